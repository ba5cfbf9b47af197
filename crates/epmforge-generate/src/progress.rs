use std::io;

use tracing::{debug, info, warn};

/// Receives human-readable progress messages at pipeline checkpoints.
///
/// Delivery is fire-and-forget: a failed send is logged and swallowed,
/// never surfaced as a generation error.
pub trait ProgressSink: Send + Sync {
    fn report(&self, message: &str) -> io::Result<()>;
}

/// Default sink that drops messages (checkpoints still reach the logs).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn report(&self, _message: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Sink that forwards messages to the tracing pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn report(&self, message: &str) -> io::Result<()> {
        info!(message, "progress");
        Ok(())
    }
}

pub(crate) fn emit(sink: &dyn ProgressSink, message: &str) {
    debug!(message, "progress checkpoint");
    if let Err(err) = sink.report(message) {
        warn!(error = %err, "progress delivery failed");
    }
}
