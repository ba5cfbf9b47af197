use thiserror::Error;

/// Internal validation failures.
///
/// These never reach the caller as errors; the validator degrades to
/// returning the unmodified input frame plus one issue string.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("core error: {0}")]
    Core(#[from] epmforge_core::Error),
}
