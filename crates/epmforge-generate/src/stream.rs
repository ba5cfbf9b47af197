use std::thread;
use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use epmforge_core::{Dimension, GenerationConfig, GenerationSettings, validate_config};
use epmforge_rules::{RulePlan, compile_rules};

use crate::errors::GenerationError;
use crate::evaluator::apply_rules;
use crate::sampler::{sample_with_replacement, streaming_target, total_combinations};
use crate::synthesizer::{fill_base_measures, header_only_frame};

/// Pause between chunks, bounding producer pressure on the consumer.
const CHUNK_PAUSE: Duration = Duration::from_millis(10);

/// One serializable batch of generated rows.
#[derive(Debug, Clone)]
pub struct RowChunk {
    pub rows: Vec<serde_json::Value>,
}

impl RowChunk {
    /// One JSON array per line, ready for JSONL transport.
    pub fn to_jsonl(&self) -> Result<String, GenerationError> {
        let mut line = serde_json::to_string(&self.rows)?;
        line.push('\n');
        Ok(line)
    }
}

/// Lazy chunked generation over the same configuration as the batch path.
///
/// Combinations are drawn independently per dimension (with replacement);
/// callers needing the distinct-combination guarantee must use the batch
/// path. The iterator is finite and non-restartable: the producer advances
/// only when the consumer pulls, so dropping it cancels generation.
pub struct ChunkStream {
    dimensions: Vec<Dimension>,
    settings: GenerationSettings,
    plan: RulePlan,
    rng: ChaCha8Rng,
    chunk_size: usize,
    remaining: u64,
    emitted: u64,
    target: u64,
    header_rows: Option<Vec<serde_json::Value>>,
    offset: usize,
    started: bool,
}

/// Start a chunked generation for the configuration.
///
/// Structural config problems and rule cycles fail here, before the first
/// chunk; per-rule problems degrade the same way as in the batch path.
pub fn stream_chunks(
    config: &GenerationConfig,
    chunk_size: usize,
) -> Result<ChunkStream, GenerationError> {
    validate_config(config)?;
    let dimension_names = config.dimension_names();
    let plan = compile_rules(&config.dependencies, &dimension_names)?;
    let settings = config.settings.clone();
    let seed = settings.random_seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let chunk_size = chunk_size.max(1);

    if config.header_only() {
        warn!("dimension without members; streaming from headers only");
        let num_rows = settings.num_records as usize;
        let mut frame = header_only_frame(&dimension_names, num_rows, &mut rng)?;
        apply_rules(&mut frame, &plan.rules)?;
        let rows = frame.to_json_rows();
        let target = rows.len() as u64;
        return Ok(ChunkStream {
            dimensions: config.dimensions.clone(),
            settings,
            plan,
            rng,
            chunk_size,
            remaining: target,
            emitted: 0,
            target,
            header_rows: Some(rows),
            offset: 0,
            started: false,
        });
    }

    let total = total_combinations(&config.dimensions);
    let target = streaming_target(total, settings.num_records, settings.sparsity);
    if target == 0 {
        warn!("record target resolved to zero; stream will be empty");
    }
    info!(target, seed, chunk_size, "chunked generation started");

    Ok(ChunkStream {
        dimensions: config.dimensions.clone(),
        settings,
        plan,
        rng,
        chunk_size,
        remaining: target,
        emitted: 0,
        target,
        header_rows: None,
        offset: 0,
        started: false,
    })
}

impl ChunkStream {
    /// Rows this stream will emit in total.
    pub fn target_rows(&self) -> u64 {
        self.target
    }

    fn next_chunk(&mut self) -> Result<RowChunk, GenerationError> {
        if let Some(rows) = &self.header_rows {
            let end = (self.offset + self.chunk_size).min(rows.len());
            let chunk = rows[self.offset..end].to_vec();
            self.offset = end;
            self.remaining -= chunk.len() as u64;
            self.emitted += chunk.len() as u64;
            return Ok(RowChunk { rows: chunk });
        }

        let rows = (self.remaining.min(self.chunk_size as u64)) as usize;
        let mut frame = sample_with_replacement(&self.dimensions, rows, &mut self.rng)?;
        fill_base_measures(
            &mut frame,
            &self.plan.base_measures,
            &self.settings,
            &mut self.rng,
        )?;
        apply_rules(&mut frame, &self.plan.rules)?;

        self.remaining -= rows as u64;
        self.emitted += rows as u64;
        debug!(emitted = self.emitted, target = self.target, "chunk generated");
        Ok(RowChunk {
            rows: frame.to_json_rows(),
        })
    }
}

impl Iterator for ChunkStream {
    type Item = Result<RowChunk, GenerationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        if self.started {
            thread::sleep(CHUNK_PAUSE);
        } else {
            self.started = true;
        }

        match self.next_chunk() {
            Ok(chunk) => Some(Ok(chunk)),
            Err(err) => {
                // fuse after an internal failure
                self.remaining = 0;
                Some(Err(err))
            }
        }
    }
}
