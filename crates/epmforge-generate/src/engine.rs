use std::sync::Arc;
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use epmforge_core::{GenerationConfig, validate_config};
use epmforge_rules::compile_rules;
use epmforge_validate::validate_and_format;

use crate::errors::GenerationError;
use crate::evaluator::apply_rules;
use crate::model::{GenerationOutcome, GenerationReport};
use crate::progress::{NullSink, ProgressSink, emit};
use crate::sampler::sample_intersections;
use crate::synthesizer::{fill_base_measures, header_only_frame};

/// Entry point for the batch generation pipeline.
///
/// Stages run strictly sequentially per request: sample intersections, fill
/// base measures, evaluate formulas, validate and format. All state is
/// request-local; concurrent requests are independent.
pub struct GenerationEngine {
    progress: Arc<dyn ProgressSink>,
}

impl Default for GenerationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationEngine {
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NullSink),
        }
    }

    pub fn with_progress(sink: Arc<dyn ProgressSink>) -> Self {
        Self { progress: sink }
    }

    pub fn run(&self, config: &GenerationConfig) -> Result<GenerationOutcome, GenerationError> {
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        validate_config(config)?;

        emit(self.progress.as_ref(), "analyzing dependencies");
        let dimension_names = config.dimension_names();
        let plan = compile_rules(&config.dependencies, &dimension_names)?;
        let mut issues: Vec<String> = plan
            .warnings
            .iter()
            .map(|warning| warning.to_string())
            .collect();

        let settings = &config.settings;
        let seed = settings.random_seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        info!(
            run_id = %run_id,
            model_type = %config.model_type,
            seed,
            rows = settings.num_records,
            sparsity = settings.sparsity,
            "generation started"
        );

        let header_only = config.header_only();
        let (mut frame, total_possible) = if header_only {
            warn!("dimension without members; generating from headers only");
            emit(
                self.progress.as_ref(),
                &format!("generating {} header-only records", settings.num_records),
            );
            let frame =
                header_only_frame(&dimension_names, settings.num_records as usize, &mut rng)?;
            (frame, 0)
        } else {
            let sampled = sample_intersections(
                &config.dimensions,
                settings.num_records,
                settings.sparsity,
                &mut rng,
            )?;
            issues.extend(sampled.warnings.iter().map(ToString::to_string));
            emit(
                self.progress.as_ref(),
                &format!(
                    "generating {}/{} records",
                    sampled.frame.num_rows(),
                    sampled.total_possible
                ),
            );
            let mut frame = sampled.frame;
            fill_base_measures(&mut frame, &plan.base_measures, settings, &mut rng)?;
            (frame, sampled.total_possible)
        };

        if frame.num_rows() == 0 {
            warn!("record target resolved to zero; no data will be generated");
            issues.push("record target resolved to zero; no data was generated".to_string());
        }

        emit(
            self.progress.as_ref(),
            &format!("applying {} calculation rules", plan.rules.len()),
        );
        let rules_applied = apply_rules(&mut frame, &plan.rules)? as u64;

        emit(self.progress.as_ref(), "validating and formatting");
        let (frame, validation_issues) =
            validate_and_format(&frame, &dimension_names, &plan.rules);
        issues.extend(validation_issues);

        let report = GenerationReport {
            run_id,
            model_type: config.model_type.clone(),
            seed,
            header_only,
            total_possible,
            rows_requested: settings.num_records,
            rows_generated: frame.num_rows() as u64,
            rules_applied,
            rule_warnings: plan.warnings.len() as u64,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            run_id = %report.run_id,
            rows = report.rows_generated,
            issues = issues.len(),
            duration_ms = report.duration_ms,
            "generation finished"
        );
        emit(
            self.progress.as_ref(),
            &format!(
                "generation finished: {} records, {} issues",
                report.rows_generated,
                issues.len()
            ),
        );

        Ok(GenerationOutcome {
            frame,
            issues,
            report,
        })
    }
}
