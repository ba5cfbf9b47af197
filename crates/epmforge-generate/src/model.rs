use serde::Serialize;

use epmforge_core::Frame;

/// Accounting for one generation run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub model_type: String,
    /// Seed actually used; equals the configured seed when one was given.
    pub seed: u64,
    pub header_only: bool,
    /// Size of the combination space (0 in header-only mode).
    pub total_possible: u64,
    pub rows_requested: u64,
    pub rows_generated: u64,
    pub rules_applied: u64,
    pub rule_warnings: u64,
    pub duration_ms: u64,
}

/// Final product of a generation request: data, issues, accounting.
///
/// Issues accompany the data, they never replace it; an empty list means a
/// clean run.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub frame: Frame,
    pub issues: Vec<String>,
    pub report: GenerationReport,
}

impl GenerationOutcome {
    /// Materialize the output rows as JSON objects in column order.
    pub fn rows(&self) -> Vec<serde_json::Value> {
        self.frame.to_json_rows()
    }
}
