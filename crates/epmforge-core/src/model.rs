use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A named axis of categorical values (ex.: Region, Product).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Dimension {
    /// Unique dimension name; becomes a column in the output.
    pub name: String,
    /// Ordered member values. An empty list on any dimension switches the
    /// whole generation into header-only mode.
    #[serde(default)]
    pub members: Vec<String>,
}

/// Kinds of dependency rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Derives a measure from a two-operand arithmetic formula.
    Calculation,
    /// Spreads a value across members (accepted, not applied).
    Allocation,
    /// Declarative consistency statement (accepted, not applied).
    Validation,
}

/// A business rule declared between measures and dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DependencyRule {
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    /// Two-operand formula, ex.: `"Margin = Revenue - COGS"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    /// Measure written on the formula's left side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Dimension and measure names referenced by the rule (informational).
    pub involved_dimensions: Vec<String>,
    /// Extra parameters; only allocation rules carry these.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// Pattern tags accepted per measure.
///
/// The synthesizer only distinguishes presence of a tag; the concrete
/// distribution behind each tag is not differentiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DataPattern {
    SeasonalPeakQ4,
    LinearIncrease,
    Random,
    NormalDistribution,
}

/// Settings controlling record count, density, and reproducibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationSettings {
    /// Target number of records to generate.
    #[serde(default = "default_num_records")]
    pub num_records: u64,
    /// Target sparsity (0 = fully dense, 1 = no intersections populated).
    #[serde(default)]
    pub sparsity: f64,
    /// Per-measure pattern tags; a declared tag shifts the sampling range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_patterns: Option<BTreeMap<String, DataPattern>>,
    /// Seed for reproducible runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
}

fn default_num_records() -> u64 {
    1000
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            num_records: default_num_records(),
            sparsity: 0.0,
            data_patterns: None,
            random_seed: None,
        }
    }
}

impl GenerationSettings {
    /// Returns true when a pattern tag is declared for the measure.
    pub fn has_pattern(&self, measure: &str) -> bool {
        self.data_patterns
            .as_ref()
            .map(|patterns| patterns.contains_key(measure))
            .unwrap_or(false)
    }
}

/// Full configuration bundle for one generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationConfig {
    /// Opaque model label (ex.: FinancialPlanning), used only for reporting.
    pub model_type: String,
    /// Dimensions of the model.
    pub dimensions: Vec<Dimension>,
    /// Declared business rules; invalid entries are dropped with a warning.
    #[serde(default)]
    pub dependencies: Vec<DependencyRule>,
    /// Generation settings.
    #[serde(default)]
    pub settings: GenerationSettings,
}

impl GenerationConfig {
    /// Names of the declared dimensions, in declaration order.
    pub fn dimension_names(&self) -> Vec<String> {
        self.dimensions
            .iter()
            .map(|dimension| dimension.name.clone())
            .collect()
    }

    /// True when any dimension carries no members, which switches the whole
    /// generation into header-only mode.
    pub fn header_only(&self) -> bool {
        self.dimensions
            .iter()
            .any(|dimension| dimension.members.is_empty())
    }
}
