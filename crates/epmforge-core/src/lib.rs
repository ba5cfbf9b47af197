//! Core contracts and helpers for EPM Forge.
//!
//! This crate defines the canonical configuration types, the columnar frame
//! used by the generation pipeline, and validation helpers shared across the
//! workspace.

pub mod error;
pub mod frame;
pub mod issue;
pub mod model;
pub mod validation;

pub use error::{Error, Result};
pub use frame::{CellValue, Frame, round2};
pub use issue::{Issue, IssueSeverity};
pub use model::{
    DataPattern, DependencyRule, Dimension, GenerationConfig, GenerationSettings, RuleType,
};
pub use validation::{config_json_schema, validate_config, validate_config_json};
