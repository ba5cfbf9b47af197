use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::model::GenerationConfig;

/// Validate structural invariants of a generation config.
///
/// This checks:
/// - at least one dimension, each with a unique non-empty name
/// - a positive record target
/// - sparsity within [0, 1]
///
/// Structural invalidity is the only fatal configuration condition; rule
/// content problems are handled downstream as dropped-rule warnings.
pub fn validate_config(config: &GenerationConfig) -> Result<()> {
    if config.dimensions.is_empty() {
        return Err(Error::InvalidConfig(
            "at least one dimension is required".to_string(),
        ));
    }

    let mut seen = BTreeSet::new();
    for dimension in &config.dimensions {
        let name = dimension.name.trim();
        if name.is_empty() {
            return Err(Error::InvalidConfig(
                "dimension name must be non-empty".to_string(),
            ));
        }
        if !seen.insert(name.to_string()) {
            return Err(Error::InvalidConfig(format!(
                "duplicate dimension name: {name}"
            )));
        }
    }

    if config.settings.num_records == 0 {
        return Err(Error::InvalidConfig(
            "num_records must be greater than zero".to_string(),
        ));
    }

    let sparsity = config.settings.sparsity;
    if !sparsity.is_finite() || !(0.0..=1.0).contains(&sparsity) {
        return Err(Error::InvalidConfig(format!(
            "sparsity must be within [0, 1], got {sparsity}"
        )));
    }

    Ok(())
}

/// Validate a raw config document against the generated JSON Schema.
///
/// Returns the list of structural violations; an empty list means the
/// document is well-formed (content invariants still go through
/// [`validate_config`] after deserialization).
pub fn validate_config_json(doc: &serde_json::Value) -> Result<Vec<String>> {
    let schema = config_json_schema()?;
    let compiled =
        jsonschema::JSONSchema::compile(&schema).map_err(|err| Error::Schema(err.to_string()))?;

    let mut violations = Vec::new();
    if let Err(errors) = compiled.validate(doc) {
        for error in errors {
            let path = error.instance_path.to_string();
            let path = if path.is_empty() { "/".to_string() } else { path };
            violations.push(format!("{path}: {error}"));
        }
    }

    Ok(violations)
}

/// JSON Schema for [`GenerationConfig`], generated from the type definitions.
pub fn config_json_schema() -> Result<serde_json::Value> {
    let schema = schemars::schema_for!(GenerationConfig);
    Ok(serde_json::to_value(schema)?)
}
