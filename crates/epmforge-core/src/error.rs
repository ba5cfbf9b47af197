use thiserror::Error;

/// Core error type shared across EPM Forge crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration violates structural invariants.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// A frame operation broke columnar invariants.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    /// JSON (de)serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// JSON Schema compilation failure.
    #[error("schema error: {0}")]
    Schema(String),
}

/// Convenience alias for results returned by EPM Forge crates.
pub type Result<T> = std::result::Result<T, Error>;
