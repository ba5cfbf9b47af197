use thiserror::Error;

/// Errors raised while compiling the rule plan.
///
/// Most rule problems are dropped-with-warning; only conditions that make
/// the whole plan unusable surface here.
#[derive(Debug, Error)]
pub enum RuleError {
    /// Derived measures depend on each other in a cycle.
    #[error("cyclic calculation rules involving: {0}")]
    CyclicRules(String),
}
