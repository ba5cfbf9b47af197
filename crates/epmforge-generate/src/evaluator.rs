use tracing::{info, warn};

use epmforge_core::{CellValue, Frame, round2};
use epmforge_rules::CompiledRule;

use crate::errors::GenerationError;

/// Apply compiled calculation rules column-wise, in plan order.
///
/// A rule whose operand columns are absent is skipped with a log line; a
/// zero denominator yields a null cell, never an error or infinity. One
/// rule's failure does not abort the rest. Returns how many rules ran.
pub fn apply_rules(frame: &mut Frame, rules: &[CompiledRule]) -> Result<usize, GenerationError> {
    let mut applied = 0;

    for rule in rules {
        let formula = &rule.formula;
        let (Some(lhs), Some(rhs)) = (frame.column(&formula.lhs), frame.column(&formula.rhs))
        else {
            warn!(formula = %formula, "calculation skipped: operand columns missing");
            continue;
        };

        let values: Vec<CellValue> = lhs
            .iter()
            .zip(rhs)
            .map(|(left, right)| match (left.as_number(), right.as_number()) {
                (Some(left), Some(right)) => formula
                    .op
                    .apply(left, right)
                    .map(|value| CellValue::Number(round2(value)))
                    .unwrap_or(CellValue::Null),
                _ => CellValue::Null,
            })
            .collect();

        frame.set_column(&formula.target, values)?;
        applied += 1;
        info!(formula = %formula, "column calculated from rule");
    }

    Ok(applied)
}
