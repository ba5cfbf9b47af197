use std::fmt;

use thiserror::Error;

/// Closed operator set for calculation formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    /// Detection order when scanning a formula's right side.
    pub const SCAN_ORDER: [Operator; 4] =
        [Operator::Mul, Operator::Add, Operator::Sub, Operator::Div];

    pub fn symbol(&self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
        }
    }

    /// Apply the operation; division by zero yields no value.
    pub fn apply(&self, lhs: f64, rhs: f64) -> Option<f64> {
        match self {
            Operator::Add => Some(lhs + rhs),
            Operator::Sub => Some(lhs - rhs),
            Operator::Mul => Some(lhs * rhs),
            Operator::Div => {
                if rhs == 0.0 {
                    None
                } else {
                    Some(lhs / rhs)
                }
            }
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.symbol())
    }
}

/// A parsed single-operator calculation: `target = lhs OP rhs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    pub target: String,
    pub lhs: String,
    pub op: Operator,
    pub rhs: String,
}

impl fmt::Display for Formula {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{} = {} {} {}",
            self.target, self.lhs, self.op, self.rhs
        )
    }
}

/// Reasons a formula string fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormulaParseError {
    #[error("formula must contain exactly one '='")]
    MalformedAssignment,
    #[error("formula target must be non-empty")]
    EmptyTarget,
    #[error("formula right side must use one of '+', '-', '*', '/'")]
    MissingOperator,
    #[error("formula supports a single operator, found several")]
    MultipleOperators,
    #[error("formula operands must be non-empty")]
    EmptyOperand,
}

/// Parse `"target = a OP b"` into a [`Formula`].
///
/// Exactly one binary operator is recognized; a right side mixing several
/// operator occurrences is rejected instead of silently mis-split.
pub fn parse_formula(text: &str) -> Result<Formula, FormulaParseError> {
    let Some((target, expr)) = text.split_once('=') else {
        return Err(FormulaParseError::MalformedAssignment);
    };
    let target = target.trim();
    let expr = expr.trim();
    if expr.contains('=') {
        return Err(FormulaParseError::MalformedAssignment);
    }
    if target.is_empty() {
        return Err(FormulaParseError::EmptyTarget);
    }

    let occurrences = expr
        .chars()
        .filter(|ch| matches!(ch, '+' | '-' | '*' | '/'))
        .count();
    if occurrences == 0 {
        return Err(FormulaParseError::MissingOperator);
    }
    if occurrences > 1 {
        return Err(FormulaParseError::MultipleOperators);
    }

    let op = Operator::SCAN_ORDER
        .into_iter()
        .find(|op| expr.contains(op.symbol()))
        .ok_or(FormulaParseError::MissingOperator)?;
    let Some((lhs, rhs)) = expr.split_once(op.symbol()) else {
        return Err(FormulaParseError::MissingOperator);
    };

    let lhs = lhs.trim();
    let rhs = rhs.trim();
    if lhs.is_empty() || rhs.is_empty() {
        return Err(FormulaParseError::EmptyOperand);
    }

    Ok(Formula {
        target: target.to_string(),
        lhs: lhs.to_string(),
        op,
        rhs: rhs.to_string(),
    })
}
