//! Penalty formula error types

use thiserror::Error;

/// Why a formula was refused at authoring time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    /// A word outside the fixed vocabulary (`score`, `overtime`, `if`,
    /// `else`, integer literals)
    #[error("Illegal token in penalty formula: {0:?}")]
    IllegalToken(String),

    /// Every word is allowed but the formula does not form a program
    /// that evaluates cleanly
    #[error("Invalid penalty formula at line {line}, column {col}: {message}")]
    SemanticError {
        line: usize,
        col: usize,
        message: String,
    },
}

impl FormulaError {
    pub(crate) fn semantic(line: usize, col: usize, message: impl Into<String>) -> Self {
        Self::SemanticError {
            line,
            col,
            message: message.into(),
        }
    }
}

/// Failure while applying a formula to a concrete score.
///
/// A formula that passed validation fails only on non-finite inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("penalty formula does not parse: {0}")]
    Rejected(#[from] FormulaError),

    #[error("non-finite {name} passed to penalty formula: {value}")]
    NonFiniteInput { name: &'static str, value: f64 },

    #[error("division by zero in penalty formula")]
    DivisionByZero,
}

pub type FormulaResult<T> = Result<T, FormulaError>;
