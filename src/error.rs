//! Custom error types and handling
//!
//! Every service and store operation returns [`AppResult`]. Variants are
//! chosen so a caller can tell "already satisfied" (e.g.
//! [`AppError::AlreadyTracked`]) from "blocked by conflicting state"
//! (e.g. [`AppError::Conflict`]) without parsing messages.

use uuid::Uuid;

use crate::penalty::{EvaluationError, FormulaError};

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Authorization errors
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    // Resource errors
    #[error("Not unique: {0}")]
    NotUnique(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // Penalty formula errors
    #[error("Invalid penalty formula: {0}")]
    InvalidFormula(#[from] FormulaError),

    #[error("Penalty evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),

    // Student status errors
    #[error("Students already tracked in homework: {}", .0.join(", "))]
    AlreadyTracked(Vec<String>),

    #[error("Students not tracked in homework: {}", .0.join(", "))]
    NotTracked(Vec<String>),

    #[error("Inconsistent state: {0}")]
    InconsistentState(String),

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    // Concurrency errors
    #[error("Homework {homework_id} changed since revision {expected}")]
    StaleRevision { homework_id: Uuid, expected: i64 },

    #[error("Conflict: {0}")]
    Conflict(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    // Internal errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::NotUnique(_) => "NOT_UNIQUE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidFormula(FormulaError::IllegalToken(_)) => "ILLEGAL_TOKEN",
            Self::InvalidFormula(FormulaError::SemanticError { .. }) => "SEMANTIC_ERROR",
            Self::Evaluation(_) => "EVALUATION_ERROR",
            Self::AlreadyTracked(_) => "ALREADY_TRACKED",
            Self::NotTracked(_) => "NOT_TRACKED",
            Self::InconsistentState(_) => "INCONSISTENT_STATE",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::StaleRevision { .. } => "STALE_REVISION",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

// Implement From for common error types
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                // Unique (course, homework name) and similar constraints
                if db_err.is_unique_violation() {
                    AppError::NotUnique(db_err.message().to_string())
                } else {
                    AppError::Database(db_err.to_string())
                }
            }
            _ => AppError::Database(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formula_errors_keep_their_kind() {
        let illegal: AppError = FormulaError::IllegalToken("os".into()).into();
        assert_eq!(illegal.error_code(), "ILLEGAL_TOKEN");

        let semantic: AppError = FormulaError::SemanticError {
            line: 1,
            col: 1,
            message: "expected a value".into(),
        }
        .into();
        assert_eq!(semantic.error_code(), "SEMANTIC_ERROR");
    }

    #[test]
    fn test_tracked_messages_list_students() {
        let err = AppError::AlreadyTracked(vec!["alice".into(), "bob".into()]);
        assert_eq!(err.to_string(), "Students already tracked in homework: alice, bob");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
