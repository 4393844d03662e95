//! Unified error hierarchy for runlog
//!
//! Provides a structured error type covering validation, storage, import,
//! and aggregate calculation failures, with user-friendly messages for the
//! CLI layer.

use thiserror::Error;

/// Top-level error type for all runlog operations
#[derive(Debug, Error)]
pub enum RunLogError {
    /// A field value failed validation at construction
    #[error("Validation error in {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// An enumerated field received a value outside its closed set
    #[error("Invalid value for {field}: {value:?}")]
    InvalidEnumValue { field: &'static str, value: String },

    /// An aggregate was requested over zero records
    #[error("Cannot compute {operation}: no runs available")]
    EmptyInput { operation: &'static str },

    /// Lookup by id with no match
    #[error("Run not found: id {id}")]
    NotFound { id: i64 },

    /// Database operation errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File-level import errors (row-level failures are collected, not raised)
    #[error("Import error: {0}")]
    Import(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for runlog operations
pub type Result<T> = std::result::Result<T, RunLogError>;

impl RunLogError {
    /// Get user-friendly error message for CLI display
    pub fn user_message(&self) -> String {
        match self {
            RunLogError::EmptyInput { .. } => "No runs found in database".to_string(),
            RunLogError::NotFound { id } => format!("Run with id {} not found", id),
            RunLogError::Database(_) => {
                "Unable to access the run database. Please check your configuration.".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Check whether the error represents a normal empty-state condition
    /// rather than a failure
    pub fn is_empty_state(&self) -> bool {
        matches!(self, RunLogError::EmptyInput { .. })
    }
}
