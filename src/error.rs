//! Error types for cohort harmonisation and differential expression

use thiserror::Error;

/// Main error type for cohort loading, merging and testing
#[derive(Error, Debug)]
pub enum CohortError {
    #[error("Missing dependency: {what}")]
    MissingDependency { what: String },

    #[error("Empty input: {reason}")]
    EmptyInput { reason: String },

    #[error("Schema mismatch in sample '{sample_id}': column '{column}' not present")]
    SchemaMismatch { sample_id: String, column: String },

    #[error("Batch correction failed: {reason}")]
    CorrectionFailure { reason: String },

    #[error("No comparison group: {reason}")]
    NoComparisonGroup { reason: String },

    #[error("Column not found: {name}")]
    ColumnNotFound { name: String },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: String, got: String },

    #[error("Duplicate label '{name}' in {context}")]
    DuplicateLabel { name: String, context: String },

    #[error("Failed to fetch cohort {cohort_id}: {reason}")]
    Source { cohort_id: String, reason: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for cohort operations
pub type Result<T> = std::result::Result<T, CohortError>;
