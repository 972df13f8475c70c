//! Error types for the plant cleaning pipeline.
//!
//! Every cleaning and synthesis step is all-or-nothing: a step either returns
//! the fully transformed table or one of the errors below, carrying the
//! offending column (and row, where one exists).
//!
//! Errors are serializable so a runner can report them as `{code, message}`.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for cleaning, imputation and feature synthesis.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// An expected column is absent or has an incompatible structure.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// An imputation source does not line up with the table it imputes.
    #[error("Imputation source for '{column}' has {actual} rows, expected {expected}")]
    Alignment {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// A list literal could not be parsed.
    #[error("Failed to parse list literal in column '{column}' at row {row}: {reason}")]
    Parse {
        column: String,
        row: usize,
        reason: String,
    },

    /// A column holds a value type the operation cannot work with.
    #[error("Column '{column}' has type {actual}, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },

    /// The feature configuration is inconsistent or references absent columns.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error with the name of the stage that produced it.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ProcessingError>,
    },
}

impl ProcessingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ProcessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for a missing configured column.
    pub fn missing_column(column: &str, role: &str) -> Self {
        ProcessingError::Configuration(format!(
            "{} column '{}' not found in dataset",
            role, column
        ))
    }

    /// Stable error code for callers that branch on the failure kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SchemaMismatch(_) => "SCHEMA_MISMATCH",
            Self::Alignment { .. } => "ALIGNMENT_ERROR",
            Self::Parse { .. } => "PARSE_ERROR",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Returns the innermost error, skipping context wrappers.
    pub fn root(&self) -> &ProcessingError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

impl Serialize for ProcessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ProcessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for processing operations.
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ProcessingError::Polars(e).with_context(context))
    }
}
