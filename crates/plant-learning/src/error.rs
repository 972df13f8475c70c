//! Error types for the plant-learning crate.
//!
//! This module defines [`LearningError`], the error type returned by every
//! fallible operation in the crate: training-data preparation, preprocessor
//! fitting and transformation, neighbor search and artifact persistence.
//!
//! # Example
//!
//! ```no_run
//! use plant_learning::{LearningError, TrainingConfig};
//!
//! fn configure() -> Result<TrainingConfig, LearningError> {
//!     let config = TrainingConfig::builder().n_neighbors(5).build()?;
//!     Ok(config)
//! }
//! ```

use plant_processing::ProcessingError;
use thiserror::Error;

/// The main error type for plant-learning operations.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LearningError {
    /// A required column is absent, or a value does not fit a fitted encoder.
    ///
    /// Raised at transform time when the query schema differs from the fit
    /// schema, or when an ordinal column holds a value outside its fixed
    /// order. Unknown one-hot values are not an error.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A column holds a value type the encoder cannot work with.
    #[error("Column '{column}' has type {actual}, expected {expected}")]
    TypeMismatch {
        /// Offending column.
        column: String,
        /// What the operation accepts.
        expected: String,
        /// What the column holds.
        actual: String,
    },

    /// Invalid training configuration.
    ///
    /// Check the message for the offending setting.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input data cannot be used for fitting or querying.
    ///
    /// Common causes:
    /// - a numeric column has no values to learn a center and scale from
    /// - a feature value is missing at encoding time
    /// - a query carries more than one record where one is expected
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The neighbor index would hold no rows.
    ///
    /// Usually every catalog row was excluded by the toxicity filter.
    #[error("Neighbor index is empty")]
    EmptyIndex,

    /// A persisted artifact was written with an incompatible format.
    #[error("Unsupported artifact format version {found} (expected {expected})")]
    ArtifactVersion {
        /// Version stored in the artifact.
        found: u32,
        /// Version this build reads and writes.
        expected: u32,
    },

    /// Error raised by the cleaning library.
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// I/O error during artifact save/load.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LearningError {
    /// Stable machine-readable code for the error kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            LearningError::SchemaMismatch(_) => "SCHEMA_MISMATCH",
            LearningError::TypeMismatch { .. } => "TYPE_MISMATCH",
            LearningError::InvalidConfig(_) => "INVALID_CONFIG",
            LearningError::InvalidData(_) => "INVALID_DATA",
            LearningError::EmptyIndex => "EMPTY_INDEX",
            LearningError::ArtifactVersion { .. } => "ARTIFACT_VERSION",
            LearningError::Processing(e) => e.error_code(),
            LearningError::Polars(_) => "POLARS_ERROR",
            LearningError::Io(_) => "IO_ERROR",
            LearningError::Json(_) => "JSON_ERROR",
        }
    }

    pub(crate) fn missing_column(column: &str, role: &str) -> Self {
        LearningError::SchemaMismatch(format!("{} column '{}' not found", role, column))
    }
}
