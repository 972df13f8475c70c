//! Plant recommendation library.
//!
//! Takes the cleaned catalog produced by [`plant_processing`] and answers
//! "which plants are most like this one?" queries:
//!
//! ```text
//! ┌──────────────┐   ┌────────────────────────┐   ┌──────────────────────┐
//! │ clean table  │──▶│ ToxicityFilter         │──▶│ RecommendationPre-   │
//! │              │   │ + training-only drop   │   │ processor::fit       │
//! └──────────────┘   └────────────────────────┘   └──────────┬───────────┘
//!                                                            │
//!                    ┌────────────────────────┐   ┌──────────▼───────────┐
//!   user record ────▶│ FittedPreprocessor::   │──▶│ NeighborIndex::query │
//!                    │ transform              │   │ (Euclidean, k)       │
//!                    └────────────────────────┘   └──────────────────────┘
//! ```
//!
//! Fitting happens once. The [`FittedPreprocessor`] and [`NeighborIndex`] are
//! immutable afterwards and safe to query from several threads.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use plant_learning::{Recommender, TrainingConfig};
//!
//! let config = TrainingConfig::builder().n_neighbors(5).build()?;
//! let recommender = Recommender::train(&clean, &config)?;
//! let matches = recommender.recommend(&user_record)?;
//! println!("{}", matches);
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, LearningError>`]. Errors from
//! the cleaning library surface as [`LearningError::Processing`].
//!
//! # Persistence
//!
//! Fitted artifacts are written as versioned JSON:
//!
//! ```rust,ignore
//! recommender.save("model/")?;
//! let recommender = Recommender::load("model/")?;
//! ```

mod artifact;
mod catalog;
mod config;
mod engine;
mod error;
mod matrix;
mod preprocessor;
mod recommender;
mod toxicity;

// Re-export public API
//
// Configuration types
pub use config::{ColumnRoles, TrainingConfig, TrainingConfigBuilder};
// Error types
pub use error::LearningError;
// Artifact format
pub use artifact::FORMAT_VERSION;
// Encoding
pub use matrix::FeatureMatrix;
pub use preprocessor::{ColumnEncoding, FittedPreprocessor, RecommendationPreprocessor};
// Neighbor search
pub use engine::{Neighbor, NeighborIndex, RecommendationEngine};
// Facade
pub use recommender::{DISTANCE_COLUMN, Recommender};
// Training data
pub use toxicity::{ToxicityFilter, prepare_training_data};

static_assertions::assert_impl_all!(FittedPreprocessor: Send, Sync);
static_assertions::assert_impl_all!(NeighborIndex: Send, Sync);
static_assertions::assert_impl_all!(Recommender: Send, Sync);
