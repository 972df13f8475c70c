//! Plant catalog cleaning library.
//!
//! Turns a raw plant catalog with ragged, inconsistently formatted attributes
//! into a typed feature table ready for similarity search. Built on Polars.
//!
//! # Overview
//!
//! - **Normalization**: lowercasing, list-literal parsing, `TRUE`/`FALSE`
//!   coercion with per-column defaults
//! - **Feature cleaners**: hardiness bounds, maintenance level (with proxy
//!   imputation from care level and watering), sunlight category, plant type
//! - **External imputation**: fill remaining gaps from a row-aligned (or
//!   id-aligned) [`ImputationSource`]
//! - **Feature synthesis**: perennial flag and animal-attraction flags
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use plant_processing::{CleaningPipeline, FeatureConfig};
//! use polars::prelude::*;
//!
//! let raw = CsvReadOptions::default()
//!     .with_has_header(true)
//!     .with_infer_schema_length(Some(0))
//!     .try_into_reader_with_file_path(Some("plants.csv".into()))?
//!     .finish()?;
//!
//! let outcome = CleaningPipeline::builder()
//!     .config(FeatureConfig::load("features.json")?)
//!     .build()?
//!     .run(raw)?;
//!
//! println!("{}", outcome.data);
//! ```
//!
//! # Error Handling
//!
//! Every step is all-or-nothing and returns [`ProcessingError`]. The only
//! step that deliberately tolerates missing data is maintenance imputation,
//! which leaves a value missing when no proxy can supply one.

pub mod cleaner;
pub mod config;
pub mod error;
pub mod imputation;
pub mod pipeline;
pub mod synthesis;
pub mod utils;

pub use cleaner::{
    FeatureCleaner, FeatureTransform, HardinessCleaner, MaintenanceCleaner, SunlightCategory,
    SunlightCleaner, TypeCleaner, coerce_booleans, lowercase, mask_outliers, parse_list_columns,
};
pub use config::{
    AttractionGroup, FeatureConfig, HardinessConfig, ImputationAlignment, MaintenanceConfig,
    NormalizationConfig, SunlightConfig, SynthesisConfig, TypeConfig, TypeGroup,
};
pub use error::{ProcessingError, Result as ProcessingResult, ResultExt};
pub use imputation::{ImputationSource, impute_from_source};
pub use pipeline::{CleaningOutcome, CleaningPipeline, CleaningPipelineBuilder};
pub use synthesis::{FeatureSynthesizer, derive_attraction, derive_perennial};
pub use utils::lists_to_literals;
