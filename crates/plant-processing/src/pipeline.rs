//! The cleaning pipeline.
//!
//! Runs column selection, generic normalization, the four feature cleaners
//! and feature synthesis, in that order:
//!
//! ```text
//! select -> normalize -> maintenance -> type -> sunlight -> hardiness -> synthesis
//! ```
//!
//! A failing step aborts the run; its error is wrapped with the step name.
//!
//! # Example
//!
//! ```rust,ignore
//! use plant_processing::{CleaningPipeline, FeatureConfig};
//!
//! let pipeline = CleaningPipeline::builder()
//!     .config(FeatureConfig::load("features.json")?)
//!     .type_source(type_df)
//!     .hardiness_source(hardiness_df)
//!     .build()?;
//!
//! let outcome = pipeline.run(raw_df)?;
//! for step in &outcome.steps {
//!     println!("{}", step);
//! }
//! ```

use crate::cleaner::{
    FeatureCleaner, FeatureTransform, HardinessCleaner, MaintenanceCleaner, SunlightCleaner,
    TypeCleaner,
};
use crate::config::FeatureConfig;
use crate::error::{ResultExt, Result};
use crate::imputation::ImputationSource;
use crate::synthesis::FeatureSynthesizer;
use polars::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// Output of a pipeline run.
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    /// The cleaned table.
    pub data: DataFrame,
    /// One line per executed step.
    pub steps: Vec<String>,
    pub duration_ms: u64,
}

/// Ordered composition of cleaning steps over one [`FeatureConfig`].
pub struct CleaningPipeline {
    config: FeatureConfig,
    steps: Vec<Box<dyn FeatureTransform>>,
}

impl CleaningPipeline {
    pub fn builder() -> CleaningPipelineBuilder {
        CleaningPipelineBuilder::default()
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Names of the steps run after column selection, in order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Clean `raw` into the feature table.
    pub fn run(&self, raw: DataFrame) -> Result<CleaningOutcome> {
        let start = Instant::now();
        info!(
            "Cleaning dataset: {} rows x {} columns",
            raw.height(),
            raw.width()
        );

        let mut steps = Vec::with_capacity(self.steps.len() + 1);

        let names: Vec<String> = raw
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        self.config.check_columns(&names).context("select")?;
        let mut df = raw
            .select(self.config.relevant_columns.iter().map(String::as_str))
            .context("select")?;
        steps.push(format!(
            "select: kept {} of {} columns",
            df.width(),
            names.len()
        ));

        for step in &self.steps {
            df = step.apply(df).context(step.name())?;
            debug!(
                "Step '{}' done: {} rows x {} columns",
                step.name(),
                df.height(),
                df.width()
            );
            steps.push(format!(
                "{}: {} rows x {} columns",
                step.name(),
                df.height(),
                df.width()
            ));
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Cleaning complete in {} ms: {} rows x {} columns",
            duration_ms,
            df.height(),
            df.width()
        );

        Ok(CleaningOutcome {
            data: df,
            steps,
            duration_ms,
        })
    }
}

/// Builder for [`CleaningPipeline`].
#[derive(Default)]
pub struct CleaningPipelineBuilder {
    config: Option<FeatureConfig>,
    type_source: Option<DataFrame>,
    hardiness_source: Option<DataFrame>,
}

impl CleaningPipelineBuilder {
    pub fn config(mut self, config: FeatureConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Table supplying plant types left missing by the type cleaner.
    pub fn type_source(mut self, data: DataFrame) -> Self {
        self.type_source = Some(data);
        self
    }

    /// Table supplying hardiness bounds left missing by the hardiness cleaner.
    pub fn hardiness_source(mut self, data: DataFrame) -> Self {
        self.hardiness_source = Some(data);
        self
    }

    /// Validate the configuration and assemble the steps.
    pub fn build(self) -> Result<CleaningPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let alignment = config.imputation_alignment.clone();
        let source = |data: DataFrame| ImputationSource::with_alignment(data, alignment.clone());

        let mut type_cleaner = TypeCleaner::new(config.plant_type.clone());
        if let Some(data) = self.type_source {
            type_cleaner = type_cleaner.with_source(source(data));
        }

        let mut hardiness_cleaner = HardinessCleaner::new(config.hardiness.clone());
        if let Some(data) = self.hardiness_source {
            hardiness_cleaner = hardiness_cleaner.with_source(source(data));
        }

        let steps: Vec<Box<dyn FeatureTransform>> = vec![
            Box::new(FeatureCleaner::new(config.normalization.clone())),
            Box::new(MaintenanceCleaner::new(config.maintenance.clone())),
            Box::new(type_cleaner),
            Box::new(SunlightCleaner::new(config.sunlight.clone())),
            Box::new(hardiness_cleaner),
            Box::new(FeatureSynthesizer::new(config.synthesis.clone())),
        ];

        Ok(CleaningPipeline { config, steps })
    }
}
