//! Derived boolean features.
//!
//! The synthesizer turns the life-cycle category into a `perennial` flag and
//! the attracted-animal list into one flag per animal group, then drops the
//! source columns and any other configured columns.

use crate::cleaner::FeatureTransform;
use crate::config::{AttractionGroup, SynthesisConfig};
use crate::error::{ProcessingError, Result};
use crate::utils::{cell_keys, require_column, string_lists};
use polars::prelude::*;
use std::collections::HashSet;
use tracing::debug;

/// Add `new_column`: false exactly where `cycle_column` equals
/// `non_perennial_value`, true everywhere else (missing values included).
pub fn derive_perennial(
    df: DataFrame,
    cycle_column: &str,
    new_column: &str,
    non_perennial_value: &str,
) -> Result<DataFrame> {
    let mut df = df;
    let cycle = require_column(&df, cycle_column, "Cycle")?;
    let flags: Vec<bool> = cell_keys(&cycle)?
        .iter()
        .map(|value| value.as_deref() != Some(non_perennial_value))
        .collect();
    df.with_column(Series::new(new_column.into(), flags))?;
    Ok(df)
}

/// Add one column per group: true iff the row's animal list shares at least
/// one animal with the group.
pub fn derive_attraction(
    df: DataFrame,
    attracts_column: &str,
    groups: &[AttractionGroup],
) -> Result<DataFrame> {
    let mut df = df;
    let attracts = string_lists(&require_column(&df, attracts_column, "Attracts")?)?;

    for group in groups {
        let animals: HashSet<&str> = group.animals.iter().map(String::as_str).collect();
        let flags: Vec<bool> = attracts
            .iter()
            .map(|row| row.iter().any(|animal| animals.contains(animal.as_str())))
            .collect();
        debug!(
            "'{}' set for {} rows",
            group.name,
            flags.iter().filter(|f| **f).count()
        );
        df.with_column(Series::new(group.name.as_str().into(), flags))?;
    }
    Ok(df)
}

/// Applies [`derive_perennial`] and [`derive_attraction`], then drops the
/// source columns together with `drop_columns`.
pub struct FeatureSynthesizer {
    config: SynthesisConfig,
}

impl FeatureSynthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        Self { config }
    }

    /// Columns removed after synthesis, without duplicates, in a stable order.
    pub fn columns_to_drop(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        [
            self.config.cycle_column.as_str(),
            self.config.attracts_column.as_str(),
        ]
        .into_iter()
        .chain(self.config.drop_columns.iter().map(String::as_str))
        .filter(|c| seen.insert(*c))
        .collect()
    }
}

impl FeatureTransform for FeatureSynthesizer {
    fn name(&self) -> &'static str {
        "synthesis"
    }

    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        let c = &self.config;
        let df = derive_perennial(df, &c.cycle_column, &c.perennial_column, &c.non_perennial_value)?;
        let df = derive_attraction(df, &c.attracts_column, &c.attraction_groups)?;

        let to_drop = self.columns_to_drop();
        if let Some(absent) = to_drop.iter().find(|col| df.column(col).is_err()) {
            return Err(ProcessingError::missing_column(absent, "Dropped"));
        }
        Ok(df.drop_many(to_drop))
    }
}
