//! Hardiness zone cleaning.

use super::{FeatureTransform, mask_outliers};
use crate::config::HardinessConfig;
use crate::error::{ProcessingError, Result};
use crate::imputation::{ImputationSource, impute_from_source};
use crate::utils::{require_column, to_float_series};
use polars::prelude::*;
use tracing::{debug, warn};

/// Turns raw hardiness bounds into two numeric columns.
///
/// Steps, in order: rename the raw columns, mask max values outside the
/// configured levels, fall back to the min value where max is unknown, convert
/// both bounds to `Float64`, then fill what is still missing from the
/// imputation source. `max >= min` is not checked.
pub struct HardinessCleaner {
    config: HardinessConfig,
    source: Option<ImputationSource>,
}

impl HardinessCleaner {
    pub fn new(config: HardinessConfig) -> Self {
        Self {
            config,
            source: None,
        }
    }

    /// Use `source` for bounds that are still missing after the min fallback.
    pub fn with_source(mut self, source: ImputationSource) -> Self {
        self.source = Some(source);
        self
    }

    fn rename(&self, df: &mut DataFrame) -> Result<()> {
        for (raw, cleaned) in &self.config.rename {
            let has_raw = df.column(raw).is_ok();
            let has_cleaned = df.column(cleaned).is_ok();
            match (has_raw, has_cleaned) {
                (true, false) => {
                    df.rename(raw, cleaned.as_str().into())?;
                }
                (false, true) => {}
                (true, true) => {
                    return Err(ProcessingError::Configuration(format!(
                        "cannot rename '{}' to '{}': both columns exist",
                        raw, cleaned
                    )));
                }
                (false, false) => {
                    return Err(ProcessingError::missing_column(raw, "Hardiness"));
                }
            }
        }
        Ok(())
    }
}

impl FeatureTransform for HardinessCleaner {
    fn name(&self) -> &'static str {
        "hardiness"
    }

    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        let mut df = df;
        self.rename(&mut df)?;

        let min_col = self.config.min_column.as_str();
        let max_col = self.config.max_column.as_str();
        require_column(&df, min_col, "Hardiness min")?;
        require_column(&df, max_col, "Hardiness max")?;

        let mut df = mask_outliers(df, max_col, &self.config.levels)?;

        let min = to_float_series(&require_column(&df, min_col, "Hardiness min")?)?;
        let max = to_float_series(&require_column(&df, max_col, "Hardiness max")?)?;

        let mut copied = 0usize;
        let max_values: Vec<Option<f64>> = max
            .f64()?
            .into_iter()
            .zip(min.f64()?.into_iter())
            .map(|(max, min)| match max {
                Some(v) => Some(v),
                None => {
                    if min.is_some() {
                        copied += 1;
                    }
                    min
                }
            })
            .collect();
        debug!("Copied min hardiness into {} missing max values", copied);

        df.replace(max_col, Series::new(max_col.into(), max_values))?;
        df.replace(min_col, min)?;

        if let Some(source) = &self.source {
            for column in [max_col, min_col] {
                df = impute_from_source(df, column, source)?;
            }
        }

        for column in [max_col, min_col] {
            let missing = df.column(column)?.null_count();
            if missing > 0 {
                warn!("{} rows still have no value in '{}'", missing, column);
            }
        }

        Ok(df)
    }
}
