//! Sunlight categorization.

use super::FeatureTransform;
use crate::config::SunlightConfig;
use crate::error::Result;
use crate::utils::{require_column, string_lists};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Cleaned sunlight requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SunlightCategory {
    FullShade,
    PartShade,
    FullSun,
}

impl SunlightCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SunlightCategory::FullShade => "full_shade",
            SunlightCategory::PartShade => "part_shade",
            SunlightCategory::FullSun => "full_sun",
        }
    }
}

/// Collapses a row's sunlight descriptors into one [`SunlightCategory`].
///
/// Any shade descriptor wins, then any sun descriptor; everything else,
/// including an empty list, is part shade.
pub struct SunlightCleaner {
    column: String,
    full_sun: HashSet<String>,
    full_shade: HashSet<String>,
}

impl SunlightCleaner {
    pub fn new(config: SunlightConfig) -> Self {
        Self {
            column: config.column,
            full_sun: config.full_sun.into_iter().collect(),
            full_shade: config.full_shade.into_iter().collect(),
        }
    }

    pub fn categorize<S: AsRef<str>>(&self, tokens: &[S]) -> SunlightCategory {
        if tokens.iter().any(|t| self.full_shade.contains(t.as_ref())) {
            SunlightCategory::FullShade
        } else if tokens.iter().any(|t| self.full_sun.contains(t.as_ref())) {
            SunlightCategory::FullSun
        } else {
            SunlightCategory::PartShade
        }
    }
}

impl FeatureTransform for SunlightCleaner {
    fn name(&self) -> &'static str {
        "sunlight"
    }

    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        let mut df = df;
        let series = require_column(&df, &self.column, "Sunlight")?;

        let categories: Vec<&str> = string_lists(&series)?
            .iter()
            .map(|tokens| self.categorize(tokens.as_slice()).as_str())
            .collect();
        debug!("Categorized sunlight for {} rows", categories.len());

        df.replace(&self.column, Series::new(self.column.as_str().into(), categories))?;
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeatureConfig;
    use crate::utils::list_series;

    fn cleaner() -> SunlightCleaner {
        SunlightCleaner::new(FeatureConfig::default().sunlight)
    }

    #[test]
    fn test_shade_wins_regardless_of_order() {
        assert_eq!(
            cleaner().categorize(&["shade", "full sun"]),
            SunlightCategory::FullShade
        );
        assert_eq!(
            cleaner().categorize(&["full sun", "shade"]),
            SunlightCategory::FullShade
        );
    }

    #[test]
    fn test_sun_and_fallback() {
        assert_eq!(
            cleaner().categorize(&["part sun", "full sun"]),
            SunlightCategory::FullSun
        );
        assert_eq!(
            cleaner().categorize(&["filtered light"]),
            SunlightCategory::PartShade
        );
        assert_eq!(
            cleaner().categorize::<&str>(&[]),
            SunlightCategory::PartShade
        );
    }

    #[test]
    fn test_apply_replaces_list_column() {
        let rows = vec![
            vec!["shade".to_string(), "full sun".to_string()],
            vec!["full sun".to_string()],
            vec![],
        ];
        let df = DataFrame::new(vec![list_series("sunlight".into(), rows).into()]).unwrap();

        let out = cleaner().apply(df).unwrap();
        let values: Vec<Option<&str>> = out
            .column("sunlight")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(
            values,
            vec![Some("full_shade"), Some("full_sun"), Some("part_shade")]
        );
    }
}
