//! Maintenance level cleaning and proxy imputation.

use super::{FeatureTransform, mask_outliers};
use crate::config::MaintenanceConfig;
use crate::error::Result;
use crate::utils::{cell_keys, require_column};
use polars::prelude::*;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Maintenance level implied by a care level.
pub fn care_to_maintenance(care_level: &str) -> &str {
    match care_level {
        "medium" => "moderate",
        "easy" => "low",
        other => other,
    }
}

/// Maintenance level implied by a watering frequency.
pub fn watering_to_maintenance(watering: &str) -> &str {
    match watering {
        "average" => "moderate",
        "minimum" => "low",
        "frequent" => "high",
        other => other,
    }
}

/// Masks unknown maintenance and care levels, then fills missing maintenance
/// levels from proxy columns.
///
/// Proxies are tried in the configured order and only fill rows that are
/// still missing. A proxy value whose mapping is not a maintenance level does
/// not fill anything, so the next proxy still gets a chance. Rows with no
/// usable proxy stay missing.
pub struct MaintenanceCleaner {
    config: MaintenanceConfig,
}

impl MaintenanceCleaner {
    pub fn new(config: MaintenanceConfig) -> Self {
        Self { config }
    }

    fn map_proxy<'a>(&self, proxy: &str, value: &'a str) -> &'a str {
        if proxy == self.config.care_level_column {
            care_to_maintenance(value)
        } else if proxy == self.config.watering_column {
            watering_to_maintenance(value)
        } else {
            value
        }
    }
}

impl FeatureTransform for MaintenanceCleaner {
    fn name(&self) -> &'static str {
        "maintenance"
    }

    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        let target = self.config.column.as_str();
        let df = mask_outliers(df, target, &self.config.maintenance_levels)?;
        let mut df = mask_outliers(
            df,
            &self.config.care_level_column,
            &self.config.care_levels,
        )?;

        let levels: HashSet<&str> = self
            .config
            .maintenance_levels
            .iter()
            .map(String::as_str)
            .collect();
        let mut values = cell_keys(&require_column(&df, target, "Maintenance")?)?;

        for proxy in &self.config.imputation_features {
            let proxy_values = cell_keys(&require_column(&df, proxy, "Maintenance proxy")?)?;
            let mut filled = 0usize;

            for (value, proxy_value) in values.iter_mut().zip(&proxy_values) {
                if value.is_some() {
                    continue;
                }
                if let Some(raw) = proxy_value {
                    let mapped = self.map_proxy(proxy, raw);
                    if levels.contains(mapped) {
                        *value = Some(mapped.to_string());
                        filled += 1;
                    }
                }
            }
            debug!("Imputed {} maintenance levels from '{}'", filled, proxy);
        }

        let missing = values.iter().filter(|v| v.is_none()).count();
        if missing > 0 {
            warn!("{} rows have no maintenance level after imputation", missing);
        }

        df.replace(target, Series::new(target.into(), values))?;
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeatureConfig;

    fn maintenance(df: &DataFrame) -> Vec<Option<String>> {
        df.column("maintenance")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    #[test]
    fn test_proxy_mappings() {
        assert_eq!(care_to_maintenance("medium"), "moderate");
        assert_eq!(care_to_maintenance("easy"), "low");
        assert_eq!(care_to_maintenance("high"), "high");
        assert_eq!(watering_to_maintenance("average"), "moderate");
        assert_eq!(watering_to_maintenance("minimum"), "low");
        assert_eq!(watering_to_maintenance("frequent"), "high");
        assert_eq!(watering_to_maintenance("none"), "none");
    }

    #[test]
    fn test_cascade() {
        let df = df![
            "maintenance" => [None, None, None, Some("low"), Some("extreme")],
            "care_level" => [Some("medium"), None, None, Some("high"), Some("easy")],
            "watering" => [None, Some("frequent"), None, Some("frequent"), None],
        ]
        .unwrap();

        let out = MaintenanceCleaner::new(FeatureConfig::default().maintenance)
            .apply(df)
            .unwrap();
        assert_eq!(
            maintenance(&out),
            vec![
                Some("moderate".to_string()),
                Some("high".to_string()),
                None,
                Some("low".to_string()),
                Some("low".to_string()),
            ]
        );
    }

    #[test]
    fn test_care_level_takes_priority_over_watering() {
        let df = df![
            "maintenance" => [Option::<&str>::None],
            "care_level" => [Some("easy")],
            "watering" => [Some("frequent")],
        ]
        .unwrap();

        let out = MaintenanceCleaner::new(FeatureConfig::default().maintenance)
            .apply(df)
            .unwrap();
        assert_eq!(maintenance(&out), vec![Some("low".to_string())]);
    }

    #[test]
    fn test_unmapped_proxy_value_leaves_room_for_next_proxy() {
        let df = df![
            "maintenance" => [Option::<&str>::None],
            "care_level" => [Some("moderate")],
            "watering" => [Some("none")],
        ]
        .unwrap();
        let mut config = FeatureConfig::default().maintenance;
        config.imputation_features = vec!["watering".to_string(), "care_level".to_string()];

        let out = MaintenanceCleaner::new(config).apply(df).unwrap();
        assert_eq!(maintenance(&out), vec![Some("moderate".to_string())]);
    }

    #[test]
    fn test_unknown_care_level_is_masked() {
        let df = df![
            "maintenance" => [Some("low")],
            "care_level" => [Some("impossible")],
            "watering" => [Some("average")],
        ]
        .unwrap();
        let out = MaintenanceCleaner::new(FeatureConfig::default().maintenance)
            .apply(df)
            .unwrap();
        assert_eq!(out.column("care_level").unwrap().null_count(), 1);
    }
}
