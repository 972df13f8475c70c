//! Plant type grouping.

use super::FeatureTransform;
use crate::config::TypeConfig;
use crate::error::Result;
use crate::imputation::{ImputationSource, impute_from_source};
use crate::utils::{require_column, type_mismatch};
use polars::prelude::*;
use std::collections::HashMap;
use tracing::debug;

/// Maps raw plant-type values onto their configured group label.
///
/// Values that belong to no group pass through unchanged. Missing values are
/// filled from the imputation source when one is attached.
pub struct TypeCleaner {
    column: String,
    member_to_label: HashMap<String, String>,
    source: Option<ImputationSource>,
}

impl TypeCleaner {
    pub fn new(config: TypeConfig) -> Self {
        let mut member_to_label = HashMap::new();
        // Later groups overwrite earlier ones for shared members.
        for group in &config.groups {
            for member in &group.members {
                member_to_label.insert(member.clone(), group.label.clone());
            }
        }
        Self {
            column: config.column,
            member_to_label,
            source: None,
        }
    }

    pub fn with_source(mut self, source: ImputationSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Group label for `value`, or `value` itself when it is in no group.
    pub fn lookup<'a>(&'a self, value: &'a str) -> &'a str {
        self.member_to_label
            .get(value)
            .map(String::as_str)
            .unwrap_or(value)
    }
}

impl FeatureTransform for TypeCleaner {
    fn name(&self) -> &'static str {
        "type"
    }

    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        let mut df = df;
        let series = require_column(&df, &self.column, "Type")?;
        if series.dtype() != &DataType::String {
            return Err(type_mismatch(&series, "string"));
        }

        let mut regrouped = 0usize;
        let values: Vec<Option<String>> = series
            .str()?
            .into_iter()
            .map(|v| {
                v.map(|raw| {
                    let label = self.lookup(raw);
                    if label != raw {
                        regrouped += 1;
                    }
                    label.to_string()
                })
            })
            .collect();
        debug!("Mapped {} plant types onto group labels", regrouped);

        df.replace(&self.column, Series::new(self.column.as_str().into(), values))?;

        match &self.source {
            Some(source) => impute_from_source(df, &self.column, source),
            None => Ok(df),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TypeGroup;

    fn config() -> TypeConfig {
        TypeConfig {
            column: "type".to_string(),
            groups: vec![
                TypeGroup {
                    label: "tree".to_string(),
                    members: vec!["deciduous tree".to_string(), "palm".to_string()],
                },
                TypeGroup {
                    label: "shrub".to_string(),
                    members: vec!["bush".to_string(), "palm".to_string()],
                },
            ],
        }
    }

    #[test]
    fn test_last_group_wins_on_overlap() {
        let cleaner = TypeCleaner::new(config());
        assert_eq!(cleaner.lookup("palm"), "shrub");
        assert_eq!(cleaner.lookup("deciduous tree"), "tree");
        assert_eq!(cleaner.lookup("fern"), "fern");
    }

    #[test]
    fn test_apply_then_impute() {
        let df = df!["type" => [Some("bush"), None, Some("fern")]].unwrap();
        let source = ImputationSource::new(df!["type" => ["x", "tree", "y"]].unwrap());

        let out = TypeCleaner::new(config())
            .with_source(source)
            .apply(df)
            .unwrap();
        let values: Vec<Option<&str>> = out
            .column("type")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![Some("shrub"), Some("tree"), Some("fern")]);
    }
}
