//! Configuration for training the recommender.
//!
//! This module provides [`TrainingConfig`], its builder, and [`ColumnRoles`],
//! which tells the preprocessor how each feature column is encoded.
//!
//! # Example
//!
//! ```
//! use plant_learning::TrainingConfig;
//!
//! let config = TrainingConfig::builder()
//!     .n_neighbors(3)
//!     .toxicity_columns(["poisonous_to_pets"])
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.n_neighbors, 3);
//! ```

use crate::error::LearningError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Encoding role of each feature column.
///
/// Columns not named here are passed through as numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnRoles {
    /// Unordered categorical column, one-hot encoded.
    pub nominal: String,

    /// Numeric columns, each robust-scaled independently.
    pub numeric: Vec<String>,

    /// Maintenance level column, ordinal encoded with `maintenance_order`.
    pub maintenance: String,

    /// Fixed category order for the maintenance column, lowest first.
    pub maintenance_order: Vec<String>,

    /// Sunlight category column, ordinal encoded with `sunlight_order`.
    pub sunlight: String,

    /// Fixed category order for the sunlight column, darkest first.
    pub sunlight_order: Vec<String>,
}

impl Default for ColumnRoles {
    fn default() -> Self {
        Self {
            nominal: "type".to_string(),
            numeric: strings(&["hardiness_max", "hardiness_min"]),
            maintenance: "maintenance".to_string(),
            maintenance_order: strings(&["low", "moderate", "high"]),
            sunlight: "sunlight".to_string(),
            sunlight_order: strings(&["full_shade", "part_shade", "full_sun"]),
        }
    }
}

impl ColumnRoles {
    /// Every column with an explicit role, in encoding order.
    pub fn encoded_columns(&self) -> Vec<&str> {
        let mut columns = vec![self.nominal.as_str()];
        columns.extend(self.numeric.iter().map(String::as_str));
        columns.push(self.maintenance.as_str());
        columns.push(self.sunlight.as_str());
        columns
    }
}

/// Configuration for [`Recommender::train`](crate::Recommender::train).
///
/// Use [`TrainingConfig::builder()`] to construct one with validation, or
/// [`TrainingConfig::load`] to read it from JSON.
///
/// # Validation
///
/// - `n_neighbors` must be at least 1
/// - both ordinal orders must be non-empty and free of duplicates
/// - at least one numeric column
/// - no column may have two roles, and no role column may be a toxicity or
///   training-only column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Boolean columns that disqualify a plant when any of them is true.
    pub toxicity_columns: Vec<String>,

    /// Columns kept in the catalog but excluded from the feature matrix.
    pub training_only_columns: Vec<String>,

    /// Number of neighbors returned per query (default: 5).
    pub n_neighbors: usize,

    /// Encoding role of each feature column.
    pub roles: ColumnRoles,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            toxicity_columns: strings(&["poisonous_to_humans", "poisonous_to_pets"]),
            training_only_columns: strings(&["id", "common_name"]),
            n_neighbors: 5,
            roles: ColumnRoles::default(),
        }
    }
}

impl TrainingConfig {
    /// Create a new builder for `TrainingConfig`.
    #[must_use]
    pub fn builder() -> TrainingConfigBuilder {
        TrainingConfigBuilder::default()
    }

    /// Parse a configuration from JSON and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, LearningError> {
        let config: TrainingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration from a JSON file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LearningError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check the constraints listed on [`TrainingConfig`].
    pub fn validate(&self) -> Result<(), LearningError> {
        if self.n_neighbors == 0 {
            return Err(LearningError::InvalidConfig(
                "n_neighbors must be at least 1".to_string(),
            ));
        }

        if self.roles.numeric.is_empty() {
            return Err(LearningError::InvalidConfig(
                "at least one numeric column is required".to_string(),
            ));
        }

        for (name, order) in [
            ("maintenance_order", &self.roles.maintenance_order),
            ("sunlight_order", &self.roles.sunlight_order),
        ] {
            if order.is_empty() {
                return Err(LearningError::InvalidConfig(format!(
                    "{} must not be empty",
                    name
                )));
            }
            let unique: HashSet<&String> = order.iter().collect();
            if unique.len() != order.len() {
                return Err(LearningError::InvalidConfig(format!(
                    "{} contains duplicate categories",
                    name
                )));
            }
        }

        let mut seen = HashSet::new();
        for column in self.roles.encoded_columns() {
            if !seen.insert(column) {
                return Err(LearningError::InvalidConfig(format!(
                    "column '{}' has more than one encoding role",
                    column
                )));
            }
        }

        let excluded = self
            .toxicity_columns
            .iter()
            .chain(&self.training_only_columns)
            .find(|c| seen.contains(c.as_str()));
        if let Some(column) = excluded {
            return Err(LearningError::InvalidConfig(format!(
                "column '{}' is excluded from the feature matrix but has an encoding role",
                column
            )));
        }

        Ok(())
    }
}

/// Builder for [`TrainingConfig`].
#[derive(Debug, Clone, Default)]
pub struct TrainingConfigBuilder {
    config: TrainingConfig,
}

impl TrainingConfigBuilder {
    /// Set the toxicity columns.
    #[must_use]
    pub fn toxicity_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.toxicity_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the columns excluded from the feature matrix.
    #[must_use]
    pub fn training_only_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.training_only_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the number of neighbors (default: 5).
    ///
    /// [`build()`](Self::build) returns an error if `k < 1`.
    #[must_use]
    pub fn n_neighbors(mut self, k: usize) -> Self {
        self.config.n_neighbors = k;
        self
    }

    #[must_use]
    pub fn roles(mut self, roles: ColumnRoles) -> Self {
        self.config.roles = roles;
        self
    }

    /// Build the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] if any constraint listed on
    /// [`TrainingConfig`] is violated.
    pub fn build(self) -> Result<TrainingConfig, LearningError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrainingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.n_neighbors, 5);
        assert_eq!(
            config.roles.encoded_columns(),
            vec!["type", "hardiness_max", "hardiness_min", "maintenance", "sunlight"]
        );
    }

    #[test]
    fn test_zero_neighbors_rejected() {
        let result = TrainingConfig::builder().n_neighbors(0).build();
        assert!(matches!(result, Err(LearningError::InvalidConfig(_))));
    }

    #[test]
    fn test_duplicate_role_rejected() {
        let roles = ColumnRoles {
            numeric: vec!["type".to_string()],
            ..ColumnRoles::default()
        };
        let result = TrainingConfig::builder().roles(roles).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_ordinal_category_rejected() {
        let roles = ColumnRoles {
            maintenance_order: strings(&["low", "low", "high"]),
            ..ColumnRoles::default()
        };
        let err = TrainingConfig::builder().roles(roles).build().unwrap_err();
        assert!(err.to_string().contains("maintenance_order"));
    }

    #[test]
    fn test_role_column_cannot_be_excluded() {
        let result = TrainingConfig::builder()
            .training_only_columns(["id", "sunlight"])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = TrainingConfig::from_json_str(r#"{"n_neighbors": 10}"#).unwrap();
        assert_eq!(config.n_neighbors, 10);
        assert_eq!(config.roles, ColumnRoles::default());
    }
}
