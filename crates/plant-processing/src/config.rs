//! Feature configuration for the cleaning pipeline.
//!
//! A [`FeatureConfig`] is built once (usually deserialized from JSON) and
//! handed to every cleaner at construction. Nothing in the pipeline looks up
//! column names or vocabularies anywhere else.

use crate::error::{ProcessingError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// How an imputation source lines up with the dataset it fills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImputationAlignment {
    /// Row `i` of the source fills row `i` of the dataset. Row counts must match.
    #[default]
    RowPosition,
    /// Rows are matched through the named identifier column.
    ById(String),
}

/// Generic per-column normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationConfig {
    /// String columns to lowercase.
    pub lowercase: Vec<String>,
    /// Columns holding textual list literals such as `['Full sun', 'Part shade']`.
    pub list_columns: Vec<String>,
    /// Boolean columns and the value used for any token other than `TRUE`/`FALSE`.
    pub boolean_defaults: BTreeMap<String, bool>,
}

/// Rules for the maintenance level and its proxies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    pub column: String,
    pub care_level_column: String,
    pub watering_column: String,
    /// Proxy columns, in the order they are tried.
    pub imputation_features: Vec<String>,
    pub maintenance_levels: Vec<String>,
    pub care_levels: Vec<String>,
}

/// A labelled group of raw plant-type values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeGroup {
    pub label: String,
    pub members: Vec<String>,
}

/// Plant-type grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeConfig {
    pub column: String,
    /// Groups in priority order; a member listed twice maps to the later group.
    pub groups: Vec<TypeGroup>,
}

/// Sunlight descriptor vocabularies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunlightConfig {
    pub column: String,
    pub full_sun: Vec<String>,
    pub full_shade: Vec<String>,
}

/// Hardiness zone bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardinessConfig {
    /// Raw column name -> cleaned column name.
    pub rename: BTreeMap<String, String>,
    pub min_column: String,
    pub max_column: String,
    /// Accepted hardiness levels, as they appear in the raw data.
    pub levels: Vec<String>,
}

/// A boolean feature set when the attracted-animal list hits a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttractionGroup {
    pub name: String,
    pub animals: Vec<String>,
}

/// Derived features and the columns they make redundant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    pub cycle_column: String,
    pub perennial_column: String,
    /// Cycle value marking a plant as not perennial.
    pub non_perennial_value: String,
    pub attracts_column: String,
    pub attraction_groups: Vec<AttractionGroup>,
    pub drop_columns: Vec<String>,
}

/// Complete, immutable configuration of a cleaning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub id_column: String,
    /// Columns kept from the raw dataset; everything else is discarded first.
    pub relevant_columns: Vec<String>,
    pub normalization: NormalizationConfig,
    pub maintenance: MaintenanceConfig,
    pub plant_type: TypeConfig,
    pub sunlight: SunlightConfig,
    pub hardiness: HardinessConfig,
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub imputation_alignment: ImputationAlignment,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl Default for FeatureConfig {
    fn default() -> Self {
        let boolean_defaults = [
            ("poisonous_to_humans", true),
            ("poisonous_to_pets", true),
            ("drought_tolerant", false),
            ("indoor", false),
            ("flowers", false),
            ("edible_fruit", false),
        ]
        .into_iter()
        .map(|(c, d)| (c.to_string(), d))
        .collect();

        let rename = [
            ("hardiness.min", "hardiness_min"),
            ("hardiness.max", "hardiness_max"),
        ]
        .into_iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();

        Self {
            id_column: "id".to_string(),
            relevant_columns: strings(&[
                "id",
                "common_name",
                "type",
                "cycle",
                "attracts",
                "watering",
                "sunlight",
                "maintenance",
                "care_level",
                "hardiness.min",
                "hardiness.max",
                "poisonous_to_humans",
                "poisonous_to_pets",
                "drought_tolerant",
                "indoor",
                "flowers",
                "edible_fruit",
            ]),
            normalization: NormalizationConfig {
                lowercase: strings(&["type", "cycle", "watering", "maintenance", "care_level"]),
                list_columns: strings(&["attracts", "sunlight"]),
                boolean_defaults,
            },
            maintenance: MaintenanceConfig {
                column: "maintenance".to_string(),
                care_level_column: "care_level".to_string(),
                watering_column: "watering".to_string(),
                imputation_features: strings(&["care_level", "watering"]),
                maintenance_levels: strings(&["low", "moderate", "high"]),
                care_levels: strings(&["easy", "low", "medium", "moderate", "high"]),
            },
            plant_type: TypeConfig {
                column: "type".to_string(),
                groups: vec![
                    TypeGroup {
                        label: "tree".to_string(),
                        members: strings(&["deciduous tree", "evergreen tree", "palm", "conifer"]),
                    },
                    TypeGroup {
                        label: "shrub".to_string(),
                        members: strings(&["deciduous shrub", "evergreen shrub", "bush", "hedge"]),
                    },
                    TypeGroup {
                        label: "flower".to_string(),
                        members: strings(&["bulb", "perennial", "annual", "wildflower"]),
                    },
                    TypeGroup {
                        label: "vine".to_string(),
                        members: strings(&["climber", "creeper"]),
                    },
                ],
            },
            sunlight: SunlightConfig {
                column: "sunlight".to_string(),
                full_sun: strings(&["full sun", "sun"]),
                full_shade: strings(&["full shade", "deep shade", "shade"]),
            },
            hardiness: HardinessConfig {
                rename,
                min_column: "hardiness_min".to_string(),
                max_column: "hardiness_max".to_string(),
                levels: (1..=13).map(|z| z.to_string()).collect(),
            },
            synthesis: SynthesisConfig {
                cycle_column: "cycle".to_string(),
                perennial_column: "perennial".to_string(),
                non_perennial_value: "annual".to_string(),
                attracts_column: "attracts".to_string(),
                attraction_groups: vec![
                    AttractionGroup {
                        name: "attracts_birds".to_string(),
                        animals: strings(&["birds", "hummingbirds"]),
                    },
                    AttractionGroup {
                        name: "attracts_pollinators".to_string(),
                        animals: strings(&["bees", "butterflies", "moths"]),
                    },
                ],
                drop_columns: strings(&["cycle", "attracts", "watering", "care_level"]),
            },
            imputation_alignment: ImputationAlignment::RowPosition,
        }
    }
}

impl FeatureConfig {
    /// Parse a configuration from a JSON string and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: FeatureConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration from a JSON file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Check that the configuration is internally consistent.
    pub fn validate(&self) -> Result<()> {
        let empty_vocabularies = [
            ("hardiness.levels", self.hardiness.levels.is_empty()),
            (
                "maintenance.maintenance_levels",
                self.maintenance.maintenance_levels.is_empty(),
            ),
            ("maintenance.care_levels", self.maintenance.care_levels.is_empty()),
            ("sunlight.full_sun", self.sunlight.full_sun.is_empty()),
            ("sunlight.full_shade", self.sunlight.full_shade.is_empty()),
        ];
        if let Some((field, _)) = empty_vocabularies.iter().find(|(_, empty)| *empty) {
            return Err(ProcessingError::Configuration(format!(
                "vocabulary '{}' must not be empty",
                field
            )));
        }

        let mut targets = HashSet::new();
        for target in self.hardiness.rename.values() {
            if !targets.insert(target) {
                return Err(ProcessingError::Configuration(format!(
                    "rename target '{}' is used more than once",
                    target
                )));
            }
        }

        if self.synthesis.non_perennial_value.trim().is_empty() {
            return Err(ProcessingError::Configuration(
                "synthesis.non_perennial_value must not be empty".to_string(),
            ));
        }

        if let ImputationAlignment::ById(column) = &self.imputation_alignment
            && column.trim().is_empty()
        {
            return Err(ProcessingError::Configuration(
                "imputation_alignment.by_id needs a column name".to_string(),
            ));
        }

        Ok(())
    }

    /// Fail with a configuration error if any relevant column is missing from `columns`.
    pub fn check_columns<S: AsRef<str>>(&self, columns: &[S]) -> Result<()> {
        let present: HashSet<&str> = columns.iter().map(|c| c.as_ref()).collect();
        let missing: Vec<&str> = self
            .relevant_columns
            .iter()
            .map(String::as_str)
            .filter(|c| !present.contains(c))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ProcessingError::Configuration(format!(
                "relevant columns not found in dataset: {:?}",
                missing
            )))
        }
    }
}
