//! On-disk form of the indexed catalog.
//!
//! The catalog is written as CSV next to a JSON schema recording each
//! column's type, so a loaded recommender returns the same attributes it was
//! trained with. List columns are written as list literals and parsed back
//! on load.

use crate::artifact::{FORMAT_VERSION, Versioned, load_json, save_json};
use crate::error::LearningError;
use plant_processing::cleaner::parse_list_literal;
use plant_processing::lists_to_literals;
use plant_processing::utils::list_series;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Column types a catalog can be persisted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum CatalogDtype {
    Boolean,
    Int32,
    Int64,
    UInt32,
    UInt64,
    Float32,
    Float64,
    String,
    StringList,
}

impl CatalogDtype {
    fn of(column: &Column) -> Result<Self, LearningError> {
        Ok(match column.dtype() {
            DataType::Boolean => Self::Boolean,
            DataType::Int32 => Self::Int32,
            DataType::Int64 => Self::Int64,
            DataType::UInt32 => Self::UInt32,
            DataType::UInt64 => Self::UInt64,
            DataType::Float32 => Self::Float32,
            DataType::Float64 => Self::Float64,
            DataType::String => Self::String,
            DataType::List(inner) if inner.as_ref() == &DataType::String => Self::StringList,
            other => {
                return Err(LearningError::TypeMismatch {
                    column: column.name().to_string(),
                    expected: "boolean, integer, float, string or string list".to_string(),
                    actual: other.to_string(),
                });
            }
        })
    }

    /// Type the CSV reader produces for this column.
    fn csv_dtype(self) -> DataType {
        match self {
            Self::Boolean => DataType::Boolean,
            Self::Int32 => DataType::Int32,
            Self::Int64 => DataType::Int64,
            Self::UInt32 => DataType::UInt32,
            Self::UInt64 => DataType::UInt64,
            Self::Float32 => DataType::Float32,
            Self::Float64 => DataType::Float64,
            Self::String | Self::StringList => DataType::String,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct CatalogColumn {
    name: String,
    dtype: CatalogDtype,
}

/// Column names and types of a persisted catalog, in column order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CatalogSchema {
    format_version: u32,
    columns: Vec<CatalogColumn>,
}

impl Versioned for CatalogSchema {
    fn format_version(&self) -> u32 {
        self.format_version
    }
}

impl CatalogSchema {
    fn of(df: &DataFrame) -> Result<Self, LearningError> {
        let columns = df
            .get_columns()
            .iter()
            .map(|c| {
                Ok(CatalogColumn {
                    name: c.name().to_string(),
                    dtype: CatalogDtype::of(c)?,
                })
            })
            .collect::<Result<Vec<_>, LearningError>>()?;
        Ok(Self {
            format_version: FORMAT_VERSION,
            columns,
        })
    }

    fn csv_schema(&self) -> Schema {
        Schema::from_iter(
            self.columns
                .iter()
                .map(|c| Field::new(c.name.as_str().into(), c.dtype.csv_dtype())),
        )
    }

    fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Write `catalog` to `csv_path` and its column types to `schema_path`.
pub(crate) fn write_catalog(
    catalog: &DataFrame,
    csv_path: &Path,
    schema_path: &Path,
) -> Result<(), LearningError> {
    save_json(&CatalogSchema::of(catalog)?, schema_path)?;

    let mut literal = lists_to_literals(catalog.clone())?;
    let mut file = File::create(csv_path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut literal)?;
    debug!("Catalog written: {}", csv_path.display());
    Ok(())
}

/// Read a catalog written by [`write_catalog`], restoring its column types.
pub(crate) fn read_catalog(csv_path: &Path, schema_path: &Path) -> Result<DataFrame, LearningError> {
    let schema: CatalogSchema = load_json(schema_path)?;
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_schema_overwrite(Some(Arc::new(schema.csv_schema())))
        .try_into_reader_with_file_path(Some(csv_path.to_path_buf()))?
        .finish()?;

    let found: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
    if found != schema.names() {
        return Err(LearningError::SchemaMismatch(format!(
            "catalog columns {:?} do not match the recorded schema {:?}",
            found,
            schema.names()
        )));
    }

    for column in schema
        .columns
        .iter()
        .filter(|c| c.dtype == CatalogDtype::StringList)
    {
        let series = df.column(&column.name)?.as_materialized_series().clone();
        let mut rows = Vec::with_capacity(series.len());
        for (row, cell) in series.str()?.into_iter().enumerate() {
            let tokens = match cell {
                Some(text) => parse_list_literal(text).map_err(|reason| {
                    LearningError::InvalidData(format!(
                        "catalog column '{}' row {}: {}",
                        column.name, row, reason
                    ))
                })?,
                None => Vec::new(),
            };
            rows.push(tokens);
        }
        df.replace(&column.name, list_series(series.name().clone(), rows))?;
    }

    debug!("Catalog loaded: {} rows", df.height());
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "plant-learning-catalog-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn catalog() -> DataFrame {
        let mut df = df![
            "id" => ["007", "008", "010"],
            "common_name" => ["Lavender", "Hosta", "Boxwood"],
            "hardiness_min" => [5.0, 3.0, 5.5],
            "zone_count" => [4i64, 6, 3],
            "indoor" => [false, true, false],
        ]
        .unwrap();
        let colors = list_series(
            "colors".into(),
            vec![
                vec!["purple".to_string()],
                vec![],
                vec!["green".to_string(), "it's yellow".to_string()],
            ],
        );
        df.with_column(colors).unwrap();
        df
    }

    #[test]
    fn test_round_trip_keeps_types_and_values() {
        let dir = scratch_dir("roundtrip");
        let (csv, schema) = (dir.join("catalog.csv"), dir.join("catalog_schema.json"));
        let original = catalog();

        write_catalog(&original, &csv, &schema).unwrap();
        let loaded = read_catalog(&csv, &schema).unwrap();

        assert_eq!(loaded.dtypes(), original.dtypes());
        assert!(loaded.equals_missing(&original));
        assert_eq!(
            loaded.column("id").unwrap().as_materialized_series().str().unwrap().get(0),
            Some("007")
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_unsupported_column_type_is_rejected() {
        let dir = scratch_dir("unsupported");
        let df = df!["height" => [1i8, 2]].unwrap();

        let err = write_catalog(&df, &dir.join("c.csv"), &dir.join("s.json")).unwrap_err();
        assert!(matches!(err, LearningError::TypeMismatch { .. }));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
