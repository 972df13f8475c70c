//! Brute-force nearest-neighbor search over encoded plants.

use crate::artifact::{FORMAT_VERSION, Versioned, load_json, save_json};
use crate::error::LearningError;
use crate::matrix::FeatureMatrix;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// One search hit: a row of the indexed matrix and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub row: usize,
    pub distance: f64,
}

/// Builds a [`NeighborIndex`] with a fixed neighbor count.
#[derive(Debug, Clone, Copy)]
pub struct RecommendationEngine {
    n_neighbors: usize,
}

impl RecommendationEngine {
    pub fn new(n_neighbors: usize) -> Self {
        Self { n_neighbors }
    }

    /// Index every row of `matrix`.
    pub fn fit(&self, matrix: FeatureMatrix) -> Result<NeighborIndex, LearningError> {
        if self.n_neighbors == 0 {
            return Err(LearningError::InvalidConfig(
                "n_neighbors must be at least 1".to_string(),
            ));
        }
        if matrix.is_empty() {
            return Err(LearningError::EmptyIndex);
        }
        info!(
            "Neighbor index built: {} rows x {} features, k={}",
            matrix.n_rows(),
            matrix.n_cols(),
            self.n_neighbors
        );
        Ok(NeighborIndex {
            format_version: FORMAT_VERSION,
            fitted_at: Utc::now(),
            n_neighbors: self.n_neighbors,
            matrix,
        })
    }
}

/// Euclidean distance index over a copy of the training matrix.
///
/// Read-only after construction; any change to the preprocessor or the
/// catalog means building a new index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborIndex {
    format_version: u32,
    fitted_at: DateTime<Utc>,
    n_neighbors: usize,
    matrix: FeatureMatrix,
}

impl Versioned for NeighborIndex {
    fn format_version(&self) -> u32 {
        self.format_version
    }
}

impl NeighborIndex {
    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    pub fn fitted_at(&self) -> DateTime<Utc> {
        self.fitted_at
    }

    /// Number of indexed rows.
    pub fn len(&self) -> usize {
        self.matrix.n_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.is_empty()
    }

    /// Number of features per row.
    pub fn dimension(&self) -> usize {
        self.matrix.n_cols()
    }

    pub fn feature_names(&self) -> &[String] {
        self.matrix.columns()
    }

    /// The `n_neighbors` closest rows to `query`.
    pub fn query(&self, query: &[f64]) -> Result<Vec<Neighbor>, LearningError> {
        self.query_k(query, self.n_neighbors)
    }

    /// The `k` closest rows to `query`, or every row if the index holds fewer.
    ///
    /// Results are sorted by ascending distance; equal distances keep index
    /// row order.
    pub fn query_k(&self, query: &[f64], k: usize) -> Result<Vec<Neighbor>, LearningError> {
        if query.len() != self.dimension() {
            return Err(LearningError::SchemaMismatch(format!(
                "query has {} features, index has {}",
                query.len(),
                self.dimension()
            )));
        }
        if query.iter().any(|v| !v.is_finite()) {
            return Err(LearningError::InvalidData(
                "query contains a non-finite value".to_string(),
            ));
        }

        let mut neighbors: Vec<Neighbor> = self
            .matrix
            .rows()
            .enumerate()
            .map(|(row, values)| Neighbor {
                row,
                distance: euclidean(query, values),
            })
            .collect();

        // Stable sort keeps row order for ties.
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(k.min(self.len()));

        debug!(
            "Query matched {} rows, nearest distance {:?}",
            neighbors.len(),
            neighbors.first().map(|n| n.distance)
        );
        Ok(neighbors)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), LearningError> {
        save_json(self, path.as_ref())
    }

    /// Load an index written by [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LearningError> {
        load_json(path.as_ref())
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum::<f64>()
        .sqrt()
}
