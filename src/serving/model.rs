use ndarray::{Array1, Array2, Axis};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use super::stats::{PredictionStats, ServingMetric};
use crate::data::FeatureSchema;
use crate::error::{HousingError, Result};
use crate::training::ModelArtifact;

/// Loaded house price model.
///
/// Shared read-only across request handlers; the counters are atomics.
#[derive(Debug)]
pub struct HousePriceModel {
    artifact: ModelArtifact,
    path: PathBuf,
    stats: PredictionStats,
}

impl HousePriceModel {
    /// Load the artifact at `path`. Any failure is reported as
    /// [`HousingError::ModelUnavailable`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let artifact = ModelArtifact::load(path).map_err(|e| HousingError::ModelUnavailable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        info!(
            path = %path.display(),
            features = artifact.schema.len(),
            trees = artifact.model.n_trees(),
            "Loaded model"
        );
        Ok(Self::from_artifact(artifact, path))
    }

    pub fn from_artifact(artifact: ModelArtifact, path: impl Into<PathBuf>) -> Self {
        Self {
            artifact,
            path: path.into(),
            stats: PredictionStats::new(),
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.artifact.schema
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// One price per row. Rows are positional in training order.
    pub fn predict(&self, rows: &Array2<f64>) -> Result<Array1<f64>> {
        if rows.nrows() == 0 {
            return Ok(Array1::zeros(0));
        }
        let expected = self.schema().len();
        if rows.ncols() != expected {
            self.stats.record_error();
            return Err(HousingError::ShapeError {
                expected: format!("{} columns", expected),
                actual: format!("{} columns", rows.ncols()),
            });
        }

        let start = Instant::now();
        match self.artifact.predict(rows) {
            Ok(prices) => {
                let elapsed = start.elapsed().as_secs_f64() * 1000.0;
                self.stats.record_batch(prices.len(), elapsed);
                debug!(rows = prices.len(), latency_ms = elapsed, "Predicted");
                Ok(prices)
            }
            Err(e) => {
                self.stats.record_error();
                Err(e)
            }
        }
    }

    /// Predict rows whose columns are labelled by `names`.
    ///
    /// `names` must be a permutation of the schema; columns are moved into
    /// training order before prediction. An empty batch still has its names
    /// checked.
    pub fn predict_named(&self, rows: &Array2<f64>, names: &[String]) -> Result<Array1<f64>> {
        let order = match self.schema().reorder_indices(names) {
            Ok(order) => order,
            Err(e) => {
                self.stats.record_error();
                return Err(e);
            }
        };
        if rows.nrows() == 0 {
            return Ok(Array1::zeros(0));
        }
        if rows.ncols() != names.len() {
            self.stats.record_error();
            return Err(HousingError::ShapeError {
                expected: format!("{} columns", names.len()),
                actual: format!("{} columns", rows.ncols()),
            });
        }
        self.predict(&rows.select(Axis(1), &order))
    }

    pub fn metrics(&self) -> Vec<ServingMetric> {
        self.stats.snapshot(self.schema().len())
    }

    pub fn stats(&self) -> &PredictionStats {
        &self.stats
    }
}
