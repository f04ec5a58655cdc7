//! Persisted model artifact
//!
//! The artifact carries the fitted forest together with the feature schema it
//! was trained on, so serving can check rows against the training order.

use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::random_forest::RandomForest;
use crate::config::ForestParams;
use crate::data::FeatureSchema;
use crate::error::{HousingError, Result};

pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Share of the forest's impurity decrease attributed to one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub name: String,
    pub importance: f64,
}

/// Fitted model plus the contract it was trained under
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub schema: FeatureSchema,
    pub target: String,
    pub params: ForestParams,
    pub train_score: f64,
    pub test_score: f64,
    pub created_at: DateTime<Utc>,
    pub model: RandomForest,
}

impl ModelArtifact {
    pub fn new(
        model: RandomForest,
        schema: FeatureSchema,
        target: impl Into<String>,
        params: ForestParams,
        train_score: f64,
        test_score: f64,
    ) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            schema,
            target: target.into(),
            params,
            train_score,
            test_score,
            created_at: Utc::now(),
            model,
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.model.predict(x)
    }

    /// Importances paired with feature names, highest first
    pub fn feature_importances(&self) -> Vec<FeatureImportance> {
        let Some(importances) = self.model.feature_importances() else {
            return Vec::new();
        };
        let mut ranked: Vec<FeatureImportance> = self
            .schema
            .names()
            .into_iter()
            .zip(importances.iter())
            .map(|(name, &importance)| FeatureImportance { name, importance })
            .collect();
        ranked.sort_by(|a, b| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse an artifact and check it is internally consistent
    pub fn from_json(json: &str) -> Result<Self> {
        let artifact: Self = serde_json::from_str(json)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Save the artifact to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load an artifact from a file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<()> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(HousingError::SerializationError(format!(
                "unsupported artifact format version {}",
                self.format_version
            )));
        }
        if self.model.n_trees() == 0 {
            return Err(HousingError::ModelNotFitted);
        }
        if self.model.n_features() != self.schema.len() {
            return Err(HousingError::ShapeError {
                expected: format!("{} schema columns", self.model.n_features()),
                actual: format!("{} schema columns", self.schema.len()),
            });
        }
        Ok(())
    }
}
