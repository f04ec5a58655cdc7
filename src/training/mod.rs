//! Model training
//!
//! Regression trees and the random forest built from them, the R² metric, and
//! the artifact format shared with serving.

pub mod artifact;
pub mod decision_tree;
pub mod metrics;
pub mod random_forest;

pub use artifact::{FeatureImportance, ModelArtifact, ARTIFACT_FORMAT_VERSION};
pub use decision_tree::{DecisionTree, TreeNode};
pub use metrics::{r2_score, RegressionMetrics};
pub use random_forest::RandomForest;

use crate::config::ForestParams;

impl From<&ForestParams> for RandomForest {
    fn from(params: &ForestParams) -> Self {
        let mut forest = RandomForest::new(params.n_estimators)
            .with_min_samples_split(params.min_samples_split)
            .with_min_samples_leaf(params.min_samples_leaf);
        if let Some(depth) = params.max_depth {
            forest = forest.with_max_depth(depth);
        }
        if let Some(k) = params.max_features {
            forest = forest.with_max_features(k);
        }
        forest
    }
}
