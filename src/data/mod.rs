//! Housing data access
//!
//! CSV loading, the ordered feature schema shared by training and serving,
//! and the seeded train/test split.

mod features;
mod loader;
pub mod split;

pub use features::{FeatureColumn, FeatureSchema, FeatureType, FEATURE_COLUMNS};
pub use loader::{DataLoader, HousingData};
pub use split::{split_sizes, train_test_split, TrainTestSplit};
