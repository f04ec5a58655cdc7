//! House price ML - train, track and serve a house price regression model
//!
//! # Modules
//!
//! ## Training
//! - [`data`] - CSV loading, feature schema, train/test split
//! - [`training`] - Regression trees, random forest, R², model artifact
//! - [`pipeline`] - End-to-end training run
//! - [`tracking`] - MLflow and local experiment tracking
//!
//! ## Serving
//! - [`serving`] - Model wrapper with runtime counters
//! - [`server`] - HTTP prediction server
//! - [`protocol`] - Seldon-style JSON messages
//!
//! ## Clients and CLI
//! - [`client`] - Housing and image test clients
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;

// Training
pub mod data;
pub mod training;
pub mod pipeline;
pub mod tracking;

// Serving
pub mod serving;
pub mod server;
pub mod protocol;

// Clients and CLI
pub mod client;
pub mod cli;

pub use error::{HousingError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{HousingError, Result};

    // Configuration
    pub use crate::config::{
        DataConfig, ForestParams, HousingClientConfig, ImageClientConfig, ServingConfig,
        TrackingConfig, TrainingConfig,
    };

    // Data
    pub use crate::data::{DataLoader, FeatureSchema, HousingData, FEATURE_COLUMNS};

    // Training
    pub use crate::pipeline::{train, TrainingReport};
    pub use crate::training::{ModelArtifact, RandomForest, RegressionMetrics};

    // Experiment tracking
    pub use crate::tracking::{LocalTracker, MlflowClient, RunStatus, TrackingBackend};

    // Serving
    pub use crate::serving::{HousePriceModel, ServingMetric};

    // Clients
    pub use crate::client::{ClassifyOutcome, Tensor};
}
