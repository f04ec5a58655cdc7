//! Runtime configuration
//!
//! Every entry point receives one of these structs explicitly. Defaults match
//! the King County training setup and may be overridden through environment
//! variables or CLI flags.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::data::FEATURE_COLUMNS;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Where the housing data lives and which columns matter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub csv_path: PathBuf,
    pub feature_columns: Vec<String>,
    pub target_column: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from(env_or("HOUSING_DATA", "kc_house_data.csv")),
            feature_columns: FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
            target_column: "price".to_string(),
        }
    }
}

impl DataConfig {
    pub fn with_csv_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.csv_path = path.into();
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_column = target.into();
        self
    }

    pub fn with_features(mut self, features: Vec<String>) -> Self {
        self.feature_columns = features;
        self
    }
}

/// Random forest hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub max_features: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: Some(6),
            max_features: Some(10),
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

impl ForestParams {
    /// Parameters as logged to the tracking service
    pub fn as_params(&self) -> Vec<(String, String)> {
        let none = || "None".to_string();
        vec![
            ("n_estimators".to_string(), self.n_estimators.to_string()),
            (
                "max_depth".to_string(),
                self.max_depth.map_or_else(none, |d| d.to_string()),
            ),
            (
                "max_features".to_string(),
                self.max_features.map_or_else(none, |f| f.to_string()),
            ),
        ]
    }
}

/// Training run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub data: DataConfig,
    pub forest: ForestParams,
    /// Fraction of rows used for training
    pub train_size: f64,
    pub random_state: u64,
    /// Where the fitted model artifact is written
    pub model_output: PathBuf,
    /// Artifact directory name inside the tracked run
    pub artifact_path: String,
    /// Rows from the test split logged as the input example
    pub input_example_rows: usize,
    pub run_name: Option<String>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            forest: ForestParams::default(),
            train_size: 0.7,
            random_state: 3,
            model_output: PathBuf::from(env_or("HOUSING_MODEL_PATH", "model.json")),
            artifact_path: "rf-regressor".to_string(),
            input_example_rows: 5,
            run_name: None,
        }
    }
}

impl TrainingConfig {
    pub fn new(data: DataConfig) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    pub fn with_forest(mut self, forest: ForestParams) -> Self {
        self.forest = forest;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_model_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_output = path.into();
        self
    }

    pub fn with_run_name(mut self, name: impl Into<String>) -> Self {
        self.run_name = Some(name.into());
        self
    }
}

/// Experiment tracking service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    pub tracking_uri: String,
    pub experiment_name: String,
    pub timeout_secs: Option<u64>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            tracking_uri: env_or("MLFLOW_TRACKING_URI", "http://localhost:5000"),
            experiment_name: env_or("MLFLOW_EXPERIMENT_NAME", "rsinghai-test"),
            timeout_secs: Some(30),
        }
    }
}

impl TrackingConfig {
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.tracking_uri = uri.into();
        self
    }

    pub fn with_experiment(mut self, name: impl Into<String>) -> Self {
        self.experiment_name = name.into();
        self
    }
}

/// Prediction server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServingConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            host: env_or("API_HOST", "0.0.0.0"),
            port: env_parse("API_PORT", 9002),
            model_path: PathBuf::from(env_or("HOUSING_MODEL_PATH", "model.json")),
        }
    }
}

impl ServingConfig {
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn with_bind(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }
}

/// Housing smoke-test client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HousingClientConfig {
    pub data: DataConfig,
    pub predict_url: String,
    /// Positional row of the CSV sent to the endpoint
    pub row_index: usize,
    pub timeout_secs: u64,
}

impl Default for HousingClientConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            predict_url: env_or("PREDICT_URL", "http://localhost:9002/predict"),
            row_index: 7,
            timeout_secs: env_parse("PREDICT_TIMEOUT_SECS", 10),
        }
    }
}

impl HousingClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.predict_url = url.into();
        self
    }

    pub fn with_row(mut self, row: usize) -> Self {
        self.row_index = row;
        self
    }
}

/// Image smoke-test client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageClientConfig {
    pub url: String,
    pub image_path: PathBuf,
    pub output_path: PathBuf,
    /// No timeout when unset
    pub timeout_secs: Option<u64>,
}

impl ImageClientConfig {
    pub fn new(url: impl Into<String>, image_path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            image_path: image_path.into(),
            output_path: PathBuf::from("result.jpg"),
            timeout_secs: None,
        }
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}
