//! Experiment Tracking Module
//!
//! Records run parameters, metrics, tags and artifacts. [`MlflowClient`]
//! talks to an MLflow tracking server over REST; [`LocalTracker`] keeps the
//! same records on the local file system.

mod local;
mod mlflow;

pub use local::{LocalExperiment, LocalRun, LocalTracker};
pub use mlflow::MlflowClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
    Killed,
}

impl RunStatus {
    /// Name used by the MLflow REST API
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Finished => "FINISHED",
            RunStatus::Failed => "FAILED",
            RunStatus::Killed => "KILLED",
        }
    }
}

/// Identifies an open run on a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHandle {
    pub experiment_id: String,
    pub run_id: String,
    pub run_name: Option<String>,
    pub artifact_uri: Option<String>,
}

/// A place training runs are recorded
#[async_trait]
pub trait TrackingBackend: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Create the experiment if needed and open a run in it
    async fn start_run(&self, experiment: &str, run_name: Option<&str>) -> Result<RunHandle>;

    async fn log_params(&self, run: &RunHandle, params: &[(String, String)]) -> Result<()>;

    async fn log_metrics(&self, run: &RunHandle, metrics: &[(String, f64)]) -> Result<()>;

    async fn set_tags(&self, run: &RunHandle, tags: &[(String, String)]) -> Result<()>;

    /// Store `contents` under `path`, relative to the run's artifact root
    async fn log_artifact(&self, run: &RunHandle, path: &str, contents: &[u8]) -> Result<()>;

    async fn end_run(&self, run: &RunHandle, status: RunStatus) -> Result<()>;
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
