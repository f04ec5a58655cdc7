//! File system tracking backend
//!
//! Layout under the base directory:
//!
//! ```text
//! experiments.json
//! <experiment_id>/<run_id>/run.json
//! <experiment_id>/<run_id>/artifacts/<path>
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use super::{now_millis, RunHandle, RunStatus, TrackingBackend};
use crate::error::{HousingError, Result};

/// An experiment known to the local tracker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalExperiment {
    pub experiment_id: String,
    pub name: String,
    pub created_at: i64,
}

/// Everything recorded for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalRun {
    pub run_id: String,
    pub run_name: Option<String>,
    pub experiment_id: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub status: RunStatus,
    pub params: HashMap<String, String>,
    pub metrics: HashMap<String, f64>,
    pub tags: HashMap<String, String>,
    pub artifacts: Vec<String>,
}

/// Tracking backend that writes JSON records below a directory
pub struct LocalTracker {
    base_dir: PathBuf,
    lock: Mutex<()>,
}

impl LocalTracker {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        Ok(Self {
            base_dir,
            lock: Mutex::new(()),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn experiments_file(&self) -> PathBuf {
        self.base_dir.join("experiments.json")
    }

    fn run_dir(&self, experiment_id: &str, run_id: &str) -> PathBuf {
        self.base_dir.join(experiment_id).join(run_id)
    }

    fn run_file(&self, experiment_id: &str, run_id: &str) -> PathBuf {
        self.run_dir(experiment_id, run_id).join("run.json")
    }

    /// Directory holding a run's artifacts
    pub fn artifact_dir(&self, run: &RunHandle) -> PathBuf {
        self.run_dir(&run.experiment_id, &run.run_id).join("artifacts")
    }

    pub fn list_experiments(&self) -> Result<Vec<LocalExperiment>> {
        let path = self.experiments_file();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn load_run(&self, run: &RunHandle) -> Result<LocalRun> {
        let contents = fs::read_to_string(self.run_file(&run.experiment_id, &run.run_id))?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn save_run(&self, run: &LocalRun) -> Result<()> {
        let dir = self.run_dir(&run.experiment_id, &run.run_id);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("run.json"), serde_json::to_string_pretty(run)?)?;
        Ok(())
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| HousingError::Tracking("local tracker lock poisoned".to_string()))
    }

    fn get_or_create_experiment(&self, name: &str) -> Result<String> {
        let mut experiments = self.list_experiments()?;
        if let Some(existing) = experiments.iter().find(|e| e.name == name) {
            return Ok(existing.experiment_id.clone());
        }

        let id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        experiments.push(LocalExperiment {
            experiment_id: id.clone(),
            name: name.to_string(),
            created_at: now_millis(),
        });
        fs::write(
            self.experiments_file(),
            serde_json::to_string_pretty(&experiments)?,
        )?;
        info!(experiment = %name, experiment_id = %id, "Created local experiment");
        Ok(id)
    }

    /// Load, change and write back a run record. `f` only runs while the
    /// run is still open.
    fn update_run<F>(&self, run: &RunHandle, f: F) -> Result<()>
    where
        F: FnOnce(&mut LocalRun) -> Result<()>,
    {
        let _guard = self.guard()?;
        let mut record = self.load_run(run)?;
        if record.status != RunStatus::Running {
            return Err(HousingError::Tracking(format!(
                "run {} is already {}",
                run.run_id,
                record.status.as_str()
            )));
        }
        f(&mut record)?;
        self.save_run(&record)
    }
}

/// Reject artifact paths that would escape the artifact directory
fn relative_artifact_path(path: &str) -> Result<PathBuf> {
    let relative = Path::new(path);
    let valid = !path.is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !valid {
        return Err(HousingError::Tracking(format!(
            "invalid artifact path '{}'",
            path
        )));
    }
    Ok(relative.to_path_buf())
}

#[async_trait]
impl TrackingBackend for LocalTracker {
    fn name(&self) -> &str {
        "local"
    }

    async fn start_run(&self, experiment: &str, run_name: Option<&str>) -> Result<RunHandle> {
        let _guard = self.guard()?;
        let experiment_id = self.get_or_create_experiment(experiment)?;
        let run_id = uuid::Uuid::new_v4().simple().to_string();

        let record = LocalRun {
            run_id: run_id.clone(),
            run_name: run_name.map(str::to_string),
            experiment_id: experiment_id.clone(),
            start_time: now_millis(),
            end_time: None,
            status: RunStatus::Running,
            params: HashMap::new(),
            metrics: HashMap::new(),
            tags: HashMap::new(),
            artifacts: Vec::new(),
        };
        self.save_run(&record)?;
        info!(experiment_id = %experiment_id, run_id = %run_id, "Started local run");

        let artifact_uri = self
            .run_dir(&experiment_id, &run_id)
            .join("artifacts")
            .display()
            .to_string();
        Ok(RunHandle {
            experiment_id,
            run_id,
            run_name: record.run_name,
            artifact_uri: Some(artifact_uri),
        })
    }

    async fn log_params(&self, run: &RunHandle, params: &[(String, String)]) -> Result<()> {
        self.update_run(run, |record| {
            record.params.extend(params.iter().cloned());
            Ok(())
        })
    }

    async fn log_metrics(&self, run: &RunHandle, metrics: &[(String, f64)]) -> Result<()> {
        self.update_run(run, |record| {
            record.metrics.extend(metrics.iter().cloned());
            Ok(())
        })
    }

    async fn set_tags(&self, run: &RunHandle, tags: &[(String, String)]) -> Result<()> {
        self.update_run(run, |record| {
            record.tags.extend(tags.iter().cloned());
            Ok(())
        })
    }

    async fn log_artifact(&self, run: &RunHandle, path: &str, contents: &[u8]) -> Result<()> {
        let relative = relative_artifact_path(path)?;
        let target = self.artifact_dir(run).join(&relative);

        self.update_run(run, |record| {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, contents)?;
            debug!(path = %target.display(), bytes = contents.len(), "Stored artifact");

            if !record.artifacts.iter().any(|a| a == path) {
                record.artifacts.push(path.to_string());
            }
            Ok(())
        })
    }

    async fn end_run(&self, run: &RunHandle, status: RunStatus) -> Result<()> {
        self.update_run(run, |record| {
            record.status = status;
            record.end_time = Some(now_millis());
            Ok(())
        })?;
        info!(run_id = %run.run_id, status = status.as_str(), "Ended local run");
        Ok(())
    }
}
