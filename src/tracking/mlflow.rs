//! MLflow REST client

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use super::{now_millis, RunHandle, RunStatus, TrackingBackend};
use crate::config::TrackingConfig;
use crate::error::{HousingError, Result};

const API: &str = "api/2.0/mlflow";
const ARTIFACT_API: &str = "api/2.0/mlflow-artifacts/artifacts";
const PROXIED_ARTIFACT_SCHEME: &str = "mlflow-artifacts:";

/// Tracking backend for an MLflow server
pub struct MlflowClient {
    base_uri: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct GetExperimentResponse {
    experiment: ExperimentInfo,
}

#[derive(Debug, Deserialize)]
struct ExperimentInfo {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateRunResponse {
    run: RunPayload,
}

#[derive(Debug, Deserialize)]
struct RunPayload {
    info: RunInfo,
}

#[derive(Debug, Deserialize)]
struct RunInfo {
    run_id: String,
    #[serde(default)]
    artifact_uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct KeyValue<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct MetricEntry<'a> {
    key: &'a str,
    value: f64,
    timestamp: i64,
    step: i64,
}

impl MlflowClient {
    pub fn new(config: &TrackingConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| HousingError::Tracking(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_uri: config.tracking_uri.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_uri, API, path)
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> Result<T> {
        let url = self.endpoint(path);
        debug!(url = %url, "MLflow POST");
        let response = self.http.post(&url).json(&body).send().await?;
        Self::decode(path, response).await
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(HousingError::Tracking(format!(
                "{} returned {}: {}",
                path, status, text
            )));
        }
        // Some endpoints answer with an empty body
        let text = if text.trim().is_empty() { "{}" } else { text.as_str() };
        serde_json::from_str(text)
            .map_err(|e| HousingError::Tracking(format!("{}: invalid response: {}", path, e)))
    }

    /// Experiment id for `name`, creating the experiment when it does not exist
    pub async fn get_or_create_experiment(&self, name: &str) -> Result<String> {
        let url = self.endpoint("experiments/get-by-name");
        let response = self
            .http
            .get(&url)
            .query(&[("experiment_name", name)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            let created: CreateExperimentResponse = self
                .post("experiments/create", json!({ "name": name }))
                .await?;
            info!(experiment = %name, experiment_id = %created.experiment_id, "Created MLflow experiment");
            return Ok(created.experiment_id);
        }

        let found: GetExperimentResponse = Self::decode("experiments/get-by-name", response).await?;
        Ok(found.experiment.experiment_id)
    }

    /// Artifact upload URL for a run whose artifacts are proxied by the server
    fn artifact_url(&self, run: &RunHandle, path: &str) -> Result<String> {
        let root = match run.artifact_uri.as_deref() {
            Some(uri) if uri.starts_with(PROXIED_ARTIFACT_SCHEME) => uri
                .trim_start_matches(PROXIED_ARTIFACT_SCHEME)
                .trim_matches('/')
                .to_string(),
            Some(uri) => {
                return Err(HousingError::Tracking(format!(
                    "artifact store '{}' is not proxied by the tracking server",
                    uri
                )))
            }
            None => format!("{}/{}/artifacts", run.experiment_id, run.run_id),
        };
        Ok(format!(
            "{}/{}/{}/{}",
            self.base_uri,
            ARTIFACT_API,
            root,
            path.trim_start_matches('/')
        ))
    }
}

#[async_trait]
impl TrackingBackend for MlflowClient {
    fn name(&self) -> &str {
        "mlflow"
    }

    async fn start_run(&self, experiment: &str, run_name: Option<&str>) -> Result<RunHandle> {
        let experiment_id = self.get_or_create_experiment(experiment).await?;

        let mut body = json!({
            "experiment_id": experiment_id,
            "start_time": now_millis(),
            "tags": [{ "key": "mlflow.source.name", "value": env!("CARGO_PKG_NAME") }],
        });
        if let Some(name) = run_name {
            body["run_name"] = json!(name);
        }

        let created: CreateRunResponse = self.post("runs/create", body).await?;
        info!(experiment_id = %experiment_id, run_id = %created.run.info.run_id, "Started MLflow run");

        Ok(RunHandle {
            experiment_id,
            run_id: created.run.info.run_id,
            run_name: run_name.map(str::to_string),
            artifact_uri: created.run.info.artifact_uri,
        })
    }

    async fn log_params(&self, run: &RunHandle, params: &[(String, String)]) -> Result<()> {
        let params: Vec<KeyValue> = params
            .iter()
            .map(|(k, v)| KeyValue { key: k, value: v })
            .collect();
        let _: serde_json::Value = self
            .post("runs/log-batch", json!({ "run_id": run.run_id, "params": params }))
            .await?;
        Ok(())
    }

    async fn log_metrics(&self, run: &RunHandle, metrics: &[(String, f64)]) -> Result<()> {
        let timestamp = now_millis();
        let metrics: Vec<MetricEntry> = metrics
            .iter()
            .map(|(k, v)| MetricEntry {
                key: k,
                value: *v,
                timestamp,
                step: 0,
            })
            .collect();
        let _: serde_json::Value = self
            .post("runs/log-batch", json!({ "run_id": run.run_id, "metrics": metrics }))
            .await?;
        Ok(())
    }

    async fn set_tags(&self, run: &RunHandle, tags: &[(String, String)]) -> Result<()> {
        let tags: Vec<KeyValue> = tags
            .iter()
            .map(|(k, v)| KeyValue { key: k, value: v })
            .collect();
        let _: serde_json::Value = self
            .post("runs/log-batch", json!({ "run_id": run.run_id, "tags": tags }))
            .await?;
        Ok(())
    }

    async fn log_artifact(&self, run: &RunHandle, path: &str, contents: &[u8]) -> Result<()> {
        let url = self.artifact_url(run, path)?;
        debug!(url = %url, bytes = contents.len(), "MLflow artifact upload");
        let response = self.http.put(&url).body(contents.to_vec()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(HousingError::Tracking(format!(
                "artifact upload {} returned {}: {}",
                path, status, text
            )));
        }
        Ok(())
    }

    async fn end_run(&self, run: &RunHandle, status: RunStatus) -> Result<()> {
        let _: serde_json::Value = self
            .post(
                "runs/update",
                json!({
                    "run_id": run.run_id,
                    "status": status.as_str(),
                    "end_time": now_millis(),
                }),
            )
            .await?;
        info!(run_id = %run.run_id, status = status.as_str(), "Ended MLflow run");
        Ok(())
    }
}
