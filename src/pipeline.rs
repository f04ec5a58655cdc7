//! Training pipeline
//!
//! CSV → split → fit → score → artifact → tracking run (model, input
//! example, signature and feature importances).

use ndarray::{s, Array2};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::{TrackingConfig, TrainingConfig};
use crate::data::{train_test_split, DataLoader, FeatureSchema, HousingData};
use crate::error::Result;
use crate::tracking::{RunHandle, RunStatus, TrackingBackend};
use crate::training::{FeatureImportance, ModelArtifact, RandomForest, RegressionMetrics};

/// Outcome of one training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub train_score: f64,
    pub test_score: f64,
    pub train_metrics: RegressionMetrics,
    pub test_metrics: RegressionMetrics,
    /// Highest first
    pub feature_importances: Vec<FeatureImportance>,
    pub n_train: usize,
    pub n_test: usize,
    pub model_path: PathBuf,
    pub experiment_id: String,
    pub run_id: String,
    pub training_time_secs: f64,
}

/// Everything produced before the tracking run is opened
struct FittedModel {
    artifact: ModelArtifact,
    input_example: Array2<f64>,
    train_metrics: RegressionMetrics,
    test_metrics: RegressionMetrics,
    n_train: usize,
    n_test: usize,
}

/// Train the forest, save the artifact and record the run in `tracker`
pub async fn train(
    config: &TrainingConfig,
    tracking: &TrackingConfig,
    tracker: &dyn TrackingBackend,
) -> Result<TrainingReport> {
    let start = Instant::now();
    let fitted = fit(config)?;
    fitted.artifact.save(&config.model_output)?;
    info!(path = %config.model_output.display(), "Saved model artifact");

    let run = tracker
        .start_run(&tracking.experiment_name, config.run_name.as_deref())
        .await?;

    if let Err(e) = log_run(config, tracker, &run, &fitted).await {
        warn!(run_id = %run.run_id, error = %e, "Logging failed, closing run as FAILED");
        if let Err(close) = tracker.end_run(&run, RunStatus::Failed).await {
            warn!(run_id = %run.run_id, error = %close, "Could not close run");
        }
        return Err(e);
    }
    tracker.end_run(&run, RunStatus::Finished).await?;

    let report = TrainingReport {
        train_score: fitted.artifact.train_score,
        test_score: fitted.artifact.test_score,
        train_metrics: fitted.train_metrics,
        test_metrics: fitted.test_metrics,
        feature_importances: fitted.artifact.feature_importances(),
        n_train: fitted.n_train,
        n_test: fitted.n_test,
        model_path: config.model_output.clone(),
        experiment_id: run.experiment_id,
        run_id: run.run_id,
        training_time_secs: start.elapsed().as_secs_f64(),
    };
    info!(
        train_score = report.train_score,
        test_score = report.test_score,
        secs = report.training_time_secs,
        "Training run complete"
    );
    Ok(report)
}

fn fit(config: &TrainingConfig) -> Result<FittedModel> {
    let data = DataLoader::new().load_housing(&config.data)?;
    let y = data.target()?;
    info!(rows = data.n_rows(), features = data.schema.len(), "Loaded training data");

    let split = train_test_split(&data.x, y, config.train_size, config.random_state)?;

    let mut forest = RandomForest::from(&config.forest).with_random_state(config.random_state);
    forest.fit(&split.x_train, &split.y_train)?;

    let train_metrics = RegressionMetrics::compute(&split.y_train, &forest.predict(&split.x_train)?)?;
    let test_metrics = RegressionMetrics::compute(&split.y_test, &forest.predict(&split.x_test)?)?;
    info!(
        train_score = train_metrics.r2,
        test_score = test_metrics.r2,
        "Scored model"
    );

    let example_rows = config.input_example_rows.min(split.x_test.nrows());
    let input_example = split.x_test.slice(s![..example_rows, ..]).to_owned();

    let artifact = ModelArtifact::new(
        forest,
        data.schema.clone(),
        config.data.target_column.clone(),
        config.forest.clone(),
        train_metrics.r2,
        test_metrics.r2,
    );

    Ok(FittedModel {
        artifact,
        input_example,
        n_train: split.x_train.nrows(),
        n_test: split.x_test.nrows(),
        train_metrics,
        test_metrics,
    })
}

async fn log_run(
    config: &TrainingConfig,
    tracker: &dyn TrackingBackend,
    run: &RunHandle,
    fitted: &FittedModel,
) -> Result<()> {
    tracker.log_params(run, &config.forest.as_params()).await?;
    tracker
        .log_metrics(
            run,
            &[
                ("train_score".to_string(), fitted.artifact.train_score),
                ("test_score".to_string(), fitted.artifact.test_score),
            ],
        )
        .await?;

    let prefix = config.artifact_path.trim_end_matches('/');
    let artifact = &fitted.artifact;
    tracker
        .log_artifact(run, &format!("{}/model.json", prefix), artifact.to_json()?.as_bytes())
        .await?;

    let example = input_example_json(&artifact.schema, &fitted.input_example);
    tracker
        .log_artifact(
            run,
            &format!("{}/input_example.json", prefix),
            serde_json::to_vec_pretty(&example)?.as_slice(),
        )
        .await?;

    let signature = signature_json(&artifact.schema, &artifact.target);
    tracker
        .log_artifact(
            run,
            &format!("{}/signature.json", prefix),
            serde_json::to_vec_pretty(&signature)?.as_slice(),
        )
        .await?;

    tracker
        .log_artifact(
            run,
            &format!("{}/feature_importances.json", prefix),
            serde_json::to_vec_pretty(&artifact.feature_importances())?.as_slice(),
        )
        .await?;

    tracker
        .set_tags(
            run,
            &[
                ("model_type".to_string(), "random_forest_regressor".to_string()),
                ("artifact_path".to_string(), prefix.to_string()),
                ("backend".to_string(), tracker.name().to_string()),
            ],
        )
        .await?;

    info!(run_id = %run.run_id, artifact_path = %prefix, "Logged run to tracker");
    Ok(())
}

/// Input example in split orientation: column names plus row values
pub fn input_example_json(schema: &FeatureSchema, rows: &Array2<f64>) -> serde_json::Value {
    let data: Vec<Vec<f64>> = rows.outer_iter().map(|r| r.to_vec()).collect();
    json!({
        "columns": schema.names(),
        "data": data,
    })
}

/// Column-based model signature
pub fn signature_json(schema: &FeatureSchema, target: &str) -> serde_json::Value {
    json!({
        "inputs": schema.columns(),
        "outputs": [{ "name": target, "type": "double" }],
    })
}

/// Describe the training data without fitting anything
pub fn describe(config: &TrainingConfig) -> Result<DatasetSummary> {
    let data = DataLoader::new().load_housing(&config.data)?;
    DatasetSummary::from_data(&data, config.train_size)
}

/// Row counts and per-column ranges of a housing dataset
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub n_rows: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub columns: Vec<ColumnSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl DatasetSummary {
    pub fn from_data(data: &HousingData, train_size: f64) -> Result<Self> {
        let (n_train, n_test) = crate::data::split_sizes(data.n_rows(), train_size)?;
        let columns = data
            .schema
            .names()
            .into_iter()
            .zip(data.x.columns())
            .map(|(name, col)| ColumnSummary {
                name,
                min: col.fold(f64::INFINITY, |a, &b| a.min(b)),
                max: col.fold(f64::NEG_INFINITY, |a, &b| a.max(b)),
                mean: col.mean().unwrap_or(0.0),
            })
            .collect();

        Ok(Self {
            n_rows: data.n_rows(),
            n_train,
            n_test,
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_input_example_layout() {
        let schema = FeatureSchema::from_names(["a", "b"]);
        let rows = array![[1.0, 2.0], [3.0, 4.0]];
        let value = input_example_json(&schema, &rows);
        assert_eq!(value["columns"], json!(["a", "b"]));
        assert_eq!(value["data"], json!([[1.0, 2.0], [3.0, 4.0]]));
    }

    #[test]
    fn test_signature_lists_features_in_order() {
        let value = signature_json(&FeatureSchema::default(), "price");
        let inputs = value["inputs"].as_array().unwrap();
        assert_eq!(inputs.len(), 10);
        assert_eq!(inputs[0]["name"], "bedrooms");
        assert_eq!(inputs[9]["name"], "zipcode");
        assert_eq!(value["outputs"][0]["name"], "price");
    }

    #[test]
    fn test_dataset_summary() {
        let data = HousingData {
            schema: FeatureSchema::from_names(["a"]),
            x: array![[1.0], [3.0], [5.0], [7.0]],
            y: None,
            source: None,
        };
        let summary = DatasetSummary::from_data(&data, 0.7).unwrap();
        assert_eq!((summary.n_train, summary.n_test), (2, 2));
        assert_eq!(summary.columns[0].min, 1.0);
        assert_eq!(summary.columns[0].max, 7.0);
        assert_eq!(summary.columns[0].mean, 4.0);
    }
}
