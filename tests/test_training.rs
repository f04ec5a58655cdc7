//! Integration test: training pipeline
//! Tests: CSV → split → fit → artifact → local tracking run

use async_trait::async_trait;
use house_price_ml::config::{DataConfig, ForestParams, TrackingConfig, TrainingConfig};
use house_price_ml::data::FEATURE_COLUMNS;
use house_price_ml::error::{HousingError, Result};
use house_price_ml::pipeline;
use house_price_ml::serving::HousePriceModel;
use house_price_ml::tracking::{LocalTracker, RunHandle, RunStatus, TrackingBackend};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Deterministic housing-like CSV; price is driven by sqft_living and grade
fn write_housing_csv(dir: &Path, n_rows: usize) -> PathBuf {
    let path = dir.join("kc_house_data.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "id,price,{}", FEATURE_COLUMNS.join(",")).unwrap();
    for i in 0..n_rows {
        let bedrooms = 1 + i % 5;
        let bathrooms = 1.0 + (i % 3) as f64 * 0.5;
        let sqft_living = 800 + (i * 37) % 2500;
        let sqft_above = sqft_living - (i % 4) * 100;
        let grade = 5 + i % 6;
        let floors = 1.0 + (i % 2) as f64;
        let view = i % 5;
        let sqft_lot = 4000 + (i * 91) % 9000;
        let waterfront = usize::from(i % 17 == 0);
        let zipcode = 98001 + i % 40;
        let price = 150.0 * sqft_living as f64 + 20000.0 * grade as f64 + (i % 7) as f64 * 500.0;
        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{},{},{},{}",
            i, price, bedrooms, bathrooms, sqft_living, sqft_above, grade, floors, view,
            sqft_lot, waterfront, zipcode
        )
        .unwrap();
    }
    path
}

fn small_config(csv: PathBuf, model_output: PathBuf) -> TrainingConfig {
    TrainingConfig::new(DataConfig::default().with_csv_path(csv))
        .with_forest(ForestParams {
            n_estimators: 10,
            ..ForestParams::default()
        })
        .with_model_output(model_output)
}

fn tracking() -> TrackingConfig {
    TrackingConfig::default().with_experiment("housing-test")
}

#[tokio::test]
async fn test_pipeline_records_local_run() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_housing_csv(dir.path(), 60);
    let model_path = dir.path().join("models").join("model.json");
    let tracker = LocalTracker::new(dir.path().join("mlruns")).unwrap();

    let config = small_config(csv, model_path.clone());
    let report = pipeline::train(&config, &tracking(), &tracker).await.unwrap();

    assert_eq!((report.n_train, report.n_test), (42, 18));
    assert!(report.train_score > 0.5, "train R² = {}", report.train_score);
    assert!(report.test_score.is_finite());
    assert!(model_path.exists());

    let handle = RunHandle {
        experiment_id: report.experiment_id.clone(),
        run_id: report.run_id.clone(),
        run_name: None,
        artifact_uri: None,
    };
    let run = tracker.load_run(&handle).unwrap();
    assert_eq!(run.status, RunStatus::Finished);
    assert_eq!(run.params.len(), 3);
    assert_eq!(run.params["n_estimators"], "10");
    assert_eq!(run.params["max_depth"], "6");
    assert_eq!(run.params["max_features"], "10");
    assert_eq!(run.metrics["train_score"], report.train_score);
    assert_eq!(run.metrics["test_score"], report.test_score);
    for artifact in [
        "model.json",
        "input_example.json",
        "signature.json",
        "feature_importances.json",
    ] {
        let path = format!("rf-regressor/{}", artifact);
        assert!(run.artifacts.contains(&path), "missing {}", path);
    }

    let example: serde_json::Value = serde_json::from_slice(
        &std::fs::read(tracker.artifact_dir(&handle).join("rf-regressor/input_example.json"))
            .unwrap(),
    )
    .unwrap();
    assert_eq!(example["data"].as_array().unwrap().len(), 5);
    assert_eq!(example["columns"][0], "bedrooms");

    let importances: serde_json::Value = serde_json::from_slice(
        &std::fs::read(tracker.artifact_dir(&handle).join("rf-regressor/feature_importances.json"))
            .unwrap(),
    )
    .unwrap();
    assert_eq!(importances.as_array().unwrap().len(), 10);
    assert_eq!(importances[0]["name"], report.feature_importances[0].name.as_str());
    let total: f64 = report.feature_importances.iter().map(|f| f.importance).sum();
    assert!((total - 1.0).abs() < 1e-9, "importances sum to {}", total);
}

#[tokio::test]
async fn test_same_seed_same_scores() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_housing_csv(dir.path(), 50);
    let tracker = LocalTracker::new(dir.path().join("mlruns")).unwrap();

    let a = pipeline::train(
        &small_config(csv.clone(), dir.path().join("a.json")),
        &tracking(),
        &tracker,
    )
    .await
    .unwrap();
    let b = pipeline::train(
        &small_config(csv, dir.path().join("b.json")),
        &tracking(),
        &tracker,
    )
    .await
    .unwrap();

    assert_eq!(a.train_score, b.train_score);
    assert_eq!(a.test_score, b.test_score);
    assert_eq!(a.experiment_id, b.experiment_id);
    assert_ne!(a.run_id, b.run_id);
}

#[tokio::test]
async fn test_saved_model_serves_training_rows() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_housing_csv(dir.path(), 40);
    let model_path = dir.path().join("model.json");
    let tracker = LocalTracker::new(dir.path().join("mlruns")).unwrap();
    pipeline::train(&small_config(csv, model_path.clone()), &tracking(), &tracker)
        .await
        .unwrap();

    let model = HousePriceModel::load(&model_path).unwrap();
    assert_eq!(model.schema().names(), FEATURE_COLUMNS.to_vec());
    let rows = ndarray::Array2::from_elem((3, 10), 1.0);
    assert_eq!(model.predict(&rows).unwrap().len(), 3);
}

#[tokio::test]
async fn test_missing_column_aborts_before_tracking() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("bad.csv");
    std::fs::write(&csv, "price,bedrooms\n1,2\n3,4\n").unwrap();
    let tracker = LocalTracker::new(dir.path().join("mlruns")).unwrap();

    let err = pipeline::train(
        &small_config(csv, dir.path().join("model.json")),
        &tracking(),
        &tracker,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, HousingError::FeatureNotFound(_) | HousingError::DataError(_)));
    assert!(tracker.list_experiments().unwrap().is_empty());
}

/// Delegates to a local tracker but refuses artifacts
struct NoArtifacts(LocalTracker);

#[async_trait]
impl TrackingBackend for NoArtifacts {
    fn name(&self) -> &str {
        "no-artifacts"
    }

    async fn start_run(&self, experiment: &str, run_name: Option<&str>) -> Result<RunHandle> {
        self.0.start_run(experiment, run_name).await
    }

    async fn log_params(&self, run: &RunHandle, params: &[(String, String)]) -> Result<()> {
        self.0.log_params(run, params).await
    }

    async fn log_metrics(&self, run: &RunHandle, metrics: &[(String, f64)]) -> Result<()> {
        self.0.log_metrics(run, metrics).await
    }

    async fn set_tags(&self, run: &RunHandle, tags: &[(String, String)]) -> Result<()> {
        self.0.set_tags(run, tags).await
    }

    async fn log_artifact(&self, _run: &RunHandle, path: &str, _contents: &[u8]) -> Result<()> {
        Err(HousingError::Tracking(format!("artifact store rejected {}", path)))
    }

    async fn end_run(&self, run: &RunHandle, status: RunStatus) -> Result<()> {
        self.0.end_run(run, status).await
    }
}

#[tokio::test]
async fn test_failure_after_start_marks_run_failed() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_housing_csv(dir.path(), 30);
    let tracker = NoArtifacts(LocalTracker::new(dir.path().join("mlruns")).unwrap());

    let err = pipeline::train(
        &small_config(csv, dir.path().join("model.json")),
        &tracking(),
        &tracker,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, HousingError::Tracking(_)));

    let experiments = tracker.0.list_experiments().unwrap();
    assert_eq!(experiments.len(), 1);
    let exp_dir = tracker.0.base_dir().join(&experiments[0].experiment_id);
    let run_id = std::fs::read_dir(&exp_dir)
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .file_name()
        .into_string()
        .unwrap();
    let run = tracker
        .0
        .load_run(&RunHandle {
            experiment_id: experiments[0].experiment_id.clone(),
            run_id,
            run_name: None,
            artifact_uri: None,
        })
        .unwrap();
    assert_eq!(run.status, RunStatus::Failed);
}
