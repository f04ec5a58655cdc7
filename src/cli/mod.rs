//! House price CLI
//!
//! One subcommand per entry point: training, serving, and the two test
//! clients.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::time::Instant;

use crate::client::{self, ClassifyOutcome};
use crate::config::{
    DataConfig, ForestParams, HousingClientConfig, ImageClientConfig, ServingConfig,
    TrackingConfig, TrainingConfig,
};
use crate::pipeline;
use crate::tracking::{LocalTracker, MlflowClient, TrackingBackend};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<16} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "house-price")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train, track and serve a house price regression model")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train the random forest and log the run
    Train {
        /// Training CSV
        #[arg(short, long, env = "HOUSING_DATA")]
        data: Option<PathBuf>,

        /// Model artifact output
        #[arg(short, long, env = "HOUSING_MODEL_PATH")]
        output: Option<PathBuf>,

        /// MLflow tracking URI
        #[arg(long, env = "MLFLOW_TRACKING_URI")]
        tracking_uri: Option<String>,

        /// Experiment name
        #[arg(long, env = "MLFLOW_EXPERIMENT_NAME")]
        experiment: Option<String>,

        /// Record the run in this directory instead of MLflow
        #[arg(long)]
        local_tracking: Option<PathBuf>,

        /// Number of trees
        #[arg(long, default_value = "100")]
        n_estimators: usize,

        /// Maximum tree depth
        #[arg(long, default_value = "6")]
        max_depth: usize,

        /// Features considered per split
        #[arg(long, default_value = "10")]
        max_features: usize,

        /// Split and forest seed
        #[arg(long, default_value = "3")]
        seed: u64,

        /// Run name shown by the tracker
        #[arg(long)]
        run_name: Option<String>,
    },

    /// Serve predictions over HTTP
    Serve {
        /// Model artifact
        #[arg(short, long, env = "HOUSING_MODEL_PATH")]
        model: Option<PathBuf>,

        /// Server host
        #[arg(long, env = "API_HOST")]
        host: Option<String>,

        /// Server port
        #[arg(short, long, env = "API_PORT")]
        port: Option<u16>,
    },

    /// Send one CSV row to a prediction endpoint
    Predict {
        /// CSV to read the row from
        #[arg(short, long, env = "HOUSING_DATA")]
        data: Option<PathBuf>,

        /// Prediction endpoint
        #[arg(short, long, env = "PREDICT_URL")]
        url: Option<String>,

        /// Row position in the CSV
        #[arg(short, long, default_value = "7")]
        row: usize,
    },

    /// Send an image to an image model and save the returned tensor
    ClassifyImage {
        /// Model endpoint
        url: String,

        /// Image file to send
        image: PathBuf,

        /// Where to write the result JPEG
        #[arg(short, long, default_value = "result.jpg")]
        output: PathBuf,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Show training data information
    Info {
        /// Training CSV
        #[arg(short, long, env = "HOUSING_DATA")]
        data: Option<PathBuf>,
    },
}

fn data_config(data: Option<PathBuf>) -> DataConfig {
    match data {
        Some(path) => DataConfig::default().with_csv_path(path),
        None => DataConfig::default(),
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub async fn cmd_train(
    data: Option<PathBuf>,
    output: Option<PathBuf>,
    tracking_uri: Option<String>,
    experiment: Option<String>,
    local_tracking: Option<PathBuf>,
    forest: ForestParams,
    seed: u64,
    run_name: Option<String>,
) -> anyhow::Result<()> {
    section("Train");

    let mut config = TrainingConfig::new(data_config(data))
        .with_forest(forest)
        .with_random_state(seed);
    if let Some(path) = output {
        config = config.with_model_output(path);
    }
    if let Some(name) = run_name {
        config = config.with_run_name(name);
    }

    let mut tracking = TrackingConfig::default();
    if let Some(uri) = tracking_uri {
        tracking = tracking.with_uri(uri);
    }
    if let Some(name) = experiment {
        tracking = tracking.with_experiment(name);
    }

    let tracker: Box<dyn TrackingBackend> = match local_tracking {
        Some(dir) => Box::new(LocalTracker::new(dir)?),
        None => Box::new(MlflowClient::new(&tracking)?),
    };

    step_run(&format!(
        "Training on {} ({} tracking)",
        config.data.csv_path.display(),
        tracker.name().cyan()
    ));
    let start = Instant::now();
    let report = pipeline::train(&config, &tracking, tracker.as_ref()).await?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    kv("Train R²", &format!("{:.4}", report.train_score));
    kv("Test R²", &format!("{:.4}", report.test_score));
    kv("Test RMSE", &format!("{:.2}", report.test_metrics.rmse));
    kv("Rows", &format!("{} train / {} test", report.n_train, report.n_test));
    kv("Model", &report.model_path.display().to_string());
    kv("Run", &report.run_id);

    if !report.feature_importances.is_empty() {
        println!();
        println!("  {}", muted("Top features"));
        for feature in report.feature_importances.iter().take(5) {
            kv(&feature.name, &format!("{:.3}", feature.importance));
        }
    }
    println!();

    Ok(())
}

pub async fn cmd_serve(
    model: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let mut config = ServingConfig::default();
    if let Some(path) = model {
        config = config.with_model_path(path);
    }
    let host = host.unwrap_or_else(|| config.host.clone());
    let port = port.unwrap_or(config.port);
    config = config.with_bind(host, port);

    section("Serve");
    kv("Model", &config.model_path.display().to_string());
    kv("Listening", &format!("{}:{}", config.host, config.port));
    println!();

    crate::server::run_server(config).await
}

pub async fn cmd_predict(
    data: Option<PathBuf>,
    url: Option<String>,
    row: usize,
) -> anyhow::Result<()> {
    let mut config = HousingClientConfig {
        data: data_config(data),
        ..HousingClientConfig::default()
    }
    .with_row(row);
    if let Some(url) = url {
        config = config.with_url(url);
    }

    match client::send_row(&config).await {
        Ok(prediction) => {
            println!("Status: {}", prediction.status);
            println!("Response: {}", prediction.body);
            Ok(())
        }
        Err(crate::error::HousingError::PredictionFailed { status, body }) => {
            println!("Status: {}", status);
            println!("Response: {}", body);
            anyhow::bail!("prediction request failed with status {}", status)
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn cmd_classify_image(
    url: String,
    image: PathBuf,
    output: PathBuf,
    timeout: Option<u64>,
) -> anyhow::Result<()> {
    let mut config = ImageClientConfig::new(url, image).with_output(output);
    if let Some(secs) = timeout {
        config = config.with_timeout_secs(secs);
    }

    match client::classify_image(&config).await? {
        ClassifyOutcome::Saved { path, shape } => {
            println!("  {} saved {} {}", ok("✓"), path.display(), dim(&format!("{:?}", shape)));
            Ok(())
        }
        ClassifyOutcome::ServiceUnavailable => {
            anyhow::bail!("Model service is not available.")
        }
        ClassifyOutcome::InternalError { .. } => anyhow::bail!("Internal model error."),
        ClassifyOutcome::UnexpectedStatus { status, .. } => {
            anyhow::bail!("Unexpected status {} from model service", status)
        }
    }
}

pub fn cmd_info(data: Option<PathBuf>) -> anyhow::Result<()> {
    section("Data Info");

    let config = TrainingConfig::new(data_config(data));
    step_run("Loading data");
    let summary = pipeline::describe(&config)?;
    step_done(&format!("{} rows", summary.n_rows));

    println!();
    kv("File", &config.data.csv_path.display().to_string());
    kv("Target", &config.data.target_column);
    kv("Split", &format!("{} train / {} test", summary.n_train, summary.n_test));
    println!();
    println!(
        "  {:<16} {:>14} {:>14} {:>14}",
        muted("Feature"),
        muted("min"),
        muted("max"),
        muted("mean")
    );
    println!("  {}", dim(&"─".repeat(60)));
    for col in &summary.columns {
        println!(
            "  {:<16} {:>14.2} {:>14.2} {:>14.2}",
            col.name, col.min, col.max, col.mean
        );
    }
    println!();

    Ok(())
}
