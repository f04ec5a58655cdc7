//! Runtime counters for the serving wrapper

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Kind of custom metric, as the serving runtime names them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetricType {
    Counter,
    Gauge,
    Timer,
}

/// One custom metric entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServingMetric {
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub key: String,
    pub value: f64,
}

impl ServingMetric {
    fn new(metric_type: MetricType, key: &str, value: f64) -> Self {
        Self {
            metric_type,
            key: key.to_string(),
            value,
        }
    }
}

/// Lock-free prediction counters
#[derive(Debug, Default)]
pub struct PredictionStats {
    total_predictions: AtomicU64,
    total_errors: AtomicU64,
    // f64 bits
    last_latency_ms: AtomicU64,
}

impl PredictionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful call that produced `rows` predictions
    pub fn record_batch(&self, rows: usize, latency_ms: f64) {
        self.total_predictions.fetch_add(rows as u64, Ordering::Relaxed);
        self.last_latency_ms
            .store(latency_ms.to_bits(), Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.total_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_predictions(&self) -> u64 {
        self.total_predictions.load(Ordering::Relaxed)
    }

    pub fn total_errors(&self) -> u64 {
        self.total_errors.load(Ordering::Relaxed)
    }

    pub fn last_latency_ms(&self) -> f64 {
        f64::from_bits(self.last_latency_ms.load(Ordering::Relaxed))
    }

    pub fn snapshot(&self, n_features: usize) -> Vec<ServingMetric> {
        vec![
            ServingMetric::new(
                MetricType::Counter,
                "predictions_total",
                self.total_predictions() as f64,
            ),
            ServingMetric::new(
                MetricType::Counter,
                "predict_errors_total",
                self.total_errors() as f64,
            ),
            ServingMetric::new(MetricType::Gauge, "model_features", n_features as f64),
            ServingMetric::new(MetricType::Timer, "last_predict_ms", self.last_latency_ms()),
        ]
    }
}
