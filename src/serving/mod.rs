//! Serving wrapper around a saved model artifact

mod model;
mod stats;

pub use model::HousePriceModel;
pub use stats::{MetricType, PredictionStats, ServingMetric};
