//! Application state management

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ServingConfig;
use crate::serving::HousePriceModel;

/// The model, or why it could not be loaded
#[derive(Debug, Clone)]
pub enum ModelSlot {
    Ready(Arc<HousePriceModel>),
    Unavailable { reason: String },
}

/// Application state shared across handlers
#[derive(Debug)]
pub struct AppState {
    pub model: ModelSlot,
    pub model_path: PathBuf,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Load the configured model, recording failure instead of returning it
    pub fn load(config: &ServingConfig) -> Self {
        let model = match HousePriceModel::load(&config.model_path) {
            Ok(model) => ModelSlot::Ready(Arc::new(model)),
            Err(e) => ModelSlot::Unavailable {
                reason: e.to_string(),
            },
        };
        Self {
            model,
            model_path: config.model_path.clone(),
            started_at: chrono::Utc::now(),
        }
    }

    pub fn with_model(model: HousePriceModel) -> Self {
        Self {
            model_path: model.path().to_path_buf(),
            model: ModelSlot::Ready(Arc::new(model)),
            started_at: chrono::Utc::now(),
        }
    }

    pub fn unavailable(model_path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            model: ModelSlot::Unavailable {
                reason: reason.into(),
            },
            model_path: model_path.into(),
            started_at: chrono::Utc::now(),
        }
    }
}
