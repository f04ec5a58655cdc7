//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::json;
use tracing::{debug, error};

use crate::protocol::{PredictRequest, PredictResponse, PredictionData};
use crate::serving::{HousePriceModel, ServingMetric};

use super::error::{Result, ServerError};
use super::state::{AppState, ModelSlot};

fn ready_model(state: &AppState) -> Result<Arc<HousePriceModel>> {
    match &state.model {
        ModelSlot::Ready(model) => Ok(Arc::clone(model)),
        ModelSlot::Unavailable { reason } => Err(ServerError::Unavailable(reason.clone())),
    }
}

// ============================================================================
// Prediction
// ============================================================================

pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>> {
    let model = ready_model(&state)?;
    let Json(request) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let rows = request.to_array()?;
    debug!(rows = rows.nrows(), named = request.data.names.is_some(), "Prediction request");

    let target = model.artifact().target.clone();
    let prices = tokio::task::spawn_blocking(move || match request.data.names {
        Some(names) => model.predict_named(&rows, &names),
        None => model.predict(&rows),
    })
    .await
    .map_err(|e| {
        error!(error = %e, "Prediction task failed");
        ServerError::Internal(e.to_string())
    })??;

    Ok(Json(PredictResponse {
        data: PredictionData {
            names: vec![target],
            ndarray: prices.to_vec(),
        },
        meta: json!({}),
    }))
}

// ============================================================================
// Health and metrics
// ============================================================================

pub async fn ping() -> &'static str {
    "pong"
}

pub async fn status(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>> {
    let model = ready_model(&state)?;
    let artifact = model.artifact();
    Ok(Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model_path": state.model_path.display().to_string(),
        "features": artifact.schema.names(),
        "target": artifact.target,
        "n_trees": artifact.model.n_trees(),
        "train_score": artifact.train_score,
        "test_score": artifact.test_score,
        "feature_importances": artifact.feature_importances(),
        "trained_at": artifact.created_at.to_rfc3339(),
        "started_at": state.started_at.to_rfc3339(),
    })))
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ServingMetric>>> {
    let model = ready_model(&state)?;
    Ok(Json(model.metrics()))
}
