//! Prediction server
//!
//! Serves a [`HousePriceModel`](crate::serving::HousePriceModel) over the
//! Seldon JSON protocol. The server comes up even when the model cannot be
//! loaded so the failure is visible on the health endpoints.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use state::{AppState, ModelSlot};

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ServingConfig;

/// Start the server with the given configuration
pub async fn run_server(config: ServingConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();

    let state = Arc::new(AppState::load(&config));
    if let ModelSlot::Unavailable { reason } = &state.model {
        warn!(
            model_path = %config.model_path.display(),
            reason = %reason,
            "Model unavailable, predictions will answer 503"
        );
    }
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        host = %config.host,
        port = config.port,
        model_path = %config.model_path.display(),
        started_at = %start_time.to_rfc3339(),
        "House price server starting"
    );
    info!(url = %format!("http://{}/predict", addr), "Prediction endpoint available");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl+c");
            return;
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(uptime_secs = uptime.num_seconds(), "Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
