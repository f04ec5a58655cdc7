//! Image model test client
//!
//! Sends an image as base64 `binData` and writes the returned tensor back out
//! as a JPEG.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, StatusCode};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::ImageClientConfig;
use crate::error::{HousingError, Result};
use crate::protocol::{BinDataRequest, TensorResponse};

/// What the image endpoint answered
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifyOutcome {
    Saved { path: PathBuf, shape: Vec<usize> },
    ServiceUnavailable,
    InternalError { body: String },
    UnexpectedStatus { status: u16, body: String },
}

impl ClassifyOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ClassifyOutcome::Saved { .. })
    }
}

/// Base64-encode the image file into a request body
pub fn encode_image(config: &ImageClientConfig) -> Result<BinDataRequest> {
    let bytes = std::fs::read(&config.image_path).map_err(|e| {
        HousingError::Image(format!("cannot read {}: {}", config.image_path.display(), e))
    })?;
    Ok(BinDataRequest {
        bin_data: STANDARD.encode(bytes),
    })
}

pub async fn classify_image(config: &ImageClientConfig) -> Result<ClassifyOutcome> {
    let request = encode_image(config)?;

    let mut builder = Client::builder();
    if let Some(secs) = config.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    let client = builder.build()?;

    info!(url = %config.url, image = %config.image_path.display(), "Sending image");
    let response = client.post(&config.url).json(&request).send().await?;
    let status = response.status();

    match status {
        StatusCode::OK => {
            let body: TensorResponse = response.json().await?;
            let tensor = body.data.tensor;
            tensor.save_jpeg(&config.output_path)?;
            info!(path = %config.output_path.display(), shape = ?tensor.shape, "Saved result image");
            Ok(ClassifyOutcome::Saved {
                path: config.output_path.clone(),
                shape: tensor.shape,
            })
        }
        StatusCode::SERVICE_UNAVAILABLE => {
            error!("Model service is not available.");
            Ok(ClassifyOutcome::ServiceUnavailable)
        }
        StatusCode::INTERNAL_SERVER_ERROR => {
            let body = response.text().await?;
            error!(body = %body, "Internal model error.");
            Ok(ClassifyOutcome::InternalError { body })
        }
        other => {
            let body = response.text().await?;
            warn!(status = other.as_u16(), body = %body, "Unexpected status from model service");
            Ok(ClassifyOutcome::UnexpectedStatus {
                status: other.as_u16(),
                body,
            })
        }
    }
}
