//! Housing model test client

use reqwest::Client;
use tracing::{info, warn};

use crate::config::HousingClientConfig;
use crate::data::{DataLoader, HousingData};
use crate::error::{HousingError, Result};
use crate::protocol::PredictRequest;

/// Status and raw body of a successful prediction call
#[derive(Debug, Clone)]
pub struct HousingPrediction {
    pub status: u16,
    pub body: String,
    pub row: Vec<f64>,
}

/// Pick the configured row from the CSV and build the request body
pub fn build_request(config: &HousingClientConfig) -> Result<(PredictRequest, Vec<f64>)> {
    let loader = DataLoader::new();
    let df = loader.load_csv(&config.data.csv_path)?;
    let data = HousingData::from_frame(&df, &config.data.feature_columns, None)?;
    let row = data.row(config.row_index)?;
    Ok((PredictRequest::new(vec![row.clone()]), row))
}

/// POST one row to the prediction endpoint
pub async fn send_row(config: &HousingClientConfig) -> Result<HousingPrediction> {
    let (request, row) = build_request(config)?;

    let client = Client::builder().timeout(config.timeout()).build()?;
    info!(url = %config.predict_url, row = config.row_index, "Sending prediction request");
    let response = client.post(&config.predict_url).json(&request).send().await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        warn!(status = status.as_u16(), body = %body, "Prediction request failed");
        return Err(HousingError::PredictionFailed {
            status: status.as_u16(),
            body,
        });
    }

    Ok(HousingPrediction {
        status: status.as_u16(),
        body,
        row,
    })
}
