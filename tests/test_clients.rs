//! Integration test: HTTP test clients against in-process mock endpoints
//! Tests: housing client 200/500, image client 200/503/500/other

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use house_price_ml::cli::cmd_predict;
use house_price_ml::client::{classify_image, send_row, ClassifyOutcome};
use house_price_ml::config::{DataConfig, HousingClientConfig, ImageClientConfig};
use house_price_ml::data::FEATURE_COLUMNS;
use house_price_ml::error::HousingError;
use serde_json::{json, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

type Captured = Arc<Mutex<Vec<Value>>>;

/// Serve `router` on an ephemeral port and return its base URL
async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Mock endpoint answering every POST with a fixed status and body
async fn mock_endpoint(status: StatusCode, body: Value) -> (String, Captured) {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new()
        .route(
            "/predict",
            post(
                move |State(captured): State<Captured>, Json(request): Json<Value>| {
                    let body = body.clone();
                    async move {
                        captured.lock().unwrap().push(request);
                        (status, Json(body))
                    }
                },
            ),
        )
        .with_state(captured.clone());
    (format!("{}/predict", spawn(router).await), captured)
}

fn write_csv(dir: &Path) -> PathBuf {
    let path = dir.join("houses.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    // Columns deliberately out of training order
    let mut header: Vec<&str> = FEATURE_COLUMNS.iter().rev().copied().collect();
    header.push("price");
    writeln!(file, "{}", header.join(",")).unwrap();
    for r in 0..10 {
        let values: Vec<String> = (0..11).map(|c| (r * 100 + c).to_string()).collect();
        writeln!(file, "{}", values.join(",")).unwrap();
    }
    path
}

fn housing_config(csv: PathBuf, url: String) -> HousingClientConfig {
    HousingClientConfig {
        data: DataConfig::default().with_csv_path(csv),
        ..HousingClientConfig::default()
    }
    .with_url(url)
}

// ============================================================================
// Housing Client Tests
// ============================================================================

#[tokio::test]
async fn test_housing_client_sends_row_seven_in_training_order() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(dir.path());
    let reply = json!({"data": {"names": ["price"], "ndarray": [512000.0]}, "meta": {}});
    let (url, captured) = mock_endpoint(StatusCode::OK, reply).await;

    let prediction = send_row(&housing_config(csv, url)).await.unwrap();
    assert_eq!(prediction.status, 200);
    assert!(prediction.body.contains("512000"));

    let requests = captured.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let sent = requests[0]["data"]["ndarray"].as_array().unwrap();
    assert_eq!(sent.len(), 1);
    // Row 7; file columns are reversed, so bedrooms is file column 9
    assert_eq!(sent[0][0], json!(709.0));
    assert_eq!(sent[0][9], json!(700.0));
}

#[tokio::test]
async fn test_housing_client_fails_on_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(dir.path());
    let (url, _) = mock_endpoint(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"error": true, "message": "boom"}),
    )
    .await;

    let err = send_row(&housing_config(csv, url)).await.unwrap_err();
    match err {
        HousingError::PredictionFailed { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("boom"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_predict_command_exit_status() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(dir.path());

    let reply = json!({"data": {"names": ["price"], "ndarray": [512000.0]}, "meta": {}});
    let (url, _) = mock_endpoint(StatusCode::OK, reply).await;
    assert!(cmd_predict(Some(csv.clone()), Some(url), 7).await.is_ok());

    let (url, captured) = mock_endpoint(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"error": true, "message": "boom"}),
    )
    .await;
    let err = cmd_predict(Some(csv), Some(url), 7).await.unwrap_err();
    assert!(err.to_string().contains("500"), "error: {}", err);
    // The row was still sent before the command failed
    assert_eq!(captured.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_housing_client_unreachable_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(dir.path());
    // Bind then drop to get a port nobody listens on
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = housing_config(csv, format!("http://127.0.0.1:{}/predict", port));
    assert!(matches!(send_row(&config).await, Err(HousingError::Http(_))));
}

// ============================================================================
// Image Client Tests
// ============================================================================

fn image_config(dir: &Path, url: String) -> ImageClientConfig {
    let image = dir.join("input.png");
    std::fs::write(&image, b"not really a png").unwrap();
    ImageClientConfig::new(url, image).with_output(dir.join("result.jpg"))
}

#[tokio::test]
async fn test_image_client_saves_tensor() {
    let dir = tempfile::tempdir().unwrap();
    let values: Vec<f64> = (0..4 * 4 * 3).map(|v| (v * 5) as f64).collect();
    let reply = json!({"data": {"tensor": {"shape": [1, 4, 4, 3], "values": values}}});
    let (url, captured) = mock_endpoint(StatusCode::OK, reply).await;

    let config = image_config(dir.path(), url);
    let outcome = classify_image(&config).await.unwrap();
    assert_eq!(
        outcome,
        ClassifyOutcome::Saved {
            path: dir.path().join("result.jpg"),
            shape: vec![1, 4, 4, 3],
        }
    );
    assert!(outcome.is_success());

    let decoded = image::open(dir.path().join("result.jpg")).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (4, 4));

    let requests = captured.lock().unwrap();
    assert_eq!(requests[0]["binData"], "bm90IHJlYWxseSBhIHBuZw==");
}

#[tokio::test]
async fn test_image_client_service_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let (url, _) = mock_endpoint(StatusCode::SERVICE_UNAVAILABLE, json!({})).await;
    let outcome = classify_image(&image_config(dir.path(), url)).await.unwrap();
    assert_eq!(outcome, ClassifyOutcome::ServiceUnavailable);
    assert!(!outcome.is_success());
    assert!(!dir.path().join("result.jpg").exists());
}

#[tokio::test]
async fn test_image_client_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let (url, _) = mock_endpoint(StatusCode::INTERNAL_SERVER_ERROR, json!({"reason": "oom"})).await;
    let outcome = classify_image(&image_config(dir.path(), url)).await.unwrap();
    assert!(matches!(outcome, ClassifyOutcome::InternalError { ref body } if body.contains("oom")));
}

#[tokio::test]
async fn test_image_client_unexpected_status() {
    let dir = tempfile::tempdir().unwrap();
    let (url, _) = mock_endpoint(StatusCode::IM_A_TEAPOT, json!({})).await;
    let outcome = classify_image(&image_config(dir.path(), url)).await.unwrap();
    assert!(matches!(outcome, ClassifyOutcome::UnexpectedStatus { status: 418, .. }));
}

#[tokio::test]
async fn test_image_client_rejects_bad_tensor() {
    let dir = tempfile::tempdir().unwrap();
    let reply = json!({"data": {"tensor": {"shape": [2, 2, 3], "values": [1.0, 2.0]}}});
    let (url, _) = mock_endpoint(StatusCode::OK, reply).await;
    let err = classify_image(&image_config(dir.path(), url)).await.unwrap_err();
    assert!(matches!(err, HousingError::Tensor(_)));
}
