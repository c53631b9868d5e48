use std::fs;
use std::path::Path;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::error::MODEL_UNAVAILABLE_MESSAGE;
use crate::test_support::{fraud_transaction, sample_transaction, test_config, write_artifacts};
use crate::{create_router, AppState};

fn app_with_model(dir: &Path) -> Router {
    let config = test_config(dir);
    write_artifacts(&config.model_dir);
    let state = AppState::from_config(config);
    assert!(state.predictor.is_some());
    create_router(state)
}

fn app_without_model(dir: &Path) -> Router {
    let state = AppState::from_config(test_config(dir));
    assert!(state.predictor.is_none());
    create_router(state)
}

fn predict_request(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn test_sample_transaction_is_legitimate() {
    let dir = tempfile::tempdir().unwrap();
    let body = serde_json::to_vec(&sample_transaction()).unwrap();

    let (status, body) = send(app_with_model(dir.path()), predict_request(body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, br#"{"prediction":"Legitimate","class":0}"#);
}

#[tokio::test]
async fn test_outlier_transaction_is_fraudulent() {
    let dir = tempfile::tempdir().unwrap();
    let body = serde_json::to_vec(&fraud_transaction()).unwrap();

    let (status, body) = send(app_with_model(dir.path()), predict_request(body)).await;

    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value, json!({ "prediction": "Fraudulent", "class": 1 }));
}

#[tokio::test]
async fn test_prediction_is_logged() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with_model(dir.path());
    let body = serde_json::to_vec(&sample_transaction()).unwrap();

    let (status, _) = send(app, predict_request(body)).await;
    assert_eq!(status, StatusCode::OK);

    let log = fs::read_to_string(test_config(dir.path()).prediction_log_path).unwrap();
    let entries: Vec<Value> = log.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["prediction"], 0);
    assert_eq!(entries[0]["input_data"]["Amount"], 149.62);
    assert!(entries[0]["timestamp"].is_string());
}

#[tokio::test]
async fn test_logging_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.log_predictions = false;
    write_artifacts(&config.model_dir);
    let log_path = config.prediction_log_path.clone();
    let app = create_router(AppState::from_config(config));

    let body = serde_json::to_vec(&sample_transaction()).unwrap();
    let (status, _) = send(app, predict_request(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!log_path.exists());
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let dir = tempfile::tempdir().unwrap();

    let (status, body) = send(app_with_model(dir.path()), predict_request("{not json")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert!(value["error"].is_string());

    let mut partial = serde_json::to_value(sample_transaction()).unwrap();
    partial.as_object_mut().unwrap().remove("V10");
    let (status, _) = send(
        app_with_model(dir.path()),
        predict_request(serde_json::to_vec(&partial).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_missing_model_returns_error_for_every_request() {
    let dir = tempfile::tempdir().unwrap();
    let expected = json!({ "error": MODEL_UNAVAILABLE_MESSAGE });

    for body in [serde_json::to_vec(&sample_transaction()).unwrap(), b"garbage".to_vec()] {
        let (status, body) = send(app_without_model(dir.path()), predict_request(body)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, expected);
    }
}

#[tokio::test]
async fn test_mismatched_scaler_leaves_service_degraded() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    write_artifacts(&config.model_dir);
    let foreign = crate::ml::StandardScaler::fit("Amount", &[1.0, 2.0, 3.0]).unwrap();
    crate::inference::save_scaler(&foreign, &config.scaler_path()).unwrap();

    let state = AppState::from_config(config);
    assert!(state.predictor.is_none());

    let body = serde_json::to_vec(&sample_transaction()).unwrap();
    let (status, _) = send(create_router(state), predict_request(body)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_health_reports_model_state() {
    let dir = tempfile::tempdir().unwrap();
    let request = || Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = send(app_with_model(dir.path()), request()).await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["status"], "healthy");
    assert_eq!(value["model_loaded"], true);
    assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));

    let empty = tempfile::tempdir().unwrap();
    let (_, body) = send(app_without_model(empty.path()), request()).await;
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["model_loaded"], false);
    assert_eq!(value["status"], "degraded");
}
