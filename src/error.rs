//! Error handling

use std::path::PathBuf;

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type FraudResult<T> = Result<T, FraudError>;

/// Errors raised by the data, training, inference and drift layers
#[derive(Debug, Error)]
pub enum FraudError {
    #[error("data file not found at {}", .0.display())]
    DataNotFound(PathBuf),

    #[error("prediction log not found at {}", .0.display())]
    LogNotFound(PathBuf),

    #[error("artifact not found at {}", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("column '{0}' is missing from the dataset")]
    MissingColumn(String),

    #[error("row {row}: label must be 0 or 1, got {value}")]
    InvalidLabel { row: usize, value: f64 },

    #[error("row {row}, column '{column}': cannot parse '{value}' as a number")]
    InvalidValue { row: usize, column: String, value: String },

    #[error("not enough data: {0}")]
    InsufficientData(String),

    #[error("model was trained with scaler {expected}, but scaler on disk is {actual}")]
    ScalerMismatch { expected: String, actual: String },

    #[error("model features {model:?} do not match the serving layout")]
    FeatureMismatch { model: Vec<String> },

    #[error("unsupported artifact format version {0}")]
    UnsupportedVersion(u32),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("experiment tracker error: {0}")]
    Tracking(String),

    #[error("plot rendering failed: {0}")]
    Plot(String),

    #[error("model fitting failed: {0}")]
    Model(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<png::EncodingError> for FraudError {
    fn from(err: png::EncodingError) -> Self {
        FraudError::Plot(err.to_string())
    }
}

impl From<linfa::Error> for FraudError {
    fn from(err: linfa::Error) -> Self {
        FraudError::Model(err.to_string())
    }
}

impl From<ndarray::ShapeError> for FraudError {
    fn from(err: ndarray::ShapeError) -> Self {
        FraudError::Model(err.to_string())
    }
}

impl From<ureq::Error> for FraudError {
    fn from(err: ureq::Error) -> Self {
        FraudError::Tracking(err.to_string())
    }
}

/// Errors returned by HTTP handlers
#[derive(Debug)]
pub enum AppError {
    /// Model or scaler failed to load at startup
    ModelUnavailable,

    /// Request body could not be read as a transaction
    ValidationError(String),

    /// Generic errors
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

pub const MODEL_UNAVAILABLE_MESSAGE: &str = "Model or scaler not loaded. Please check your files.";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::ModelUnavailable => (StatusCode::SERVICE_UNAVAILABLE, MODEL_UNAVAILABLE_MESSAGE),
            AppError::ValidationError(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.as_str()),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<FraudError> for AppError {
    fn from(err: FraudError) -> Self {
        AppError::InternalError(err.to_string())
    }
}
