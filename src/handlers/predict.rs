//! Prediction handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;

use crate::data::Transaction;
use crate::monitor::PredictionLogEntry;
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: &'static str,
    pub class: u8,
}

/// Score one transaction
pub async fn predict(
    State(state): State<AppState>,
    body: Result<Json<Transaction>, JsonRejection>,
) -> AppResult<Json<PredictResponse>> {
    // Without a model every request gets the same answer, whatever the body
    let predictor = state.predictor.as_ref().ok_or(AppError::ModelUnavailable)?;
    let Json(tx) = body.map_err(|e| AppError::ValidationError(e.body_text()))?;

    let prediction = predictor.predict(&tx);

    if let Some(logger) = &state.logger {
        logger.record(&PredictionLogEntry::new(tx, prediction.class, Some(prediction.confidence)));
    }

    tracing::debug!(
        "Prediction: {} (class {}, p_fraud={:.3})",
        prediction.label.as_str(),
        prediction.class,
        prediction.confidence
    );

    Ok(Json(PredictResponse {
        prediction: prediction.label.as_str(),
        class: prediction.class,
    }))
}
