//! Fraud Sentinel
//!
//! Credit-card fraud detection: a random-forest classifier trained offline on
//! the public transaction dataset, served over HTTP, with a prediction log
//! that feeds an offline drift report.
//!
//! ```text
//!  creditcard.csv ──► fraud-train ──► model.json + scaler.json + metrics.json
//!                                              │
//!                                              ▼
//!   POST /predict ──────────────────────► fraud-api ──► logs.txt ──► fraud-drift-report
//! ```

pub mod config;
pub mod data;
pub mod drift;
pub mod error;
pub mod handlers;
pub mod inference;
pub mod logging;
pub mod ml;
pub mod monitor;
pub mod preprocessing;
pub mod simulation;
pub mod tracking;
pub mod training;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use config::Config;
pub use error::{AppError, AppResult, FraudError, FraudResult};

use inference::Predictor;
use monitor::PredictionLogger;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// `None` when the model or scaler failed to load; the server then
    /// answers every prediction with an error
    pub predictor: Option<Arc<Predictor>>,
    pub logger: Option<Arc<PredictionLogger>>,
}

impl AppState {
    /// Load the predictor from `config.model_dir`, degrading instead of failing
    pub fn from_config(config: Config) -> Self {
        let predictor = match Predictor::load(&config.model_dir) {
            Ok(p) => Some(Arc::new(p)),
            Err(e) => {
                tracing::error!("❌ Error loading model or scaler: {}", e);
                None
            }
        };

        let logger = config
            .log_predictions
            .then(|| Arc::new(PredictionLogger::new(config.prediction_log_path.clone())));

        Self {
            config,
            predictor,
            logger,
        }
    }
}

/// Create the router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/predict", post(handlers::predict::predict))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
