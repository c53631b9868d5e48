//! Fraud Sentinel prediction API
//!
//! Loads the trained model and scaler once, then serves `POST /predict` and
//! `GET /health`. A missing or mismatched model does not stop the server; it
//! answers every prediction with an error until restarted with valid files.

use std::net::SocketAddr;

use fraud_sentinel::{create_router, logging, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    logging::init();
    let config = Config::from_env();

    tracing::info!("Fraud Sentinel API starting...");
    tracing::info!("Model directory: {}", config.model_dir.display());

    let state = AppState::from_config(config.clone());
    if state.predictor.is_some() {
        tracing::info!("✅ Model and scaler loaded successfully.");
    }

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
