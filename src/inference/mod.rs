//! Model loading and single-transaction inference

pub mod artifact;
pub mod predictor;

pub use artifact::*;
pub use predictor::*;

pub const MODEL_FILE: &str = "model.json";
pub const SCALER_FILE: &str = "scaler.json";
