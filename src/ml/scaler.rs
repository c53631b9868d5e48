//! Standard scaler for a single numeric feature

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{FraudError, FraudResult};

/// Standardizes one feature with the mean and population variance seen at fit time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Column the scaler was fitted on
    pub feature: String,
    pub mean: f64,
    pub var: f64,
    /// `sqrt(var)`, or 1.0 for a constant column
    pub scale: f64,
    pub n_samples_seen: usize,
}

impl StandardScaler {
    pub fn fit(feature: &str, values: &[f64]) -> FraudResult<Self> {
        if values.is_empty() {
            return Err(FraudError::InsufficientData(format!(
                "cannot fit scaler on empty column '{}'",
                feature
            )));
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        let scale = if std > f64::EPSILON * mean.abs().max(1.0) { std } else { 1.0 };

        Ok(Self {
            feature: feature.to_string(),
            mean,
            var,
            scale,
            n_samples_seen: values.len(),
        })
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }

    pub fn inverse_transform(&self, value: f64) -> f64 {
        value * self.scale + self.mean
    }

    /// SHA-256 over the serialized parameters; pairs a model with its scaler
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        hex::encode(hasher.finalize())
    }
}
