//! Serving-side scoring of single transactions

use std::path::Path;

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::data::{Transaction, AMOUNT_INDEX};
use crate::error::FraudResult;
use crate::ml::{RandomForest, StandardScaler};
use super::artifact::{load_model, load_scaler, ModelArtifact};
use super::{MODEL_FILE, SCALER_FILE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionLabel {
    Legitimate,
    Fraudulent,
}

impl PredictionLabel {
    pub fn from_class(class: u8) -> Self {
        if class == 1 {
            PredictionLabel::Fraudulent
        } else {
            PredictionLabel::Legitimate
        }
    }

    pub fn class(&self) -> u8 {
        match self {
            PredictionLabel::Legitimate => 0,
            PredictionLabel::Fraudulent => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionLabel::Legitimate => "Legitimate",
            PredictionLabel::Fraudulent => "Fraudulent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub class: u8,
    pub label: PredictionLabel,
    /// Share of the forest voting fraudulent
    pub confidence: f64,
}

/// Model and scaler loaded once at startup; read-only afterwards
#[derive(Debug, Clone)]
pub struct Predictor {
    model: ModelArtifact,
    scaler: StandardScaler,
}

impl Predictor {
    /// Pair a model with its scaler, refusing mismatched artifacts
    pub fn new(model: ModelArtifact, scaler: StandardScaler) -> FraudResult<Self> {
        model.validate(&scaler)?;
        Ok(Self { model, scaler })
    }

    /// Load `model.json` and `scaler.json` from `model_dir`
    pub fn load(model_dir: &Path) -> FraudResult<Self> {
        let model = load_model(&model_dir.join(MODEL_FILE))?;
        let scaler = load_scaler(&model_dir.join(SCALER_FILE))?;
        let predictor = Self::new(model, scaler)?;

        tracing::info!(
            "Loaded model ({} trees, trained {}) and scaler from {}",
            predictor.model.forest.n_trees(),
            predictor.model.created_at.to_rfc3339(),
            model_dir.display()
        );
        Ok(predictor)
    }

    pub fn predict(&self, tx: &Transaction) -> Prediction {
        let mut features = tx.to_features();
        features[AMOUNT_INDEX] = self.scaler.transform(features[AMOUNT_INDEX]);

        let row = ArrayView1::from(&features[..]);
        let confidence = self.model.forest.predict_proba_row(row);
        let class = RandomForest::decide(confidence);

        Prediction {
            class,
            label: PredictionLabel::from_class(class),
            confidence,
        }
    }

    pub fn model(&self) -> &ModelArtifact {
        &self.model
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }
}
