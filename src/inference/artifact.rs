//! Persisted model and scaler artifacts

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::data::FEATURE_NAMES;
use crate::error::{FraudError, FraudResult};
use crate::ml::{RandomForest, StandardScaler};

/// Bumped whenever the on-disk model layout changes
pub const ARTIFACT_VERSION: u32 = 2;

/// Fitted forest plus everything needed to serve it consistently
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    /// Feature order the forest was trained on
    pub feature_names: Vec<String>,
    /// [`StandardScaler::fingerprint`] of the scaler used during training
    pub scaler_fingerprint: String,
    pub forest: RandomForest,
}

impl ModelArtifact {
    pub fn new(forest: RandomForest, scaler: &StandardScaler) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            created_at: Utc::now(),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            scaler_fingerprint: scaler.fingerprint(),
            forest,
        }
    }

    /// Check the artifact against the serving layout and the scaler it will be paired with
    pub fn validate(&self, scaler: &StandardScaler) -> FraudResult<()> {
        if self.version != ARTIFACT_VERSION {
            return Err(FraudError::UnsupportedVersion(self.version));
        }
        if self.feature_names.iter().map(String::as_str).ne(FEATURE_NAMES.iter().copied())
            || self.forest.n_features() != FEATURE_NAMES.len()
        {
            return Err(FraudError::FeatureMismatch {
                model: self.feature_names.clone(),
            });
        }
        let actual = scaler.fingerprint();
        if actual != self.scaler_fingerprint {
            return Err(FraudError::ScalerMismatch {
                expected: self.scaler_fingerprint.clone(),
                actual,
            });
        }
        Ok(())
    }
}

/// Write `value` as pretty JSON, creating parent directories
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> FraudResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_vec_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> FraudResult<T> {
    if !path.exists() {
        return Err(FraudError::ArtifactNotFound(path.to_path_buf()));
    }

    let data = fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}

pub fn save_model(model: &ModelArtifact, path: &Path) -> FraudResult<()> {
    // Trees are large; skip pretty-printing
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serde_json::to_vec(model)?)?;
    Ok(())
}

pub fn load_model(path: &Path) -> FraudResult<ModelArtifact> {
    load_json(path)
}

pub fn save_scaler(scaler: &StandardScaler, path: &Path) -> FraudResult<()> {
    save_json(scaler, path)
}

pub fn load_scaler(path: &Path) -> FraudResult<StandardScaler> {
    load_json(path)
}
