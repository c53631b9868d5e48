//! Configuration module

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FraudError, FraudResult};
use crate::ml::{ForestParams, MaxFeatures};

/// Application configuration shared by the server and the offline binaries
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Directory holding `model.json` and `scaler.json`
    pub model_dir: PathBuf,

    /// Raw transaction CSV
    pub data_path: PathBuf,

    /// Where training writes its metrics
    pub metrics_path: PathBuf,

    /// Hyperparameter file for training
    pub train_config_path: PathBuf,

    /// Append-only prediction log read by the drift report
    pub prediction_log_path: PathBuf,

    /// Whether the server appends prediction log entries
    pub log_predictions: bool,

    /// Experiment tracker location (MLflow URL or local directory)
    pub tracking_uri: Option<String>,

    /// Experiment name used by the tracker
    pub experiment_name: String,

    /// Prediction endpoint targeted by the drift simulation
    pub api_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),

            model_dir: env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./models")),

            data_path: env::var("DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/raw/creditcard.csv")),

            metrics_path: env::var("METRICS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("metrics.json")),

            train_config_path: env::var("TRAIN_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("config/train_config.json")),

            prediction_log_path: env::var("PREDICTION_LOG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("logs.txt")),

            log_predictions: env::var("LOG_PREDICTIONS")
                .ok()
                .map(|v| parse_flag(&v))
                .unwrap_or(true),

            tracking_uri: env::var("TRACKING_URI")
                .ok()
                .filter(|v| !v.trim().is_empty()),

            experiment_name: env::var("EXPERIMENT_NAME")
                .unwrap_or_else(|_| "Fraud Detection RandomForest Training".to_string()),

            api_url: env::var("API_URL")
                .unwrap_or_else(|_| "http://localhost:8000/predict".to_string()),
        }
    }

    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(crate::inference::MODEL_FILE)
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.model_dir.join(crate::inference::SCALER_FILE)
    }

    pub fn confusion_matrix_path(&self) -> PathBuf {
        self.model_dir.join("confusion_matrix.png")
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(value.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off")
}

/// Training hyperparameters, read from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    #[serde(default)]
    pub model: ModelConfig,

    /// Fraction of rows held out for evaluation
    #[serde(default = "default_test_size")]
    pub test_size: f64,

    /// Folds for cross-validated F1
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    #[serde(default)]
    pub max_features: MaxFeatures,
    #[serde(default = "default_random_state")]
    pub random_state: u64,
}

fn default_test_size() -> f64 {
    0.2
}

fn default_cv_folds() -> usize {
    5
}

fn default_n_estimators() -> usize {
    100
}

fn default_min_samples_split() -> usize {
    2
}

fn default_min_samples_leaf() -> usize {
    1
}

fn default_random_state() -> u64 {
    42
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            max_depth: None,
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            max_features: MaxFeatures::default(),
            random_state: default_random_state(),
        }
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            test_size: default_test_size(),
            cv_folds: default_cv_folds(),
        }
    }
}

impl TrainConfig {
    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> FraudResult<Self> {
        if !path.exists() {
            tracing::warn!("Train config not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let data = fs::read(path)?;
        let config: TrainConfig = serde_json::from_slice(&data)?;
        config.validate()?;
        tracing::info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> FraudResult<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(FraudError::Config(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.cv_folds < 2 {
            return Err(FraudError::Config("cv_folds must be at least 2".to_string()));
        }
        if self.model.n_estimators == 0 {
            return Err(FraudError::Config("n_estimators must be positive".to_string()));
        }
        if self.model.min_samples_split < 2 {
            return Err(FraudError::Config("min_samples_split must be at least 2".to_string()));
        }
        if self.model.min_samples_leaf == 0 {
            return Err(FraudError::Config("min_samples_leaf must be positive".to_string()));
        }
        Ok(())
    }

    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_estimators: self.model.n_estimators,
            max_depth: self.model.max_depth,
            min_samples_split: self.model.min_samples_split,
            min_samples_leaf: self.model.min_samples_leaf,
            max_features: self.model.max_features,
            random_state: self.model.random_state,
        }
    }
}
