//! Prediction log: append-only JSON lines consumed by the drift report

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::data::Transaction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionLogEntry {
    pub timestamp: DateTime<Utc>,
    pub input_data: Transaction,
    pub prediction: u8,
    pub confidence: Option<f64>,
}

impl PredictionLogEntry {
    pub fn new(input_data: Transaction, prediction: u8, confidence: Option<f64>) -> Self {
        Self {
            timestamp: Utc::now(),
            input_data,
            prediction,
            confidence,
        }
    }
}

pub struct PredictionLogger {
    file: Mutex<Option<File>>,
    path: PathBuf,
}

impl PredictionLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Mutex::new(None),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry as a single JSON line; the file is opened lazily
    pub fn append(&self, entry: &PredictionLogEntry) -> io::Result<()> {
        let json = serde_json::to_string(entry)?;
        tracing::info!(target: "fraud_sentinel::predictions", "{}", json);

        let mut file_guard = self.file.lock();
        if file_guard.is_none() {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            *file_guard = Some(OpenOptions::new().create(true).append(true).open(&self.path)?);
        }

        if let Some(file) = file_guard.as_mut() {
            writeln!(file, "{}", json)?;
            file.flush()?;
        }
        Ok(())
    }

    /// Append, downgrading failures to a warning
    pub fn record(&self, entry: &PredictionLogEntry) {
        if let Err(e) = self.append(entry) {
            tracing::warn!("Failed to write prediction log {}: {}", self.path.display(), e);
        }
    }
}
