//! Column-named numeric table loaded from CSV

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::{FraudError, FraudResult};
use super::record::LABEL_COLUMN;

/// Numeric table; `None` marks an empty cell
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Option<f64>>>,
}

/// Inspection summary printed by `fraud-inspect`
#[derive(Debug, Clone, Serialize)]
pub struct DataSummary {
    pub n_rows: usize,
    pub n_columns: usize,
    pub columns: Vec<String>,
    pub missing: Vec<(String, usize)>,
    pub class_distribution: Option<ClassDistribution>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ClassDistribution {
    pub legitimate: usize,
    pub fraudulent: usize,
}

impl ClassDistribution {
    pub fn total(&self) -> usize {
        self.legitimate + self.fraudulent
    }

    pub fn fraud_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.fraudulent as f64 / self.total() as f64
        }
    }
}

/// Read a CSV file with a header row into a [`Frame`]
pub fn load_frame(path: &Path) -> FraudResult<Frame> {
    if !path.exists() {
        return Err(FraudError::DataNotFound(path.to_path_buf()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        let mut row = Vec::with_capacity(columns.len());
        for (col_idx, field) in record.iter().enumerate() {
            let field = field.trim();
            if field.is_empty() {
                row.push(None);
                continue;
            }
            let value = field.parse::<f64>().map_err(|_| FraudError::InvalidValue {
                row: row_idx,
                column: columns.get(col_idx).cloned().unwrap_or_default(),
                value: field.to_string(),
            })?;
            row.push(Some(value));
        }
        rows.push(row);
    }

    tracing::info!("Loaded {} rows x {} columns from {}", rows.len(), columns.len(), path.display());
    Ok(Frame { columns, rows })
}

impl Frame {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<f64>>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<f64>>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column
    pub fn column(&self, name: &str) -> FraudResult<Vec<Option<f64>>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| FraudError::MissingColumn(name.to_string()))?;
        Ok(self.rows.iter().map(|r| r[idx]).collect())
    }

    /// Remove a column; returns false when it was not present
    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        true
    }

    /// Drop every row with at least one missing cell; returns how many were dropped
    pub fn drop_incomplete_rows(&mut self) -> usize {
        let before = self.rows.len();
        self.rows.retain(|r| r.iter().all(Option::is_some));
        before - self.rows.len()
    }

    pub fn head(&self, n: usize) -> &[Vec<Option<f64>>] {
        &self.rows[..n.min(self.rows.len())]
    }

    pub fn missing_counts(&self) -> Vec<(String, usize)> {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let missing = self.rows.iter().filter(|r| r[idx].is_none()).count();
                (name.clone(), missing)
            })
            .collect()
    }

    /// Class balance, when a `Class` column exists
    pub fn class_distribution(&self) -> Option<ClassDistribution> {
        let idx = self.column_index(LABEL_COLUMN)?;
        let mut dist = ClassDistribution { legitimate: 0, fraudulent: 0 };
        for row in &self.rows {
            match row[idx] {
                Some(v) if v == 0.0 => dist.legitimate += 1,
                Some(v) if v == 1.0 => dist.fraudulent += 1,
                _ => {}
            }
        }
        Some(dist)
    }

    pub fn summary(&self) -> DataSummary {
        DataSummary {
            n_rows: self.n_rows(),
            n_columns: self.n_columns(),
            columns: self.columns.clone(),
            missing: self.missing_counts(),
            class_distribution: self.class_distribution(),
        }
    }
}

impl fmt::Display for DataSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Data Info ---")?;
        writeln!(f, "Rows: {}", self.n_rows)?;
        writeln!(f, "Columns: {} ({})", self.n_columns, self.columns.join(", "))?;

        writeln!(f, "\n--- Missing Values ---")?;
        for (name, count) in &self.missing {
            writeln!(f, "{:<10} {}", name, count)?;
        }

        writeln!(f, "\n--- Target Class Distribution ---")?;
        match &self.class_distribution {
            Some(dist) => {
                let fraud_pct = dist.fraud_rate() * 100.0;
                let legit_pct = if dist.total() == 0 { 0.0 } else { 100.0 - fraud_pct };
                writeln!(f, "Legitimate transactions: {} ({:.2}%)", dist.legitimate, legit_pct)?;
                write!(f, "Fraudulent transactions: {} ({:.2}%)", dist.fraudulent, fraud_pct)
            }
            None => write!(f, "No '{}' column present", LABEL_COLUMN),
        }
    }
}
