//! Offline drift report over the prediction log
//!
//! Compares the mean of the first [`BASELINE_WINDOW`] logged requests with the
//! mean of everything after them, for a fixed set of features and thresholds.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::error::{FraudError, FraudResult};

/// Requests treated as the reference window
pub const BASELINE_WINDOW: usize = 10;

/// Features checked for drift and the absolute mean shift that counts as drift
pub const DRIFT_CHECKS: [(&str, f64); 2] = [("Amount", 100.0), ("V10", 10.0)];

/// Columns that are not input features
const NON_FEATURE_COLUMNS: [&str; 2] = ["timestamp", "confidence"];

/// Extract the JSON object embedded in each log line.
///
/// Lines without an object are ignored; objects that do not parse and lines
/// that are not UTF-8 are skipped with a warning. Single-quoted dict reprs using `None` are also accepted.
pub fn parse_logs(path: &Path) -> FraudResult<Vec<Value>> {
    if !path.exists() {
        return Err(FraudError::LogNotFound(path.to_path_buf()));
    }

    let object_re = compile(r"(\{.*\})")?;
    let none_re = compile(r"\bNone\b")?;
    let mut reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Skipping line {}: not valid UTF-8 ({})", line_no, e);
                continue;
            }
        };
        let Some(captures) = object_re.captures(&line) else {
            continue;
        };
        let raw = &captures[1];

        match parse_object(raw, &none_re) {
            Ok(value) if value.is_object() => entries.push(value),
            Ok(_) => tracing::warn!("Skipping non-object entry in line: {}", line.trim()),
            Err(e) => tracing::warn!("Skipping malformed JSON entry: {} in line: {}", e, line.trim()),
        }
    }

    Ok(entries)
}

fn compile(pattern: &str) -> FraudResult<Regex> {
    Regex::new(pattern).map_err(|e| FraudError::Config(format!("invalid pattern {}: {}", pattern, e)))
}

fn parse_object(raw: &str, none_re: &Regex) -> Result<Value, serde_json::Error> {
    serde_json::from_str(raw).or_else(|first_err| {
        let relaxed = none_re.replace_all(&raw.replace('\'', "\""), "null").into_owned();
        serde_json::from_str(&relaxed).map_err(|_| first_err)
    })
}

/// Numeric view of the log: nested objects (e.g. `input_data`) are flattened
/// so their fields become columns
#[derive(Debug, Clone, Default)]
pub struct LogTable {
    columns: Vec<String>,
    rows: Vec<HashMap<String, f64>>,
}

impl LogTable {
    pub fn from_entries(entries: &[Value]) -> Self {
        let mut table = LogTable::default();
        for entry in entries {
            let mut row = HashMap::new();
            if let Value::Object(map) = entry {
                for (key, value) in map {
                    match value {
                        Value::Object(nested) => {
                            for (inner_key, inner) in nested {
                                table.insert(&mut row, inner_key, inner);
                            }
                        }
                        other => table.insert(&mut row, key, other),
                    }
                }
            }
            table.rows.push(row);
        }
        table
    }

    fn insert(&mut self, row: &mut HashMap<String, f64>, key: &str, value: &Value) {
        if NON_FEATURE_COLUMNS.contains(&key) {
            return;
        }
        let Some(number) = value.as_f64() else {
            return;
        };
        if !self.columns.iter().any(|c| c == key) {
            self.columns.push(key.to_string());
        }
        row.insert(key.to_string(), number);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values of `column` in rows `range`, skipping rows that lack it
    fn values(&self, column: &str, range: std::ops::Range<usize>) -> Vec<f64> {
        let end = range.end.min(self.rows.len());
        let start = range.start.min(end);
        self.rows[start..end]
            .iter()
            .filter_map(|r| r.get(column).copied())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1)
    pub std: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureDrift {
    pub feature: String,
    pub threshold: f64,
    pub initial_mean: Option<f64>,
    pub current_mean: Option<f64>,
    pub drifted: bool,
}

impl FeatureDrift {
    pub fn difference(&self) -> Option<f64> {
        Some((self.current_mean? - self.initial_mean?).abs())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DriftReport {
    pub total_entries: usize,
    pub features: Vec<FeatureDrift>,
    pub summary: Vec<ColumnSummary>,
}

impl DriftReport {
    pub fn feature(&self, name: &str) -> Option<&FeatureDrift> {
        self.features.iter().find(|f| f.feature == name)
    }

    pub fn any_drift(&self) -> bool {
        self.features.iter().any(|f| f.drifted)
    }
}

pub fn analyze(table: &LogTable) -> DriftReport {
    let all = 0..table.len();

    let summary = table
        .columns()
        .iter()
        .map(|name| {
            let values = table.values(name, all.clone());
            ColumnSummary {
                name: name.clone(),
                count: values.len(),
                mean: mean(&values),
                std: sample_std(&values),
            }
        })
        .collect();

    let features = DRIFT_CHECKS
        .iter()
        .map(|&(feature, threshold)| {
            let initial_mean = mean(&table.values(feature, 0..BASELINE_WINDOW));
            let current_mean = mean(&table.values(feature, BASELINE_WINDOW..table.len()));
            let mut drift = FeatureDrift {
                feature: feature.to_string(),
                threshold,
                initial_mean,
                current_mean,
                drifted: false,
            };
            drift.drifted = drift.difference().map_or(false, |d| d > threshold);
            drift
        })
        .collect();

    DriftReport {
        total_entries: table.len(),
        features,
        summary,
    }
}

/// Flatten parsed log entries into numeric columns
pub fn flatten(entries: &[Value]) -> LogTable {
    LogTable::from_entries(entries)
}

/// Parse and analyze a prediction log; `None` when it holds no entries
pub fn report_from_file(path: &Path) -> FraudResult<Option<DriftReport>> {
    let entries = parse_logs(path)?;
    if entries.is_empty() {
        return Ok(None);
    }
    Ok(Some(analyze(&flatten(&entries))))
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v))
}

impl fmt::Display for DriftReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Found {} prediction logs.", self.total_entries)?;
        writeln!(f, "\nData Drift Report:")?;

        for drift in &self.features {
            writeln!(f, "{}", "-".repeat(25))?;
            writeln!(f, "Initial Mean {}: {}", drift.feature, fmt_opt(drift.initial_mean))?;
            writeln!(f, "Current Mean {}: {}", drift.feature, fmt_opt(drift.current_mean))?;
        }

        for drift in &self.features {
            if drift.difference().is_none() {
                writeln!(
                    f,
                    "\nInsufficient data to assess drift in '{}' (need more than {} entries).",
                    drift.feature, BASELINE_WINDOW
                )?;
            } else if drift.drifted {
                writeln!(f, "\n⚠️  Alert: Significant drift detected in '{}' feature!", drift.feature)?;
            } else {
                writeln!(f, "\n✅  No significant drift detected in '{}' feature.", drift.feature)?;
            }
        }

        writeln!(f, "\nFull Report:")?;
        writeln!(f, "{:<12} {:>12} {:>20}", "", "Mean", "Standard Deviation")?;
        for col in &self.summary {
            writeln!(f, "{:<12} {:>12} {:>20}", col.name, fmt_opt(col.mean), fmt_opt(col.std))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::data::Transaction;
    use crate::monitor::{PredictionLogEntry, PredictionLogger};
    use crate::test_support::sample_transaction;

    fn with_amount_and_v10(amount: f64, v10: f64) -> Transaction {
        let mut tx = sample_transaction();
        tx.amount = amount;
        tx.v10 = v10;
        tx
    }

    /// Ten baseline requests at `before`, twenty later ones at `after`
    fn write_log(path: &Path, before: f64, after: f64) {
        let logger = PredictionLogger::new(path);
        for i in 0..30 {
            let amount = if i < BASELINE_WINDOW { before } else { after };
            let entry = PredictionLogEntry::new(with_amount_and_v10(amount, 0.1), 0, None);
            logger.append(&entry).unwrap();
        }
    }

    #[test]
    fn test_large_amount_shift_is_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs.txt");
        write_log(&path, 50.0, 300.0);

        let report = report_from_file(&path).unwrap().unwrap();
        let amount = report.feature("Amount").unwrap();
        assert_eq!(report.total_entries, 30);
        assert_eq!(amount.initial_mean, Some(50.0));
        assert_eq!(amount.current_mean, Some(300.0));
        assert!(amount.drifted);
        assert!(!report.feature("V10").unwrap().drifted);
        assert!(report.to_string().contains("Significant drift detected in 'Amount'"));
    }

    #[test]
    fn test_shift_below_threshold_is_not_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs.txt");
        write_log(&path, 50.0, 120.0);

        let report = report_from_file(&path).unwrap().unwrap();
        assert!(!report.feature("Amount").unwrap().drifted);
        assert!(!report.any_drift());
        assert!(report.to_string().contains("No significant drift detected in 'Amount'"));
    }

    #[test]
    fn test_threshold_is_strict() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs.txt");
        write_log(&path, 0.0, 100.0);

        let report = report_from_file(&path).unwrap().unwrap();
        assert!(!report.feature("Amount").unwrap().drifted);
    }

    #[test]
    fn test_v10_shift_is_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs.txt");
        let logger = PredictionLogger::new(&path);
        for i in 0..20 {
            let v10 = if i < BASELINE_WINDOW { 0.0 } else { 50.0 };
            logger.append(&PredictionLogEntry::new(with_amount_and_v10(10.0, v10), 0, None)).unwrap();
        }

        let report = report_from_file(&path).unwrap().unwrap();
        assert!(report.feature("V10").unwrap().drifted);
        assert!(!report.feature("Amount").unwrap().drifted);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs.txt");
        fs::write(
            &path,
            "2024-01-01 10:00:00 - INFO - {\"prediction\": 0, \"input_data\": {\"Amount\": 10.0, \"V10\": 1.0}}\n\
             2024-01-01 10:00:01 - INFO - {broken json\n\
             2024-01-01 10:00:02 - INFO - {not: valid}\n\
             server started\n\
             2024-01-01 10:00:03 - INFO - {'prediction': 1, 'confidence': None, 'input_data': {'Amount': 30.0, 'V10': 3.0}}\n",
        )
        .unwrap();

        let entries = parse_logs(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1]["input_data"]["Amount"], 30.0);

        let table = flatten(&entries);
        assert_eq!(table.columns(), &["Amount", "V10", "prediction"]);
        let report = analyze(&table);
        let amount = report.summary.iter().find(|c| c.name == "Amount").unwrap();
        assert_eq!(amount.mean, Some(20.0));
        assert!((amount.std.unwrap() - 200f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs.txt");
        let mut raw = Vec::new();
        for i in 0..12 {
            raw.extend_from_slice(format!("{{\"prediction\": 0, \"input_data\": {{\"Amount\": {}.0}}}}\n", i).as_bytes());
            if i == 5 {
                raw.extend_from_slice(b"garbled \xff\xfe line\n");
            }
        }
        fs::write(&path, raw).unwrap();

        let entries = parse_logs(&path).unwrap();
        assert_eq!(entries.len(), 12);
        assert_eq!(entries[6]["input_data"]["Amount"], 6.0);
    }

    #[test]
    fn test_short_log_has_no_verdict() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs.txt");
        write_log(&path, 50.0, 50.0);
        let lines: Vec<String> = fs::read_to_string(&path).unwrap().lines().take(5).map(String::from).collect();
        fs::write(&path, lines.join("\n")).unwrap();

        let report = report_from_file(&path).unwrap().unwrap();
        let amount = report.feature("Amount").unwrap();
        assert_eq!(amount.current_mean, None);
        assert!(!amount.drifted);
        assert!(report.to_string().contains("Insufficient data"));
    }

    #[test]
    fn test_missing_or_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            report_from_file(&dir.path().join("absent.txt")),
            Err(FraudError::LogNotFound(_))
        ));

        let empty = dir.path().join("empty.txt");
        fs::write(&empty, "").unwrap();
        assert!(report_from_file(&empty).unwrap().is_none());
    }
}
