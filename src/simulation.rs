//! Synthetic drift: replay shifted dataset rows against a running API

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;

use crate::data::{Frame, Transaction, FEATURE_COUNT, FEATURE_NAMES};
use crate::error::{FraudError, FraudResult};

pub const SAMPLE_SIZE: usize = 100;
pub const SAMPLE_SEED: u64 = 42;
pub const DRIFT_FEATURE: &str = "V10";
pub const DRIFT_SHIFT: f64 = 50.0;

/// Draw `n` complete rows (seeded) and add `shift` to `feature`
pub fn drifted_sample(frame: &Frame, n: usize, seed: u64, feature: &str, shift: f64) -> FraudResult<Vec<Transaction>> {
    let feature_idx = FEATURE_NAMES
        .iter()
        .position(|&name| name == feature)
        .ok_or_else(|| FraudError::MissingColumn(feature.to_string()))?;

    let columns = FEATURE_NAMES
        .iter()
        .map(|name| frame.column_index(name).ok_or_else(|| FraudError::MissingColumn(name.to_string())))
        .collect::<FraudResult<Vec<usize>>>()?;

    let complete: Vec<[f64; FEATURE_COUNT]> = frame
        .rows()
        .iter()
        .filter_map(|row| {
            let mut features = [0.0; FEATURE_COUNT];
            for (slot, &col) in features.iter_mut().zip(&columns) {
                *slot = row[col]?;
            }
            Some(features)
        })
        .collect();

    if complete.len() < n {
        return Err(FraudError::InsufficientData(format!(
            "need {} complete rows, dataset has {}",
            n,
            complete.len()
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    Ok(sample(&mut rng, complete.len(), n)
        .into_iter()
        .map(|i| {
            let mut features = complete[i];
            features[feature_idx] += shift;
            Transaction::from_features(&features)
        })
        .collect())
}

/// POST each transaction to `url`; returns how many were accepted.
/// Failures are reported and skipped.
pub fn send_all(url: &str, transactions: &[Transaction]) -> usize {
    let mut accepted = 0;
    for (i, tx) in transactions.iter().enumerate() {
        match ureq::post(url).send_json(tx) {
            Ok(_) => accepted += 1,
            Err(e) => {
                tracing::warn!("Request {} failed: {}", i + 1, e);
            }
        }
    }
    accepted
}
