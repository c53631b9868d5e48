//! Stratified k-fold cross-validation over linfa's contiguous folds

use linfa::Dataset;
use ndarray::{Array1, ArrayView2, Axis};

use crate::error::{FraudError, FraudResult};
use super::forest::{ForestParams, RandomForest};
use super::metrics::f1_score;

/// Row order that interleaves the classes in proportion, so that contiguous
/// chunks of `len / k` rows each keep roughly the overall class ratio.
/// Rows of the same class keep their relative order.
pub fn stratified_order(y: &[u8], k: usize) -> FraudResult<Vec<usize>> {
    if k < 2 {
        return Err(FraudError::Config("cross-validation needs at least 2 folds".to_string()));
    }
    if y.len() < k {
        return Err(FraudError::InsufficientData(format!(
            "{} samples cannot be split into {} folds",
            y.len(),
            k
        )));
    }

    let class_sizes = [
        y.iter().filter(|&&l| l == 0).count(),
        y.iter().filter(|&&l| l != 0).count(),
    ];
    let mut seen = [0usize; 2];

    // Position of each row within its class, as a fraction of the class size
    let mut keyed: Vec<(f64, usize)> = y
        .iter()
        .enumerate()
        .map(|(row, &label)| {
            let class = (label != 0) as usize;
            let key = (seen[class] as f64 + 0.5) / class_sizes[class] as f64;
            seen[class] += 1;
            (key, row)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));

    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}

fn to_labels(targets: &Array1<usize>) -> Vec<u8> {
    targets.iter().map(|&l| l as u8).collect()
}

/// F1 score of a freshly fitted forest on each held-out fold
pub fn cross_val_f1(
    x: ArrayView2<f64>,
    y: &[u8],
    params: &ForestParams,
    k: usize,
) -> FraudResult<Vec<f64>> {
    let order = stratified_order(y, k)?;
    let targets: Array1<usize> = order.iter().map(|&i| y[i] as usize).collect();
    let dataset = Dataset::new(x.select(Axis(0), &order), targets);

    dataset
        .fold(k)
        .into_iter()
        .enumerate()
        .map(|(fold, (train, valid))| {
            let forest = RandomForest::fit(train.records().view(), &to_labels(train.targets()), params)?;
            let score = f1_score(&to_labels(valid.targets()), &forest.predict(valid.records().view()));
            tracing::debug!("Fold {}/{}: F1 = {:.4}", fold + 1, k, score);
            Ok(score)
        })
        .collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_order_keeps_class_ratio_per_chunk() {
        let mut y = vec![0u8; 20];
        y.extend(vec![1u8; 5]);
        let order = stratified_order(&y, 5).unwrap();

        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..25).collect::<Vec<_>>());

        for chunk in order.chunks(5) {
            assert_eq!(chunk.iter().filter(|&&i| y[i] == 0).count(), 4);
            assert_eq!(chunk.iter().filter(|&&i| y[i] == 1).count(), 1);
        }
    }

    #[test]
    fn test_too_few_samples_for_folds() {
        assert!(matches!(
            stratified_order(&[0, 1, 0], 5),
            Err(FraudError::InsufficientData(_))
        ));
        assert!(stratified_order(&[0, 1, 0], 1).is_err());
    }

    #[test]
    fn test_cross_val_on_separable_data() {
        let mut rows = Vec::new();
        let mut y = Vec::new();
        for i in 0..30 {
            let v = (i % 6) as f64 * 0.1;
            rows.extend_from_slice(&[v, -v]);
            y.push(0);
        }
        for i in 0..15 {
            let v = 8.0 + (i % 3) as f64 * 0.1;
            rows.extend_from_slice(&[v, -v]);
            y.push(1);
        }
        let x = Array2::from_shape_vec((45, 2), rows).unwrap();
        let params = ForestParams { n_estimators: 10, ..ForestParams::default() };

        let scores = cross_val_f1(x.view(), &y, &params, 3).unwrap();
        assert_eq!(scores.len(), 3);
        assert!(scores.iter().all(|&s| (s - 1.0).abs() < 1e-12), "scores: {:?}", scores);
        assert!((mean(&scores) - 1.0).abs() < 1e-12);
    }
}
