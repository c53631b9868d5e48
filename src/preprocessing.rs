//! Feature preparation: drop `Time`, extract `Class`, scale `Amount`, split

use linfa::Dataset;
use ndarray::{concatenate, Array1, Array2, Axis, Ix1};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::data::{Frame, AMOUNT_COLUMN, AMOUNT_INDEX, FEATURE_COUNT, FEATURE_NAMES, LABEL_COLUMN, TIME_COLUMN};
use crate::error::{FraudError, FraudResult};
use crate::ml::StandardScaler;

/// Model-ready train/test matrices plus the scaler fitted on `Amount`
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub x_train: Array2<f64>,
    pub y_train: Vec<u8>,
    pub x_test: Array2<f64>,
    pub y_test: Vec<u8>,
    pub scaler: StandardScaler,
}

pub fn prepare(mut frame: Frame, test_size: f64, seed: u64) -> FraudResult<PreparedData> {
    if !frame.drop_column(TIME_COLUMN) {
        tracing::debug!("No '{}' column to drop", TIME_COLUMN);
    }

    let dropped = frame.drop_incomplete_rows();
    if dropped > 0 {
        tracing::warn!("Dropped {} rows with missing values", dropped);
    }
    if frame.n_rows() == 0 {
        return Err(FraudError::InsufficientData("dataset has no complete rows".to_string()));
    }

    let labels = extract_labels(&frame)?;

    let feature_idx = FEATURE_NAMES
        .iter()
        .map(|name| {
            frame
                .column_index(name)
                .ok_or_else(|| FraudError::MissingColumn(name.to_string()))
        })
        .collect::<FraudResult<Vec<usize>>>()?;

    let n = frame.n_rows();
    let mut x = Array2::<f64>::zeros((n, FEATURE_COUNT));
    for (r, row) in frame.rows().iter().enumerate() {
        for (c, &idx) in feature_idx.iter().enumerate() {
            // drop_incomplete_rows guarantees every cell is present
            x[[r, c]] = row[idx].unwrap_or_default();
        }
    }
    tracing::info!("Data shape before splitting: X=({}, {}), y=({})", n, FEATURE_COUNT, labels.len());

    let amounts: Vec<f64> = x.column(AMOUNT_INDEX).to_vec();
    let scaler = StandardScaler::fit(AMOUNT_COLUMN, &amounts)?;
    x.column_mut(AMOUNT_INDEX).mapv_inplace(|v| scaler.transform(v));
    tracing::info!(
        "'{}' feature normalized (mean={:.4}, scale={:.4})",
        AMOUNT_COLUMN,
        scaler.mean,
        scaler.scale
    );

    let targets: Array1<usize> = labels.iter().map(|&l| l as usize).collect();
    let (train, test) = stratified_split(Dataset::new(x, targets), test_size, seed)?;
    if train.targets().is_empty() || test.targets().is_empty() {
        return Err(FraudError::InsufficientData(format!(
            "test_size {} leaves an empty split for {} rows",
            test_size, n
        )));
    }

    let data = PreparedData {
        y_train: train.targets().iter().map(|&l| l as u8).collect(),
        x_train: train.records,
        y_test: test.targets().iter().map(|&l| l as u8).collect(),
        x_test: test.records,
        scaler,
    };

    tracing::info!(
        "Split into training ({} rows) and testing ({} rows) sets",
        data.y_train.len(),
        data.y_test.len()
    );
    Ok(data)
}

fn extract_labels(frame: &Frame) -> FraudResult<Vec<u8>> {
    frame
        .column(LABEL_COLUMN)?
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(v) if v == 0.0 => Ok(0),
            Some(v) if v == 1.0 => Ok(1),
            other => Err(FraudError::InvalidLabel { row, value: other.unwrap_or(f64::NAN) }),
        })
        .collect()
}

/// Shuffle each class with a seeded RNG and hold out `test_size` of it
/// (rounded up, per class). Returns `(train, test)`, each reshuffled so the
/// classes are mixed.
pub fn stratified_split(
    dataset: Dataset<f64, usize, Ix1>,
    test_size: f64,
    seed: u64,
) -> FraudResult<(Dataset<f64, usize, Ix1>, Dataset<f64, usize, Ix1>)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(FraudError::Config(format!("test_size must be in (0, 1), got {}", test_size)));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train_parts = Vec::new();
    let mut test_parts = Vec::new();

    for class in [0usize, 1] {
        let members: Vec<usize> = dataset
            .targets()
            .iter()
            .enumerate()
            .filter(|&(_, &l)| l == class)
            .map(|(i, _)| i)
            .collect();
        if members.is_empty() {
            continue;
        }

        let subset = Dataset::new(
            dataset.records().select(Axis(0), &members),
            Array1::from_elem(members.len(), class),
        );
        let (test, train) = subset.shuffle(&mut rng).split_with_ratio(test_size as f32);
        test_parts.push(test);
        train_parts.push(train);
    }

    let train = stack(&train_parts, dataset.records().ncols())?.shuffle(&mut rng);
    let test = stack(&test_parts, dataset.records().ncols())?.shuffle(&mut rng);
    Ok((train, test))
}

fn stack(parts: &[Dataset<f64, usize, Ix1>], n_features: usize) -> FraudResult<Dataset<f64, usize, Ix1>> {
    if parts.is_empty() {
        return Ok(Dataset::new(Array2::zeros((0, n_features)), Array1::zeros(0)));
    }
    let records: Vec<_> = parts.iter().map(|d| d.records().view()).collect();
    let targets: Vec<_> = parts.iter().map(|d| d.targets().view()).collect();
    Ok(Dataset::new(
        concatenate(Axis(0), &records)?,
        concatenate(Axis(0), &targets)?,
    ))
}
