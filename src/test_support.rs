//! Shared fixtures for unit tests

use std::path::Path;

use ndarray::Array2;

use crate::config::Config;
use crate::data::{Transaction, AMOUNT_COLUMN, AMOUNT_INDEX, FEATURE_COUNT};
use crate::inference::{save_model, save_scaler, ModelArtifact, MODEL_FILE, SCALER_FILE};
use crate::ml::{ForestParams, RandomForest, StandardScaler};

/// The documented sample request; a legitimate transaction
pub fn sample_transaction() -> Transaction {
    Transaction::from_features(&[
        -1.3598071336738, -0.0727811732551, 2.5362473405167, 1.37815522427448,
        -0.33832076994255, 0.46238777776269, 0.23959855490417, 0.09869790126105,
        0.36378696961121, 0.09079417189317, -0.55159953326081, -0.61780085576182,
        -0.99138984723659, -0.31116935369987, 1.46817614013149, -0.47040052525949,
        0.20797124192924, 0.02579058019855, 0.4039930322765, 0.25141209823979,
        -0.01830677793131, 0.27783757555889, -0.11047391018876, 0.06692807491465,
        0.12853935827352, -0.18911484384993, 0.13355837674039, -0.02105305344538,
        149.62,
    ])
}

/// Far outside the legitimate cluster on every feature
pub fn fraud_transaction() -> Transaction {
    let mut features = [-9.0; FEATURE_COUNT];
    features[AMOUNT_INDEX] = 2000.0;
    Transaction::from_features(&features)
}

/// Raw (unscaled) rows: legitimate values in [-1, 1] with small amounts,
/// fraudulent values in [-10, -8] with amounts above 1500
pub fn separable_rows() -> (Array2<f64>, Vec<u8>) {
    let mut values = Vec::new();
    let mut labels = Vec::new();

    for i in 0..60 {
        for j in 0..FEATURE_COUNT - 1 {
            values.push(((i * 7 + j * 3) % 21) as f64 / 10.0 - 1.0);
        }
        values.push(5.0 + ((i * 13) % 200) as f64);
        labels.push(0);
    }
    for i in 0..30 {
        for j in 0..FEATURE_COUNT - 1 {
            values.push(-8.0 - ((i + j) % 5) as f64 * 0.5);
        }
        values.push(1500.0 + i as f64 * 10.0);
        labels.push(1);
    }

    let n = labels.len();
    (Array2::from_shape_vec((n, FEATURE_COUNT), values).unwrap(), labels)
}

/// Small forest and its scaler, fitted on [`separable_rows`]
pub fn fitted_artifacts() -> (ModelArtifact, StandardScaler) {
    let (mut x, y) = separable_rows();
    let amounts: Vec<f64> = x.column(AMOUNT_INDEX).to_vec();
    let scaler = StandardScaler::fit(AMOUNT_COLUMN, &amounts).unwrap();
    x.column_mut(AMOUNT_INDEX).mapv_inplace(|v| scaler.transform(v));

    let params = ForestParams { n_estimators: 12, ..ForestParams::default() };
    let forest = RandomForest::fit(x.view(), &y, &params).unwrap();
    (ModelArtifact::new(forest, &scaler), scaler)
}

/// Persist [`fitted_artifacts`] into `dir`
pub fn write_artifacts(dir: &Path) {
    let (model, scaler) = fitted_artifacts();
    save_model(&model, &dir.join(MODEL_FILE)).unwrap();
    save_scaler(&scaler, &dir.join(SCALER_FILE)).unwrap();
}

/// Raw-dataset CSV text (with `Time` and `Class`) built from [`separable_rows`]
pub fn separable_csv() -> String {
    let (x, y) = separable_rows();
    let mut out = String::from("Time");
    for name in crate::data::FEATURE_NAMES {
        out.push(',');
        out.push_str(name);
    }
    out.push_str(",Class\n");

    for (i, (row, label)) in x.rows().into_iter().zip(&y).enumerate() {
        out.push_str(&i.to_string());
        for v in row {
            out.push(',');
            out.push_str(&v.to_string());
        }
        out.push_str(&format!(",{}\n", label));
    }
    out
}

/// Configuration rooted in `dir`, independent of the process environment
pub fn test_config(dir: &Path) -> Config {
    Config {
        port: 0,
        model_dir: dir.join("models"),
        data_path: dir.join("creditcard.csv"),
        metrics_path: dir.join("metrics.json"),
        train_config_path: dir.join("train_config.json"),
        prediction_log_path: dir.join("logs.txt"),
        log_predictions: true,
        tracking_uri: None,
        experiment_name: "Fraud Detection RandomForest Training".to_string(),
        api_url: "http://localhost:8000/predict".to_string(),
    }
}
