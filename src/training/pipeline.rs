use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use linfa::prelude::ToConfusionMatrix;
use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::config::{Config, TrainConfig};
use crate::data::load_frame;
use crate::error::FraudResult;
use crate::inference::{save_json, save_model, save_scaler, ModelArtifact};
use crate::ml::{cross_val_f1, ClassificationMetrics, ConfusionMatrix, RandomForest};
use crate::preprocessing::prepare;
use crate::tracking::{tracker_from_config, ExperimentTracker};

use super::plot::save_confusion_matrix;

/// Contents of `metrics.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub test_accuracy: f64,
    pub test_f1_score: f64,
    pub test_precision: f64,
    pub test_recall: f64,
    /// Matthews correlation coefficient, symmetric in the two classes
    pub test_mcc: f64,
    pub cv_mean_f1_score: f64,
    pub cv_f1_scores: Vec<f64>,
    pub training_runtime_sec: f64,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
}

impl TrainingMetrics {
    /// Numeric metrics for the experiment tracker
    pub fn tracked(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("test_accuracy".to_string(), self.test_accuracy),
            ("test_f1_score".to_string(), self.test_f1_score),
            ("test_precision".to_string(), self.test_precision),
            ("test_recall".to_string(), self.test_recall),
            ("test_mcc".to_string(), self.test_mcc),
            ("cv_mean_f1_score".to_string(), self.cv_mean_f1_score),
            ("training_runtime_sec".to_string(), self.training_runtime_sec),
        ])
    }
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub metrics: TrainingMetrics,
    pub confusion_matrix: ConfusionMatrix,
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
    pub metrics_path: PathBuf,
    pub plot_path: PathBuf,
    pub run_id: Option<String>,
}

/// Scores of a forest on a held-out set
#[derive(Debug, Clone, Copy)]
pub struct Evaluation {
    pub confusion_matrix: ConfusionMatrix,
    /// Fraud (class 1) is the positive class
    pub scores: ClassificationMetrics,
    pub mcc: f64,
}

/// Score `forest` on a held-out set
pub fn evaluate(forest: &RandomForest, x: ArrayView2<f64>, y: &[u8]) -> FraudResult<Evaluation> {
    let predicted = forest.predict(x);
    let confusion_matrix = ConfusionMatrix::from_predictions(y, &predicted);

    let truth: Array1<usize> = y.iter().map(|&l| l as usize).collect();
    let predicted: Array1<usize> = predicted.into_iter().map(usize::from).collect();
    let mcc = f64::from(predicted.confusion_matrix(truth.view())?.mcc());

    Ok(Evaluation {
        confusion_matrix,
        scores: confusion_matrix.metrics(),
        // Undefined when only one class is present
        mcc: if mcc.is_finite() { mcc } else { 0.0 },
    })
}

pub fn run_training(config: &Config) -> FraudResult<TrainingReport> {
    let train_config = TrainConfig::load(&config.train_config_path)?;
    let params = train_config.forest_params();

    tracing::info!("📂 Loading data from {}", config.data_path.display());
    let frame = load_frame(&config.data_path)?;
    let data = prepare(frame, train_config.test_size, params.random_state)?;
    tracing::info!(
        "Prepared {} training and {} test rows",
        data.y_train.len(),
        data.y_test.len()
    );

    tracing::info!(
        "🌲 Training random forest: n_estimators={}, max_depth={:?}",
        params.n_estimators,
        params.max_depth
    );
    let started = Instant::now();
    let forest = RandomForest::fit(data.x_train.view(), &data.y_train, &params)?;
    let training_runtime_sec = started.elapsed().as_secs_f64();

    let Evaluation { confusion_matrix, scores: test, mcc } = evaluate(&forest, data.x_test.view(), &data.y_test)?;

    tracing::info!("Running {}-fold cross-validation", train_config.cv_folds);
    let cv_f1_scores = cross_val_f1(data.x_train.view(), &data.y_train, &params, train_config.cv_folds)?;
    let cv_mean_f1_score = crate::ml::cv::mean(&cv_f1_scores);

    let metrics = TrainingMetrics {
        test_accuracy: test.accuracy,
        test_f1_score: test.f1,
        test_precision: test.precision,
        test_recall: test.recall,
        test_mcc: mcc,
        cv_mean_f1_score,
        cv_f1_scores,
        training_runtime_sec,
        n_estimators: params.n_estimators,
        max_depth: params.max_depth,
    };

    tracing::info!(
        "✅ Test accuracy {:.4}, F1 {:.4}, precision {:.4}, recall {:.4}, MCC {:.4}; CV mean F1 {:.4}",
        metrics.test_accuracy,
        metrics.test_f1_score,
        metrics.test_precision,
        metrics.test_recall,
        metrics.test_mcc,
        metrics.cv_mean_f1_score
    );

    let model_path = config.model_path();
    let scaler_path = config.scaler_path();
    let plot_path = config.confusion_matrix_path();

    save_model(&ModelArtifact::new(forest, &data.scaler), &model_path)?;
    save_scaler(&data.scaler, &scaler_path)?;
    save_json(&metrics, &config.metrics_path)?;
    save_confusion_matrix(&confusion_matrix, &plot_path)?;
    tracing::info!("💾 Model and scaler saved to {}", config.model_dir.display());

    let mut report = TrainingReport {
        metrics,
        confusion_matrix,
        model_path,
        scaler_path,
        metrics_path: config.metrics_path.clone(),
        plot_path,
        run_id: None,
    };

    if let Some(mut tracker) = tracker_from_config(config) {
        match track_run(tracker.as_mut(), &train_config, &report) {
            Ok(()) => report.run_id = Some(tracker.run_id().to_string()),
            Err(e) => tracing::warn!("Failed to record training run: {}", e),
        }
    }

    Ok(report)
}

fn track_run(
    tracker: &mut dyn ExperimentTracker,
    train_config: &TrainConfig,
    report: &TrainingReport,
) -> FraudResult<()> {
    let model = &train_config.model;
    let params = BTreeMap::from([
        ("n_estimators".to_string(), model.n_estimators.to_string()),
        (
            "max_depth".to_string(),
            model.max_depth.map_or_else(|| "None".to_string(), |d| d.to_string()),
        ),
        ("min_samples_split".to_string(), model.min_samples_split.to_string()),
        ("min_samples_leaf".to_string(), model.min_samples_leaf.to_string()),
        ("max_features".to_string(), model.max_features.to_string()),
        ("random_state".to_string(), model.random_state.to_string()),
        ("test_size".to_string(), train_config.test_size.to_string()),
        ("cv_folds".to_string(), train_config.cv_folds.to_string()),
    ]);

    tracker.log_params(&params)?;
    tracker.log_metrics(&report.metrics.tracked())?;
    for artifact in [&report.model_path, &report.scaler_path, &report.metrics_path, &report.plot_path] {
        log_artifact_if_present(tracker, artifact)?;
    }
    tracker.finish()
}

fn log_artifact_if_present(tracker: &mut dyn ExperimentTracker, path: &Path) -> FraudResult<()> {
    if path.exists() {
        tracker.log_artifact(path)?;
    }
    Ok(())
}
