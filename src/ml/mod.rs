//! Classifier, scaler and evaluation primitives

pub mod cv;
pub mod forest;
pub mod metrics;
pub mod scaler;

pub use cv::{cross_val_f1, stratified_order};
pub use forest::{ForestParams, MaxFeatures, RandomForest};
pub use metrics::{ClassificationMetrics, ConfusionMatrix};
pub use scaler::StandardScaler;
