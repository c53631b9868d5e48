//! Offline training: ingest, prepare, fit, evaluate, persist, track

pub mod pipeline;
pub mod plot;

pub use pipeline::*;
pub use plot::{render_confusion_matrix, save_confusion_matrix};
