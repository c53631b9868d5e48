//! Dataset ingestion and inspection

pub mod frame;
pub mod record;

pub use frame::*;
pub use record::*;
