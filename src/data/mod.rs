//! Data storage module
//!
//! Persists price series and real-time flow samples to Parquet

mod parquet;
mod recorder;
mod store;

pub use parquet::{FlowSample, ParquetReader, ParquetWriter};
pub use recorder::{FlowRecorder, RecorderConfig, RecorderStats};
pub use store::SeriesStore;
