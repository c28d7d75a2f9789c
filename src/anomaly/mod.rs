//! Volume anomaly detection module
//!
//! Flags bars whose traded volume sits far above the rolling baseline
//! of the bars that precede them.

mod detector;
mod types;

pub use detector::{AnomalyDetector, RollingStat};
pub use types::{AnomalyRecord, SeriesError, VolumeBar, VolumeSeries};
