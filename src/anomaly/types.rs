//! Volume series types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Volume series construction errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeriesError {
    /// Timestamps are not strictly increasing
    #[error("bar {index} at {timestamp} is not after the previous bar")]
    OutOfOrder {
        index: usize,
        timestamp: DateTime<Utc>,
    },
}

/// A single OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeBar {
    /// Bar open time
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    /// Shares traded during the bar
    pub volume: u64,
}

impl VolumeBar {
    /// Bar with only a close price and volume, for feeds that report nothing else
    pub fn from_close(timestamp: DateTime<Utc>, close: Decimal, volume: u64) -> Self {
        Self {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }
}

/// Chronologically ordered bars with unique timestamps
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VolumeSeries {
    bars: Vec<VolumeBar>,
}

impl VolumeSeries {
    /// Build a series from bars that must already be strictly increasing in time
    pub fn new(bars: Vec<VolumeBar>) -> Result<Self, SeriesError> {
        if let Some(index) = bars
            .windows(2)
            .position(|pair| pair[1].timestamp <= pair[0].timestamp)
        {
            return Err(SeriesError::OutOfOrder {
                index: index + 1,
                timestamp: bars[index + 1].timestamp,
            });
        }
        Ok(Self { bars })
    }

    /// Build a series from arbitrary bars, sorting by time and keeping
    /// the last bar seen for any duplicated timestamp
    pub fn from_unordered(mut bars: Vec<VolumeBar>) -> Self {
        // Stable sort keeps input order among equal timestamps
        bars.sort_by_key(|bar| bar.timestamp);
        let mut deduped: Vec<VolumeBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.timestamp == bar.timestamp => *last = bar,
                _ => deduped.push(bar),
            }
        }
        Self { bars: deduped }
    }

    pub fn bars(&self) -> &[VolumeBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Most recent bar
    pub fn last(&self) -> Option<&VolumeBar> {
        self.bars.last()
    }
}

/// A bar whose volume z-score exceeded the detection threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub timestamp: DateTime<Utc>,
    pub volume: u64,
    /// Mean volume of the preceding window
    pub rolling_mean: f64,
    /// Sample standard deviation of the preceding window
    pub rolling_stddev: f64,
    pub z_score: f64,
}
