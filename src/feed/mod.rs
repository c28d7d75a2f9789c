//! Market data feed module
//!
//! Price/volume bars from Yahoo Finance and live option chains from NSE

mod nse;
mod yahoo;

pub use nse::{NseConfig, NseOptionChainClient, NSE_BASE_URL};
pub use yahoo::{YahooChartClient, YahooConfig, YAHOO_CHART_URL};

use crate::anomaly::VolumeSeries;
use crate::options::OptionChainSnapshot;
use async_trait::async_trait;

/// Source of historical OHLCV bars
#[async_trait]
pub trait VolumeProvider: Send + Sync {
    /// Fetch bars for `ticker` over `period` at `interval`; `Ok(None)` when
    /// the source has no data for the ticker
    async fn fetch_series(
        &self,
        ticker: &str,
        period: &str,
        interval: &str,
    ) -> anyhow::Result<Option<VolumeSeries>>;
}

/// Source of live option chain snapshots
#[async_trait]
pub trait OptionChainProvider: Send + Sync {
    /// Fetch a fresh chain for `ticker`; `Ok(None)` when none is available
    async fn fetch_chain(&self, ticker: &str) -> anyhow::Result<Option<OptionChainSnapshot>>;
}
