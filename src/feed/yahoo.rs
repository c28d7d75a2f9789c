//! Yahoo Finance chart API client
//!
//! Downloads intraday OHLCV bars, e.g. five days of one-minute bars for an
//! NSE-listed stock (`RELIANCE.NS`).

use super::VolumeProvider;
use crate::anomaly::{VolumeBar, VolumeSeries};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// Chart API base URL
pub const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Configuration for the Yahoo client
#[derive(Debug, Clone)]
pub struct YahooConfig {
    pub base_url: String,
    /// Appended to tickers that do not already carry a suffix
    pub exchange_suffix: String,
    pub timeout: Duration,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: YAHOO_CHART_URL.to_string(),
            exchange_suffix: ".NS".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Client for the Yahoo Finance chart endpoint
pub struct YahooChartClient {
    config: YahooConfig,
    client: Client,
}

impl YahooChartClient {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(YahooConfig::default())
    }

    pub fn with_config(config: YahooConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent("Mozilla/5.0 (X11; Linux x86_64)")
            .build()?;
        Ok(Self { config, client })
    }

    /// Exchange symbol for a ticker (`RELIANCE` -> `RELIANCE.NS`)
    pub fn symbol(&self, ticker: &str) -> String {
        if ticker.contains('.') || self.config.exchange_suffix.is_empty() {
            ticker.to_string()
        } else {
            format!("{}{}", ticker, self.config.exchange_suffix)
        }
    }
}

#[async_trait]
impl VolumeProvider for YahooChartClient {
    async fn fetch_series(
        &self,
        ticker: &str,
        period: &str,
        interval: &str,
    ) -> anyhow::Result<Option<VolumeSeries>> {
        let symbol = self.symbol(ticker);
        let url = format!("{}/{}", self.config.base_url, symbol);

        tracing::info!(symbol = %symbol, period, interval, "Fetching price bars");

        let response = self
            .client
            .get(&url)
            .query(&[("range", period), ("interval", interval)])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::warn!(symbol = %symbol, "No data found, ticker may be delisted or invalid");
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Yahoo chart API error: {} - {}", status, body);
        }

        let body: ChartResponse = response.json().await?;
        let series = parse_chart(body)?;
        if series.as_ref().map_or(true, VolumeSeries::is_empty) {
            tracing::warn!(symbol = %symbol, "Chart response contained no bars");
            return Ok(None);
        }

        Ok(series)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteColumns>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Turn the columnar chart payload into bars, dropping rows without a
/// volume or close
fn parse_chart(body: ChartResponse) -> anyhow::Result<Option<VolumeSeries>> {
    if let Some(error) = body.chart.error {
        anyhow::bail!("Yahoo chart error {}: {}", error.code, error.description);
    }
    let Some(result) = body.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(None);
    };
    let columns = result.indicators.quote.into_iter().next().unwrap_or_default();

    let price = |column: &[Option<f64>], i: usize| -> Option<Decimal> {
        column
            .get(i)
            .copied()
            .flatten()
            .and_then(|v| Decimal::try_from(v).ok())
            .map(|d| d.round_dp(2))
    };

    let bars = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let timestamp = DateTime::from_timestamp(*ts, 0)?;
            let volume = columns.volume.get(i).copied().flatten()?;
            let close = price(&columns.close, i)?;
            Some(VolumeBar {
                timestamp,
                open: price(&columns.open, i).unwrap_or(close),
                high: price(&columns.high, i).unwrap_or(close),
                low: price(&columns.low, i).unwrap_or(close),
                close,
                volume: volume.max(0.0).round() as u64,
            })
        })
        .collect();

    Ok(Some(VolumeSeries::from_unordered(bars)))
}
