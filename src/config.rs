//! Configuration types for iva-ofe

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Invalid configuration, surfaced before any data is processed
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Rolling window too small to compute a sample standard deviation
    #[error("window_size must be at least 2, got {0}")]
    WindowTooSmall(usize),
    /// Z-score threshold is not a positive finite number
    #[error("z_threshold must be positive and finite, got {0}")]
    InvalidZThreshold(f64),
    /// Multiplier or tolerance that must be strictly positive
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: Decimal },
    /// High-conviction threshold above the maximum reachable score
    #[error("high_conviction_threshold must be below 5, got {0}")]
    UnreachableConviction(u8),
    /// Polling interval of zero
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
    /// Market hours window is empty or out of range
    #[error("invalid market hours {open}..{close}")]
    InvalidMarketHours { open: u32, close: u32 },
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub detector: DetectorConfig,
    pub scoring: ScoringConfig,
    pub engine: EngineConfig,
    pub feed: FeedConfig,
    pub data: DataConfig,
    pub collector: CollectorConfig,
    pub telemetry: TelemetryConfig,
}

/// Volume anomaly detection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Number of preceding bars in the rolling window
    pub window_size: usize,
    /// Z-score a bar must strictly exceed to be anomalous
    pub z_threshold: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_size: 30,
            z_threshold: 4.0,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size < 2 {
            return Err(ConfigError::WindowTooSmall(self.window_size));
        }
        if !self.z_threshold.is_finite() || self.z_threshold <= 0.0 {
            return Err(ConfigError::InvalidZThreshold(self.z_threshold));
        }
        Ok(())
    }
}

/// Options-flow confirmation scoring configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Combined call + put traded volume that counts as significant
    pub aggregate_volume_threshold: u64,
    /// One side must exceed the other by this factor to count as directional
    pub directional_multiplier: Decimal,
    /// Max distance of last price from mid, as a fraction of mid
    pub mid_price_tolerance: Decimal,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            aggregate_volume_threshold: 10_000,
            directional_multiplier: Decimal::TWO,
            mid_price_tolerance: Decimal::new(5, 2), // 0.05 = 5%
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.directional_multiplier <= Decimal::ZERO {
            return Err(ConfigError::NonPositive {
                name: "directional_multiplier",
                value: self.directional_multiplier,
            });
        }
        if self.mid_price_tolerance <= Decimal::ZERO {
            return Err(ConfigError::NonPositive {
                name: "mid_price_tolerance",
                value: self.mid_price_tolerance,
            });
        }
        Ok(())
    }
}

/// Signal engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Best score must strictly exceed this to be a high-conviction signal
    pub high_conviction_threshold: u8,
    /// Pause between consecutive option-chain requests (milliseconds)
    pub pacing_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            high_conviction_threshold: 2,
            pacing_interval_ms: 1_000,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.high_conviction_threshold >= 5 {
            return Err(ConfigError::UnreachableConviction(
                self.high_conviction_threshold,
            ));
        }
        Ok(())
    }
}

/// Market data feed configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Suffix appended to tickers for the price feed (e.g. ".NS")
    pub exchange_suffix: String,
    /// Lookback period for historical bars
    pub period: String,
    /// Bar interval
    pub interval: String,
    /// Restrict the chain to one expiry date, or `"nearest"` for the first
    /// listed expiry; every expiry is aggregated when unset
    pub expiry: Option<String>,
    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            exchange_suffix: ".NS".to_string(),
            period: "5d".to_string(),
            interval: "1m".to_string(),
            expiry: None,
            request_timeout_secs: 10,
        }
    }
}

/// Data storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DataConfig {
    pub output_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./data"),
        }
    }
}

/// Real-time flow collector configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Seconds between samples while the market is open
    pub poll_interval_secs: u64,
    /// Seconds to sleep while the market is closed
    pub idle_interval_secs: u64,
    /// First exchange-local hour of the trading session
    pub market_open_hour: u32,
    /// Last exchange-local hour of the trading session (inclusive)
    pub market_close_hour: u32,
    /// Exchange offset from UTC in minutes (IST = +330)
    pub utc_offset_minutes: i32,
    /// Samples buffered before a Parquet file is written
    pub buffer_size: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            idle_interval_secs: 300,
            market_open_hour: 9,
            market_close_hour: 15,
            utc_offset_minutes: 330,
            buffer_size: 60,
        }
    }
}

impl CollectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval("poll_interval_secs"));
        }
        if self.idle_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval("idle_interval_secs"));
        }
        if self.market_open_hour > self.market_close_hour || self.market_close_hour > 23 {
            return Err(ConfigError::InvalidMarketHours {
                open: self.market_open_hour,
                close: self.market_close_hour,
            });
        }
        Ok(())
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    /// Prometheus exporter port; disabled when unset
    pub metrics_port: Option<u16>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_port: None,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,
    /// JSON format for log aggregation
    Json,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detector.validate()?;
        self.scoring.validate()?;
        self.engine.validate()?;
        self.collector.validate()?;
        Ok(())
    }
}
