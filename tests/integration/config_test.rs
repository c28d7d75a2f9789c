//! Configuration integration tests

use iva_ofe::config::{Config, ConfigError, LogFormat};
use rust_decimal_macros::dec;
use std::io::Write;

#[test]
fn test_example_config_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example");
    let config = Config::load(path).unwrap();

    assert_eq!(config.detector.window_size, 30);
    assert_eq!(config.detector.z_threshold, 4.0);
    assert_eq!(config.scoring.aggregate_volume_threshold, 10_000);
    assert_eq!(config.scoring.directional_multiplier, dec!(2));
    assert_eq!(config.scoring.mid_price_tolerance, dec!(0.05));
    assert_eq!(config.engine.high_conviction_threshold, 2);
    assert_eq!(config.engine.pacing_interval_ms, 1000);
    assert_eq!(config.feed.exchange_suffix, ".NS");
    assert!(config.feed.expiry.is_none());
    assert_eq!(config.collector.utc_offset_minutes, 330);
    assert_eq!(config.telemetry.log_format, LogFormat::Pretty);
    assert!(config.telemetry.metrics_port.is_none());
}

#[test]
fn test_partial_config_keeps_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[engine]\npacing_interval_ms = 0\n\n[telemetry]\nlog_format = \"json\"").unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.engine.pacing_interval_ms, 0);
    assert_eq!(config.engine.high_conviction_threshold, 2);
    assert_eq!(config.telemetry.log_format, LogFormat::Json);
    assert_eq!(config.detector.window_size, 30);
}

#[test]
fn test_invalid_window_rejected() {
    let config: Config = toml::from_str("[detector]\nwindow_size = 1").unwrap();
    assert_eq!(config.validate(), Err(ConfigError::WindowTooSmall(1)));
}

#[test]
fn test_load_rejects_bad_files() {
    let mut invalid = tempfile::NamedTempFile::new().unwrap();
    writeln!(invalid, "[engine]\nhigh_conviction_threshold = 5").unwrap();
    tokio_test::assert_err!(Config::load(invalid.path()));

    let mut malformed = tempfile::NamedTempFile::new().unwrap();
    writeln!(malformed, "[detector\nwindow_size = 30").unwrap();
    tokio_test::assert_err!(Config::load(malformed.path()));

    tokio_test::assert_err!(Config::load("/nonexistent/config.toml"));
}
