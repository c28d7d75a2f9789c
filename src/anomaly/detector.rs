//! Rolling z-score volume anomaly detector
//!
//! Each bar is compared against the `window_size` bars strictly before it:
//! the window mean and sample standard deviation (n - 1 denominator) are
//! computed over the same boundary, and the bar is anomalous when
//!
//! ```text
//! z = (volume - mean) / stddev > z_threshold
//! ```
//!
//! Bars without a full window, or whose window has zero spread, are never
//! anomalous.
//!
//! The window deliberately excludes the current bar. A trailing window that
//! includes it (the usual `rolling(window).mean()` shape) lets the spike
//! inflate its own mean and stddev, capping z at `(n - 1) / sqrt(n)` for a
//! window of `n` bars, so scores from the two definitions are not comparable.

use super::types::{AnomalyRecord, VolumeSeries};
use crate::config::{ConfigError, DetectorConfig};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Rolling statistics for one bar with a full preceding window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingStat {
    pub timestamp: DateTime<Utc>,
    pub volume: u64,
    pub rolling_mean: f64,
    pub rolling_stddev: f64,
    /// None when the window has zero spread
    pub z_score: Option<f64>,
}

/// Detects volume spikes against a trailing baseline
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    config: DetectorConfig,
}

impl AnomalyDetector {
    /// Create a detector, rejecting invalid window or threshold settings
    pub fn new(config: DetectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Rolling statistics for every bar that has a full preceding window
    pub fn rolling_stats(&self, series: &VolumeSeries) -> Vec<RollingStat> {
        let window = self.config.window_size;
        let bars = series.bars();
        if bars.len() <= window {
            return Vec::new();
        }

        let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();

        volumes
            .windows(window + 1)
            .zip(&bars[window..])
            .map(|(slice, bar)| {
                let (baseline, current) = slice.split_at(window);
                let (mean, stddev) = mean_stddev(baseline);
                let z_score = if stddev > 0.0 && stddev.is_finite() {
                    Some((current[0] - mean) / stddev)
                } else {
                    None
                };
                RollingStat {
                    timestamp: bar.timestamp,
                    volume: bar.volume,
                    rolling_mean: mean,
                    rolling_stddev: stddev,
                    z_score,
                }
            })
            .collect()
    }

    /// Bars whose z-score strictly exceeds the threshold, in chronological order
    pub fn detect(&self, series: &VolumeSeries) -> Vec<AnomalyRecord> {
        let anomalies: Vec<AnomalyRecord> = self
            .rolling_stats(series)
            .into_iter()
            .filter_map(|stat| {
                let z_score = stat.z_score.filter(|z| *z > self.config.z_threshold)?;
                Some(AnomalyRecord {
                    timestamp: stat.timestamp,
                    volume: stat.volume,
                    rolling_mean: stat.rolling_mean,
                    rolling_stddev: stat.rolling_stddev,
                    z_score,
                })
            })
            .collect();

        tracing::debug!(
            bars = series.len(),
            window = self.config.window_size,
            threshold = self.config.z_threshold,
            anomalies = anomalies.len(),
            "Volume anomaly scan complete"
        );

        anomalies
    }
}

/// Mean and sample standard deviation of a non-empty slice
fn mean_stddev(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::VolumeBar;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn series(volumes: &[u64]) -> VolumeSeries {
        let base = DateTime::parse_from_rfc3339("2025-01-06T03:45:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let bars = volumes
            .iter()
            .enumerate()
            .map(|(i, v)| VolumeBar::from_close(base + Duration::minutes(i as i64), dec!(1250), *v))
            .collect();
        VolumeSeries::new(bars).unwrap()
    }

    fn detector(window_size: usize, z_threshold: f64) -> AnomalyDetector {
        AnomalyDetector::new(DetectorConfig {
            window_size,
            z_threshold,
        })
        .unwrap()
    }

    /// Baseline with small but non-zero spread
    fn baseline(n: usize) -> Vec<u64> {
        (0..n).map(|i| 1_000 + (i as u64 % 5) * 10).collect()
    }

    #[test]
    fn test_spike_after_full_window() {
        let mut volumes = baseline(30);
        let as_f64: Vec<f64> = volumes.iter().map(|v| *v as f64).collect();
        let (mean, stddev) = mean_stddev(&as_f64);
        volumes.push((mean + 10.0 * stddev).round() as u64);

        let anomalies = detector(30, 4.0).detect(&series(&volumes));
        assert_eq!(anomalies.len(), 1);
        let record = &anomalies[0];
        assert!(record.z_score > 4.0);
        assert!((record.z_score - 10.0).abs() < 0.1);
        assert!((record.rolling_mean - mean).abs() < 1e-9);
        assert!((record.rolling_stddev - stddev).abs() < 1e-9);
    }

    #[test]
    fn test_short_series_is_empty() {
        let d = detector(30, 4.0);
        for len in [0, 1, 29, 30] {
            let mut volumes = baseline(len);
            if let Some(last) = volumes.last_mut() {
                *last = 1_000_000;
            }
            assert!(d.detect(&series(&volumes)).is_empty(), "len {len}");
            assert!(d.rolling_stats(&series(&volumes)).is_empty());
        }
    }

    #[test]
    fn test_zero_spread_window_is_not_anomalous() {
        let mut volumes = vec![500; 30];
        volumes.push(1_000_000);

        let d = detector(30, 4.0);
        assert!(d.detect(&series(&volumes)).is_empty());

        let stats = d.rolling_stats(&series(&volumes));
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].rolling_stddev, 0.0);
        assert!(stats[0].z_score.is_none());
    }

    #[test]
    fn test_threshold_is_strict() {
        // Window [0, 2]: mean 1, sample stddev sqrt(2)
        let volumes = [0, 2, 1];
        let stats = detector(2, 1.0).rolling_stats(&series(&volumes));
        let z = stats[0].z_score.unwrap();
        assert_eq!(z, 0.0);

        let volumes = [0, 4, 6];
        let stats = detector(2, 1.0).rolling_stats(&series(&volumes));
        let z = stats[0].z_score.unwrap();
        // mean 2, stddev sqrt(8), z = 4 / sqrt(8) = sqrt(2)
        assert!((z - 2f64.sqrt()).abs() < 1e-12);

        assert!(detector(2, z).detect(&series(&volumes)).is_empty());
        assert_eq!(detector(2, z - 1e-9).detect(&series(&volumes)).len(), 1);
    }

    #[test]
    fn test_every_record_exceeds_threshold() {
        let mut volumes = baseline(120);
        volumes[40] = 50_000;
        volumes[41] = 1_200;
        volumes[90] = 3_000;
        volumes[110] = 80_000;

        let d = detector(30, 4.0);
        let anomalies = d.detect(&series(&volumes));
        assert!(!anomalies.is_empty());
        for record in &anomalies {
            assert!(record.z_score > 4.0);
            assert!(record.z_score.is_finite());
        }
    }

    #[test]
    fn test_output_is_chronological() {
        let mut volumes = baseline(100);
        volumes[35] = 40_000;
        volumes[70] = 60_000;
        volumes[99] = 20_000;

        let anomalies = detector(30, 4.0).detect(&series(&volumes));
        assert!(anomalies.len() >= 2);
        assert!(anomalies
            .windows(2)
            .all(|pair| pair[0].timestamp < pair[1].timestamp));
    }

    #[test]
    fn test_detect_is_idempotent() {
        let mut volumes = baseline(80);
        volumes[50] = 25_000;
        let s = series(&volumes);
        let snapshot = s.clone();

        let d = detector(30, 4.0);
        let first = d.detect(&s);
        let second = d.detect(&s);
        assert_eq!(first, second);
        assert_eq!(s, snapshot);
    }

    #[test]
    fn test_spike_excluded_from_own_window() {
        // Spike lifts the baseline for the next 30 bars only
        let mut volumes = baseline(40);
        volumes[30] = 100_000;

        let stats = detector(30, 4.0).rolling_stats(&series(&volumes));
        assert_eq!(stats.len(), 10);
        assert!(stats[0].z_score.unwrap() > 100.0);
        assert!(stats[1].rolling_mean > stats[0].rolling_mean);
    }

    #[test]
    fn test_current_bar_not_in_own_window() {
        let mut volumes: Vec<u64> = (0..30).map(|i| if i % 2 == 0 { 1_000 } else { 1_200 }).collect();
        volumes.push(2_117);

        let stats = detector(30, 4.0).rolling_stats(&series(&volumes));
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].rolling_mean, 1_100.0);
        let z = stats[0].z_score.unwrap();
        assert!((z - 10.0).abs() < 0.01);

        // Trailing window that includes the spike scores far lower
        let trailing: Vec<f64> = volumes[1..].iter().map(|v| *v as f64).collect();
        let (mean, stddev) = mean_stddev(&trailing);
        let inclusive_z = (2_117.0 - mean) / stddev;
        assert!(inclusive_z < 30.0_f64.sqrt());
        assert!(inclusive_z < z / 1.5);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(AnomalyDetector::new(DetectorConfig {
            window_size: 0,
            z_threshold: 4.0
        })
        .is_err());
        assert!(AnomalyDetector::new(DetectorConfig {
            window_size: 30,
            z_threshold: -2.0
        })
        .is_err());
    }

    #[test]
    fn test_mean_stddev() {
        let (mean, stddev) = mean_stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(mean, 5.0);
        assert!((stddev - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }
}
