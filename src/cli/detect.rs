//! Detect command implementation

use super::series_store;
use crate::anomaly::{AnomalyDetector, VolumeSeries};
use crate::config::Config;
use clap::Args;

#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Stock ticker (e.g. RELIANCE)
    #[arg(short, long)]
    pub ticker: String,

    /// Print rolling statistics for every scorable bar, not only anomalies
    #[arg(long)]
    pub stats: bool,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

impl DetectArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let Some(series) = series_store(config).read_series(&self.ticker)? else {
            println!(
                "No stored data for {}. Run `iva-ofe fetch --ticker {}` first.",
                self.ticker, self.ticker
            );
            return Ok(());
        };

        let detector = AnomalyDetector::new(config.detector.clone())?;
        if self.stats {
            return self.print_stats(&detector, &series);
        }
        let anomalies = detector.detect(&series);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&anomalies)?);
            return Ok(());
        }

        if anomalies.is_empty() {
            println!("No significant volume anomalies found.");
            return Ok(());
        }

        println!(
            "Found {} volume anomalies for {}:",
            anomalies.len(),
            self.ticker
        );
        println!(
            "{:<26} {:>12} {:>14} {:>14} {:>8}",
            "timestamp", "volume", "rolling_mean", "rolling_std", "z"
        );
        for a in &anomalies {
            println!(
                "{:<26} {:>12} {:>14.1} {:>14.1} {:>8.2}",
                a.timestamp.to_rfc3339(),
                a.volume,
                a.rolling_mean,
                a.rolling_stddev,
                a.z_score
            );
        }
        Ok(())
    }

    fn print_stats(&self, detector: &AnomalyDetector, series: &VolumeSeries) -> anyhow::Result<()> {
        let stats = detector.rolling_stats(series);
        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
            return Ok(());
        }

        let threshold = detector.config().z_threshold;
        for stat in &stats {
            let z = stat
                .z_score
                .map_or_else(|| "-".to_string(), |z| format!("{:.2}", z));
            let flag = if stat.z_score.is_some_and(|z| z > threshold) {
                "*"
            } else {
                ""
            };
            println!(
                "{:<26} {:>12} {:>14.1} {:>14.1} {:>8} {}",
                stat.timestamp.to_rfc3339(),
                stat.volume,
                stat.rolling_mean,
                stat.rolling_stddev,
                z,
                flag
            );
        }
        Ok(())
    }
}
