//! Run command implementation

use super::{nse_client, series_store, shutdown_on_ctrl_c, yahoo_client};
use crate::anomaly::AnomalyDetector;
use crate::config::Config;
use crate::feed::VolumeProvider;
use crate::signal::{ConfirmationScorer, RunOutcome, RunReport, SignalEngine, MAX_SCORE};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Stock ticker (e.g. RELIANCE)
    #[arg(short, long)]
    pub ticker: String,

    /// Download fresh bars instead of using stored ones
    #[arg(long)]
    pub live: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let detector = AnomalyDetector::new(config.detector.clone())?;
        let scorer = ConfirmationScorer::new(config.scoring.clone())?;
        let provider = Arc::new(nse_client(config)?);
        let engine = SignalEngine::new(config.engine.clone(), detector, scorer, provider)?;

        let store = series_store(config);
        let series = if self.live {
            let series = yahoo_client(config)?
                .fetch_series(&self.ticker, &config.feed.period, &config.feed.interval)
                .await?;
            if let Some(series) = &series {
                store.write_series(&self.ticker, series)?;
            }
            series
        } else {
            store.read_series(&self.ticker)?
        };

        if !self.json {
            println!("--- Starting IVA-OFE Engine ---");
        }
        let report = engine
            .run_with_shutdown(&self.ticker, series.as_ref(), shutdown_on_ctrl_c())
            .await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        Ok(())
    }
}

fn print_report(report: &RunReport) {
    if !report.anomalies.is_empty() {
        println!(
            "Found {} anomalies, {} scored, {} without options data.",
            report.anomalies.len(),
            report.results.len(),
            report.skipped
        );
    }
    for result in &report.results {
        println!(
            "  {}  z={:.2}  score {}/{}  {}",
            result.timestamp.to_rfc3339(),
            result.z_score,
            result.score,
            MAX_SCORE,
            result.reason
        );
    }
    if report.cancelled {
        println!("Run interrupted; partial results shown.");
    }

    println!("--- IVA-OFE Engine Run Complete ---");
    match &report.outcome {
        RunOutcome::NoData => println!("No price data available for {}.", report.ticker),
        RunOutcome::NoAnomalies => println!("No significant stock volume anomalies found."),
        RunOutcome::NoResults => println!("Analysis complete, but no results were generated."),
        RunOutcome::LowConviction(_) => {
            println!("No high-conviction signals found after analysis.")
        }
        RunOutcome::HighConviction(best) => {
            println!("STRONGEST SIGNAL OF THE DAY");
            println!("  Timestamp: {}", best.timestamp.to_rfc3339());
            println!("  Stock Volume Z-Score: {:.2}", best.z_score);
            println!("  Options Confirmation Score: {}/{}", best.score, MAX_SCORE);
            println!("  Reason: {}", best.reason);
        }
    }
}
