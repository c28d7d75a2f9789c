//! Fetch command implementation

use super::{series_store, yahoo_client};
use crate::config::Config;
use crate::feed::VolumeProvider;
use crate::telemetry::{self, LatencyMetric};
use clap::Args;
use std::time::Instant;

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Stock ticker (e.g. RELIANCE)
    #[arg(short, long)]
    pub ticker: String,

    /// Lookback period, overrides feed.period
    #[arg(long)]
    pub period: Option<String>,
}

impl FetchArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let client = yahoo_client(config)?;
        let period = self.period.as_deref().unwrap_or(&config.feed.period);

        let started = Instant::now();
        let series = client
            .fetch_series(&self.ticker, period, &config.feed.interval)
            .await?;
        telemetry::record_latency(LatencyMetric::SeriesFetch, started.elapsed());

        let Some(series) = series else {
            println!("No data found for {}.", self.ticker);
            return Ok(());
        };

        let path = series_store(config).write_series(&self.ticker, &series)?;
        println!(
            "Saved {} bars for {} to {}",
            series.len(),
            self.ticker,
            path.display()
        );
        Ok(())
    }
}
