//! CLI interface for iva-ofe
//!
//! Provides subcommands for:
//! - `fetch`: Download price bars and store them
//! - `detect`: Find volume anomalies in stored bars
//! - `chain`: Fetch and score the live option chain
//! - `run`: Full anomaly + options confirmation pipeline
//! - `collect`: Record real-time stock/option flow
//! - `config`: Show configuration

mod chain;
mod collect;
mod detect;
mod fetch;
mod run;

pub use chain::ChainArgs;
pub use collect::CollectArgs;
pub use detect::DetectArgs;
pub use fetch::FetchArgs;
pub use run::RunArgs;

use crate::config::Config;
use crate::data::SeriesStore;
use crate::feed::{NseConfig, NseOptionChainClient, YahooChartClient, YahooConfig};
use clap::{Parser, Subcommand};
use std::time::Duration;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(name = "iva-ofe")]
#[command(about = "Intraday volume anomaly and options flow confirmation engine")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download intraday bars and store them as Parquet
    Fetch(FetchArgs),
    /// Detect volume anomalies in stored bars
    Detect(DetectArgs),
    /// Fetch the live option chain and score it
    Chain(ChainArgs),
    /// Detect anomalies and confirm them against the option chain
    Run(RunArgs),
    /// Record real-time stock and option flow
    Collect(CollectArgs),
    /// Show configuration
    Config,
}

fn yahoo_client(config: &Config) -> anyhow::Result<YahooChartClient> {
    YahooChartClient::with_config(YahooConfig {
        exchange_suffix: config.feed.exchange_suffix.clone(),
        timeout: Duration::from_secs(config.feed.request_timeout_secs),
        ..Default::default()
    })
}

fn nse_client(config: &Config) -> anyhow::Result<NseOptionChainClient> {
    NseOptionChainClient::with_config(NseConfig {
        timeout: Duration::from_secs(config.feed.request_timeout_secs),
        expiry: config.feed.expiry.clone(),
        ..Default::default()
    })
}

fn series_store(config: &Config) -> SeriesStore {
    SeriesStore::new(config.data.output_dir.clone(), &config.feed.interval)
}

/// Receiver that flips to true on Ctrl-C
fn shutdown_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            let _ = tx.send(true);
        }
    });
    rx
}
