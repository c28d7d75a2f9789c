//! Chain command implementation

use super::nse_client;
use crate::config::Config;
use crate::feed::OptionChainProvider;
use crate::options::OptionSide;
use crate::signal::{ConfirmationScorer, MAX_SCORE};
use crate::telemetry::{self, LatencyMetric};
use clap::Args;
use std::time::Instant;

#[derive(Args, Debug)]
pub struct ChainArgs {
    /// Underlying symbol (e.g. RELIANCE, NIFTY)
    #[arg(short, long)]
    pub ticker: String,
}

impl ChainArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let client = nse_client(config)?;
        let scorer = ConfirmationScorer::new(config.scoring.clone())?;

        let started = Instant::now();
        let chain = client.fetch_chain(&self.ticker).await?;
        telemetry::record_latency(LatencyMetric::ChainFetch, started.elapsed());

        let Some(chain) = chain else {
            println!("Could not fetch options data for {}.", self.ticker);
            return Ok(());
        };

        println!("Option chain for {}", chain.ticker);
        if let Some(expiry) = &chain.expiry {
            println!("  Expiry: {}", expiry);
        }
        if let Some(underlying) = chain.underlying_value {
            println!("  Underlying: {}", underlying);
        }
        println!("  Strikes: {}", chain.strike_count());

        for side in [OptionSide::Call, OptionSide::Put] {
            let total = chain
                .total_volume(side)
                .map_or_else(|| "overflow".to_string(), |v| v.to_string());
            match chain.most_active(side) {
                Some(top) => println!(
                    "  {} volume: {} (most active {} @ {}, LTP {}, bid {}, ask {})",
                    side,
                    total,
                    top.strike_price.normalize(),
                    top.traded_volume,
                    top.last_traded_price,
                    top.bid,
                    top.ask
                ),
                None => println!("  {} volume: {}", side, total),
            }
        }

        let score = scorer.score(&chain);
        println!("Confirmation Score: {}/{}. Reason: {}", score.score, MAX_SCORE, score.reason);
        Ok(())
    }
}
