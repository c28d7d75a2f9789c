//! Collect command implementation

use super::{nse_client, shutdown_on_ctrl_c, yahoo_client};
use crate::collector::FlowCollector;
use crate::config::Config;
use crate::data::{FlowRecorder, RecorderConfig};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Stock ticker (e.g. RELIANCE)
    #[arg(short, long)]
    pub ticker: String,
}

impl CollectArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let recorder = FlowRecorder::new(
            &self.ticker,
            RecorderConfig {
                output_dir: config.data.output_dir.clone(),
                buffer_size: config.collector.buffer_size,
                ..Default::default()
            },
        );
        let collector = FlowCollector::new(
            &self.ticker,
            config.collector.clone(),
            Arc::new(yahoo_client(config)?),
            Arc::new(nse_client(config)?),
            recorder,
        )?;

        println!(
            "Collecting flow for {} every {}s, press Ctrl-C to stop.",
            self.ticker, config.collector.poll_interval_secs
        );
        let stats = collector.run(shutdown_on_ctrl_c()).await?;
        println!(
            "Recorded {} samples in {} files.",
            stats.samples_written, stats.files_written
        );
        Ok(())
    }
}
