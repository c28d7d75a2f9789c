//! Real-time stock and option flow collector

use super::session::is_market_open;
use crate::config::{CollectorConfig, ConfigError};
use crate::data::{FlowRecorder, FlowSample, RecorderStats};
use crate::feed::{OptionChainProvider, VolumeProvider};
use crate::options::OptionSide;
use crate::telemetry::{self, CounterMetric, GaugeMetric};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Clock used to decide whether the market is open
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Samples the latest stock bar and option-chain totals for one ticker at a
/// fixed interval while the market is open
pub struct FlowCollector<V: VolumeProvider, O: OptionChainProvider> {
    ticker: String,
    config: CollectorConfig,
    volume_provider: Arc<V>,
    chain_provider: Arc<O>,
    recorder: FlowRecorder,
    clock: Clock,
}

impl<V: VolumeProvider, O: OptionChainProvider> FlowCollector<V, O> {
    pub fn new(
        ticker: &str,
        config: CollectorConfig,
        volume_provider: Arc<V>,
        chain_provider: Arc<O>,
        recorder: FlowRecorder,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            ticker: ticker.to_uppercase(),
            config,
            volume_provider,
            chain_provider,
            recorder,
            clock: Arc::new(Utc::now),
        })
    }

    /// Replace the wall clock
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Take one sample; `Ok(None)` when either source had nothing
    pub async fn sample(&self) -> anyhow::Result<Option<FlowSample>> {
        let Some(series) = self
            .volume_provider
            .fetch_series(&self.ticker, "1d", "1m")
            .await?
        else {
            return Ok(None);
        };
        let Some(bar) = series.last() else {
            return Ok(None);
        };

        let Some(chain) = self.chain_provider.fetch_chain(&self.ticker).await? else {
            return Ok(None);
        };
        let (Some(total_call_volume), Some(total_put_volume)) = (
            chain.total_volume(OptionSide::Call),
            chain.total_volume(OptionSide::Put),
        ) else {
            anyhow::bail!("Option volume total overflowed for {}", self.ticker);
        };

        Ok(Some(FlowSample {
            timestamp: (self.clock)(),
            ticker: self.ticker.clone(),
            price: bar.close,
            volume: bar.volume,
            total_call_volume,
            total_put_volume,
        }))
    }

    /// Poll until `shutdown` flips to true, then flush and return recorder stats
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<RecorderStats> {
        let poll = Duration::from_secs(self.config.poll_interval_secs);
        let idle = Duration::from_secs(self.config.idle_interval_secs);

        tracing::info!(
            ticker = %self.ticker,
            poll_secs = poll.as_secs(),
            "Flow collector started"
        );

        while !*shutdown.borrow() {
            let now = (self.clock)();
            let wait = if is_market_open(now, &self.config) {
                self.collect_once().await?;
                poll
            } else {
                tracing::info!(time = %now.format("%H:%M:%S"), "Market is closed, collector sleeping");
                idle
            };

            if wait_or_shutdown(wait, &mut shutdown).await {
                break;
            }
        }

        tracing::info!(ticker = %self.ticker, "Flow collector stopping");
        let stats = self.recorder.shutdown().await?;
        tracing::info!(
            written = stats.samples_written,
            files = stats.files_written,
            "Flow collector stopped"
        );
        Ok(stats)
    }

    async fn collect_once(&self) -> anyhow::Result<()> {
        match self.sample().await {
            Ok(Some(sample)) => {
                tracing::info!(
                    ticker = %sample.ticker,
                    price = %sample.price,
                    volume = sample.volume,
                    call_volume = sample.total_call_volume,
                    put_volume = sample.total_put_volume,
                    "Flow sample"
                );
                telemetry::set_gauge(GaugeMetric::CallVolume, sample.total_call_volume as f64);
                telemetry::set_gauge(GaugeMetric::PutVolume, sample.total_put_volume as f64);
                self.recorder.record(sample).await?;
                telemetry::increment_counter(CounterMetric::FlowSamplesRecorded, 1);
            }
            Ok(None) => {
                tracing::warn!(ticker = %self.ticker, "Incomplete data, sample skipped");
            }
            Err(e) => {
                tracing::warn!(ticker = %self.ticker, error = %e, "Sample failed");
            }
        }
        Ok(())
    }
}

/// Sleep for `wait`; returns true as soon as shutdown is requested
async fn wait_or_shutdown(wait: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let sleep = tokio::time::sleep(wait);
    tokio::pin!(sleep);

    let stopped = tokio::select! {
        _ = &mut sleep => return false,
        changed = shutdown.wait_for(|stop| *stop) => changed.is_ok(),
    };
    if !stopped {
        // Sender gone; nobody can stop us early any more
        sleep.await;
    }
    stopped
}
