//! Buffered recorder for real-time flow samples

use super::parquet::{FlowSample, ParquetWriter};
use chrono::{DateTime, Duration, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

/// Configuration for flow recording
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Output directory for Parquet files
    pub output_dir: PathBuf,
    /// Samples buffered before a flush
    pub buffer_size: usize,
    /// Maximum time between flushes
    pub flush_interval_secs: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./data"),
            buffer_size: 60,
            flush_interval_secs: 900,
        }
    }
}

/// Recording statistics
#[derive(Debug, Default, Clone)]
pub struct RecorderStats {
    pub samples_received: u64,
    pub samples_written: u64,
    pub files_written: u64,
    /// Flushes that failed; their samples stay buffered for the next flush
    pub write_failures: u64,
    pub last_flush: Option<DateTime<Utc>>,
}

/// Records flow samples for one ticker to timestamped Parquet files
pub struct FlowRecorder {
    ticker: String,
    tx: mpsc::Sender<FlowSample>,
    stats: Arc<RwLock<RecorderStats>>,
    writer_task: JoinHandle<()>,
}

impl FlowRecorder {
    /// Create a recorder and spawn its writer task
    pub fn new(ticker: &str, config: RecorderConfig) -> Self {
        let (tx, rx) = mpsc::channel(1_024);
        let stats = Arc::new(RwLock::new(RecorderStats::default()));
        let writer = ParquetWriter::new(config.output_dir.clone());
        let prefix = format!("flow_{}", ticker.to_uppercase());

        let task_stats = stats.clone();
        let writer_task = tokio::spawn(async move {
            Self::run_writer(rx, writer, prefix, config, task_stats).await;
        });

        Self {
            ticker: ticker.to_uppercase(),
            tx,
            stats,
            writer_task,
        }
    }

    /// Queue a sample for writing
    pub async fn record(&self, sample: FlowSample) -> anyhow::Result<()> {
        self.tx
            .send(sample)
            .await
            .map_err(|_| anyhow::anyhow!("Flow writer for {} has stopped", self.ticker))
    }

    pub async fn stats(&self) -> RecorderStats {
        self.stats.read().await.clone()
    }

    /// Close the channel, wait for the buffer to be flushed and return final stats
    pub async fn shutdown(self) -> anyhow::Result<RecorderStats> {
        drop(self.tx);
        self.writer_task.await?;
        let stats = self.stats.read().await.clone();
        Ok(stats)
    }

    async fn run_writer(
        mut rx: mpsc::Receiver<FlowSample>,
        writer: ParquetWriter,
        prefix: String,
        config: RecorderConfig,
        stats: Arc<RwLock<RecorderStats>>,
    ) {
        let buffer_size = config.buffer_size.max(1);
        let mut buffer: Vec<FlowSample> = Vec::with_capacity(buffer_size);
        let mut last_flush = Utc::now();
        let flush_interval = Duration::seconds(config.flush_interval_secs as i64);
        let timeout = tokio::time::Duration::from_secs(config.flush_interval_secs.max(1));

        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Some(sample) => {
                            stats.write().await.samples_received += 1;
                            buffer.push(sample);

                            if buffer.len() >= buffer_size {
                                Self::flush(&mut buffer, &writer, &prefix, &stats).await;
                                last_flush = Utc::now();
                            }
                        }
                        None => {
                            Self::flush(&mut buffer, &writer, &prefix, &stats).await;
                            if !buffer.is_empty() {
                                tracing::error!(prefix = %prefix, lost = buffer.len(), "Flow samples unwritten at shutdown");
                            }
                            tracing::info!(prefix = %prefix, "Flow writer shutting down");
                            break;
                        }
                    }
                }

                _ = tokio::time::sleep(timeout) => {
                    let now = Utc::now();
                    if now - last_flush >= flush_interval && !buffer.is_empty() {
                        Self::flush(&mut buffer, &writer, &prefix, &stats).await;
                        last_flush = now;
                    }
                }
            }
        }
    }

    /// Write the buffer to a new file named after the first buffered sample.
    /// The buffer is only cleared once the file is written.
    async fn flush(
        buffer: &mut Vec<FlowSample>,
        writer: &ParquetWriter,
        prefix: &str,
        stats: &Arc<RwLock<RecorderStats>>,
    ) {
        let Some(first) = buffer.first() else {
            return;
        };

        let path = writer.file_path(prefix, first.timestamp);
        let count = buffer.len();

        match writer.write_flow_samples(&path, buffer) {
            Ok(()) => {
                let mut s = stats.write().await;
                s.samples_written += count as u64;
                s.files_written += 1;
                s.last_flush = Some(Utc::now());
                tracing::info!(count, path = ?path, "Flushed flow samples");
                buffer.clear();
            }
            Err(e) => {
                stats.write().await.write_failures += 1;
                tracing::error!(error = %e, path = ?path, count, "Failed to write flow samples, keeping them buffered");
            }
        }
    }
}
