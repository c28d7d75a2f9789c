//! Per-ticker price bar storage

use super::parquet::{ParquetReader, ParquetWriter};
use crate::anomaly::VolumeSeries;
use std::path::PathBuf;

/// Stores one Parquet file per ticker and bar interval
pub struct SeriesStore {
    writer: ParquetWriter,
    interval: String,
}

impl SeriesStore {
    pub fn new(output_dir: PathBuf, interval: &str) -> Self {
        Self {
            writer: ParquetWriter::new(output_dir),
            interval: interval.to_string(),
        }
    }

    /// `<dir>/<TICKER>_<interval>.parquet`, exchange suffix stripped
    pub fn series_path(&self, ticker: &str) -> PathBuf {
        let base = ticker.split('.').next().unwrap_or(ticker).to_uppercase();
        self.writer
            .output_dir()
            .join(format!("{}_{}.parquet", base, self.interval))
    }

    /// Persist a series, replacing any previous file for the ticker
    pub fn write_series(&self, ticker: &str, series: &VolumeSeries) -> anyhow::Result<PathBuf> {
        let path = self.series_path(ticker);
        if series.is_empty() {
            anyhow::bail!("Refusing to store an empty series for {}", ticker);
        }
        self.writer.write_volume_bars(&path, series.bars())?;
        tracing::info!(ticker, bars = series.len(), path = ?path, "Stored price series");
        Ok(path)
    }

    /// Load a stored series; `None` when nothing has been stored yet
    pub fn read_series(&self, ticker: &str) -> anyhow::Result<Option<VolumeSeries>> {
        let path = self.series_path(ticker);
        if !path.exists() {
            tracing::warn!(ticker, path = ?path, "No stored series");
            return Ok(None);
        }

        let bars = ParquetReader::new(path).read_volume_bars()?;
        Ok(Some(VolumeSeries::from_unordered(bars)))
    }
}
