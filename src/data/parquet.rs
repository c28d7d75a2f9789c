//! Parquet file writer and reader

use crate::anomaly::VolumeBar;
use arrow::array::{Array, ArrayRef, StringArray, TimestampMicrosecondArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rust_decimal::Decimal;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

fn timestamp_field(name: &str) -> Field {
    Field::new(
        name,
        DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
        false,
    )
}

/// OHLCV bar schema; prices stored as strings for Decimal precision
pub fn volume_bar_schema() -> Schema {
    Schema::new(vec![
        timestamp_field("timestamp"),
        Field::new("open", DataType::Utf8, false),
        Field::new("high", DataType::Utf8, false),
        Field::new("low", DataType::Utf8, false),
        Field::new("close", DataType::Utf8, false),
        Field::new("volume", DataType::UInt64, false),
    ])
}

/// Combined stock/options flow sample schema
pub fn flow_sample_schema() -> Schema {
    Schema::new(vec![
        timestamp_field("timestamp"),
        Field::new("ticker", DataType::Utf8, false),
        Field::new("stock_price", DataType::Utf8, false),
        Field::new("stock_volume", DataType::UInt64, false),
        Field::new("total_ce_volume", DataType::UInt64, false),
        Field::new("total_pe_volume", DataType::UInt64, false),
    ])
}

/// One real-time sample of stock and option-chain activity
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSample {
    pub timestamp: DateTime<Utc>,
    pub ticker: String,
    pub price: Decimal,
    pub volume: u64,
    pub total_call_volume: u64,
    pub total_put_volume: u64,
}

/// Parquet file writer
pub struct ParquetWriter {
    output_dir: PathBuf,
}

impl ParquetWriter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    /// Ensure output directory exists
    pub fn ensure_dir(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Generate a file path for a given timestamp and prefix
    pub fn file_path(&self, prefix: &str, timestamp: DateTime<Utc>) -> PathBuf {
        let filename = format!("{}_{}.parquet", prefix, timestamp.format("%Y%m%d_%H%M%S"));
        self.output_dir.join(filename)
    }

    fn write_batch(&self, path: &Path, batch: RecordBatch) -> anyhow::Result<()> {
        self.ensure_dir()?;
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(())
    }

    /// Write OHLCV bars to a Parquet file
    pub fn write_volume_bars(&self, path: &Path, bars: &[VolumeBar]) -> anyhow::Result<()> {
        if bars.is_empty() {
            return Ok(());
        }

        let timestamps: Vec<i64> = bars.iter().map(|b| b.timestamp.timestamp_micros()).collect();
        let decimal_column = |f: fn(&VolumeBar) -> Decimal| -> ArrayRef {
            let values: Vec<String> = bars.iter().map(|b| f(b).to_string()).collect();
            Arc::new(StringArray::from(values))
        };

        let batch = RecordBatch::try_new(
            Arc::new(volume_bar_schema()),
            vec![
                Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone("UTC")),
                decimal_column(|b| b.open),
                decimal_column(|b| b.high),
                decimal_column(|b| b.low),
                decimal_column(|b| b.close),
                Arc::new(UInt64Array::from_iter_values(bars.iter().map(|b| b.volume))),
            ],
        )?;

        self.write_batch(path, batch)?;
        tracing::debug!(path = ?path, count = bars.len(), "Wrote volume bars to Parquet");
        Ok(())
    }

    /// Write flow samples to a Parquet file
    pub fn write_flow_samples(&self, path: &Path, samples: &[FlowSample]) -> anyhow::Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let timestamps: Vec<i64> = samples
            .iter()
            .map(|s| s.timestamp.timestamp_micros())
            .collect();
        let tickers: Vec<&str> = samples.iter().map(|s| s.ticker.as_str()).collect();
        let prices: Vec<String> = samples.iter().map(|s| s.price.to_string()).collect();

        let batch = RecordBatch::try_new(
            Arc::new(flow_sample_schema()),
            vec![
                Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone("UTC")),
                Arc::new(StringArray::from(tickers)),
                Arc::new(StringArray::from(prices)),
                Arc::new(UInt64Array::from_iter_values(samples.iter().map(|s| s.volume))),
                Arc::new(UInt64Array::from_iter_values(
                    samples.iter().map(|s| s.total_call_volume),
                )),
                Arc::new(UInt64Array::from_iter_values(
                    samples.iter().map(|s| s.total_put_volume),
                )),
            ],
        )?;

        self.write_batch(path, batch)?;
        tracing::debug!(path = ?path, count = samples.len(), "Wrote flow samples to Parquet");
        Ok(())
    }
}

/// Reader for Parquet files
pub struct ParquetReader {
    path: PathBuf,
}

impl ParquetReader {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn batches(&self) -> anyhow::Result<Vec<RecordBatch>> {
        let file = File::open(&self.path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
        Ok(reader.collect::<Result<Vec<_>, _>>()?)
    }

    /// Read OHLCV bars in file order
    pub fn read_volume_bars(&self) -> anyhow::Result<Vec<VolumeBar>> {
        let mut bars = Vec::new();

        for batch in self.batches()? {
            let timestamps = column::<TimestampMicrosecondArray>(&batch, "timestamp")?;
            let open = column::<StringArray>(&batch, "open")?;
            let high = column::<StringArray>(&batch, "high")?;
            let low = column::<StringArray>(&batch, "low")?;
            let close = column::<StringArray>(&batch, "close")?;
            let volume = column::<UInt64Array>(&batch, "volume")?;

            for i in 0..batch.num_rows() {
                let timestamp = DateTime::from_timestamp_micros(timestamps.value(i))
                    .ok_or_else(|| anyhow::anyhow!("Invalid timestamp"))?;
                bars.push(VolumeBar {
                    timestamp,
                    open: Decimal::from_str(open.value(i))?,
                    high: Decimal::from_str(high.value(i))?,
                    low: Decimal::from_str(low.value(i))?,
                    close: Decimal::from_str(close.value(i))?,
                    volume: volume.value(i),
                });
            }
        }

        Ok(bars)
    }

    /// Read flow samples in file order
    pub fn read_flow_samples(&self) -> anyhow::Result<Vec<FlowSample>> {
        let mut samples = Vec::new();

        for batch in self.batches()? {
            let timestamps = column::<TimestampMicrosecondArray>(&batch, "timestamp")?;
            let tickers = column::<StringArray>(&batch, "ticker")?;
            let prices = column::<StringArray>(&batch, "stock_price")?;
            let volumes = column::<UInt64Array>(&batch, "stock_volume")?;
            let calls = column::<UInt64Array>(&batch, "total_ce_volume")?;
            let puts = column::<UInt64Array>(&batch, "total_pe_volume")?;

            for i in 0..batch.num_rows() {
                let timestamp = DateTime::from_timestamp_micros(timestamps.value(i))
                    .ok_or_else(|| anyhow::anyhow!("Invalid timestamp"))?;
                samples.push(FlowSample {
                    timestamp,
                    ticker: tickers.value(i).to_string(),
                    price: Decimal::from_str(prices.value(i))?,
                    volume: volumes.value(i),
                    total_call_volume: calls.value(i),
                    total_put_volume: puts.value(i),
                });
            }
        }

        Ok(samples)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Typed column lookup by name
fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> anyhow::Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| anyhow::anyhow!("Invalid {} column", name))
}
