//! Parquet storage integration tests

use chrono::{DateTime, Duration, Utc};
use iva_ofe::anomaly::{AnomalyDetector, VolumeBar};
use iva_ofe::config::DetectorConfig;
use iva_ofe::data::{FlowRecorder, FlowSample, ParquetReader, ParquetWriter, RecorderConfig, SeriesStore};
use rust_decimal_macros::dec;
use tempfile::TempDir;

fn start() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-01-06T03:45:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

#[test]
fn test_unordered_file_loads_sorted_and_deduplicated() {
    let temp_dir = TempDir::new().unwrap();
    let writer = ParquetWriter::new(temp_dir.path().to_path_buf());
    let t = start();

    // Written out of order with a duplicated timestamp
    let bars = vec![
        VolumeBar::from_close(t + Duration::minutes(2), dec!(1252), 300),
        VolumeBar::from_close(t, dec!(1250), 100),
        VolumeBar::from_close(t + Duration::minutes(1), dec!(1251), 200),
        VolumeBar::from_close(t + Duration::minutes(1), dec!(1251.5), 250),
    ];
    writer
        .write_volume_bars(&temp_dir.path().join("TCS_1m.parquet"), &bars)
        .unwrap();

    let store = SeriesStore::new(temp_dir.path().to_path_buf(), "1m");
    let series = store.read_series("TCS.NS").unwrap().unwrap();

    let volumes: Vec<u64> = series.bars().iter().map(|b| b.volume).collect();
    assert_eq!(volumes, vec![100, 250, 300]);
    assert!(series
        .bars()
        .windows(2)
        .all(|w| w[0].timestamp < w[1].timestamp));
}

#[test]
fn test_detection_on_stored_series() {
    let temp_dir = TempDir::new().unwrap();
    let store = SeriesStore::new(temp_dir.path().to_path_buf(), "1m");
    let t = start();

    let mut volumes: Vec<u64> = (0..30).map(|i| if i % 2 == 0 { 1_000 } else { 1_200 }).collect();
    volumes.push(2_117);
    let bars: Vec<VolumeBar> = volumes
        .iter()
        .enumerate()
        .map(|(i, v)| VolumeBar::from_close(t + Duration::minutes(i as i64), dec!(1250), *v))
        .collect();
    store
        .write_series("INFY", &iva_ofe::anomaly::VolumeSeries::new(bars).unwrap())
        .unwrap();

    let series = store.read_series("INFY").unwrap().unwrap();
    let anomalies = AnomalyDetector::new(DetectorConfig::default())
        .unwrap()
        .detect(&series);

    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].volume, 2_117);
    assert!((anomalies[0].z_score - 10.0).abs() < 0.01);
}

#[tokio::test]
async fn test_recorder_output_is_readable() {
    let temp_dir = TempDir::new().unwrap();
    let recorder = FlowRecorder::new(
        "HDFCBANK",
        RecorderConfig {
            output_dir: temp_dir.path().to_path_buf(),
            buffer_size: 5,
            flush_interval_secs: 3600,
        },
    );

    for i in 0..3 {
        recorder
            .record(FlowSample {
                timestamp: start() + Duration::minutes(i),
                ticker: "HDFCBANK".to_string(),
                price: dec!(1650.25),
                volume: 4_000,
                total_call_volume: 90_000 + i as u64,
                total_put_volume: 70_000,
            })
            .await
            .unwrap();
    }
    let stats = recorder.shutdown().await.unwrap();
    assert_eq!(stats.samples_written, 3);

    let path = temp_dir
        .path()
        .join("flow_HDFCBANK_20250106_034500.parquet");
    let samples = ParquetReader::new(path).read_flow_samples().unwrap();
    let calls: Vec<u64> = samples.iter().map(|s| s.total_call_volume).collect();
    assert_eq!(calls, vec![90_000, 90_001, 90_002]);
}
