//! End-to-end pipeline tests: stored bars -> detection -> NSE payload scoring -> best-of

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use iva_ofe::anomaly::{AnomalyDetector, VolumeBar, VolumeSeries};
use iva_ofe::config::{DetectorConfig, EngineConfig, ScoringConfig};
use iva_ofe::data::SeriesStore;
use iva_ofe::feed::OptionChainProvider;
use iva_ofe::options::{parse_option_chain, OptionChainSnapshot, OptionSide, NEAREST_EXPIRY};
use iva_ofe::signal::{ConfirmationScorer, FlowBias, RunOutcome, SignalEngine};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use tempfile::TempDir;

/// Serves raw NSE payloads in order; `None` entries mean "unavailable"
struct PayloadProvider {
    payloads: Mutex<VecDeque<Option<Value>>>,
}

impl PayloadProvider {
    fn new(payloads: Vec<Option<Value>>) -> Self {
        Self {
            payloads: Mutex::new(payloads.into()),
        }
    }
}

#[async_trait]
impl OptionChainProvider for PayloadProvider {
    async fn fetch_chain(&self, ticker: &str) -> anyhow::Result<Option<OptionChainSnapshot>> {
        let payload = self.payloads.lock().unwrap().pop_front().flatten();
        match payload {
            Some(payload) => Ok(Some(parse_option_chain(ticker, &payload, None)?)),
            None => Ok(None),
        }
    }
}

fn row(strike: u32, ce: Option<(u64, f64, f64, f64)>, pe: Option<(u64, f64, f64, f64)>) -> Value {
    let side = |q: Option<(u64, f64, f64, f64)>| {
        q.map(|(volume, ltp, bid, ask)| {
            json!({
                "totalTradedVolume": volume,
                "lastPrice": ltp,
                "bidprice": bid,
                "askPrice": ask,
                "openInterest": 1000
            })
        })
    };
    let mut row = json!({"strikePrice": strike, "expiryDate": "30-Jan-2025"});
    if let Some(ce) = side(ce) {
        row["CE"] = ce;
    }
    if let Some(pe) = side(pe) {
        row["PE"] = pe;
    }
    row
}

fn payload(rows: Vec<Value>) -> Value {
    json!({
        "records": {
            "expiryDates": ["30-Jan-2025", "27-Feb-2025"],
            "timestamp": "06-Jan-2025 11:15:00",
            "underlyingValue": 1251.35,
            "data": rows
        }
    })
}

/// Call 15,000 vs put 3,000, most active call traded at its mid: scores 5
fn bullish_payload() -> Value {
    payload(vec![
        row(1240, None, Some((3_000, 12.0, 11.0, 14.0))),
        row(1260, Some((10_000, 20.0, 19.5, 20.5)), None),
        row(1280, Some((5_000, 11.0, 10.0, 13.0)), None),
    ])
}

/// Balanced 4,000 vs 4,000: scores 0
fn quiet_payload() -> Value {
    payload(vec![
        row(1240, Some((2_500, 25.0, 24.0, 26.0)), Some((1_500, 9.0, 8.5, 9.5))),
        row(1260, Some((1_500, 18.0, 17.0, 19.0)), Some((2_500, 14.0, 13.0, 15.0))),
    ])
}

/// Put 6,000 vs call 1,000 away from mid: scores 2
fn bearish_payload() -> Value {
    payload(vec![
        row(1240, Some((1_000, 25.0, 24.5, 25.5)), Some((6_000, 30.0, 10.0, 11.0))),
    ])
}

/// Three sessions' worth of quiet bars with spikes at the given indices
fn session_series(spikes: &[usize]) -> VolumeSeries {
    let start = DateTime::parse_from_rfc3339("2025-01-06T03:45:00Z")
        .unwrap()
        .with_timezone(&Utc);
    let bars = (0..150)
        .map(|i| {
            let volume = if spikes.contains(&i) {
                600_000
            } else {
                12_000 + (i as u64 % 5) * 200
            };
            VolumeBar::from_close(start + Duration::minutes(i as i64), dec!(1251.30), volume)
        })
        .collect();
    VolumeSeries::new(bars).unwrap()
}

fn engine(payloads: Vec<Option<Value>>) -> SignalEngine<PayloadProvider> {
    SignalEngine::new(
        EngineConfig {
            pacing_interval_ms: 0,
            ..Default::default()
        },
        AnomalyDetector::new(DetectorConfig::default()).unwrap(),
        ConfirmationScorer::new(ScoringConfig::default()).unwrap(),
        std::sync::Arc::new(PayloadProvider::new(payloads)),
    )
    .unwrap()
}

#[tokio::test]
async fn test_stored_series_to_high_conviction_signal() {
    let temp_dir = TempDir::new().unwrap();
    let store = SeriesStore::new(temp_dir.path().to_path_buf(), "1m");
    let spikes = [35, 75, 115];
    store
        .write_series("RELIANCE.NS", &session_series(&spikes))
        .unwrap();
    let series = store.read_series("RELIANCE").unwrap();

    let engine = engine(vec![
        Some(quiet_payload()),
        Some(bullish_payload()),
        Some(bearish_payload()),
    ]);
    let report = engine.run("RELIANCE", series.as_ref()).await;

    assert_eq!(report.anomalies.len(), 3);
    let scores: Vec<u8> = report.results.iter().map(|r| r.score).collect();
    assert_eq!(scores, vec![5, 2, 0]);

    let RunOutcome::HighConviction(best) = &report.outcome else {
        panic!("expected high conviction, got {:?}", report.outcome);
    };
    assert_eq!(best.score, 5);
    assert_eq!(best.timestamp, report.anomalies[1].timestamp);
    assert_eq!(best.bias, Some(FlowBias::Bullish));
    assert!(best.reason.contains("Strong bullish bias"));
    assert!(best.reason.contains("strike 1260"));
    assert_eq!(best.total_call_volume, 15_000);
    assert_eq!(best.total_put_volume, 3_000);
}

#[tokio::test]
async fn test_unavailable_chains_give_no_results() {
    let engine = engine(vec![None, None]);
    let series = session_series(&[50, 100]);

    let report = engine.run("RELIANCE", Some(&series)).await;

    assert_eq!(report.anomalies.len(), 2);
    assert_eq!(report.skipped, 2);
    assert!(report.results.is_empty());
    assert_eq!(report.outcome, RunOutcome::NoResults);
}

#[tokio::test]
async fn test_quiet_chains_are_low_conviction() {
    let engine = engine(vec![Some(quiet_payload()), Some(bearish_payload())]);
    let series = session_series(&[50, 100]);

    let report = engine.run("RELIANCE", Some(&series)).await;

    let RunOutcome::LowConviction(best) = &report.outcome else {
        panic!("expected low conviction, got {:?}", report.outcome);
    };
    assert_eq!(best.score, 2);
    assert_eq!(best.bias, Some(FlowBias::Bearish));
}

/// Same strike listed for two expiries: balanced nearest month, call-heavy next month
fn two_expiry_payload() -> Value {
    json!({
        "records": {
            "expiryDates": ["30-Jan-2025", "27-Feb-2025"],
            "data": [
                {
                    "strikePrice": 1300,
                    "expiryDate": "30-Jan-2025",
                    "CE": {"totalTradedVolume": 4000},
                    "PE": {"totalTradedVolume": 4000}
                },
                {
                    "strikePrice": 1300,
                    "expiryDate": "27-Feb-2025",
                    "CE": {"totalTradedVolume": 9000},
                    "PE": {"totalTradedVolume": 100}
                }
            ]
        }
    })
}

#[test]
fn test_volume_across_expiries_drives_score() {
    let scorer = ConfirmationScorer::new(ScoringConfig::default()).unwrap();

    let snapshot = parse_option_chain("RELIANCE", &two_expiry_payload(), None).unwrap();
    assert_eq!(snapshot.total_volume(OptionSide::Call), Some(13_000));
    assert_eq!(snapshot.total_volume(OptionSide::Put), Some(4_100));

    let all = scorer.score(&snapshot);
    assert_eq!(all.total_call_volume, 13_000);
    assert_eq!(all.total_put_volume, 4_100);
    assert_eq!(all.score, 3);
    assert_eq!(all.bias, Some(FlowBias::Bullish));

    // Nearest expiry alone is balanced below the aggregate threshold
    let nearest =
        parse_option_chain("RELIANCE", &two_expiry_payload(), Some(NEAREST_EXPIRY)).unwrap();
    let nearest = scorer.score(&nearest);
    assert_eq!(nearest.score, 0);
    assert_eq!(nearest.bias, None);
}

#[tokio::test]
async fn test_missing_stored_series_is_no_data() {
    let temp_dir = TempDir::new().unwrap();
    let store = SeriesStore::new(temp_dir.path().to_path_buf(), "1m");
    let series = store.read_series("RELIANCE").unwrap();

    let report = engine(Vec::new()).run("RELIANCE", series.as_ref()).await;
    assert_eq!(report.outcome, RunOutcome::NoData);
}

#[tokio::test]
async fn test_report_serializes_outcome() {
    let engine = engine(vec![Some(bullish_payload())]);
    let series = session_series(&[60]);

    let report = engine.run("RELIANCE", Some(&series)).await;
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["ticker"], "RELIANCE");
    assert_eq!(json["outcome"]["kind"], "high_conviction");
    assert_eq!(json["outcome"]["signal"]["score"], 5);
}
