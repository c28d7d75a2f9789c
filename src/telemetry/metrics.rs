//! Prometheus metrics

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Volume anomalies found by the detector
    AnomaliesDetected,
    /// Option chains scored
    ChainsScored,
    /// Option chain requests that returned nothing
    ChainUnavailable,
    /// Flow samples written by the collector
    FlowSamplesRecorded,
}

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Price bar download
    SeriesFetch,
    /// Option chain download
    ChainFetch,
    /// Full engine run
    EngineRun,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Best confirmation score of the last run
    BestScore,
    /// Call volume in the last sampled chain
    CallVolume,
    /// Put volume in the last sampled chain
    PutVolume,
}

/// Install the Prometheus exporter listening on `port`
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;
    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(())
}

/// Increment a counter
pub fn increment_counter(metric: CounterMetric, value: u64) {
    let metric_name = match metric {
        CounterMetric::AnomaliesDetected => "ivaofe_anomalies_detected_total",
        CounterMetric::ChainsScored => "ivaofe_chains_scored_total",
        CounterMetric::ChainUnavailable => "ivaofe_chain_unavailable_total",
        CounterMetric::FlowSamplesRecorded => "ivaofe_flow_samples_recorded_total",
    };
    metrics::counter!(metric_name).increment(value);
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::SeriesFetch => "ivaofe_series_fetch_latency_ms",
        LatencyMetric::ChainFetch => "ivaofe_chain_fetch_latency_ms",
        LatencyMetric::EngineRun => "ivaofe_engine_run_latency_ms",
    };
    metrics::histogram!(metric_name).record(duration.as_secs_f64() * 1_000.0);
}

/// Record a confirmation score
pub fn record_score(score: u8) {
    metrics::histogram!("ivaofe_confirmation_score").record(f64::from(score));
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::BestScore => "ivaofe_best_score",
        GaugeMetric::CallVolume => "ivaofe_call_volume",
        GaugeMetric::PutVolume => "ivaofe_put_volume",
    };
    metrics::gauge!(metric_name).set(value);
}
