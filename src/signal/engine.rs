//! Signal engine
//!
//! Runs the full pipeline for one ticker:
//! 1. Detect volume anomalies in the series
//! 2. For each anomaly, in order, fetch a fresh option chain and score it
//! 3. Pick the best-scoring anomaly and classify the run
//!
//! Chain requests are strictly sequential with a pause between them; the
//! exchange rate-limits aggressive clients.

use super::scorer::ConfirmationScorer;
use super::types::{select_best, ConfirmationResult, RunOutcome, RunReport};
use crate::anomaly::{AnomalyDetector, VolumeSeries};
use crate::config::{ConfigError, EngineConfig};
use crate::feed::OptionChainProvider;
use crate::telemetry::{self, CounterMetric, GaugeMetric, LatencyMetric};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use uuid::Uuid;

/// Confirms volume anomalies against live options flow
pub struct SignalEngine<P: OptionChainProvider> {
    config: EngineConfig,
    detector: AnomalyDetector,
    scorer: ConfirmationScorer,
    provider: Arc<P>,
}

impl<P: OptionChainProvider> SignalEngine<P> {
    pub fn new(
        config: EngineConfig,
        detector: AnomalyDetector,
        scorer: ConfirmationScorer,
        provider: Arc<P>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            detector,
            scorer,
            provider,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the pipeline to completion
    pub async fn run(&self, ticker: &str, series: Option<&VolumeSeries>) -> RunReport {
        self.execute(ticker, series, None).await
    }

    /// Run the pipeline, stopping between anomalies once `shutdown` turns true.
    /// Anomalies scored before the stop still take part in best-of selection.
    pub async fn run_with_shutdown(
        &self,
        ticker: &str,
        series: Option<&VolumeSeries>,
        shutdown: watch::Receiver<bool>,
    ) -> RunReport {
        self.execute(ticker, series, Some(shutdown)).await
    }

    async fn execute(
        &self,
        ticker: &str,
        series: Option<&VolumeSeries>,
        mut shutdown: Option<watch::Receiver<bool>>,
    ) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let started = Instant::now();

        let mut report = RunReport {
            run_id,
            ticker: ticker.to_string(),
            started_at,
            finished_at: started_at,
            anomalies: Vec::new(),
            results: Vec::new(),
            skipped: 0,
            cancelled: false,
            outcome: RunOutcome::NoData,
        };

        let Some(series) = series.filter(|s| !s.is_empty()) else {
            tracing::warn!(%run_id, ticker, "No volume data available");
            return self.finish(report, started);
        };

        report.anomalies = self.detector.detect(series);
        telemetry::increment_counter(CounterMetric::AnomaliesDetected, report.anomalies.len() as u64);
        if report.anomalies.is_empty() {
            tracing::info!(%run_id, ticker, bars = series.len(), "No significant volume anomalies found");
            report.outcome = RunOutcome::NoAnomalies;
            return self.finish(report, started);
        }

        tracing::info!(
            %run_id,
            ticker,
            anomalies = report.anomalies.len(),
            "Found anomalies, analyzing each"
        );

        let mut results: Vec<ConfirmationResult> = Vec::with_capacity(report.anomalies.len());
        for (i, anomaly) in report.anomalies.iter().enumerate() {
            if is_shutdown(&shutdown) {
                report.cancelled = true;
                break;
            }
            if i > 0 && self.pause(&mut shutdown).await {
                report.cancelled = true;
                break;
            }

            tracing::info!(
                %run_id,
                timestamp = %anomaly.timestamp,
                z_score = anomaly.z_score,
                volume = anomaly.volume,
                "Analyzing anomaly"
            );

            let fetch_started = Instant::now();
            let fetched = self.provider.fetch_chain(ticker).await;
            telemetry::record_latency(LatencyMetric::ChainFetch, fetch_started.elapsed());

            let snapshot = match fetched {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => {
                    tracing::warn!(%run_id, timestamp = %anomaly.timestamp, "Could not fetch options data for this anomaly");
                    telemetry::increment_counter(CounterMetric::ChainUnavailable, 1);
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(%run_id, timestamp = %anomaly.timestamp, error = %e, "Option chain request failed");
                    telemetry::increment_counter(CounterMetric::ChainUnavailable, 1);
                    report.skipped += 1;
                    continue;
                }
            };

            let score = self.scorer.score(&snapshot);
            telemetry::increment_counter(CounterMetric::ChainsScored, 1);
            telemetry::record_score(score.score);
            tracing::info!(
                %run_id,
                timestamp = %anomaly.timestamp,
                score = score.score,
                reason = %score.reason,
                "Confirmation score"
            );

            results.push(ConfirmationResult::new(anomaly, score));
        }

        report.outcome = match select_best(&results) {
            None => RunOutcome::NoResults,
            Some(best) if best.score > self.config.high_conviction_threshold => {
                RunOutcome::HighConviction(best.clone())
            }
            Some(best) => RunOutcome::LowConviction(best.clone()),
        };

        // Stable: chronological order survives among equal scores
        results.sort_by(|a, b| b.score.cmp(&a.score));
        report.results = results;

        self.finish(report, started)
    }

    /// Wait out the pacing interval; true when shutdown was requested meanwhile
    async fn pause(&self, shutdown: &mut Option<watch::Receiver<bool>>) -> bool {
        if self.config.pacing_interval_ms == 0 {
            return false;
        }
        let sleep = tokio::time::sleep(Duration::from_millis(self.config.pacing_interval_ms));
        tokio::pin!(sleep);

        let Some(rx) = shutdown.as_mut() else {
            sleep.await;
            return false;
        };
        let cancelled = tokio::select! {
            _ = &mut sleep => return false,
            changed = rx.wait_for(|stop| *stop) => changed.is_ok(),
        };
        if !cancelled {
            // Sender dropped: nobody can cancel any more
            sleep.await;
        }
        cancelled
    }

    fn finish(&self, mut report: RunReport, started: Instant) -> RunReport {
        report.finished_at = Utc::now();
        telemetry::record_latency(LatencyMetric::EngineRun, started.elapsed());
        if let Some(best) = report.best() {
            telemetry::set_gauge(GaugeMetric::BestScore, f64::from(best.score));
        }

        match &report.outcome {
            RunOutcome::HighConviction(best) => tracing::info!(
                run_id = %report.run_id,
                timestamp = %best.timestamp,
                z_score = best.z_score,
                score = best.score,
                reason = %best.reason,
                "Strongest signal of the day"
            ),
            RunOutcome::LowConviction(best) => tracing::info!(
                run_id = %report.run_id,
                best_score = best.score,
                "No high-conviction signals found after analysis"
            ),
            RunOutcome::NoResults => tracing::info!(
                run_id = %report.run_id,
                skipped = report.skipped,
                "Analysis complete, but no results were generated"
            ),
            RunOutcome::NoData | RunOutcome::NoAnomalies => {}
        }

        report
    }
}

fn is_shutdown(shutdown: &Option<watch::Receiver<bool>>) -> bool {
    shutdown.as_ref().is_some_and(|rx| *rx.borrow())
}
