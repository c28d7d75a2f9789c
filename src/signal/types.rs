//! Signal types

use crate::anomaly::AnomalyRecord;
use crate::options::OptionContractQuote;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum confirmation score (1 + 2 + 2)
pub const MAX_SCORE: u8 = 5;

/// Direction implied by options flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowBias {
    /// Call volume dominates
    Bullish,
    /// Put volume dominates
    Bearish,
}

/// Outcome of scoring one option chain snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationScore {
    /// 0..=5
    pub score: u8,
    pub reason: String,
    /// Set only when the directional test passed
    pub bias: Option<FlowBias>,
    pub total_call_volume: u64,
    pub total_put_volume: u64,
    /// Most active contract on the dominant side
    pub top_contract: Option<OptionContractQuote>,
}

/// Confirmation score attached to the anomaly that triggered it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationResult {
    /// Timestamp of the anomalous bar
    pub timestamp: DateTime<Utc>,
    pub z_score: f64,
    pub score: u8,
    pub reason: String,
    pub bias: Option<FlowBias>,
    pub total_call_volume: u64,
    pub total_put_volume: u64,
}

impl ConfirmationResult {
    pub fn new(anomaly: &AnomalyRecord, score: ConfirmationScore) -> Self {
        Self {
            timestamp: anomaly.timestamp,
            z_score: anomaly.z_score,
            score: score.score,
            reason: score.reason,
            bias: score.bias,
            total_call_volume: score.total_call_volume,
            total_put_volume: score.total_put_volume,
        }
    }
}

/// Terminal classification of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "signal", rename_all = "snake_case")]
pub enum RunOutcome {
    /// No volume data was available
    NoData,
    /// The series contained no anomalies
    NoAnomalies,
    /// Every anomaly was skipped for lack of option data
    NoResults,
    /// Best result did not clear the high-conviction threshold
    LowConviction(ConfirmationResult),
    /// Best result cleared the high-conviction threshold
    HighConviction(ConfirmationResult),
}

impl RunOutcome {
    /// Best result, when any anomaly was scored
    pub fn best(&self) -> Option<&ConfirmationResult> {
        match self {
            RunOutcome::LowConviction(result) | RunOutcome::HighConviction(result) => Some(result),
            _ => None,
        }
    }

    pub fn is_high_conviction(&self) -> bool {
        matches!(self, RunOutcome::HighConviction(_))
    }
}

/// Everything produced by one engine run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub ticker: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Detected anomalies in chronological order
    pub anomalies: Vec<AnomalyRecord>,
    /// Scored anomalies, highest score first (chronological among equals)
    pub results: Vec<ConfirmationResult>,
    /// Anomalies skipped because no option chain was available
    pub skipped: usize,
    /// Run stopped early on a shutdown request
    pub cancelled: bool,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn best(&self) -> Option<&ConfirmationResult> {
        self.outcome.best()
    }
}

/// Highest-scoring result; the earliest wins ties
pub fn select_best(results: &[ConfirmationResult]) -> Option<&ConfirmationResult> {
    results.iter().fold(None, |best, candidate| match best {
        Some(current) if current.score >= candidate.score => Some(current),
        _ => Some(candidate),
    })
}
