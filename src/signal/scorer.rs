//! Options-flow confirmation scoring
//!
//! Scores a chain snapshot 0-5 with three ordered tests:
//!
//! 1. Aggregate volume (+1): calls + puts above the configured threshold.
//! 2. Directional bias (+2): one side's volume exceeds the other's times the
//!    multiplier. Without a dominant side scoring stops here.
//! 3. Mid-price proximity (+2): the most active contract on the dominant
//!    side last traded within the tolerance of its bid/ask midpoint.

use super::types::{ConfirmationScore, FlowBias};
use crate::config::{ConfigError, ScoringConfig};
use crate::options::{OptionChainSnapshot, OptionSide};
use rust_decimal::Decimal;
use thiserror::Error;

const NO_ACTIVITY: &str = "No significant options activity found.";
const SIGNIFICANT_VOLUME: &str = "Significant overall options volume.";

/// Failures while reading a snapshot; reported as a zero score
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScoringError {
    #[error("{0} traded volume total overflowed")]
    VolumeOverflow(OptionSide),
    #[error("no {0} contracts to pick the most active strike from")]
    EmptySide(OptionSide),
}

/// Converts option chain snapshots into confirmation scores
#[derive(Debug, Clone)]
pub struct ConfirmationScorer {
    config: ScoringConfig,
}

impl ConfirmationScorer {
    pub fn new(config: ScoringConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score a snapshot. Never fails: read errors yield score 0 with the
    /// error described in the reason.
    pub fn score(&self, snapshot: &OptionChainSnapshot) -> ConfirmationScore {
        match self.try_score(snapshot) {
            Ok(score) => score,
            Err(e) => {
                tracing::warn!(ticker = %snapshot.ticker, error = %e, "Options analysis failed");
                ConfirmationScore {
                    score: 0,
                    reason: format!("Error during options analysis: {e}"),
                    bias: None,
                    total_call_volume: 0,
                    total_put_volume: 0,
                    top_contract: None,
                }
            }
        }
    }

    fn try_score(&self, snapshot: &OptionChainSnapshot) -> Result<ConfirmationScore, ScoringError> {
        let total_ce = snapshot
            .total_volume(OptionSide::Call)
            .ok_or(ScoringError::VolumeOverflow(OptionSide::Call))?;
        let total_pe = snapshot
            .total_volume(OptionSide::Put)
            .ok_or(ScoringError::VolumeOverflow(OptionSide::Put))?;

        let mut result = ConfirmationScore {
            score: 0,
            reason: NO_ACTIVITY.to_string(),
            bias: None,
            total_call_volume: total_ce,
            total_put_volume: total_pe,
            top_contract: None,
        };

        if u128::from(total_ce) + u128::from(total_pe)
            > u128::from(self.config.aggregate_volume_threshold)
        {
            result.score += 1;
            result.reason = SIGNIFICANT_VOLUME.to_string();
        }

        let multiplier = self.config.directional_multiplier;
        let (bias, side) = if dominates(total_ce, total_pe, multiplier) {
            result.reason = format!(
                "Strong bullish bias: Call volume ({total_ce}) is >{multiplier}x Put volume ({total_pe})."
            );
            (FlowBias::Bullish, OptionSide::Call)
        } else if dominates(total_pe, total_ce, multiplier) {
            result.reason = format!(
                "Strong bearish bias: Put volume ({total_pe}) is >{multiplier}x Call volume ({total_ce})."
            );
            (FlowBias::Bearish, OptionSide::Put)
        } else {
            // No clear direction: the smart-money check does not apply
            return Ok(result);
        };
        result.score += 2;
        result.bias = Some(bias);

        let top = snapshot
            .most_active(side)
            .ok_or(ScoringError::EmptySide(side))?;
        let mid = top.mid_price();
        if mid > Decimal::ZERO
            && (top.last_traded_price - mid).abs() < self.config.mid_price_tolerance * mid
        {
            result.score += 2;
            result.reason.push_str(&format!(
                " High activity at strike {} occurred near its mid-price, indicating institutional flow.",
                top.strike_price.normalize()
            ));
        }
        result.top_contract = Some(top.clone());

        Ok(result)
    }
}

/// `lhs > rhs * multiplier`, false when the product overflows
fn dominates(lhs: u64, rhs: u64, multiplier: Decimal) -> bool {
    Decimal::from(rhs)
        .checked_mul(multiplier)
        .is_some_and(|scaled| Decimal::from(lhs) > scaled)
}
