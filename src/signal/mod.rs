//! Signal generation module
//!
//! Confirms volume anomalies with options flow and ranks the results

mod engine;
mod scorer;
mod types;

pub use engine::SignalEngine;
pub use scorer::{ConfirmationScorer, ScoringError};
pub use types::{
    select_best, ConfirmationResult, ConfirmationScore, FlowBias, RunOutcome, RunReport, MAX_SCORE,
};
