//! Option chain module
//!
//! Per-strike call/put trade aggregates and conversion from the raw
//! exchange option-chain payload.

pub mod nse;
mod types;

pub use nse::{parse_option_chain, ChainParseError, NEAREST_EXPIRY};
pub use types::{OptionChainSnapshot, OptionContractQuote, OptionSide};
