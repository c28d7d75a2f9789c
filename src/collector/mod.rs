//! Real-time flow collection
//!
//! Samples stock price/volume and option-chain volume totals during market
//! hours and records them to Parquet

mod flow;
mod session;

pub use flow::{Clock, FlowCollector};
pub use session::{is_market_open, local_hour};
