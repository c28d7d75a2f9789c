//! Exchange trading session window

use crate::config::CollectorConfig;
use chrono::{DateTime, Duration, Timelike, Utc};

/// Exchange-local wall-clock hour for a UTC instant
pub fn local_hour(now: DateTime<Utc>, utc_offset_minutes: i32) -> u32 {
    (now + Duration::minutes(i64::from(utc_offset_minutes))).hour()
}

/// True when the exchange-local hour falls within the configured session,
/// both ends inclusive
pub fn is_market_open(now: DateTime<Utc>, config: &CollectorConfig) -> bool {
    let hour = local_hour(now, config.utc_offset_minutes);
    (config.market_open_hour..=config.market_close_hour).contains(&hour)
}
