//! NSE option-chain payload conversion
//!
//! The exchange publishes the chain as `records.data[]`, one row per
//! (strike, expiry) with optional `CE` and `PE` objects. Field values are
//! unreliable: sides may be absent, non-objects, or missing individual
//! fields. Anything unreadable on a present side becomes a zero-filled quote.

use super::types::{OptionChainSnapshot, OptionContractQuote, OptionSide};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;
use thiserror::Error;

/// Expiry setting that selects the first listed (nearest) expiry
pub const NEAREST_EXPIRY: &str = "nearest";

/// NSE timestamps are India Standard Time
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Payload shape errors that make the whole chain unusable
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainParseError {
    #[error("option chain payload has no `records` object")]
    MissingRecords,
    #[error("option chain payload has no `records.data` array")]
    MissingData,
}

/// Convert a raw NSE option-chain payload into a snapshot
///
/// Without `expiry` every row counts: side totals sum traded volume across
/// all expiries, and a strike listed for several expiries keeps its most
/// active quote. `expiry` restricts rows to one expiry date, or to the first
/// entry of `records.expiryDates` when it is [`NEAREST_EXPIRY`].
pub fn parse_option_chain(
    ticker: &str,
    payload: &Value,
    expiry: Option<&str>,
) -> Result<OptionChainSnapshot, ChainParseError> {
    let records = payload
        .get("records")
        .and_then(Value::as_object)
        .ok_or(ChainParseError::MissingRecords)?;
    let rows = records
        .get("data")
        .and_then(Value::as_array)
        .ok_or(ChainParseError::MissingData)?;

    let target_expiry = match expiry {
        Some(NEAREST_EXPIRY) => records
            .get("expiryDates")
            .and_then(Value::as_array)
            .and_then(|dates| dates.first())
            .and_then(Value::as_str)
            .map(str::to_string),
        other => other.map(str::to_string),
    };

    let mut snapshot = OptionChainSnapshot::new(ticker);
    snapshot.expiry = target_expiry.clone();
    snapshot.underlying_value = records.get("underlyingValue").and_then(parse_decimal);
    if let Some(ts) = records
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(parse_exchange_timestamp)
    {
        snapshot.captured_at = ts;
    }

    let mut skipped = 0usize;
    for row in rows {
        let Some(row) = row.as_object() else {
            skipped += 1;
            continue;
        };
        let Some(strike) = row.get("strikePrice").and_then(parse_decimal) else {
            skipped += 1;
            continue;
        };
        if let (Some(target), Some(row_expiry)) = (
            target_expiry.as_deref(),
            row.get("expiryDate").and_then(Value::as_str),
        ) {
            if row_expiry != target {
                continue;
            }
        }

        for side in [OptionSide::Call, OptionSide::Put] {
            if let Some(raw) = row.get(side.code()) {
                snapshot.merge(side, parse_quote(strike, raw));
            }
        }
    }

    if skipped > 0 {
        tracing::debug!(ticker, skipped, "Skipped option chain rows without a strike");
    }

    Ok(snapshot)
}

/// Read one CE/PE object, zero-filling anything missing or malformed
fn parse_quote(strike: Decimal, raw: &Value) -> OptionContractQuote {
    let Some(fields) = raw.as_object() else {
        return OptionContractQuote::zeroed(strike);
    };
    OptionContractQuote {
        strike_price: strike,
        traded_volume: count_field(fields, "totalTradedVolume"),
        last_traded_price: price_field(fields, "lastPrice"),
        bid: price_field(fields, "bidprice"),
        ask: price_field(fields, "askPrice"),
        open_interest: count_field(fields, "openInterest"),
    }
}

fn price_field(fields: &Map<String, Value>, key: &str) -> Decimal {
    fields
        .get(key)
        .and_then(parse_decimal)
        .map(|d| d.max(Decimal::ZERO))
        .unwrap_or(Decimal::ZERO)
}

fn count_field(fields: &Map<String, Value>, key: &str) -> u64 {
    let Some(value) = fields.get(key) else {
        return 0;
    };
    if let Some(n) = value.as_u64() {
        return n;
    }
    parse_decimal(value)
        .filter(|d| d.is_sign_positive())
        .and_then(|d| d.round().to_u64())
        .unwrap_or(0)
}

fn parse_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().replace(',', ""),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Parse `06-Jan-2025 15:30:00` (IST) into UTC
fn parse_exchange_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(text, "%d-%b-%Y %H:%M:%S").ok()?;
    let offset = FixedOffset::east_opt(IST_OFFSET_SECS)?;
    naive
        .and_local_timezone(offset)
        .single()
        .map(|ts| ts.with_timezone(&Utc))
}
