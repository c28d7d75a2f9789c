//! Option chain types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

/// Call or put side of the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionSide {
    /// Call options (CE)
    Call,
    /// Put options (PE)
    Put,
}

impl OptionSide {
    /// Exchange code for the side
    pub fn code(self) -> &'static str {
        match self {
            OptionSide::Call => "CE",
            OptionSide::Put => "PE",
        }
    }
}

impl fmt::Display for OptionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Trade aggregates for a single contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionContractQuote {
    pub strike_price: Decimal,
    /// Contracts traded in the session
    pub traded_volume: u64,
    pub last_traded_price: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub open_interest: u64,
}

impl OptionContractQuote {
    /// Quote used in place of a missing or malformed source record
    pub fn zeroed(strike_price: Decimal) -> Self {
        Self {
            strike_price,
            traded_volume: 0,
            last_traded_price: Decimal::ZERO,
            bid: Decimal::ZERO,
            ask: Decimal::ZERO,
            open_interest: 0,
        }
    }

    /// Midpoint of the quoted bid and ask
    pub fn mid_price(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }
}

/// Point-in-time option chain for one underlying
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChainSnapshot {
    pub ticker: String,
    pub captured_at: DateTime<Utc>,
    /// Spot price of the underlying when the chain was captured
    pub underlying_value: Option<Decimal>,
    /// Expiry the chain was restricted to; None when every expiry is included
    pub expiry: Option<String>,
    /// Call quotes keyed by strike
    pub calls: BTreeMap<Decimal, OptionContractQuote>,
    /// Put quotes keyed by strike
    pub puts: BTreeMap<Decimal, OptionContractQuote>,
    /// Call volume of quotes merged into a strike that already had a more
    /// active quote (other expiries of the same strike)
    #[serde(default)]
    pub merged_call_volume: u64,
    /// Put counterpart of `merged_call_volume`
    #[serde(default)]
    pub merged_put_volume: u64,
}

impl OptionChainSnapshot {
    /// Empty snapshot captured now
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            captured_at: Utc::now(),
            underlying_value: None,
            expiry: None,
            calls: BTreeMap::new(),
            puts: BTreeMap::new(),
            merged_call_volume: 0,
            merged_put_volume: 0,
        }
    }

    /// Add or replace a quote on one side
    pub fn insert(&mut self, side: OptionSide, quote: OptionContractQuote) {
        self.side_mut(side).insert(quote.strike_price, quote);
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with_quote(mut self, side: OptionSide, quote: OptionContractQuote) -> Self {
        self.insert(side, quote);
        self
    }

    /// Add a quote, keeping the more active one when the strike is already
    /// listed. The volume of the other quote still counts towards the side
    /// total.
    pub fn merge(&mut self, side: OptionSide, quote: OptionContractQuote) {
        let folded = match self.side_mut(side).entry(quote.strike_price) {
            Entry::Vacant(slot) => {
                slot.insert(quote);
                0
            }
            Entry::Occupied(mut slot) => {
                if quote.traded_volume > slot.get().traded_volume {
                    slot.insert(quote).traded_volume
                } else {
                    quote.traded_volume
                }
            }
        };
        let merged = match side {
            OptionSide::Call => &mut self.merged_call_volume,
            OptionSide::Put => &mut self.merged_put_volume,
        };
        *merged = merged.saturating_add(folded);
    }

    pub fn side(&self, side: OptionSide) -> &BTreeMap<Decimal, OptionContractQuote> {
        match side {
            OptionSide::Call => &self.calls,
            OptionSide::Put => &self.puts,
        }
    }

    fn side_mut(&mut self, side: OptionSide) -> &mut BTreeMap<Decimal, OptionContractQuote> {
        match side {
            OptionSide::Call => &mut self.calls,
            OptionSide::Put => &mut self.puts,
        }
    }

    /// Total traded volume on one side, merged quotes included; None on overflow
    pub fn total_volume(&self, side: OptionSide) -> Option<u64> {
        let merged = match side {
            OptionSide::Call => self.merged_call_volume,
            OptionSide::Put => self.merged_put_volume,
        };
        self.side(side)
            .values()
            .try_fold(merged, |acc, q| acc.checked_add(q.traded_volume))
    }

    /// Quote with the highest traded volume; the lowest strike wins ties
    pub fn most_active(&self, side: OptionSide) -> Option<&OptionContractQuote> {
        // min_by_key keeps the first of equal elements, max_by_key the last
        self.side(side)
            .values()
            .min_by_key(|q| Reverse(q.traded_volume))
    }

    /// Number of distinct strikes across both sides
    pub fn strike_count(&self) -> usize {
        self.calls
            .keys()
            .chain(self.puts.keys().filter(|k| !self.calls.contains_key(*k)))
            .count()
    }
}
