//! Order — the aggregation of all fills sharing one order identifier.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::fill::FillDetail;
use super::ids::OrderId;
use crate::datetime::DateParseResult;

/// Per-order trade record built by folding raw fills.
///
/// Invariant: `total_amount`, `total_value`, `total_fees` are always the
/// sums over `fills` — they are only mutated through [`Order::apply_fill`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Trading-pair symbol, e.g. `"BTC/USD"`.
    pub pair: String,
    /// Constituent fills, insertion order preserved.
    pub fills: Vec<FillDetail>,
    /// Signed sum of fill amounts: positive = net buy, negative = net sell.
    pub total_amount: f64,
    /// Sum of amount × price across fills.
    pub total_value: f64,
    /// Sum of absolute fee values.
    pub total_fees: f64,
    /// Canonical timestamp of the first fill, if its raw string normalized.
    pub timestamp: Option<NaiveDateTime>,
    /// The first fill's timestamp string exactly as exported.
    pub raw_timestamp: String,
    /// Normalization diagnostic for the first fill — never silently dropped.
    pub date_parse: DateParseResult,
}

impl Order {
    /// Create an empty order seeded from the first sighting of an identifier.
    pub fn new(id: OrderId, pair: impl Into<String>, date_parse: DateParseResult) -> Self {
        Self {
            id,
            pair: pair.into(),
            fills: Vec::new(),
            total_amount: 0.0,
            total_value: 0.0,
            total_fees: 0.0,
            timestamp: date_parse.datetime(),
            raw_timestamp: date_parse.original.clone(),
            date_parse,
        }
    }

    /// Fold one fill into the order, keeping the accumulators consistent.
    pub fn apply_fill(&mut self, fill: FillDetail) {
        self.total_amount += fill.amount;
        self.total_value += fill.amount * fill.price;
        self.total_fees += fill.fee.abs();
        self.fills.push(fill);
    }

    /// Base-currency component of the pair symbol (`"BTC"` in `"BTC/USD"`).
    pub fn base_currency(&self) -> &str {
        self.pair.split('/').next().unwrap_or(&self.pair)
    }

    /// Quote-currency component of the pair symbol (`"USD"` in `"BTC/USD"`).
    pub fn quote_currency(&self) -> Option<&str> {
        self.pair.split_once('/').map(|(_, quote)| quote)
    }

    /// Entry leg: net buy.
    pub fn is_entry(&self) -> bool {
        self.total_amount > 0.0
    }

    /// Exit leg: net sell.
    pub fn is_exit(&self) -> bool {
        self.total_amount < 0.0
    }
}
