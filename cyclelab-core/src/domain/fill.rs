use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One raw fill line from an exchange export, before aggregation.
///
/// Transient: consumed by the aggregator and never stored. Numeric fields
/// that failed to parse arrive here as `f64::NAN` and propagate into the
/// order accumulators rather than rejecting the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFill {
    /// Trading-pair symbol, e.g. `"BTC/USD"`.
    pub pair: String,
    /// Signed amount: positive = buy, negative = sell.
    pub amount: f64,
    pub price: f64,
    pub fee: f64,
    /// Timestamp string exactly as exported.
    pub timestamp: String,
    /// Order identifier exactly as exported (trimmed by the aggregator).
    pub order_id: String,
}

/// A fill retained inside an [`Order`](super::Order), insertion order preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillDetail {
    pub amount: f64,
    pub price: f64,
    pub fee: f64,
    /// Canonical timestamp if the raw string normalized, else `None`.
    pub timestamp: Option<NaiveDateTime>,
}
