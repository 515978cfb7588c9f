//! Cycle — an analyzed round trip, plus the diagnostic record for pairs
//! excluded from an analysis pass.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::ids::{OrderId, PairId};

/// One analyzed round-trip cycle.
///
/// Derived wholly from member orders; entry/exit dates are `None` when the
/// corresponding legs carry no canonical timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cycle {
    pub id: PairId,
    pub name: String,
    pub quote_currency: Option<String>,
    /// Earliest entry-leg timestamp.
    pub entry_date: Option<NaiveDateTime>,
    /// Latest exit-leg timestamp.
    pub exit_date: Option<NaiveDateTime>,
    /// Exit minus entry, in milliseconds. May be zero or negative for
    /// malformed inputs — surfaced as-is, not rejected.
    pub hold_ms: Option<i64>,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Σ entry-leg amounts.
    pub position_size: f64,
    pub pnl: f64,
    /// Percent return on entry value. Non-finite when entry value is zero —
    /// "undefined", never coerced to zero.
    pub roi: f64,
    pub total_fees: f64,
    pub order_ids: Vec<OrderId>,
}

impl Cycle {
    pub fn hold_duration(&self) -> Option<Duration> {
        self.hold_ms.map(Duration::milliseconds)
    }

    pub fn hold_hours(&self) -> Option<f64> {
        self.hold_ms.map(|ms| ms as f64 / 3_600_000.0)
    }

    /// Percent change from entry to exit price. Shares the undefined-ratio
    /// sentinel behavior of ROI.
    pub fn price_change_pct(&self) -> f64 {
        (self.exit_price - self.entry_price) / self.entry_price * 100.0
    }

    pub fn is_winner(&self) -> bool {
        self.roi > 0.0
    }
}

/// Why a pair was excluded from an analysis pass. A reportable skip, not an
/// error: the batch always completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Fewer than 2 member orders still resolve against the order map.
    InsufficientOrders { resolved: usize },
    /// No entry leg or no exit leg among the members.
    MissingLeg,
    /// Pair's quote currency does not match the requested filter.
    QuoteMismatch,
}

/// Diagnostic record for one excluded pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedCycle {
    pub id: PairId,
    pub name: String,
    pub reason: SkipReason,
}
