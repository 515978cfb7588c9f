//! TradePair — a user-built round-trip grouping of orders, with its cached
//! financial analysis and the on-disk persisted form.

use serde::{Deserialize, Serialize};

use super::ids::{OrderId, PairId};

/// Financial metrics for one pair/cycle.
///
/// Cached, not authoritative: always recomputable from the member orders.
/// Undefined ratios (zero entry value or size) are carried as non-finite
/// `f64` sentinels and serialize as JSON `null`, never as `0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairAnalysis {
    #[serde(with = "float_sentinel", default = "nan")]
    pub entry_price: f64,
    #[serde(with = "float_sentinel", default = "nan")]
    pub exit_price: f64,
    /// Hold duration in milliseconds; `None` when a leg has no canonical date.
    #[serde(rename = "holdDuration", default)]
    pub hold_duration_ms: Option<i64>,
    pub position_size: f64,
    #[serde(with = "float_sentinel", default = "nan")]
    pub pnl: f64,
    #[serde(with = "float_sentinel", default = "nan")]
    pub roi: f64,
    pub total_fees: f64,
}

fn nan() -> f64 {
    f64::NAN
}

/// Serialize non-finite floats as `null` and read `null` back as NaN, so a
/// wash-cycle ROI round-trips through the pairs file without becoming zero.
mod float_sentinel {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
        if v.is_finite() {
            s.serialize_f64(*v)
        } else {
            s.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::NAN))
    }
}

/// A named group of ≥2 order identifiers representing one round trip.
///
/// The member list is authoritative; `analysis` is a memoization. Notes are
/// session-only and not part of the persisted format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradePair {
    pub id: PairId,
    pub name: String,
    /// Member order identifiers, sorted by normalized timestamp at creation.
    pub order_ids: Vec<OrderId>,
    pub analysis: PairAnalysis,
    /// ISO-8601 creation instant, kept as text so it round-trips untouched.
    pub created_at: String,
    pub notes: Option<String>,
}

/// On-disk form of one pair: `pairId -> {name, orderIDs, analysis, createdAt}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedPair {
    pub name: String,
    #[serde(rename = "orderIDs")]
    pub order_ids: Vec<OrderId>,
    pub analysis: PairAnalysis,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

impl TradePair {
    pub fn to_persisted(&self) -> PersistedPair {
        PersistedPair {
            name: self.name.clone(),
            order_ids: self.order_ids.clone(),
            analysis: self.analysis.clone(),
            created_at: self.created_at.clone(),
        }
    }

    pub fn from_persisted(id: PairId, pair: PersistedPair) -> Self {
        Self {
            id,
            name: pair.name,
            order_ids: pair.order_ids,
            analysis: pair.analysis,
            created_at: pair.created_at,
            notes: None,
        }
    }
}
