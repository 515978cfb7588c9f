//! Domain types for CycleLab.

pub mod cycle;
pub mod fill;
pub mod ids;
pub mod order;
pub mod pair;

pub use cycle::{Cycle, SkipReason, SkippedCycle};
pub use fill::{FillDetail, RawFill};
pub use ids::{OrderId, PairId};
pub use order::Order;
pub use pair::{PairAnalysis, PersistedPair, TradePair};

/// Trading-pair symbol alias, e.g. `"BTC/USD"`.
pub type Symbol = String;
