//! Session — the mutable working set tying ingestion, selection, and
//! pairing together.
//!
//! A session owns exactly one batch of orders. Loading a new batch replaces
//! everything derived from the old one, including pairs and the current
//! selection; persistence of pairs across batches is the store's concern,
//! not the session's.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::analytics::{self, TimeWindow};
use crate::datetime::ParsingStats;
use crate::domain::{Order, OrderId, PairId, PersistedPair, Symbol, TradePair};
use crate::ingest::{self, IngestError};
use crate::pairing::{self, CycleReport, PairSet, PairingError};

/// Position and turnover aggregates for one trading-pair symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolMetrics {
    pub orders: usize,
    /// Net signed amount across the symbol's orders.
    pub position: f64,
    /// Gross traded value, Σ |order value|.
    pub volume: f64,
    /// Net signed value.
    pub net_value: f64,
    pub total_fees: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    orders: HashMap<OrderId, Order>,
    trading_pairs: BTreeSet<Symbol>,
    stats: ParsingStats,
    pairs: PairSet,
    selected: BTreeSet<OrderId>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a CSV fill export, replacing the entire working set. Pairs and
    /// the selection belong to the previous batch and are cleared too.
    pub fn load_batch(&mut self, text: &str) -> Result<&ParsingStats, IngestError> {
        let batch = ingest::ingest_csv(text)?;
        info!(
            orders = batch.orders.len(),
            symbols = batch.trading_pairs.len(),
            failures = batch.stats.failure_count(),
            "loaded fill batch"
        );
        self.orders = batch.orders;
        self.trading_pairs = batch.trading_pairs;
        self.stats = batch.stats;
        self.pairs.clear();
        self.selected.clear();
        Ok(&self.stats)
    }

    pub fn orders(&self) -> &HashMap<OrderId, Order> {
        &self.orders
    }

    /// Orders sorted by canonical timestamp, undated orders last, ties
    /// broken by identifier.
    pub fn orders_sorted(&self) -> Vec<&Order> {
        let mut orders: Vec<&Order> = self.orders.values().collect();
        orders.sort_by(|a, b| match (a.timestamp, b.timestamp) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.id.cmp(&b.id)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.id.cmp(&b.id),
        });
        orders
    }

    pub fn trading_pairs(&self) -> &BTreeSet<Symbol> {
        &self.trading_pairs
    }

    pub fn stats(&self) -> &ParsingStats {
        &self.stats
    }

    pub fn pairs(&self) -> &PairSet {
        &self.pairs
    }

    // ─── Selection ──────────────────────────────────────────────────

    pub fn selected(&self) -> &BTreeSet<OrderId> {
        &self.selected
    }

    /// Toggle an order in the selection. Unknown identifiers are ignored;
    /// returns whether the order is selected afterwards.
    pub fn toggle_selection(&mut self, id: &OrderId) -> bool {
        if !self.orders.contains_key(id) {
            return false;
        }
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.clone());
            true
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    // ─── Pairing ────────────────────────────────────────────────────

    /// Form a pair from the current selection. The selection is cleared
    /// only on success; on failure it stays intact for correction.
    pub fn create_pair_from_selection(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<PairId, PairingError> {
        let selected: Vec<OrderId> = self.selected.iter().cloned().collect();
        let id = self.pairs.create_pair(&self.orders, &selected, now)?;
        self.selected.clear();
        Ok(id)
    }

    pub fn find_pair_for_order(&self, id: &OrderId) -> Option<&TradePair> {
        self.pairs.find_pair_for_order(id)
    }

    /// Attach or clear notes on a pair. Returns false for an unknown id.
    pub fn set_pair_notes(&mut self, id: &PairId, notes: Option<String>) -> bool {
        self.pairs.set_notes(id, notes)
    }

    /// Replace the pair set with pairs restored from persistence.
    pub fn adopt_pairs(&mut self, persisted: BTreeMap<PairId, PersistedPair>) {
        self.pairs.load_persisted(persisted);
    }

    pub fn persisted_pairs(&self) -> BTreeMap<PairId, PersistedPair> {
        self.pairs.to_persisted()
    }

    // ─── Analysis ───────────────────────────────────────────────────

    pub fn analyze_cycles(&self, quote_filter: Option<&str>) -> CycleReport {
        pairing::analyze_cycles(&self.pairs, &self.orders, quote_filter)
    }

    pub fn filter_cycles(&self, window: TimeWindow, now: DateTime<Utc>) -> CycleReport {
        analytics::filter_cycles(&self.pairs, &self.orders, window, now)
    }

    /// Position, turnover, and fee totals for one trading-pair symbol, or
    /// `None` when the batch has no orders for it.
    pub fn pair_metrics(&self, symbol: &str) -> Option<SymbolMetrics> {
        let mut metrics = SymbolMetrics {
            orders: 0,
            position: 0.0,
            volume: 0.0,
            net_value: 0.0,
            total_fees: 0.0,
        };
        for order in self.orders.values().filter(|o| o.pair == symbol) {
            metrics.orders += 1;
            metrics.position += order.total_amount;
            metrics.volume += order.total_value.abs();
            metrics.net_value += order.total_value;
            metrics.total_fees += order.total_fees;
        }
        (metrics.orders > 0).then_some(metrics)
    }
}
