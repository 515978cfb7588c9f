//! Pair/cycle building — explicit user pairing and automatic cycle analysis.
//!
//! Both paths feed the same cycle representation: `create_pair` turns a
//! selection of order identifiers into a [`TradePair`] with a cached
//! analysis block; `analyze_cycles` re-derives [`Cycle`]s from the member
//! lists of every pair in the set. The cached analysis is strictly a
//! memoization — analysis always recomputes from member orders.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, warn};

use crate::domain::{
    Cycle, Order, OrderId, PairAnalysis, PairId, PersistedPair, SkipReason, SkippedCycle,
    TradePair,
};

/// Structural pairing failure. Per-cycle analysis problems are skips, not
/// errors — only a too-small selection reaches the caller.
#[derive(Debug, thiserror::Error)]
pub enum PairingError {
    #[error("need at least 2 valid orders to form a cycle ({resolved} of {selected} selected orders resolved)")]
    InsufficientTrades { selected: usize, resolved: usize },
}

/// Result of one automatic analysis pass: cycles sorted most-recent-exit
/// first, plus a diagnostic record for every excluded pair.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub cycles: Vec<Cycle>,
    pub skipped: Vec<SkippedCycle>,
}

/// The working set of trade pairs, keyed by pair identifier.
#[derive(Debug, Clone, Default)]
pub struct PairSet {
    pairs: BTreeMap<PairId, TradePair>,
}

impl PairSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, id: &PairId) -> Option<&TradePair> {
        self.pairs.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TradePair> {
        self.pairs.values()
    }

    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    pub fn insert(&mut self, pair: TradePair) {
        self.pairs.insert(pair.id.clone(), pair);
    }

    /// The pair containing the given order, if any. An order belongs to at
    /// most one pair after a merge, but creation does not enforce that, so
    /// this returns the first match in id order.
    pub fn find_pair_for_order(&self, order_id: &OrderId) -> Option<&TradePair> {
        self.pairs
            .values()
            .find(|pair| pair.order_ids.contains(order_id))
    }

    /// Attach or clear free-form notes on a pair. Notes live only in the
    /// session; the persisted format does not carry them.
    pub fn set_notes(&mut self, id: &PairId, notes: Option<String>) -> bool {
        match self.pairs.get_mut(id) {
            Some(pair) => {
                pair.notes = notes;
                true
            }
            None => false,
        }
    }

    /// Restore a pair set from its persisted form, replacing the current set.
    pub fn load_persisted(&mut self, persisted: BTreeMap<PairId, PersistedPair>) {
        self.pairs = persisted
            .into_iter()
            .map(|(id, pair)| (id.clone(), TradePair::from_persisted(id, pair)))
            .collect();
    }

    pub fn to_persisted(&self) -> BTreeMap<PairId, PersistedPair> {
        self.pairs
            .iter()
            .map(|(id, pair)| (id.clone(), pair.to_persisted()))
            .collect()
    }

    /// Explicit pairing: group the selected orders into a new pair.
    ///
    /// Identifiers that no longer resolve are dropped; if fewer than 2
    /// remain the set is left untouched and `InsufficientTrades` is
    /// returned. `now` is the creation instant — always supplied by the
    /// caller, never sampled here.
    pub fn create_pair(
        &mut self,
        orders: &HashMap<OrderId, Order>,
        selected: &[OrderId],
        now: DateTime<Utc>,
    ) -> Result<PairId, PairingError> {
        let mut members: Vec<&Order> = selected
            .iter()
            .filter_map(|id| {
                let order = orders.get(id);
                if order.is_none() {
                    warn!(order_id = %id, "selected order no longer exists, dropping");
                }
                order
            })
            .collect();

        if members.len() < 2 {
            return Err(PairingError::InsufficientTrades {
                selected: selected.len(),
                resolved: members.len(),
            });
        }

        members.sort_by_key(|order| order.timestamp);

        let id = self.generate_pair_id(now);
        let name = self.generate_pair_name(members[0]);
        let analysis = compute_metrics(&members);

        self.pairs.insert(
            id.clone(),
            TradePair {
                id: id.clone(),
                name,
                order_ids: members.iter().map(|o| o.id.clone()).collect(),
                analysis,
                created_at: now.to_rfc3339(),
                notes: None,
            },
        );
        Ok(id)
    }

    /// `pair_{unix-millis}_{9 alphanumeric chars}`, retried against the live
    /// set — uniqueness is the contract, not the scheme.
    fn generate_pair_id(&self, now: DateTime<Utc>) -> PairId {
        let mut rng = rand::thread_rng();
        loop {
            let suffix: String = (&mut rng)
                .sample_iter(Alphanumeric)
                .take(9)
                .map(char::from)
                .collect();
            let candidate = PairId::new(format!("pair_{}_{}", now.timestamp_millis(), suffix));
            if !self.pairs.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// `"{base} Trade #{n} ({entry date})"`, where `n` counts existing pairs
    /// of the same base currency.
    fn generate_pair_name(&self, first: &Order) -> String {
        let base = first.base_currency();
        let sequence = self
            .pairs
            .values()
            .filter(|pair| pair.name.contains(&format!("{base} Trade")))
            .count()
            + 1;
        let date = first
            .timestamp
            .map(|t| t.date().to_string())
            .unwrap_or_else(|| first.raw_timestamp.clone());
        format!("{base} Trade #{sequence} ({date})")
    }
}

// ─── Cycle financial metrics ────────────────────────────────────────

/// Compute the shared analysis block from a pair's member orders.
///
/// Division by zero (wash cycles, zero-size legs) yields non-finite values;
/// they are carried as-is and must be treated as "undefined" downstream.
pub fn compute_metrics(orders: &[&Order]) -> PairAnalysis {
    let entries: Vec<&Order> = orders.iter().copied().filter(|o| o.is_entry()).collect();
    let exits: Vec<&Order> = orders.iter().copied().filter(|o| o.is_exit()).collect();

    let total_entry: f64 = entries.iter().map(|o| o.total_value).sum();
    let total_exit: f64 = exits.iter().map(|o| o.total_value).sum::<f64>().abs();
    let total_fees: f64 = orders.iter().map(|o| o.total_fees).sum();

    let entry_amount: f64 = entries.iter().map(|o| o.total_amount).sum();
    let exit_amount: f64 = exits.iter().map(|o| o.total_amount).sum();

    let pnl = total_exit - total_entry - total_fees;

    let (entry_date, exit_date) = entry_exit_dates(&entries, &exits);
    let hold_duration_ms = match (entry_date, exit_date) {
        (Some(entry), Some(exit)) => Some((exit - entry).num_milliseconds()),
        _ => None,
    };

    PairAnalysis {
        entry_price: total_entry / entry_amount,
        exit_price: total_exit / exit_amount.abs(),
        hold_duration_ms,
        position_size: entry_amount,
        pnl,
        roi: pnl / total_entry * 100.0,
        total_fees,
    }
}

/// Earliest entry-leg and latest exit-leg timestamps, ignoring orders whose
/// dates failed to normalize.
fn entry_exit_dates(
    entries: &[&Order],
    exits: &[&Order],
) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
    let entry_date = entries.iter().filter_map(|o| o.timestamp).min();
    let exit_date = exits.iter().filter_map(|o| o.timestamp).max();
    (entry_date, exit_date)
}

// ─── Automatic grouping ─────────────────────────────────────────────

/// Re-derive cycles from every pair's member list.
///
/// Pairs with fewer than 2 resolvable orders, a missing entry or exit leg,
/// or a non-matching quote currency are excluded and reported as skips.
/// Output is sorted by exit date descending (most recent round trip first,
/// undated cycles last).
pub fn analyze_cycles(
    pairs: &PairSet,
    orders: &HashMap<OrderId, Order>,
    quote_filter: Option<&str>,
) -> CycleReport {
    let mut report = CycleReport::default();

    for pair in pairs.iter() {
        let members: Vec<&Order> = pair
            .order_ids
            .iter()
            .filter_map(|id| orders.get(id))
            .collect();

        if members.len() < 2 {
            debug!(pair = %pair.id, resolved = members.len(), "cycle has fewer than 2 valid orders");
            report.skipped.push(SkippedCycle {
                id: pair.id.clone(),
                name: pair.name.clone(),
                reason: SkipReason::InsufficientOrders {
                    resolved: members.len(),
                },
            });
            continue;
        }

        let quote = members[0].quote_currency().map(str::to_string);
        if let Some(filter) = quote_filter {
            if quote.as_deref() != Some(filter) {
                report.skipped.push(SkippedCycle {
                    id: pair.id.clone(),
                    name: pair.name.clone(),
                    reason: SkipReason::QuoteMismatch,
                });
                continue;
            }
        }

        let entries: Vec<&Order> = members.iter().copied().filter(|o| o.is_entry()).collect();
        let exits: Vec<&Order> = members.iter().copied().filter(|o| o.is_exit()).collect();
        if entries.is_empty() || exits.is_empty() {
            debug!(pair = %pair.id, "cycle missing entry or exit leg");
            report.skipped.push(SkippedCycle {
                id: pair.id.clone(),
                name: pair.name.clone(),
                reason: SkipReason::MissingLeg,
            });
            continue;
        }

        let analysis = compute_metrics(&members);
        let (entry_date, exit_date) = entry_exit_dates(&entries, &exits);

        report.cycles.push(Cycle {
            id: pair.id.clone(),
            name: pair.name.clone(),
            quote_currency: quote,
            entry_date,
            exit_date,
            hold_ms: analysis.hold_duration_ms,
            entry_price: analysis.entry_price,
            exit_price: analysis.exit_price,
            position_size: analysis.position_size,
            pnl: analysis.pnl,
            roi: analysis.roi,
            total_fees: analysis.total_fees,
            order_ids: pair.order_ids.clone(),
        });
    }

    report
        .cycles
        .sort_by(|a, b| b.exit_date.cmp(&a.exit_date));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::normalize_str;
    use crate::domain::FillDetail;
    use chrono::TimeZone;

    fn make_order(id: &str, pair: &str, amount: f64, price: f64, fee: f64, date: &str) -> Order {
        let mut order = Order::new(OrderId::new(id), pair, normalize_str(date));
        order.apply_fill(FillDetail {
            amount,
            price,
            fee,
            timestamp: order.timestamp,
        });
        order
    }

    fn order_map(orders: Vec<Order>) -> HashMap<OrderId, Order> {
        orders.into_iter().map(|o| (o.id.clone(), o)).collect()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn create_pair_computes_round_trip_metrics() {
        // Entry 10 @ 100 (value 1000), exit 10 @ 110 (value 1100), fees 5.
        let orders = order_map(vec![
            make_order("X", "BTC/USD", 10.0, 100.0, 0.0, "01-01-24 10:00:00"),
            make_order("Y", "BTC/USD", -10.0, 110.0, 5.0, "02-01-24 10:00:00"),
        ]);
        let mut pairs = PairSet::new();
        let selected = vec![OrderId::new("Y"), OrderId::new("X")];
        let id = pairs.create_pair(&orders, &selected, now()).unwrap();

        let pair = pairs.get(&id).unwrap();
        // Sorted by timestamp ascending: entry first.
        assert_eq!(pair.order_ids, vec![OrderId::new("X"), OrderId::new("Y")]);
        assert!((pair.analysis.pnl - 95.0).abs() < 1e-10);
        assert!((pair.analysis.roi - 9.5).abs() < 1e-10);
        assert!((pair.analysis.entry_price - 100.0).abs() < 1e-10);
        assert!((pair.analysis.exit_price - 110.0).abs() < 1e-10);
        assert!((pair.analysis.position_size - 10.0).abs() < 1e-10);
        assert_eq!(pair.analysis.hold_duration_ms, Some(24 * 3_600_000));
        assert_eq!(pair.name, "BTC Trade #1 (2024-01-01)");
    }

    #[test]
    fn create_pair_rejects_fewer_than_two_resolvable() {
        let orders = order_map(vec![make_order(
            "X",
            "BTC/USD",
            1.0,
            100.0,
            0.0,
            "01-01-24 10:00:00",
        )]);
        let mut pairs = PairSet::new();
        let selected = vec![OrderId::new("X"), OrderId::new("GONE")];

        let err = pairs.create_pair(&orders, &selected, now()).unwrap_err();
        match err {
            PairingError::InsufficientTrades { selected, resolved } => {
                assert_eq!(selected, 2);
                assert_eq!(resolved, 1);
            }
        }
        // No mutation on failure.
        assert!(pairs.is_empty());
    }

    #[test]
    fn pair_names_sequence_per_base_currency() {
        let orders = order_map(vec![
            make_order("A", "BTC/USD", 1.0, 100.0, 0.0, "01-01-24 10:00:00"),
            make_order("B", "BTC/USD", -1.0, 110.0, 0.0, "02-01-24 10:00:00"),
            make_order("C", "BTC/USD", 2.0, 90.0, 0.0, "03-01-24 10:00:00"),
            make_order("D", "BTC/USD", -2.0, 95.0, 0.0, "04-01-24 10:00:00"),
            make_order("E", "ETH/USD", 5.0, 50.0, 0.0, "05-01-24 10:00:00"),
            make_order("F", "ETH/USD", -5.0, 55.0, 0.0, "06-01-24 10:00:00"),
        ]);
        let mut pairs = PairSet::new();
        let p1 = pairs
            .create_pair(&orders, &[OrderId::new("A"), OrderId::new("B")], now())
            .unwrap();
        let p2 = pairs
            .create_pair(&orders, &[OrderId::new("C"), OrderId::new("D")], now())
            .unwrap();
        let p3 = pairs
            .create_pair(&orders, &[OrderId::new("E"), OrderId::new("F")], now())
            .unwrap();

        assert!(pairs.get(&p1).unwrap().name.starts_with("BTC Trade #1"));
        assert!(pairs.get(&p2).unwrap().name.starts_with("BTC Trade #2"));
        assert!(pairs.get(&p3).unwrap().name.starts_with("ETH Trade #1"));
    }

    #[test]
    fn pair_ids_unique_for_identical_instant() {
        let orders = order_map(vec![
            make_order("A", "BTC/USD", 1.0, 100.0, 0.0, "01-01-24 10:00:00"),
            make_order("B", "BTC/USD", -1.0, 110.0, 0.0, "02-01-24 10:00:00"),
        ]);
        let mut pairs = PairSet::new();
        let selected = vec![OrderId::new("A"), OrderId::new("B")];
        let p1 = pairs.create_pair(&orders, &selected, now()).unwrap();
        let p2 = pairs.create_pair(&orders, &selected, now()).unwrap();
        assert_ne!(p1, p2);
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn analyze_sorts_by_exit_date_descending() {
        let orders = order_map(vec![
            make_order("A", "BTC/USD", 1.0, 100.0, 0.0, "01-01-24 10:00:00"),
            make_order("B", "BTC/USD", -1.0, 110.0, 0.0, "02-01-24 10:00:00"),
            make_order("C", "BTC/USD", 1.0, 100.0, 0.0, "03-01-24 10:00:00"),
            make_order("D", "BTC/USD", -1.0, 120.0, 0.0, "04-01-24 10:00:00"),
        ]);
        let mut pairs = PairSet::new();
        let early = pairs
            .create_pair(&orders, &[OrderId::new("A"), OrderId::new("B")], now())
            .unwrap();
        let late = pairs
            .create_pair(&orders, &[OrderId::new("C"), OrderId::new("D")], now())
            .unwrap();

        let report = analyze_cycles(&pairs, &orders, None);
        assert_eq!(report.cycles.len(), 2);
        assert_eq!(report.cycles[0].id, late);
        assert_eq!(report.cycles[1].id, early);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn analyze_skips_missing_leg_as_diagnostic() {
        let orders = order_map(vec![
            make_order("A", "BTC/USD", 1.0, 100.0, 0.0, "01-01-24 10:00:00"),
            make_order("B", "BTC/USD", 2.0, 105.0, 0.0, "02-01-24 10:00:00"),
        ]);
        let mut pairs = PairSet::new();
        pairs
            .create_pair(&orders, &[OrderId::new("A"), OrderId::new("B")], now())
            .unwrap();

        let report = analyze_cycles(&pairs, &orders, None);
        assert!(report.cycles.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::MissingLeg);
    }

    #[test]
    fn analyze_quote_filter_excludes_other_currencies() {
        let orders = order_map(vec![
            make_order("A", "BTC/USD", 1.0, 100.0, 0.0, "01-01-24 10:00:00"),
            make_order("B", "BTC/USD", -1.0, 110.0, 0.0, "02-01-24 10:00:00"),
            make_order("C", "ETH/EUR", 1.0, 50.0, 0.0, "03-01-24 10:00:00"),
            make_order("D", "ETH/EUR", -1.0, 55.0, 0.0, "04-01-24 10:00:00"),
        ]);
        let mut pairs = PairSet::new();
        pairs
            .create_pair(&orders, &[OrderId::new("A"), OrderId::new("B")], now())
            .unwrap();
        pairs
            .create_pair(&orders, &[OrderId::new("C"), OrderId::new("D")], now())
            .unwrap();

        let report = analyze_cycles(&pairs, &orders, Some("USD"));
        assert_eq!(report.cycles.len(), 1);
        assert_eq!(report.cycles[0].quote_currency.as_deref(), Some("USD"));
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::QuoteMismatch);
    }

    #[test]
    fn analyze_reports_orders_dropped_from_batch() {
        let orders = order_map(vec![
            make_order("A", "BTC/USD", 1.0, 100.0, 0.0, "01-01-24 10:00:00"),
            make_order("B", "BTC/USD", -1.0, 110.0, 0.0, "02-01-24 10:00:00"),
        ]);
        let mut pairs = PairSet::new();
        pairs
            .create_pair(&orders, &[OrderId::new("A"), OrderId::new("B")], now())
            .unwrap();

        // A later batch no longer contains order B.
        let mut shrunk = orders;
        shrunk.remove(&OrderId::new("B"));
        let report = analyze_cycles(&pairs, &shrunk, None);
        assert!(report.cycles.is_empty());
        assert_eq!(
            report.skipped[0].reason,
            SkipReason::InsufficientOrders { resolved: 1 }
        );
    }

    #[test]
    fn wash_cycle_roi_is_non_finite_not_zero() {
        // Exit-only value on both legs nets a zero entry value.
        let orders = order_map(vec![
            make_order("A", "BTC/USD", 1.0, 0.0, 0.0, "01-01-24 10:00:00"),
            make_order("B", "BTC/USD", -1.0, 110.0, 1.0, "02-01-24 10:00:00"),
        ]);
        let members: Vec<&Order> = vec![
            &orders[&OrderId::new("A")],
            &orders[&OrderId::new("B")],
        ];
        let analysis = compute_metrics(&members);
        assert!(!analysis.roi.is_finite());
        assert!(analysis.roi != 0.0);
        // P&L itself is still defined.
        assert!((analysis.pnl - 109.0).abs() < 1e-10);
    }

    #[test]
    fn negative_hold_duration_is_surfaced() {
        // Exit timestamp before entry timestamp: malformed input, kept as-is.
        let orders = order_map(vec![
            make_order("A", "BTC/USD", 1.0, 100.0, 0.0, "05-01-24 10:00:00"),
            make_order("B", "BTC/USD", -1.0, 110.0, 0.0, "01-01-24 10:00:00"),
        ]);
        let members: Vec<&Order> = vec![
            &orders[&OrderId::new("A")],
            &orders[&OrderId::new("B")],
        ];
        let analysis = compute_metrics(&members);
        assert_eq!(analysis.hold_duration_ms, Some(-4 * 24 * 3_600_000));
    }

    #[test]
    fn undated_legs_leave_hold_undefined() {
        let orders = order_map(vec![
            make_order("A", "BTC/USD", 1.0, 100.0, 0.0, "garbage"),
            make_order("B", "BTC/USD", -1.0, 110.0, 0.0, "02-01-24 10:00:00"),
        ]);
        let members: Vec<&Order> = vec![
            &orders[&OrderId::new("A")],
            &orders[&OrderId::new("B")],
        ];
        let analysis = compute_metrics(&members);
        assert_eq!(analysis.hold_duration_ms, None);
    }

    #[test]
    fn find_pair_for_order() {
        let orders = order_map(vec![
            make_order("A", "BTC/USD", 1.0, 100.0, 0.0, "01-01-24 10:00:00"),
            make_order("B", "BTC/USD", -1.0, 110.0, 0.0, "02-01-24 10:00:00"),
        ]);
        let mut pairs = PairSet::new();
        let id = pairs
            .create_pair(&orders, &[OrderId::new("A"), OrderId::new("B")], now())
            .unwrap();

        assert_eq!(pairs.find_pair_for_order(&OrderId::new("A")).unwrap().id, id);
        assert!(pairs.find_pair_for_order(&OrderId::new("Z")).is_none());
    }
}
