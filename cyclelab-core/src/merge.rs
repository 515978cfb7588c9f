//! Conflict-aware merge of persisted pair sets.
//!
//! An order belongs to at most one pair: any existing pair sharing even a
//! single order identifier with the incoming set is evicted before the
//! incoming pairs land. Incoming always wins.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::domain::{OrderId, PairId, PersistedPair};

/// Accounting for one merge pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub existing_before: usize,
    pub added: usize,
    pub evicted: usize,
    pub evicted_ids: Vec<PairId>,
    pub final_total: usize,
}

/// Merged pair set plus its report.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub pairs: BTreeMap<PairId, PersistedPair>,
    pub report: MergeReport,
}

/// Merge `incoming` into `existing`, evicting conflicting existing pairs.
pub fn merge(
    existing: BTreeMap<PairId, PersistedPair>,
    incoming: BTreeMap<PairId, PersistedPair>,
) -> MergeOutcome {
    let existing_before = existing.len();

    let incoming_orders: BTreeSet<&OrderId> = incoming
        .values()
        .flat_map(|pair| pair.order_ids.iter())
        .collect();

    let mut evicted_ids = Vec::new();
    let mut pairs: BTreeMap<PairId, PersistedPair> = existing
        .into_iter()
        .filter(|(id, pair)| {
            let conflict = pair
                .order_ids
                .iter()
                .any(|order| incoming_orders.contains(order));
            if conflict {
                warn!(pair = %id, name = %pair.name, "evicting pair superseded by incoming set");
                evicted_ids.push(id.clone());
            }
            !conflict
        })
        .collect();

    let added = incoming.len();
    pairs.extend(incoming);

    let report = MergeReport {
        existing_before,
        added,
        evicted: evicted_ids.len(),
        evicted_ids,
        final_total: pairs.len(),
    };
    MergeOutcome { pairs, report }
}
