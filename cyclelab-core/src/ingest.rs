//! Fill ingestion — CSV row decoding and per-order aggregation.
//!
//! `read_fills` decodes exported rows into [`RawFill`]s; `aggregate` folds
//! them into per-order records keyed by trimmed order identifier. Ingestion
//! is wholesale-replacing: the returned [`Aggregation`] supersedes any
//! previous batch (see [`Session::load_batch`](crate::session::Session)).

use std::collections::{BTreeSet, HashMap};

use tracing::warn;

use crate::datetime::{self, ParsingStats};
use crate::domain::{FillDetail, Order, OrderId, RawFill, Symbol};

/// Structural read failure: the input could not be decoded as rows at all.
/// Per-row problems (bad numbers, bad dates) never surface here.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read fill rows: {0}")]
    Read(#[from] csv::Error),
}

/// Result of one ingestion batch.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// Per-order records keyed by trimmed order identifier.
    pub orders: HashMap<OrderId, Order>,
    /// Distinct trading-pair symbols observed in the batch.
    pub trading_pairs: BTreeSet<Symbol>,
    /// Completed parsing-statistics snapshot for the batch.
    pub stats: ParsingStats,
}

/// Expected export columns:
/// `(ignored), pair, amount, price, fee, fee %, fee currency, timestamp, order id`.
/// The header row is skipped; blank and whitespace-only rows are dropped
/// without counting toward statistics.
pub fn read_fills(text: &str) -> Result<Vec<RawFill>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut fills = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let field = |i: usize| record.get(i).unwrap_or("");
        fills.push(RawFill {
            pair: field(1).to_string(),
            amount: parse_numeric(field(2)),
            price: parse_numeric(field(3)),
            fee: parse_numeric(field(4)),
            timestamp: field(7).to_string(),
            order_id: field(8).to_string(),
        });
    }
    Ok(fills)
}

/// Malformed numerics parse to NaN and propagate into the accumulators —
/// the row is kept, not rejected.
fn parse_numeric(field: &str) -> f64 {
    field.trim().parse().unwrap_or(f64::NAN)
}

/// Fold raw fills into per-order records, in input order.
pub fn aggregate<I>(fills: I) -> Aggregation
where
    I: IntoIterator<Item = RawFill>,
{
    let mut orders: HashMap<OrderId, Order> = HashMap::new();
    let mut trading_pairs = BTreeSet::new();
    let mut stats = ParsingStats::default();

    for fill in fills {
        let date_parse = datetime::normalize(&fill.timestamp, &mut stats);
        let id = OrderId::new(&fill.order_id);

        let order = orders
            .entry(id.clone())
            .or_insert_with(|| Order::new(id, fill.pair.clone(), date_parse.clone()));
        order.apply_fill(FillDetail {
            amount: fill.amount,
            price: fill.price,
            fee: fill.fee,
            timestamp: date_parse.datetime(),
        });

        trading_pairs.insert(fill.pair);
    }

    if stats.failure_count() > 0 {
        warn!(
            failed = stats.failure_count(),
            total = stats.total_processed,
            "timestamps failed to normalize"
        );
    }

    Aggregation {
        orders,
        trading_pairs,
        stats,
    }
}

/// Decode and aggregate in one step.
pub fn ingest_csv(text: &str) -> Result<Aggregation, IngestError> {
    Ok(aggregate(read_fills(text)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "txid,pair,amount,price,fee,fee %,fee currency,date,order id\n";

    fn csv_with_rows(rows: &[&str]) -> String {
        let mut text = HEADER.to_string();
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        text
    }

    #[test]
    fn header_row_is_skipped() {
        let fills = read_fills(HEADER).unwrap();
        assert!(fills.is_empty());
    }

    #[test]
    fn blank_rows_are_dropped_without_counting() {
        let text = csv_with_rows(&[
            "1,BTC/USD,1.0,100.0,0.5,0.1,USD,01-01-24 10:00:00,X",
            "   ",
            "",
        ]);
        let agg = ingest_csv(&text).unwrap();
        assert_eq!(agg.orders.len(), 1);
        assert_eq!(agg.stats.total_processed, 1);
    }

    #[test]
    fn same_order_id_accumulates() {
        // Buy 1 @ 100 then sell 1 @ 110 on the same id.
        let text = csv_with_rows(&[
            "1,BTC/USD,1,100,1,0.1,USD,01-01-24 10:00:00,X",
            "2,BTC/USD,-1,110,1,0.1,USD,02-01-24 10:00:00,X",
        ]);
        let agg = ingest_csv(&text).unwrap();
        assert_eq!(agg.orders.len(), 1);

        let order = &agg.orders[&OrderId::new("X")];
        assert_eq!(order.fills.len(), 2);
        assert!((order.total_amount - 0.0).abs() < 1e-12);
        assert!((order.total_value - (-10.0)).abs() < 1e-12);
        assert!((order.total_fees - 2.0).abs() < 1e-12);
        // First-sighting timestamp wins for the order itself.
        assert_eq!(
            order.date_parse.normalized(),
            Some("2024-01-01 10:00:00")
        );
    }

    #[test]
    fn order_ids_are_trimmed_before_keying() {
        let text = csv_with_rows(&[
            "1,BTC/USD,1,100,0.1,0.1,USD,01-01-24 10:00:00,A1",
            "2,BTC/USD,2,100,0.1,0.1,USD,01-01-24 10:05:00,A1 ",
        ]);
        let agg = ingest_csv(&text).unwrap();
        assert_eq!(agg.orders.len(), 1);
        assert_eq!(agg.orders[&OrderId::new("A1")].fills.len(), 2);
    }

    #[test]
    fn totals_conserve_row_sums() {
        let text = csv_with_rows(&[
            "1,BTC/USD,1.5,100,0.5,0.1,USD,01-01-24 10:00:00,A",
            "2,ETH/USD,-2.0,50,0.25,0.1,USD,01-01-24 11:00:00,B",
            "3,BTC/USD,0.5,102,0.25,0.1,USD,01-01-24 12:00:00,A",
        ]);
        let agg = ingest_csv(&text).unwrap();

        let sum_amount: f64 = agg.orders.values().map(|o| o.total_amount).sum();
        let sum_value: f64 = agg.orders.values().map(|o| o.total_value).sum();
        let sum_fees: f64 = agg.orders.values().map(|o| o.total_fees).sum();

        assert!((sum_amount - (1.5 - 2.0 + 0.5)).abs() < 1e-9);
        assert!((sum_value - (150.0 - 100.0 + 51.0)).abs() < 1e-9);
        assert!((sum_fees - 1.0).abs() < 1e-9);
    }

    #[test]
    fn trading_pair_set_is_distinct_and_sorted() {
        let text = csv_with_rows(&[
            "1,ETH/USD,1,50,0.1,0.1,USD,01-01-24 10:00:00,A",
            "2,BTC/USD,1,100,0.1,0.1,USD,01-01-24 10:00:00,B",
            "3,BTC/USD,1,101,0.1,0.1,USD,01-01-24 10:00:00,C",
        ]);
        let agg = ingest_csv(&text).unwrap();
        let pairs: Vec<&str> = agg.trading_pairs.iter().map(String::as_str).collect();
        assert_eq!(pairs, vec!["BTC/USD", "ETH/USD"]);
    }

    #[test]
    fn malformed_numerics_become_nan_not_rejected() {
        let text = csv_with_rows(&["1,BTC/USD,oops,100,0.1,0.1,USD,01-01-24 10:00:00,A"]);
        let agg = ingest_csv(&text).unwrap();
        let order = &agg.orders[&OrderId::new("A")];
        assert_eq!(order.fills.len(), 1);
        assert!(order.total_amount.is_nan());
        assert!(order.total_value.is_nan());
    }

    #[test]
    fn date_failures_keep_the_record_and_are_counted() {
        let text = csv_with_rows(&["1,BTC/USD,1,100,0.1,0.1,USD,not a date,A"]);
        let agg = ingest_csv(&text).unwrap();
        let order = &agg.orders[&OrderId::new("A")];
        assert!(!order.date_parse.success());
        assert_eq!(order.timestamp, None);
        assert_eq!(order.raw_timestamp, "not a date");
        assert_eq!(agg.stats.failure_count(), 1);
    }

    #[test]
    fn short_rows_do_not_error() {
        let text = csv_with_rows(&["1,BTC/USD,1"]);
        let agg = ingest_csv(&text).unwrap();
        // Missing timestamp and order id decode as empty strings.
        let order = &agg.orders[&OrderId::new("")];
        assert!(order.fills[0].price.is_nan());
        assert!(!order.date_parse.success());
    }
}
