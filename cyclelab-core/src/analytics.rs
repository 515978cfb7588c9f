//! Cycle analytics — distribution, scatter, monthly, and summary views.
//!
//! Every function here consumes `&[Cycle]` from an analysis pass and is a
//! pure projection: no ambient clock, no mutation. Non-finite ROI values
//! mean "undefined" and are excluded from bins and averages, never coerced
//! to zero.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, Utc};

use crate::domain::{Cycle, Order, OrderId};
use crate::pairing::{analyze_cycles, CycleReport, PairSet};

/// One 5%-wide ROI histogram bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiBucket {
    /// Inclusive lower bound, a multiple of 5.
    pub lower: i64,
    pub label: String,
    pub count: usize,
}

/// ROI histogram in 5%-wide buckets, sorted by lower bound ascending.
pub fn roi_distribution(cycles: &[Cycle]) -> Vec<RoiBucket> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for cycle in cycles {
        if !cycle.roi.is_finite() {
            continue;
        }
        let lower = ((cycle.roi / 5.0).floor() * 5.0) as i64;
        *counts.entry(lower).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(lower, count)| RoiBucket {
            lower,
            label: format!("{lower}% to {}%", lower + 5),
            count,
        })
        .collect()
}

/// One hold-time-vs-ROI scatter point.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldRoiPoint {
    pub hours: f64,
    pub roi: f64,
}

/// Scatter data relating hold time to return. Cycles with no measurable
/// hold or an undefined ROI contribute nothing.
pub fn hold_time_roi(cycles: &[Cycle]) -> Vec<HoldRoiPoint> {
    cycles
        .iter()
        .filter(|c| c.roi.is_finite())
        .filter_map(|c| {
            c.hold_hours().map(|hours| HoldRoiPoint {
                hours,
                roi: c.roi,
            })
        })
        .collect()
}

/// Aggregate performance for one calendar month of cycle entries.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyStat {
    /// Mean ROI over the month's cycles with a defined ROI. `NaN` when
    /// none of them have one.
    pub avg_roi: f64,
    pub count: usize,
}

/// Average ROI and cycle count keyed by entry month (`"YYYY-MM"`).
/// Cycles without an entry date are omitted.
pub fn monthly_performance(cycles: &[Cycle]) -> BTreeMap<String, MonthlyStat> {
    let mut months: BTreeMap<String, (f64, usize, usize)> = BTreeMap::new();
    for cycle in cycles {
        let Some(entry) = cycle.entry_date else {
            continue;
        };
        let key = format!("{:04}-{:02}", entry.year(), entry.month());
        let slot = months.entry(key).or_insert((0.0, 0, 0));
        slot.2 += 1;
        if cycle.roi.is_finite() {
            slot.0 += cycle.roi;
            slot.1 += 1;
        }
    }
    months
        .into_iter()
        .map(|(key, (sum, finite, count))| {
            (
                key,
                MonthlyStat {
                    avg_roi: sum / finite as f64,
                    count,
                },
            )
        })
        .collect()
}

/// Name and ROI of a standout cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleHighlight {
    pub name: String,
    pub roi: f64,
}

/// Headline statistics over a set of cycles.
#[derive(Debug, Clone)]
pub struct CycleSummary {
    pub total_cycles: usize,
    pub profitable: usize,
    /// profitable / total × 100. A winner is strictly `roi > 0.0`.
    pub win_rate: f64,
    /// Mean over cycles with a defined ROI. `NaN` when none have one.
    pub avg_roi: f64,
    /// Mean hold in milliseconds over cycles with a measurable hold.
    pub avg_hold_ms: Option<f64>,
    pub best: Option<CycleHighlight>,
    pub worst: Option<CycleHighlight>,
}

/// Summarize a set of cycles, or `None` when there are none.
pub fn summary(cycles: &[Cycle]) -> Option<CycleSummary> {
    if cycles.is_empty() {
        return None;
    }

    let profitable = cycles.iter().filter(|c| c.is_winner()).count();

    let finite: Vec<&Cycle> = cycles.iter().filter(|c| c.roi.is_finite()).collect();
    let avg_roi = finite.iter().map(|c| c.roi).sum::<f64>() / finite.len() as f64;
    let best = finite
        .iter()
        .max_by(|a, b| a.roi.total_cmp(&b.roi))
        .map(|c| CycleHighlight {
            name: c.name.clone(),
            roi: c.roi,
        });
    let worst = finite
        .iter()
        .min_by(|a, b| a.roi.total_cmp(&b.roi))
        .map(|c| CycleHighlight {
            name: c.name.clone(),
            roi: c.roi,
        });

    let holds: Vec<i64> = cycles.iter().filter_map(|c| c.hold_ms).collect();
    let avg_hold_ms = if holds.is_empty() {
        None
    } else {
        Some(holds.iter().sum::<i64>() as f64 / holds.len() as f64)
    };

    Some(CycleSummary {
        total_cycles: cycles.len(),
        profitable,
        win_rate: profitable as f64 / cycles.len() as f64 * 100.0,
        avg_roi,
        avg_hold_ms,
        best,
        worst,
    })
}

// ─── Time windows ───────────────────────────────────────────────────

/// Entry-date window for filtered analysis. The reference instant is always
/// an explicit argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    Last30Days,
    Last90Days,
    YearToDate,
    All,
}

impl TimeWindow {
    fn contains(self, entry: chrono::NaiveDateTime, now: DateTime<Utc>) -> bool {
        let now = now.naive_utc();
        match self {
            TimeWindow::Last30Days => now - entry <= Duration::days(30),
            TimeWindow::Last90Days => now - entry <= Duration::days(90),
            TimeWindow::YearToDate => entry.year() == now.year(),
            TimeWindow::All => true,
        }
    }
}

/// Run a full cycle analysis and keep only the cycles whose entry date
/// falls inside the window. Cycles without an entry date survive only
/// under [`TimeWindow::All`]; skip diagnostics pass through unchanged.
pub fn filter_cycles(
    pairs: &PairSet,
    orders: &HashMap<OrderId, Order>,
    window: TimeWindow,
    now: DateTime<Utc>,
) -> CycleReport {
    let mut report = analyze_cycles(pairs, orders, None);
    report.cycles.retain(|cycle| match cycle.entry_date {
        Some(entry) => window.contains(entry, now),
        None => window == TimeWindow::All,
    });
    report
}
