//! CSV export of analyzed cycles.
//!
//! One row per cycle. Undefined values — missing dates, unmeasurable
//! holds, non-finite ratios — render as empty cells rather than zeros.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use cyclelab_core::datetime::CANONICAL_FORMAT;
use cyclelab_core::domain::Cycle;

/// Render cycles as CSV.
///
/// Columns: Cycle Name, Entry Date, Exit Date, Hold Duration,
/// Position Size, Entry Price, Exit Price, Price Change %, ROI %, P&L,
/// Total Fees. Position size carries 8 decimal places; money and percent
/// columns carry 2.
pub fn export_cycles_csv(cycles: &[Cycle]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "Cycle Name",
        "Entry Date",
        "Exit Date",
        "Hold Duration",
        "Position Size",
        "Entry Price",
        "Exit Price",
        "Price Change %",
        "ROI %",
        "P&L",
        "Total Fees",
    ])?;

    for cycle in cycles {
        wtr.write_record([
            cycle.name.clone(),
            date_cell(cycle.entry_date),
            date_cell(cycle.exit_date),
            cycle.hold_ms.map(format_duration).unwrap_or_default(),
            format!("{:.8}", cycle.position_size),
            money_cell(cycle.entry_price),
            money_cell(cycle.exit_price),
            percent_cell(cycle.price_change_pct()),
            percent_cell(cycle.roi),
            money_cell(cycle.pnl),
            money_cell(cycle.total_fees),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export cycles to a CSV file on disk.
pub fn write_cycles_csv(cycles: &[Cycle], path: &std::path::Path) -> Result<()> {
    let csv = export_cycles_csv(cycles)?;
    std::fs::write(path, csv)
        .with_context(|| format!("failed to write cycle CSV to {}", path.display()))
}

/// Human-readable hold duration: `"2d 5h"`, or `"5h"` under a day.
/// Negative durations keep their sign.
pub fn format_duration(ms: i64) -> String {
    let sign = if ms < 0 { "-" } else { "" };
    let ms = ms.abs();
    let days = ms / 86_400_000;
    let hours = (ms % 86_400_000) / 3_600_000;
    if days > 0 {
        format!("{sign}{days}d {hours}h")
    } else {
        format!("{sign}{hours}h")
    }
}

fn date_cell(date: Option<NaiveDateTime>) -> String {
    date.map(|d| d.format(CANONICAL_FORMAT).to_string())
        .unwrap_or_default()
}

fn money_cell(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.2}")
    } else {
        String::new()
    }
}

fn percent_cell(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.2}%")
    } else {
        String::new()
    }
}
