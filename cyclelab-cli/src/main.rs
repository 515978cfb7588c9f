//! CycleLab CLI — ingest, analyze, export, and merge commands.
//!
//! Commands:
//! - `ingest` — load a fill CSV and report orders and parsing diagnostics
//! - `cycles` — analyze round-trip cycles from a fill CSV and saved pairs
//! - `export` — write analyzed cycles to a CSV file
//! - `merge` — merge an incoming pair set into a pair store file

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use cyclelab_core::analytics::{self, TimeWindow};
use cyclelab_core::session::Session;
use cyclelab_report::export::{export_cycles_csv, format_duration, write_cycles_csv};
use cyclelab_report::store;

#[derive(Parser)]
#[command(
    name = "cyclelab",
    about = "CycleLab CLI — trade aggregation and cycle analysis"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a fill CSV and report aggregated orders and parsing diagnostics.
    Ingest {
        /// Path to the exchange fill export CSV.
        fills: PathBuf,
    },
    /// Analyze round-trip cycles from a fill CSV and a saved pair set.
    Cycles {
        /// Path to the exchange fill export CSV.
        fills: PathBuf,

        /// Pair store file (JSON).
        #[arg(long, default_value = "pairs.json")]
        pairs: PathBuf,

        /// Only include cycles quoted in this currency (e.g. USD).
        #[arg(long)]
        quote: Option<String>,

        /// Entry-date window: 30d, 90d, ytd, or all.
        #[arg(long, default_value = "all")]
        window: String,

        /// Print monthly performance breakdown.
        #[arg(long, default_value_t = false)]
        monthly: bool,
    },
    /// Write analyzed cycles to a CSV file.
    Export {
        /// Path to the exchange fill export CSV.
        fills: PathBuf,

        /// Pair store file (JSON).
        #[arg(long, default_value = "pairs.json")]
        pairs: PathBuf,

        /// Output CSV path. Omit to print to stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Merge an incoming pair set into a pair store file. Existing pairs
    /// sharing any order with the incoming set are evicted.
    Merge {
        /// Pair store file (JSON) to merge into.
        #[arg(long, default_value = "pairs.json")]
        pairs: PathBuf,

        /// Incoming pair set file (JSON).
        incoming: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { fills } => run_ingest(&fills),
        Commands::Cycles {
            fills,
            pairs,
            quote,
            window,
            monthly,
        } => run_cycles(&fills, &pairs, quote.as_deref(), &window, monthly),
        Commands::Export { fills, pairs, out } => run_export(&fills, &pairs, out.as_deref()),
        Commands::Merge { pairs, incoming } => run_merge(&pairs, &incoming),
    }
}

fn load_session(fills: &std::path::Path) -> Result<Session> {
    let text = std::fs::read_to_string(fills)
        .with_context(|| format!("failed to read fill CSV {}", fills.display()))?;
    let mut session = Session::new();
    session.load_batch(&text)?;
    Ok(session)
}

fn run_ingest(fills: &std::path::Path) -> Result<()> {
    let session = load_session(fills)?;
    let stats = session.stats();

    println!("Orders:  {}", session.orders().len());
    println!("Symbols: {}", session.trading_pairs().len());
    println!();
    println!(
        "{:<20} {:<10} {:>14} {:>14} {:>10}  {}",
        "Order", "Symbol", "Amount", "Value", "Fees", "Date"
    );
    println!("{}", "-".repeat(92));
    for order in session.orders_sorted() {
        println!(
            "{:<20} {:<10} {:>14.8} {:>14.2} {:>10.2}  {}",
            order.id,
            order.pair,
            order.total_amount,
            order.total_value,
            order.total_fees,
            order.date_parse.display_label(),
        );
    }

    println!();
    println!("--- Date Parsing ---");
    println!("Processed: {}", stats.total_processed);
    println!("Parsed:    {}", stats.successfully_parsed);
    for (format, count) in &stats.format_counts {
        println!("  {format}: {count}");
    }
    if stats.failure_count() > 0 {
        println!("Failures:  {} ({:.1}%)", stats.failure_count(), stats.failure_rate() * 100.0);
        for failure in &stats.failures {
            println!("  {:?}: {}", failure.input, failure.reason);
        }
    }

    Ok(())
}

fn run_cycles(
    fills: &std::path::Path,
    pairs_path: &std::path::Path,
    quote: Option<&str>,
    window: &str,
    monthly: bool,
) -> Result<()> {
    let mut session = load_session(fills)?;
    session.adopt_pairs(store::load_pairs(pairs_path)?);

    let window = parse_window(window)?;
    let report = if let Some(quote) = quote {
        if window != TimeWindow::All {
            bail!("--quote and --window cannot be combined");
        }
        session.analyze_cycles(Some(quote))
    } else {
        session.filter_cycles(window, Utc::now())
    };

    if report.cycles.is_empty() && report.skipped.is_empty() {
        println!("No cycles to analyze. Create pairs first or merge a pair set.");
        return Ok(());
    }

    println!(
        "{:<32} {:>12} {:>12} {:>10} {:>12} {:>10}",
        "Cycle", "Entry", "Exit", "Hold", "P&L", "ROI"
    );
    println!("{}", "-".repeat(94));
    for cycle in &report.cycles {
        println!(
            "{:<32} {:>12} {:>12} {:>10} {:>12.2} {:>10}",
            cycle.name,
            cycle.entry_date.map(|d| d.date().to_string()).unwrap_or_default(),
            cycle.exit_date.map(|d| d.date().to_string()).unwrap_or_default(),
            cycle.hold_ms.map(format_duration).unwrap_or_default(),
            cycle.pnl,
            if cycle.roi.is_finite() {
                format!("{:.2}%", cycle.roi)
            } else {
                String::new()
            },
        );
    }

    if let Some(summary) = analytics::summary(&report.cycles) {
        println!();
        println!("--- Summary ---");
        println!("Cycles:     {}", summary.total_cycles);
        println!("Profitable: {}", summary.profitable);
        println!("Win Rate:   {:.1}%", summary.win_rate);
        if summary.avg_roi.is_finite() {
            println!("Avg ROI:    {:.2}%", summary.avg_roi);
        }
        if let Some(avg_hold) = summary.avg_hold_ms {
            println!("Avg Hold:   {}", format_duration(avg_hold as i64));
        }
        if let Some(best) = &summary.best {
            println!("Best:       {} ({:.2}%)", best.name, best.roi);
        }
        if let Some(worst) = &summary.worst {
            println!("Worst:      {} ({:.2}%)", worst.name, worst.roi);
        }
    }

    if monthly {
        println!();
        println!("--- Monthly ---");
        for (month, stat) in analytics::monthly_performance(&report.cycles) {
            if stat.avg_roi.is_finite() {
                println!("{month}: {:>3} cycles, avg ROI {:.2}%", stat.count, stat.avg_roi);
            } else {
                println!("{month}: {:>3} cycles", stat.count);
            }
        }
    }

    if !report.skipped.is_empty() {
        println!();
        println!("--- Skipped ---");
        for skip in &report.skipped {
            println!("{}: {:?}", skip.name, skip.reason);
        }
    }

    Ok(())
}

fn run_export(
    fills: &std::path::Path,
    pairs_path: &std::path::Path,
    out: Option<&std::path::Path>,
) -> Result<()> {
    let mut session = load_session(fills)?;
    session.adopt_pairs(store::load_pairs(pairs_path)?);

    let report = session.analyze_cycles(None);
    match out {
        Some(path) => {
            write_cycles_csv(&report.cycles, path)?;
            println!("Exported {} cycle(s) to {}", report.cycles.len(), path.display());
        }
        None => print!("{}", export_cycles_csv(&report.cycles)?),
    }

    if !report.skipped.is_empty() {
        eprintln!("Skipped {} pair(s) during analysis.", report.skipped.len());
    }
    Ok(())
}

fn run_merge(pairs_path: &std::path::Path, incoming_path: &std::path::Path) -> Result<()> {
    let incoming = store::load_pairs(incoming_path)?;
    if incoming.is_empty() {
        bail!("incoming pair set {} is empty", incoming_path.display());
    }

    let report = store::merge_into_file(pairs_path, incoming)?;
    println!("Existing: {}", report.existing_before);
    println!("Added:    {}", report.added);
    println!("Evicted:  {}", report.evicted);
    for id in &report.evicted_ids {
        println!("  - {id}");
    }
    println!("Total:    {}", report.final_total);
    Ok(())
}

fn parse_window(value: &str) -> Result<TimeWindow> {
    Ok(match value {
        "30d" => TimeWindow::Last30Days,
        "90d" => TimeWindow::Last90Days,
        "ytd" => TimeWindow::YearToDate,
        "all" => TimeWindow::All,
        _ => bail!("unknown window '{value}'. Valid: 30d, 90d, ytd, all"),
    })
}
