//! One-shot printer of the latest closing state from a `.dat` chart series
//! directory -- useful for checking on a running or finished `bazaarbot`
//! from a script or CI job without attaching the live chart.
//!
//! ## Usage
//!
//! ```bash
//! print-summary --chart-dir ./chart-data
//! print-summary --chart-dir ./chart-data --format json
//! ```

use anyhow::Result;
use bazaar_core::chart;
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;

const COMMODITIES: &[&str] = &["food", "fertilizer", "wood", "ore", "metal", "tools"];

#[derive(Parser)]
#[command(name = "print-summary")]
#[command(about = "Print the latest per-commodity state from a chart-data directory")]
struct Args {
    /// Directory bazaarbot wrote its per-commodity `.dat` series to.
    #[arg(long, default_value = "./chart-data")]
    chart_dir: PathBuf,

    /// Output format (pretty, json).
    #[arg(short, long, default_value = "pretty")]
    format: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.format.as_str() {
        "json" => print_json(&args.chart_dir)?,
        _ => print_pretty(&args.chart_dir)?,
    }
    Ok(())
}

fn print_pretty(dir: &PathBuf) -> Result<()> {
    println!();
    println!("=== BazaarBot chart summary ({}) ===", dir.display());
    for commodity in COMMODITIES {
        let series = chart::read_series(dir, commodity)?;
        let Some(last) = series.last() else {
            println!("{commodity:<12} (no data yet)");
            continue;
        };
        let pct = percentage_change(&series, 10_000);
        println!("{commodity:<12} ${:>8.2}   10s change {pct:>6.2}%   {} samples", last.value, series.len());
    }
    println!();
    Ok(())
}

fn print_json(dir: &PathBuf) -> Result<()> {
    let mut entries = Vec::new();
    for commodity in COMMODITIES {
        let series = chart::read_series(dir, commodity)?;
        let last = series.last();
        entries.push(json!({
            "commodity": commodity,
            "price": last.map(|p| p.value),
            "percentage_change_10s": percentage_change(&series, 10_000),
            "samples": series.len(),
        }));
    }
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

/// `100*(current - past)/past`, `past` being the earliest sample inside the
/// `delta_ms` window (or the series' earliest sample if it's shorter).
fn percentage_change(series: &[chart::ChartPoint], delta_ms: i64) -> f64 {
    let Some(last) = series.last() else { return 0.0 };
    let cutoff = last.timestamp_ms - delta_ms;
    let mut past = last.value;
    for point in series.iter().rev() {
        if point.timestamp_ms < cutoff {
            break;
        }
        past = point.value;
    }
    if past == 0.0 {
        0.0
    } else {
        100.0 * (last.value - past) / past
    }
}
