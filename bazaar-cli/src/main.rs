//! `bazaarbot`: runs the simulation headless and prints a closing summary.
//!
//! Three positional, all-optional numeric arguments: simulation duration in
//! seconds, animation FPS (0 disables the live chart; unused by this binary,
//! see `bazaar-tui` for the chart), agent tick rate per second.

use anyhow::{Context, Result};
use bazaar_core::chart::{self, ChartPoint};
use bazaar_core::errors::StartupError;
use bazaar_core::{AuctionHouseHandle, Clock, Commodity, Config, Supervisor, SystemClock};
use bazaar_roles::RoleKind;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// The CLI's own top-level error type, at the binary boundary where this
/// workspace's dependency ledger puts `thiserror`; library crates hand-roll
/// their error enums instead (`bazaar_core::errors`).
#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("simulation startup failed: {0}")]
    Startup(#[from] StartupError),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Continuous double-auction agent economy")]
struct Args {
    /// Simulation duration in seconds.
    #[arg(default_value_t = 60)]
    duration_secs: u64,

    /// Animation frames per second; 0 means no display.
    #[arg(default_value_t = 0)]
    fps: u32,

    /// Agent tick rate, in ticks per second.
    #[arg(default_value_t = 2)]
    agent_tick_rate: u32,

    /// Log level (info, debug, trace, ...).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Directory the per-commodity `.dat` chart series are written to, when
    /// `fps > 0`. Read by `bazaar-chart`.
    #[arg(long, default_value = "./chart-data")]
    chart_dir: PathBuf,
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
    Ok(())
}

const COMMODITIES: &[&str] = &["food", "fertilizer", "wood", "ore", "metal", "tools"];

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level).context("failed to initialize logging")?;

    if args.agent_tick_rate == 0 {
        anyhow::bail!("agent tick rate must be positive");
    }
    let trader_tick_ms = 1000 / args.agent_tick_rate as u64;
    let run_duration_ms = args.duration_secs * 1000;

    tracing::info!(
        duration_secs = args.duration_secs,
        fps = args.fps,
        agent_tick_rate = args.agent_tick_rate,
        "starting bazaarbot"
    );

    let config = Config::from_env();
    let clock = Arc::new(SystemClock);
    let house = Arc::new(AuctionHouseHandle::new(config, clock.clone()));
    for commodity in COMMODITIES {
        house.register_commodity(Commodity::new(*commodity, 1.0));
    }

    let (pump_thread, clearing_thread) = AuctionHouseHandle::spawn(house.clone(), run_duration_ms);

    let supervisor = Arc::new(Supervisor::<RoleKind>::new(
        house.clone(),
        config,
        clock.clone(),
        trader_tick_ms,
    ));
    let supervisor_thread = supervisor.clone().spawn();

    let shutdown_house = house.clone();
    ctrlc::set_handler(move || {
        tracing::warn!("received interrupt, shutting down");
        shutdown_house.shutdown();
    })
    .context("failed to install Ctrl-C handler")?;

    let chart_thread = if args.fps > 0 {
        std::fs::create_dir_all(&args.chart_dir).context("failed to create chart data directory")?;
        Some(spawn_chart_writer(house.clone(), clock, args.chart_dir.clone(), args.fps))
    } else {
        None
    };

    pump_thread.join().expect("auction house pump thread panicked");
    clearing_thread.join().expect("auction house clearing thread panicked");
    let supervisor_result = supervisor_thread.join().expect("supervisor thread panicked");
    supervisor_result.map_err(CliError::from)?;
    if let Some(chart_thread) = chart_thread {
        chart_thread.join().expect("chart writer thread panicked");
    }

    print_summary(&house);
    Ok(())
}

/// Samples each commodity's mid price at `fps` frames per second and appends
/// it to that commodity's `.dat` file, until the house shuts down.
fn spawn_chart_writer(
    house: Arc<AuctionHouseHandle>,
    clock: Arc<dyn Clock>,
    dir: PathBuf,
    fps: u32,
) -> thread::JoinHandle<()> {
    let frame_ms = (1000 / fps.max(1) as u64).max(1);
    thread::Builder::new()
        .name("chart-writer".into())
        .spawn(move || {
            while !house.is_shutdown() {
                let now = clock.now_ms();
                for commodity in COMMODITIES {
                    let value = house.history.mid_price.most_recent(commodity);
                    if let Err(err) = chart::append_point(&dir, commodity, ChartPoint { timestamp_ms: now, value }) {
                        tracing::warn!(commodity, %err, "failed to append chart point");
                    }
                }
                thread::sleep(Duration::from_millis(frame_ms));
            }
        })
        .expect("failed to spawn chart writer thread")
}

fn print_summary(house: &AuctionHouseHandle) {
    println!("=== BazaarBot summary ===");
    for commodity in COMMODITIES {
        let price = house.history.mid_price.most_recent(commodity);
        let pct_change = house.history.mid_price.t_percentage_change(commodity, 10_000);
        println!("{commodity:<12} closing price ${price:>8.2}   10s change {pct_change:>6.2}%");
    }
    println!("spread profit: ${:.2}", house.spread_profit());
    println!("average agent lifespan (ticks): {:.1}", house.average_age_at_death());
    println!("total deaths: {}", house.total_deaths());
}
