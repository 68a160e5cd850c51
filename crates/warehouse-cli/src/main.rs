//! `warehouse-cli` – fleet localisation front end.
//!
//! This binary brings a simulated warehouse fleet up from a cold start:
//!
//! 1. Loads `~/.warehouse/config.toml` (or `--config <path>`), writing the
//!    defaults on first run.
//! 2. Builds the floor plan and places every configured robot at its hidden
//!    starting pose.
//! 3. Localises the robots one at a time, each resolved robot becoming an
//!    obstacle for the next.
//! 4. Prints a coloured summary, or the full report as JSON with `--json`.
//!
//! Ctrl-C stops the run before the next robot starts.

mod config;

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use warehouse_perception::WarehouseMap;
use warehouse_runtime::{FleetLocaliser, FleetReport, TracingObserver};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "warehouse", about = "Localise a warehouse robot fleet from a cold start")]
struct Args {
    /// Config file path (defaults to ~/.warehouse/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Print the fleet report as JSON instead of a summary
    #[arg(long)]
    json: bool,
    /// Seed for the exploration tie-break
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Hold the guard until exit so pending spans are flushed.
    let _telemetry = warehouse_runtime::init_tracing("warehouse-localiser");

    if !args.json {
        print_banner();
    }

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("{}", "⚠  Ctrl-C received – stopping after the current robot …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; the run cannot be interrupted cleanly");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let path = args.config.clone().unwrap_or_else(config::config_path);
    let mut cfg = match config::load_from(&path) {
        Ok(Some(cfg)) => {
            if !args.json {
                println!("  Config loaded from {}", path.display().to_string().bold());
            }
            cfg
        }
        Ok(None) => {
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            match config::save_to(&config::Config::default(), &path) {
                Ok(()) if !args.json => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    path.display().to_string().bold()
                ),
                Ok(()) => {}
                Err(e) => eprintln!("{}: {}", "Error saving config".red(), e),
            }
            cfg
        }
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            eprintln!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };
    if let Some(seed) = args.seed {
        cfg.seed = Some(seed);
    }

    // ── Fleet bring-up ────────────────────────────────────────────────────
    let (map, mut robots) = match cfg.build_map().and_then(|map| {
        let robots = cfg.spawn_robots(&map)?;
        Ok((map, robots))
    }) {
        Ok(setup) => setup,
        Err(e) => {
            eprintln!("{}: {}", "Setup error".red(), e);
            return ExitCode::FAILURE;
        }
    };

    if !args.json {
        println!(
            "  Localising {} robot(s) on a {}×{} floor ({} readings, max {} moves each)\n",
            robots.len(),
            map.width(),
            map.height(),
            cfg.converter,
            cfg.max_iterations
        );
    }

    let mut fleet = FleetLocaliser::new(map, cfg.localiser_config()).with_observer(Box::new(TracingObserver));
    let report = fleet.localise_all(&mut robots, &shutdown);

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("{}: {}", "Failed to serialise report".red(), e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_report(&report);
        println!();
        for row in render_floor(fleet.map(), &report) {
            println!("    {}", row);
        }
        println!();
    }

    if report.is_complete() && report.located.len() == robots.len() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_report(report: &FleetReport) {
    for robot in &report.located {
        println!(
            "  {} {:<10} {}  {}",
            "✓".green().bold(),
            robot.name.bold(),
            robot.location.to_string().cyan(),
            format!("({} moves)", robot.moves).dimmed()
        );
    }
    for robot in &report.failed {
        println!("  {} {:<10} {}", "✗".red().bold(), robot.name.bold(), robot.reason.red());
    }
}

/// Floor plan rows, northernmost first, with each located robot drawn as the
/// first letter of its name.
fn render_floor(map: &WarehouseMap, report: &FleetReport) -> Vec<String> {
    let mut grid: Vec<Vec<char>> = map.to_rows().iter().map(|r| r.chars().collect()).collect();
    for robot in &report.located {
        let p = robot.location.to_point();
        if !map.contains(p) {
            continue;
        }
        let row = (map.height() - 1 - p.y) as usize;
        let glyph = robot.name.chars().next().unwrap_or('R').to_ascii_uppercase();
        grid[row][p.x as usize] = glyph;
    }
    grid.into_iter().map(|r| r.into_iter().collect()).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("  {} {}",
        "Warehouse Localiser".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Multi-hypothesis cold-start localisation");
    println!();
}
