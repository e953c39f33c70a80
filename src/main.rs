use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use freight_fuel_mix::config::EngineConfig;
use freight_fuel_mix::logging::{init_logging, LogLevel};
use freight_fuel_mix::optimizer::SolverKind;
use freight_fuel_mix::provider::CsvDataProvider;
use freight_fuel_mix::reporting::{display_report, display_run_header, write_json_report};
use freight_fuel_mix::FuelMixEngine;

#[derive(Parser)]
#[command(name = "freight-fuel-mix")]
#[command(about = "Emission-minimizing fuel mixes for highway, rail and maritime freight", long_about = None)]
struct Cli {
    /// Fuel price table (CSV)
    #[arg(long)]
    prices: PathBuf,

    /// Fuel emission factor table (CSV)
    #[arg(long)]
    emissions: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Allowed cost increase over the diesel baseline, in percent
    #[arg(long)]
    max_cost_increase: Option<f64>,

    /// Allocation solver
    #[arg(long)]
    solver: Option<SolverKind>,

    /// Solver worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Also write the report as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<LogLevel>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(pct) = cli.max_cost_increase {
        config.max_cost_increase_pct = pct;
    }
    if let Some(solver) = cli.solver {
        config.solver = solver;
    }
    if let Some(workers) = cli.workers {
        config.workers = Some(workers);
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    init_logging(&config.logging);

    let engine = FuelMixEngine::new(config).context("invalid configuration")?;
    let provider = CsvDataProvider::new(&cli.prices, &cli.emissions);
    let report = engine
        .run_with_provider(&provider)
        .context("fuel-mix optimization failed")?;

    let scenarios = report
        .modes
        .values()
        .map(|m| m.scenarios.len())
        .max()
        .unwrap_or(0);
    display_run_header(&report, scenarios);
    display_report(&report);

    if let Some(path) = &cli.json {
        write_json_report(&report, path)
            .with_context(|| format!("writing JSON report to {}", path.display()))?;
        println!("JSON report written to {}", path.display());
    }

    Ok(())
}
