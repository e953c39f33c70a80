//! Reporting and output formatting module
//! Console tables per mode plus the JSON report

use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use crate::aggregator::{FuelMixReport, MetricStats, ModeReport};
use crate::models::{Mode, ScenarioOutcome};

const BANNER_WIDTH: usize = 99;

fn banner(title: &str) -> String {
    let rule = "═".repeat(BANNER_WIDTH);
    format!("╔{rule}╗\n║{title:^width$}║\n╚{rule}╝\n", width = BANNER_WIDTH)
}

/// Display run parameters
pub fn display_run_header(report: &FuelMixReport, scenarios: usize) {
    println!("\n{}", banner("FREIGHT FUEL-MIX OPTIMIZATION"));
    println!(
        "Maximum cost increase: {:.1}% | Scenarios: {} | Modes: {}\n",
        report.max_cost_increase_pct,
        scenarios,
        report.modes.len()
    );
}

/// Per-scenario outcomes of one mode
pub fn format_mode_results(mode: Mode, mode_report: &ModeReport) -> String {
    let mut out = banner(&format!("{} RESULTS", mode.name().to_uppercase()));
    out.push('\n');

    for (scenario, outcome) in &mode_report.scenarios {
        let _ = writeln!(out, "Scenario: {}", scenario);
        match outcome {
            ScenarioOutcome::Optimal(mix) => {
                for (fuel, share) in mix.allocations.iter().filter(|(_, x)| **x > 1e-9) {
                    let _ = writeln!(out, "  {:<20} {:>6.1}%", fuel, share * 100.0);
                }
                let _ = writeln!(
                    out,
                    "  GHG change: {:+.2}% | Cost change: {:+.2}%\n",
                    mix.percent_ghg, mix.percent_cost
                );
            }
            ScenarioOutcome::Failed { reason } => {
                let _ = writeln!(out, "  Optimization failed for this scenario. ({})\n", reason);
            }
        }
    }
    out
}

fn format_stats(label: &str, stats: &MetricStats) -> String {
    format!(
        "  {label}: mean {:+.2}% ± {:.2} | median {:+.2}% | range [{:+.2}%, {:+.2}%] | 10th-90th [{:+.2}%, {:+.2}%]",
        stats.mean,
        stats.std_dev,
        stats.percentile_50,
        stats.min,
        stats.max,
        stats.percentile_10,
        stats.percentile_90,
    )
}

/// Solved/failed counts and percent-change distribution of one mode
pub fn format_mode_summary(mode: Mode, mode_report: &ModeReport) -> String {
    let summary = &mode_report.summary;
    let mut out = format!(
        "{} summary: {} solved, {} failed\n",
        mode.name(),
        summary.solved,
        summary.failed
    );
    if let Some(ghg) = &summary.percent_ghg {
        out.push_str(&format_stats("GHG ", ghg));
        out.push('\n');
    }
    if let Some(cost) = &summary.percent_cost {
        out.push_str(&format_stats("Cost", cost));
        out.push('\n');
    }
    out
}

/// Print every mode of the report
pub fn display_report(report: &FuelMixReport) {
    for (&mode, mode_report) in &report.modes {
        print!("{}", format_mode_results(mode, mode_report));
        println!("{}", format_mode_summary(mode, mode_report));
    }
}

/// Write the report as pretty-printed JSON
pub fn write_json_report(report: &FuelMixReport, path: &Path) -> io::Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}
