//! Result aggregation and per-mode statistics
//! Merges scenario outcomes from every mode into a single report, whatever order they finish in

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::models::{AllocationResult, Mode, ScenarioOutcome};

/// Distribution of one percent-change metric across solved scenarios
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub percentile_10: f64,
    pub percentile_50: f64, // Median
    pub percentile_90: f64,
}

impl MetricStats {
    /// `None` for an empty sample
    pub fn from_values(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.total_cmp(b));

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        let percentile = |p: f64| {
            let index = ((p / 100.0) * (n - 1.0)).round() as usize;
            values[index.min(values.len() - 1)]
        };

        Some(MetricStats {
            mean,
            std_dev: variance.sqrt(),
            min: values[0],
            max: values[values.len() - 1],
            percentile_10: percentile(10.0),
            percentile_50: percentile(50.0),
            percentile_90: percentile(90.0),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeSummary {
    pub solved: usize,
    pub failed: usize,
    pub percent_ghg: Option<MetricStats>,
    pub percent_cost: Option<MetricStats>,
}

impl ModeSummary {
    fn from_outcomes<'a>(outcomes: impl Iterator<Item = &'a ScenarioOutcome>) -> Self {
        let mut ghg = Vec::new();
        let mut cost = Vec::new();
        let mut failed = 0;
        for outcome in outcomes {
            match outcome.fuel_mix() {
                Some(mix) => {
                    ghg.push(mix.percent_ghg);
                    cost.push(mix.percent_cost);
                }
                None => failed += 1,
            }
        }
        ModeSummary {
            solved: ghg.len(),
            failed,
            percent_ghg: MetricStats::from_values(ghg),
            percent_cost: MetricStats::from_values(cost),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeReport {
    pub scenarios: IndexMap<String, ScenarioOutcome>,
    pub summary: ModeSummary,
}

/// Outcomes of a whole run, keyed by mode then scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelMixReport {
    pub max_cost_increase_pct: f64,
    pub modes: IndexMap<Mode, ModeReport>,
}

impl FuelMixReport {
    pub fn mode(&self, mode: Mode) -> Option<&ModeReport> {
        self.modes.get(&mode)
    }

    pub fn outcome(&self, mode: Mode, scenario: &str) -> Option<&ScenarioOutcome> {
        self.mode(mode)?.scenarios.get(scenario)
    }
}

/// Build the report. Scenarios are listed in `scenario_order` within every mode; a failure
/// in one mode has no effect on the same scenario in another.
pub fn aggregate(
    scenario_order: &[String],
    modes: &[Mode],
    results: Vec<AllocationResult>,
    max_cost_increase_pct: f64,
) -> FuelMixReport {
    let mut by_key: HashMap<(Mode, String), ScenarioOutcome> = results
        .into_iter()
        .map(|r| ((r.mode, r.scenario), r.outcome))
        .collect();

    let modes = modes
        .iter()
        .map(|&mode| {
            let scenarios: IndexMap<String, ScenarioOutcome> = scenario_order
                .iter()
                .filter_map(|scenario| {
                    by_key
                        .remove(&(mode, scenario.clone()))
                        .map(|outcome| (scenario.clone(), outcome))
                })
                .collect();
            let summary = ModeSummary::from_outcomes(scenarios.values());
            (mode, ModeReport { scenarios, summary })
        })
        .collect();

    FuelMixReport {
        max_cost_increase_pct,
        modes,
    }
}
