//! Allocation optimizer
//! Finds the emission-minimizing fuel split for one scenario and mode under the cost cap.
//!
//! The LP has one coverage row and one budget row, so an optimal basic solution holds
//! either a single fuel within budget or a blend of two fuels that spends the budget
//! exactly. The direct solver enumerates those vertices; the LP solver builds the same
//! model with `good_lp` and is kept for cross-checking.

use std::fmt;
use std::str::FromStr;

use good_lp::solvers::clarabel::clarabel;
use good_lp::{constraint, variable, variables, Expression, ResolutionError, Solution, SolverModel, Variable};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::baseline::Baseline;
use crate::coefficients::CoefficientBuilder;
use crate::config::EngineConfig;
use crate::error::SolveFailure;
use crate::models::{FuelCoefficient, FuelMix, ModeContext, ScenarioOutcome};
use crate::tables::ScenarioData;

/// Relative slack when testing a fuel against the budget
const BUDGET_TOLERANCE: f64 = 1e-9;

/// Which algorithm solves the allocation LP
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    /// Vertex enumeration of the two-row LP
    #[default]
    Direct,
    /// Generic LP solver (Clarabel through good_lp)
    Lp,
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverKind::Direct => write!(f, "direct"),
            SolverKind::Lp => write!(f, "lp"),
        }
    }
}

impl FromStr for SolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(SolverKind::Direct),
            "lp" => Ok(SolverKind::Lp),
            other => Err(format!("unknown solver '{}' (use direct or lp)", other)),
        }
    }
}

/// Minimize Σ emission·x subject to Σ x = 1, Σ cost·x ≤ budget, 0 ≤ x ≤ 1
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationProblem {
    pub fuels: Vec<FuelCoefficient>,
    pub budget: f64,
}

/// Candidate vertex: `share` of fuel `dear` blended into fuel `base`
#[derive(Debug, Clone, Copy)]
struct Vertex {
    base: usize,
    dear: Option<(usize, f64)>,
    emission: f64,
}

impl AllocationProblem {
    pub fn new(fuels: Vec<FuelCoefficient>, budget: f64) -> Self {
        Self { fuels, budget }
    }

    /// Allocation fractions in fuel order
    pub fn solve(&self, kind: SolverKind) -> Result<Vec<f64>, SolveFailure> {
        if self.fuels.is_empty() {
            return Err(SolveFailure::NoEligibleFuels);
        }
        match kind {
            SolverKind::Direct => self.solve_direct(),
            SolverKind::Lp => self.solve_lp(),
        }
    }

    fn solve_direct(&self) -> Result<Vec<f64>, SolveFailure> {
        let slack = BUDGET_TOLERANCE * self.budget.abs().max(1.0);
        let within = |fuel: &FuelCoefficient| fuel.cost <= self.budget + slack;

        let mut best: Option<Vertex> = None;
        let mut consider = |candidate: Vertex| {
            if best.map_or(true, |b| candidate.emission < b.emission) {
                best = Some(candidate);
            }
        };

        for (i, fuel) in self.fuels.iter().enumerate() {
            if within(fuel) {
                consider(Vertex {
                    base: i,
                    dear: None,
                    emission: fuel.emission,
                });
            }
        }

        // Blends that spend the budget exactly: a fuel under the cap with a cleaner one over it
        for (i, cheap) in self.fuels.iter().enumerate().filter(|(_, f)| within(*f)) {
            for (j, dear) in self.fuels.iter().enumerate().filter(|(_, f)| !within(*f)) {
                if dear.emission >= cheap.emission {
                    continue;
                }
                let share = ((self.budget - cheap.cost) / (dear.cost - cheap.cost)).clamp(0.0, 1.0);
                consider(Vertex {
                    base: i,
                    dear: Some((j, share)),
                    emission: cheap.emission + share * (dear.emission - cheap.emission),
                });
            }
        }

        let vertex = best.ok_or(SolveFailure::Infeasible)?;
        let mut allocation = vec![0.0; self.fuels.len()];
        match vertex.dear {
            Some((j, share)) => {
                allocation[vertex.base] = 1.0 - share;
                allocation[j] = share;
            }
            None => allocation[vertex.base] = 1.0,
        }
        Ok(allocation)
    }

    fn solve_lp(&self) -> Result<Vec<f64>, SolveFailure> {
        let mut vars = variables!();
        let allocation: Vec<Variable> = self
            .fuels
            .iter()
            .map(|_| vars.add(variable().min(0.0).max(1.0)))
            .collect();

        let emission: Expression = self
            .fuels
            .iter()
            .zip(&allocation)
            .map(|(fuel, &x)| fuel.emission * x)
            .sum();
        let cost: Expression = self
            .fuels
            .iter()
            .zip(&allocation)
            .map(|(fuel, &x)| fuel.cost * x)
            .sum();
        let coverage: Expression = allocation.iter().map(|&x| Expression::from(x)).sum();
        let budget = self.budget;

        let solution = vars
            .minimise(emission)
            .using(clarabel)
            .with(constraint!(coverage == 1.0))
            .with(constraint!(cost <= budget))
            .solve()
            .map_err(|err| match err {
                ResolutionError::Infeasible => SolveFailure::Infeasible,
                other => SolveFailure::Solver(other.to_string()),
            })?;

        Ok(allocation
            .iter()
            .map(|&x| solution.value(x).clamp(0.0, 1.0))
            .collect())
    }

    pub fn emission_of(&self, allocation: &[f64]) -> f64 {
        self.fuels
            .iter()
            .zip(allocation)
            .map(|(fuel, x)| fuel.emission * x)
            .sum()
    }

    pub fn cost_of(&self, allocation: &[f64]) -> f64 {
        self.fuels
            .iter()
            .zip(allocation)
            .map(|(fuel, x)| fuel.cost * x)
            .sum()
    }
}

/// Percent change of `optimized` relative to `baseline`
pub fn percent_change(optimized: f64, baseline: f64) -> f64 {
    (optimized / baseline - 1.0) * 100.0
}

fn baseline_is_usable(baseline: &Baseline) -> bool {
    baseline.cost.is_finite() && baseline.cost > 0.0 && baseline.emission.is_finite() && baseline.emission != 0.0
}

/// Optimize one scenario for one mode.
/// Never fails: every problem becomes a `ScenarioOutcome::Failed`.
pub fn optimize_fuel_allocation(
    builder: &CoefficientBuilder<'_>,
    mode: &ModeContext,
    scenario: &ScenarioData,
    baseline: Option<&Baseline>,
    config: &EngineConfig,
) -> ScenarioOutcome {
    let outcome = solve_scenario(builder, mode, scenario, baseline, config);
    match &outcome {
        ScenarioOutcome::Optimal(mix) => tracing::info!(
            scenario = %scenario.scenario,
            mode = %mode.mode,
            percent_ghg = mix.percent_ghg,
            percent_cost = mix.percent_cost,
            "optimization succeeded"
        ),
        ScenarioOutcome::Failed { reason } => tracing::warn!(
            scenario = %scenario.scenario,
            mode = %mode.mode,
            %reason,
            "optimization failed"
        ),
    }
    outcome
}

fn solve_scenario(
    builder: &CoefficientBuilder<'_>,
    mode: &ModeContext,
    scenario: &ScenarioData,
    baseline: Option<&Baseline>,
    config: &EngineConfig,
) -> ScenarioOutcome {
    let Some(baseline) = baseline else {
        return SolveFailure::MissingBaseline.into();
    };
    if !baseline_is_usable(baseline) {
        return SolveFailure::DegenerateBaseline.into();
    }

    let fuels = builder.coefficients(mode, scenario);
    tracing::debug!(
        scenario = %scenario.scenario,
        mode = %mode.mode,
        fuels = fuels.len(),
        "built fuel coefficients"
    );

    let problem = AllocationProblem::new(fuels, config.cost_cap(baseline.cost));
    let allocation = match problem.solve(config.solver) {
        Ok(allocation) => allocation,
        Err(reason) => return reason.into(),
    };

    let total_emission = problem.emission_of(&allocation);
    let total_cost = problem.cost_of(&allocation);
    let allocations: IndexMap<String, f64> = problem
        .fuels
        .iter()
        .zip(&allocation)
        .map(|(fuel, &x)| (fuel.fuel.clone(), x))
        .collect();

    ScenarioOutcome::Optimal(FuelMix {
        allocations,
        total_emission,
        total_cost,
        percent_ghg: percent_change(total_emission, baseline.emission),
        percent_cost: percent_change(total_cost, baseline.cost),
    })
}
