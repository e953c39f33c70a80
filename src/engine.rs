//! Batch orchestration
//! Validates the inputs, then solves every scenario × mode pair on a bounded worker pool

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::aggregator::{aggregate, FuelMixReport};
use crate::baseline::{check_baseline_fuel, check_baseline_properties, BaselineCalculator};
use crate::coefficients::CoefficientBuilder;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::models::{AllocationResult, Mode, ModeContext};
use crate::optimizer::optimize_fuel_allocation;
use crate::provider::{DataProvider, EngineInputs};
use crate::tables::{index_scenarios, ScenarioData};

/// Runs fuel-mix optimizations for one configuration
pub struct FuelMixEngine {
    config: EngineConfig,
}

impl FuelMixEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn run_with_provider(&self, provider: &dyn DataProvider) -> Result<FuelMixReport, EngineError> {
        let inputs = provider.load()?;
        self.run(&inputs)
    }

    /// Optimize every mode
    pub fn run(&self, inputs: &EngineInputs) -> Result<FuelMixReport, EngineError> {
        self.run_modes(inputs, &Mode::ALL)
    }

    /// Optimize the given modes. Fatal input problems abort before any solve; per-scenario
    /// problems end up as failed outcomes in the report.
    pub fn run_modes(&self, inputs: &EngineInputs, modes: &[Mode]) -> Result<FuelMixReport, EngineError> {
        let config = &self.config;
        validate_inputs(inputs)?;
        check_baseline_fuel(&inputs.prices, &inputs.emissions, &config.baseline_fuel)?;

        let builder = CoefficientBuilder::new(config);
        let contexts: Vec<ModeContext> = modes.iter().map(|&m| config.modes.context(m)).collect();
        check_baseline_properties(&builder, &contexts, &config.baseline_fuel)?;

        let scenarios = index_scenarios(&inputs.prices, &inputs.emissions, config.baseline_year);
        let calculator = BaselineCalculator::new(&builder, &config.baseline_fuel);

        let jobs: Vec<(&ScenarioData, &ModeContext)> = contexts
            .iter()
            .flat_map(|ctx| scenarios.values().map(move |scenario| (scenario, ctx)))
            .collect();

        tracing::info!(
            scenarios = scenarios.len(),
            modes = contexts.len(),
            solver = %config.solver,
            max_cost_increase_pct = config.max_cost_increase_pct,
            "starting fuel-mix optimization"
        );

        let mut pool = ThreadPoolBuilder::new();
        if let Some(workers) = config.workers {
            pool = pool.num_threads(workers);
        }
        let pool = pool.build()?;

        let results: Vec<AllocationResult> = pool.install(|| {
            jobs.par_iter()
                .map(|&(scenario, ctx)| {
                    let baseline = calculator.baseline(scenario, ctx);
                    AllocationResult {
                        scenario: scenario.scenario.clone(),
                        mode: ctx.mode,
                        outcome: optimize_fuel_allocation(
                            &builder,
                            ctx,
                            scenario,
                            baseline.as_ref(),
                            config,
                        ),
                    }
                })
                .collect()
        });

        let order: Vec<String> = scenarios.keys().cloned().collect();
        let report = aggregate(&order, modes, results, config.max_cost_increase_pct);

        for (mode, mode_report) in &report.modes {
            tracing::info!(
                mode = %mode,
                solved = mode_report.summary.solved,
                failed = mode_report.summary.failed,
                "mode complete"
            );
        }
        Ok(report)
    }
}

/// Reject non-finite numbers before they reach a solver
fn validate_inputs(inputs: &EngineInputs) -> Result<(), EngineError> {
    if let Some((row, record)) = inputs
        .prices
        .iter()
        .enumerate()
        .find(|(_, r)| !r.price_per_gj.is_finite())
    {
        return Err(EngineError::InvalidInput {
            table: "price",
            row,
            reason: format!("price for '{}' is {}", record.fuel, record.price_per_gj),
        });
    }
    if let Some((row, record)) = inputs
        .emissions
        .iter()
        .enumerate()
        .find(|(_, r)| !r.kg_co2e_per_gj.is_finite())
    {
        return Err(EngineError::InvalidInput {
            table: "emissions",
            row,
            reason: format!("emission for '{}' is {}", record.fuel, record.kg_co2e_per_gj),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SolveFailure;
    use crate::models::{EmissionRecord, PriceRecord, ScenarioOutcome};
    use crate::optimizer::SolverKind;
    use rstest::rstest;

    fn price(scenario: &str, fuel: &str, value: f64, biomass: &str) -> PriceRecord {
        PriceRecord {
            year: 2050,
            scenario: scenario.to_string(),
            fuel: fuel.to_string(),
            price_per_gj: value,
            biomass_supply: Some(biomass.to_string()),
        }
    }

    fn emission(scenario: &str, fuel: &str, value: f64) -> EmissionRecord {
        EmissionRecord {
            year: 2050,
            scenario: scenario.to_string(),
            fuel: fuel.to_string(),
            kg_co2e_per_gj: value,
        }
    }

    /// Three scenarios: a normal one, a biomass-constrained one and one with pricey fuels
    fn inputs() -> EngineInputs {
        let mut prices = Vec::new();
        let mut emissions = Vec::new();
        for (scenario, biomass, scale) in [
            ("Reference", "Reference", 1.0),
            ("LowBio", "Constrained", 1.0),
            ("Expensive", "Reference", 3.0),
        ] {
            for (fuel, price_gj, ghg) in [
                ("petroleum diesel", 20.0, 90.0),
                ("renewable diesel", 24.0, 30.0),
                ("FT biofuels", 22.0, 15.0),
                ("hydrogen", 200.0, 5.0),
                ("LNG", 14.0, 150.0),
                ("ammonia", 30.0, 8.0),
            ] {
                let p = if fuel == "petroleum diesel" { price_gj } else { price_gj * scale };
                prices.push(price(scenario, fuel, p, biomass));
                // combustion and upstream components
                emissions.push(emission(scenario, fuel, ghg * 0.8));
                emissions.push(emission(scenario, fuel, ghg * 0.2));
            }
        }
        // older years are ignored
        prices.push(price("Reference", "petroleum diesel", 1.0, "Reference"));
        prices.last_mut().unwrap().year = 2030;
        EngineInputs { prices, emissions }
    }

    fn engine() -> FuelMixEngine {
        let config = EngineConfig {
            workers: Some(2),
            ..EngineConfig::default()
        };
        FuelMixEngine::new(config).unwrap()
    }

    #[rstest]
    #[case(SolverKind::Direct, 1e-9)]
    #[case(SolverKind::Lp, 1e-6)]
    fn test_solved_outcomes_respect_constraints(#[case] solver: SolverKind, #[case] tol: f64) {
        let config = EngineConfig {
            solver,
            workers: Some(2),
            ..EngineConfig::default()
        };
        let engine = FuelMixEngine::new(config).unwrap();
        let inputs = inputs();
        let report = engine.run(&inputs).unwrap();

        let builder = CoefficientBuilder::new(engine.config());
        let scenarios = index_scenarios(&inputs.prices, &inputs.emissions, 2050);
        let calculator = BaselineCalculator::new(&builder, "petroleum diesel");

        let mut solved = 0;
        for (mode, mode_report) in &report.modes {
            let ctx = engine.config().modes.context(*mode);
            for (scenario, outcome) in &mode_report.scenarios {
                let Some(mix) = outcome.fuel_mix() else { continue };
                solved += 1;
                let data = &scenarios[scenario];
                let baseline = calculator.baseline(data, &ctx).unwrap();

                let total: f64 = mix.allocations.values().sum();
                assert!((total - 1.0).abs() < 1e-6);
                assert!(mix.allocations.values().all(|x| (0.0..=1.0).contains(x)));

                let cost: f64 = mix
                    .allocations
                    .iter()
                    .map(|(fuel, x)| builder.unit_cost(fuel, &ctx, data).unwrap() * x)
                    .sum();
                assert!(cost <= engine.config().cost_cap(baseline.cost) * (1.0 + tol));
                assert!((cost - mix.total_cost).abs() < 1e-9 * cost.abs().max(1.0));
            }
        }
        assert!(solved > 0);
    }

    #[test]
    fn test_mode_eligibility() {
        let report = engine().run(&inputs()).unwrap();

        let highway = report.outcome(Mode::Highway, "Reference").unwrap().fuel_mix().unwrap();
        assert!(!highway.allocations.contains_key("ammonia"));

        let maritime = report.outcome(Mode::Maritime, "Reference").unwrap().fuel_mix().unwrap();
        let fuels: Vec<_> = maritime.allocations.keys().map(String::as_str).collect();
        assert_eq!(fuels, vec!["petroleum diesel", "hydrogen", "LNG", "ammonia"]);
    }

    #[test]
    fn test_infeasible_scenario_does_not_stop_the_batch() {
        let mut config = EngineConfig::default();
        // only fuels that cost more than diesel in the expensive scenario
        config.max_cost_increase_pct = 0.0;
        config.modes.highway.fuels = vec!["hydrogen".to_string(), "renewable diesel".to_string()];
        let report = FuelMixEngine::new(config).unwrap().run(&inputs()).unwrap();

        assert_eq!(
            report.outcome(Mode::Highway, "Expensive"),
            Some(&ScenarioOutcome::from(SolveFailure::Infeasible))
        );
        // same scenario still solves for other modes
        assert!(report.outcome(Mode::Rail, "Expensive").unwrap().is_optimal());
        assert_eq!(report.mode(Mode::Highway).unwrap().scenarios.len(), 3);
    }

    #[test]
    fn test_biomass_constraint_changes_highway_mix_only() {
        let report = engine().run(&inputs()).unwrap();

        let reference = report.outcome(Mode::Highway, "Reference").unwrap().fuel_mix().unwrap();
        let constrained = report.outcome(Mode::Highway, "LowBio").unwrap().fuel_mix().unwrap();
        assert!(reference.allocations["FT biofuels"] > constrained.allocations["FT biofuels"]);

        let maritime_ref = report.outcome(Mode::Maritime, "Reference").unwrap();
        let maritime_low = report.outcome(Mode::Maritime, "LowBio").unwrap();
        assert_eq!(maritime_ref, maritime_low);
    }

    #[test]
    fn test_runs_are_idempotent() {
        let engine = engine();
        let inputs = inputs();

        assert_eq!(engine.run(&inputs).unwrap(), engine.run(&inputs).unwrap());
    }

    #[test]
    fn test_scenario_without_diesel_rows_fails_per_scenario() {
        let mut inputs = inputs();
        inputs.prices.push(price("NoDiesel", "LNG", 14.0, "Reference"));
        inputs.emissions.push(emission("NoDiesel", "LNG", 75.0));

        let report = engine().run(&inputs).unwrap();
        for mode in Mode::ALL {
            assert_eq!(
                report.outcome(mode, "NoDiesel"),
                Some(&ScenarioOutcome::from(SolveFailure::MissingBaseline))
            );
        }
    }

    #[test]
    fn test_missing_diesel_is_fatal() {
        let mut inputs = inputs();
        inputs.emissions.retain(|r| r.fuel != "petroleum diesel");

        assert!(matches!(
            engine().run(&inputs),
            Err(EngineError::MissingBaselineFuel { table: "emissions", .. })
        ));
    }

    #[test]
    fn test_non_finite_input_is_rejected() {
        let mut inputs = inputs();
        inputs.prices[3].price_per_gj = f64::NAN;

        assert!(matches!(
            engine().run(&inputs),
            Err(EngineError::InvalidInput { table: "price", row: 3, .. })
        ));
    }

    #[test]
    fn test_run_single_mode_with_provider() {
        let engine = engine();
        let report = engine.run_with_provider(&inputs()).unwrap();
        assert_eq!(report.modes.len(), 3);

        let rail_only = engine.run_modes(&inputs(), &[Mode::Rail]).unwrap();
        assert_eq!(rail_only.modes.keys().copied().collect::<Vec<_>>(), vec![Mode::Rail]);
        assert_eq!(rail_only.mode(Mode::Rail), report.mode(Mode::Rail));
    }
}
