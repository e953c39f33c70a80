//! Baseline calculator
//! Reference cost and emission per scenario and mode when all freight runs on the baseline fuel

use serde::{Deserialize, Serialize};

use crate::coefficients::CoefficientBuilder;
use crate::error::EngineError;
use crate::models::{EmissionRecord, ModeContext, PriceRecord};
use crate::tables::ScenarioData;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub cost: f64,
    pub emission: f64,
}

/// Fail unless `fuel` appears somewhere in both tables
pub fn check_baseline_fuel(
    prices: &[PriceRecord],
    emissions: &[EmissionRecord],
    fuel: &str,
) -> Result<(), EngineError> {
    if !prices.iter().any(|r| r.fuel == fuel) {
        return Err(EngineError::MissingBaselineFuel {
            fuel: fuel.to_string(),
            table: "price",
        });
    }
    if !emissions.iter().any(|r| r.fuel == fuel) {
        return Err(EngineError::MissingBaselineFuel {
            fuel: fuel.to_string(),
            table: "emissions",
        });
    }
    Ok(())
}

/// Fail unless every mode can price the baseline fuel
pub fn check_baseline_properties(
    builder: &CoefficientBuilder<'_>,
    modes: &[ModeContext],
    fuel: &str,
) -> Result<(), EngineError> {
    let probe = ScenarioData {
        prices: [(fuel.to_string(), 1.0)].into_iter().collect(),
        emissions: [(fuel.to_string(), 1.0)].into_iter().collect(),
        ..Default::default()
    };
    for mode in modes {
        if builder.unit_cost(fuel, mode, &probe).is_none()
            || builder.unit_emission(fuel, mode, &probe).is_none()
        {
            return Err(EngineError::MissingBaselineProperties {
                fuel: fuel.to_string(),
                mode: mode.mode,
            });
        }
    }
    Ok(())
}

pub struct BaselineCalculator<'a> {
    builder: &'a CoefficientBuilder<'a>,
    fuel: &'a str,
}

impl<'a> BaselineCalculator<'a> {
    pub fn new(builder: &'a CoefficientBuilder<'a>, fuel: &'a str) -> Self {
        Self { builder, fuel }
    }

    /// Baseline for one scenario and mode, or `None` when the scenario lacks a baseline
    /// price or emission row.
    ///
    /// The cost comes from the first baseline price row of the scenario while the emission
    /// sums every baseline emission row; the asymmetry is intended.
    pub fn baseline(&self, scenario: &ScenarioData, mode: &ModeContext) -> Option<Baseline> {
        // the biomass override never touches the baseline fuel, so the raw first row is used
        let price = scenario.price(self.fuel)?;
        let emission = scenario.emission(self.fuel)?;
        let props = self.builder.properties(mode.mode, self.fuel)?;
        let model = self.builder.cost_model(mode.mode);

        Some(Baseline {
            cost: model.unit_cost(price, props, mode.freight_volume)?,
            emission: model.unit_emission(emission, props, mode.freight_volume)?,
        })
    }
}
