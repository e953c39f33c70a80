//! Per-scenario views over the raw price and emission tables

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::models::{EmissionRecord, PriceRecord};

/// Rows of one scenario for a single year, ready for coefficient building
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScenarioData {
    pub scenario: String,
    /// First price row per fuel, in table order
    pub prices: IndexMap<String, f64>,
    /// Emission components summed per fuel
    pub emissions: HashMap<String, f64>,
    pub biomass_constrained: bool,
}

impl ScenarioData {
    pub fn price(&self, fuel: &str) -> Option<f64> {
        self.prices.get(fuel).copied()
    }

    pub fn emission(&self, fuel: &str) -> Option<f64> {
        self.emissions.get(fuel).copied()
    }

    /// Fuels present in both tables, in price-table order
    pub fn fuels_with_data(&self) -> impl Iterator<Item = &str> {
        self.prices
            .keys()
            .map(String::as_str)
            .filter(|fuel| self.emissions.contains_key(*fuel))
    }
}

/// Group the rows of `year` by scenario.
/// Scenarios are listed in the order they first appear in the price table; scenarios that
/// only appear in the emission table have nothing to optimize and are dropped.
pub fn index_scenarios(
    prices: &[PriceRecord],
    emissions: &[EmissionRecord],
    year: u32,
) -> IndexMap<String, ScenarioData> {
    let mut scenarios: IndexMap<String, ScenarioData> = IndexMap::new();

    for record in prices.iter().filter(|r| r.year == year) {
        let data = scenarios
            .entry(record.scenario.clone())
            .or_insert_with(|| ScenarioData {
                scenario: record.scenario.clone(),
                ..Default::default()
            });
        data.prices
            .entry(record.fuel.clone())
            .or_insert(record.price_per_gj);
        data.biomass_constrained |= record.is_biomass_constrained();
    }

    for record in emissions.iter().filter(|r| r.year == year) {
        if let Some(data) = scenarios.get_mut(&record.scenario) {
            *data.emissions.entry(record.fuel.clone()).or_insert(0.0) += record.kg_co2e_per_gj;
        }
    }

    scenarios
}
