//! Coefficient builder
//! Turns raw prices and emission intensities into per-mode LP coefficients

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::{BiomassOverride, EngineConfig};
use crate::models::{FuelCoefficient, FuelProperties, Mode, ModeContext};
use crate::tables::ScenarioData;

/// LHV is quoted in MJ; prices and intensities are per GJ
pub const MJ_PER_GJ: f64 = 1000.0;

/// Ship consumption rates are quoted per thousand ton-miles
const SHIP_CONSUMPTION_SCALE: f64 = 1000.0;

/// Converts a per-GJ quantity into a mode-level total for the whole freight volume
pub trait CostModel: Send + Sync {
    /// Total fuel cost (USD billion) if the full volume ran on this fuel
    fn unit_cost(&self, price_per_gj: f64, props: &FuelProperties, freight_volume: f64) -> Option<f64>;

    /// Total emission if the full volume ran on this fuel
    fn unit_emission(
        &self,
        kg_co2e_per_gj: f64,
        props: &FuelProperties,
        freight_volume: f64,
    ) -> Option<f64>;
}

/// Highway and rail: energy per ton-mile times volume
#[derive(Debug, Clone, Copy, Default)]
pub struct RoadRailModel;

impl CostModel for RoadRailModel {
    fn unit_cost(&self, price_per_gj: f64, props: &FuelProperties, freight_volume: f64) -> Option<f64> {
        Some(price_per_gj * (props.lhv / MJ_PER_GJ) * props.consumption * freight_volume)
    }

    fn unit_emission(
        &self,
        kg_co2e_per_gj: f64,
        props: &FuelProperties,
        freight_volume: f64,
    ) -> Option<f64> {
        Some(kg_co2e_per_gj * (props.lhv / MJ_PER_GJ) * props.consumption * freight_volume)
    }
}

/// Empirical maritime operating-cost model.
///
/// `cost = normalization * (fuel_price_coefficient * fuel_price
///         + crew_coefficient * crew_rate + capital_coefficient * capital_value + offset)
///         * freight_volume`, with `fuel_price = price * density * lhv / 1000`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaritimeCostModel {
    pub normalization: f64,
    pub fuel_price_coefficient: f64,
    pub crew_coefficient: f64,
    pub crew_rate: f64,
    pub capital_coefficient: f64,
    pub capital_value: f64,
    pub offset: f64,
}

impl Default for MaritimeCostModel {
    fn default() -> Self {
        Self {
            normalization: 0.01,
            fuel_price_coefficient: 2.636e-2,
            crew_coefficient: 8.841e-3,
            crew_rate: 27.34,
            capital_coefficient: 4.47e-6,
            capital_value: 287331.0,
            offset: 1.0411,
        }
    }
}

impl MaritimeCostModel {
    /// Price per fuel unit from a per-GJ price
    pub fn fuel_price(&self, price_per_gj: f64, density: f64, lhv: f64) -> f64 {
        price_per_gj * density * (lhv / MJ_PER_GJ)
    }

    pub fn freight_cost(&self, fuel_price: f64, freight_volume: f64) -> f64 {
        self.normalization
            * (self.fuel_price_coefficient * fuel_price
                + self.crew_coefficient * self.crew_rate
                + self.capital_coefficient * self.capital_value
                + self.offset)
            * freight_volume
    }
}

impl CostModel for MaritimeCostModel {
    fn unit_cost(&self, price_per_gj: f64, props: &FuelProperties, freight_volume: f64) -> Option<f64> {
        let density = props.density?;
        let fuel_price = self.fuel_price(price_per_gj, density, props.lhv);
        Some(self.freight_cost(fuel_price, freight_volume))
    }

    fn unit_emission(
        &self,
        kg_co2e_per_gj: f64,
        props: &FuelProperties,
        freight_volume: f64,
    ) -> Option<f64> {
        Some(
            kg_co2e_per_gj
                * (props.lhv / MJ_PER_GJ)
                * (props.consumption / SHIP_CONSUMPTION_SCALE)
                * freight_volume,
        )
    }
}

/// Lookup of physical properties by (mode, fuel)
#[derive(Debug, Clone, Default)]
pub struct PropertyTable {
    entries: HashMap<(Mode, String), FuelProperties>,
}

impl PropertyTable {
    pub fn from_entries(entries: &[FuelProperties]) -> Self {
        let mut table = HashMap::with_capacity(entries.len());
        for entry in entries {
            table
                .entry((entry.mode, entry.fuel.clone()))
                .or_insert_with(|| entry.clone());
        }
        Self { entries: table }
    }

    pub fn get(&self, mode: Mode, fuel: &str) -> Option<&FuelProperties> {
        self.entries.get(&(mode, fuel.to_string()))
    }
}

/// Builds cost and emission coefficients for one engine configuration
pub struct CoefficientBuilder<'a> {
    properties: PropertyTable,
    maritime: &'a MaritimeCostModel,
    biomass: &'a BiomassOverride,
}

impl<'a> CoefficientBuilder<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self {
            properties: PropertyTable::from_entries(&config.fuel_properties),
            maritime: &config.maritime,
            biomass: &config.biomass_override,
        }
    }

    pub fn cost_model(&self, mode: Mode) -> &dyn CostModel {
        match mode {
            Mode::Highway | Mode::Rail => &RoadRailModel,
            Mode::Maritime => self.maritime,
        }
    }

    pub fn properties(&self, mode: Mode, fuel: &str) -> Option<&FuelProperties> {
        self.properties.get(mode, fuel)
    }

    /// Scenario price for `fuel` with the biomass-constrained override applied
    pub fn effective_price(&self, fuel: &str, mode: Mode, scenario: &ScenarioData) -> Option<f64> {
        let price = scenario.price(fuel)?;
        if scenario.biomass_constrained && self.biomass.applies_to(fuel, mode) {
            Some(price * self.biomass.multiplier)
        } else {
            Some(price)
        }
    }

    /// `None` when the scenario has no price for the fuel or the fuel is unusable in the mode
    pub fn unit_cost(&self, fuel: &str, mode: &ModeContext, scenario: &ScenarioData) -> Option<f64> {
        let props = self.properties(mode.mode, fuel)?;
        let price = self.effective_price(fuel, mode.mode, scenario)?;
        self.cost_model(mode.mode)
            .unit_cost(price, props, mode.freight_volume)
    }

    pub fn unit_emission(
        &self,
        fuel: &str,
        mode: &ModeContext,
        scenario: &ScenarioData,
    ) -> Option<f64> {
        let props = self.properties(mode.mode, fuel)?;
        let intensity = scenario.emission(fuel)?;
        self.cost_model(mode.mode)
            .unit_emission(intensity, props, mode.freight_volume)
    }

    /// Coefficients for every eligible fuel of the mode, in price-table order.
    /// Fuels outside the allow-list, missing from either table, or lacking properties the
    /// mode formula needs are left out.
    pub fn coefficients(&self, mode: &ModeContext, scenario: &ScenarioData) -> Vec<FuelCoefficient> {
        scenario
            .fuels_with_data()
            .filter(|fuel| mode.allows(fuel))
            .filter_map(|fuel| {
                let cost = self.unit_cost(fuel, mode, scenario)?;
                let emission = self.unit_emission(fuel, mode, scenario)?;
                Some(FuelCoefficient {
                    fuel: fuel.to_string(),
                    cost,
                    emission,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use rstest::rstest;

    fn scenario(biomass_constrained: bool) -> ScenarioData {
        let mut data = ScenarioData {
            scenario: "s1".to_string(),
            biomass_constrained,
            ..Default::default()
        };
        for (fuel, price, ghg) in [
            ("petroleum diesel", 20.0, 90.0),
            ("FT biofuels", 30.0, 10.0),
            ("FT biofuels CCS", 35.0, -20.0),
            ("ammonia", 25.0, 5.0),
            ("LNG", 15.0, 70.0),
        ] {
            data.prices.insert(fuel.to_string(), price);
            data.emissions.insert(fuel.to_string(), ghg);
        }
        data
    }

    fn context(config: &EngineConfig, mode: Mode) -> ModeContext {
        config.modes.context(mode)
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() <= 1e-9 * b.abs().max(1.0), "{} != {}", a, b);
    }

    #[test]
    fn test_road_formula() {
        let config = EngineConfig::default();
        let builder = CoefficientBuilder::new(&config);
        let highway = context(&config, Mode::Highway);
        let data = scenario(false);

        let cost = builder.unit_cost("petroleum diesel", &highway, &data).unwrap();
        let emission = builder.unit_emission("petroleum diesel", &highway, &data).unwrap();

        // price * LHV(GJ/gal) * gal/ton-mile * billion ton-miles
        assert_close(cost, 20.0 * 0.13556 * 0.008 * 926.0);
        assert_close(emission, 90.0 * 0.13556 * 0.008 * 926.0);
    }

    #[test]
    fn test_maritime_formula() {
        let config = EngineConfig::default();
        let builder = CoefficientBuilder::new(&config);
        let maritime = context(&config, Mode::Maritime);
        let data = scenario(false);

        let cost = builder.unit_cost("petroleum diesel", &maritime, &data).unwrap();
        let fuel_price = 20.0 * 3.25 * (42.8 / 1000.0);
        let expected = 0.01
            * (2.636e-2 * fuel_price + 8.841e-3 * 27.34 + 4.47e-6 * 287331.0 + 1.0411)
            * 221.0;
        assert_close(cost, expected);

        let emission = builder.unit_emission("petroleum diesel", &maritime, &data).unwrap();
        assert_close(emission, 90.0 * (42.8 / 1000.0) * (1.08 / 1000.0) * 221.0);
    }

    #[test]
    fn test_maritime_needs_density() {
        let mut config = EngineConfig::default();
        for entry in config.fuel_properties.iter_mut() {
            if entry.fuel == "LNG" && entry.mode == Mode::Maritime {
                entry.density = None;
            }
        }
        let builder = CoefficientBuilder::new(&config);
        let maritime = context(&config, Mode::Maritime);

        assert!(builder.unit_cost("LNG", &maritime, &scenario(false)).is_none());
        let fuels: Vec<_> = builder
            .coefficients(&maritime, &scenario(false))
            .into_iter()
            .map(|c| c.fuel)
            .collect();
        assert!(!fuels.contains(&"LNG".to_string()));
    }

    #[test]
    fn test_missing_properties_exclude_fuel() {
        let mut config = EngineConfig::default();
        config.modes.highway.fuels.push("ammonia".to_string());
        let builder = CoefficientBuilder::new(&config);
        let highway = context(&config, Mode::Highway);

        assert!(builder.unit_cost("ammonia", &highway, &scenario(false)).is_none());
        let fuels: Vec<_> = builder
            .coefficients(&highway, &scenario(false))
            .into_iter()
            .map(|c| c.fuel)
            .collect();
        assert_eq!(
            fuels,
            vec!["petroleum diesel", "FT biofuels", "FT biofuels CCS", "LNG"]
        );
    }

    #[rstest]
    #[case(Mode::Highway, "FT biofuels", 2.5)]
    #[case(Mode::Rail, "FT biofuels CCS", 2.5)]
    #[case(Mode::Highway, "LNG", 1.0)]
    #[case(Mode::Maritime, "LNG", 1.0)]
    fn test_biomass_override_ratio(#[case] mode: Mode, #[case] fuel: &str, #[case] ratio: f64) {
        let config = EngineConfig::default();
        let builder = CoefficientBuilder::new(&config);
        let ctx = context(&config, mode);

        let plain = builder.unit_cost(fuel, &ctx, &scenario(false)).unwrap();
        let constrained = builder.unit_cost(fuel, &ctx, &scenario(true)).unwrap();

        assert_close(constrained, ratio * plain);
    }

    #[test]
    fn test_biomass_override_leaves_emissions_alone() {
        let config = EngineConfig::default();
        let builder = CoefficientBuilder::new(&config);
        let highway = context(&config, Mode::Highway);

        assert_eq!(
            builder.unit_emission("FT biofuels", &highway, &scenario(false)),
            builder.unit_emission("FT biofuels", &highway, &scenario(true)),
        );
    }
}
