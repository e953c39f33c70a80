//! Engine configuration
//! Every field has a default matching the reference freight dataset; a TOML file only
//! needs to name what it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::coefficients::MaritimeCostModel;
use crate::error::ConfigError;
use crate::logging::LogConfig;
use crate::models::{FuelProperties, Mode, ModeContext};
use crate::optimizer::SolverKind;

pub const DEFAULT_BASELINE_YEAR: u32 = 2050;
pub const DEFAULT_BASELINE_FUEL: &str = "petroleum diesel";
pub const DEFAULT_MAX_COST_INCREASE_PCT: f64 = 20.0;

const ROAD_RAIL_FUELS: &[&str] = &[
    "petroleum diesel",
    "e-diesel",
    "hydrogen",
    "renewable diesel",
    "FT biofuels",
    "FT biofuels CCS",
    "LNG",
    "electricity",
];

const MARITIME_FUELS: &[&str] = &["petroleum diesel", "LNG", "hydrogen", "ammonia"];

// (fuel, mode, LHV MJ/unit, density kg/gal, consumption units/ton-mile)
const DEFAULT_PROPERTIES: &[(&str, Mode, f64, Option<f64>, f64)] = &[
    ("petroleum diesel", Mode::Highway, 135.56, Some(3.25), 0.008),
    ("petroleum diesel", Mode::Rail, 135.56, Some(3.25), 0.00189),
    ("petroleum diesel", Mode::Maritime, 42.8, Some(3.25), 1.08),
    ("e-diesel", Mode::Highway, 135.56, Some(3.25), 0.008),
    ("e-diesel", Mode::Rail, 135.56, Some(3.25), 0.00189),
    ("renewable diesel", Mode::Highway, 135.56, Some(3.25), 0.008),
    ("renewable diesel", Mode::Rail, 135.56, Some(3.25), 0.00189),
    ("FT biofuels", Mode::Highway, 126.132, Some(3.25), 0.008),
    ("FT biofuels", Mode::Rail, 126.132, Some(3.25), 0.00236),
    ("FT biofuels CCS", Mode::Highway, 130.52, Some(3.25), 0.008),
    ("FT biofuels CCS", Mode::Rail, 130.52, Some(3.25), 0.00182),
    ("ammonia", Mode::Maritime, 18.6, Some(2.58), 2.5),
    ("hydrogen", Mode::Highway, 119.88, Some(0.268), 0.009),
    ("hydrogen", Mode::Rail, 119.88, Some(0.268), 0.00189),
    ("hydrogen", Mode::Maritime, 120.0, Some(0.268), 0.69),
    ("LNG", Mode::Highway, 22.409, Some(1.89), 0.006),
    ("LNG", Mode::Rail, 22.409, Some(1.89), 0.00108),
    ("LNG", Mode::Maritime, 45.0, Some(1.89), 1.18),
    ("electricity", Mode::Highway, 3.6, Some(1.0), 0.095),
    ("electricity", Mode::Rail, 3.6, Some(1.0), 0.0383),
];

pub fn default_fuel_properties() -> Vec<FuelProperties> {
    DEFAULT_PROPERTIES
        .iter()
        .map(|&(fuel, mode, lhv, density, consumption)| FuelProperties {
            fuel: fuel.to_string(),
            mode,
            lhv,
            density,
            consumption,
        })
        .collect()
}

/// Freight volume and fuel allow-list of one mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeSettings {
    /// Billion ton-miles
    pub freight_volume: f64,
    pub fuels: Vec<String>,
}

impl ModeSettings {
    fn new(freight_volume: f64, fuels: &[&str]) -> Self {
        Self {
            freight_volume,
            fuels: fuels.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Per-mode settings. A `[modes.<mode>]` section only needs the keys it changes; the rest
/// keep that mode's defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ModeTableOverrides")]
pub struct ModeTable {
    pub highway: ModeSettings,
    pub rail: ModeSettings,
    pub maritime: ModeSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModeOverrides {
    freight_volume: Option<f64>,
    fuels: Option<Vec<String>>,
}

impl ModeOverrides {
    fn apply(self, settings: &mut ModeSettings) {
        if let Some(volume) = self.freight_volume {
            settings.freight_volume = volume;
        }
        if let Some(fuels) = self.fuels {
            settings.fuels = fuels;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ModeTableOverrides {
    highway: ModeOverrides,
    rail: ModeOverrides,
    maritime: ModeOverrides,
}

impl From<ModeTableOverrides> for ModeTable {
    fn from(overrides: ModeTableOverrides) -> Self {
        let mut table = ModeTable::default();
        overrides.highway.apply(&mut table.highway);
        overrides.rail.apply(&mut table.rail);
        overrides.maritime.apply(&mut table.maritime);
        table
    }
}

impl Default for ModeTable {
    fn default() -> Self {
        Self {
            highway: ModeSettings::new(926.0, ROAD_RAIL_FUELS),
            rail: ModeSettings::new(604.0, ROAD_RAIL_FUELS),
            maritime: ModeSettings::new(221.0, MARITIME_FUELS),
        }
    }
}

impl ModeTable {
    pub fn get(&self, mode: Mode) -> &ModeSettings {
        match mode {
            Mode::Highway => &self.highway,
            Mode::Rail => &self.rail,
            Mode::Maritime => &self.maritime,
        }
    }

    pub fn get_mut(&mut self, mode: Mode) -> &mut ModeSettings {
        match mode {
            Mode::Highway => &mut self.highway,
            Mode::Rail => &mut self.rail,
            Mode::Maritime => &mut self.maritime,
        }
    }

    pub fn context(&self, mode: Mode) -> ModeContext {
        let settings = self.get(mode);
        ModeContext {
            mode,
            freight_volume: settings.freight_volume,
            fuels: settings.fuels.clone(),
        }
    }
}

/// Price multiplier applied to biofuels when biomass supply is constrained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomassOverride {
    pub multiplier: f64,
    pub fuels: Vec<String>,
    pub modes: Vec<Mode>,
}

impl Default for BiomassOverride {
    fn default() -> Self {
        Self {
            multiplier: 2.5,
            fuels: vec!["FT biofuels".to_string(), "FT biofuels CCS".to_string()],
            modes: vec![Mode::Highway, Mode::Rail],
        }
    }
}

impl BiomassOverride {
    pub fn applies_to(&self, fuel: &str, mode: Mode) -> bool {
        self.modes.contains(&mode) && self.fuels.iter().any(|f| f == fuel)
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Allowed total fuel cost increase over the diesel baseline, in percent
    pub max_cost_increase_pct: f64,
    pub baseline_year: u32,
    pub baseline_fuel: String,
    pub solver: SolverKind,
    /// Solver worker threads; defaults to available parallelism
    pub workers: Option<usize>,
    pub biomass_override: BiomassOverride,
    pub maritime: MaritimeCostModel,
    pub modes: ModeTable,
    pub fuel_properties: Vec<FuelProperties>,
    pub logging: LogConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cost_increase_pct: DEFAULT_MAX_COST_INCREASE_PCT,
            baseline_year: DEFAULT_BASELINE_YEAR,
            baseline_fuel: DEFAULT_BASELINE_FUEL.to_string(),
            solver: SolverKind::default(),
            workers: None,
            biomass_override: BiomassOverride::default(),
            maritime: MaritimeCostModel::default(),
            modes: ModeTable::default(),
            fuel_properties: default_fuel_properties(),
            logging: LogConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Read and validate a TOML config file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Cost cap for a scenario whose baseline cost is `baseline_cost`
    pub fn cost_cap(&self, baseline_cost: f64) -> f64 {
        (1.0 + self.max_cost_increase_pct / 100.0) * baseline_cost
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: &str| {
            Err(ConfigError::Invalid {
                field: field.to_string(),
                reason: reason.to_string(),
            })
        };

        if !self.max_cost_increase_pct.is_finite() || self.max_cost_increase_pct <= -100.0 {
            return invalid(
                "max_cost_increase_pct",
                "must be a finite percentage above -100",
            );
        }
        if self.baseline_fuel.trim().is_empty() {
            return invalid("baseline_fuel", "must not be empty");
        }
        if self.workers == Some(0) {
            return invalid("workers", "must be at least 1");
        }
        if !self.biomass_override.multiplier.is_finite() || self.biomass_override.multiplier < 0.0 {
            return invalid("biomass_override.multiplier", "must be finite and non-negative");
        }

        let maritime = &self.maritime;
        for (name, value) in [
            ("normalization", maritime.normalization),
            ("fuel_price_coefficient", maritime.fuel_price_coefficient),
            ("crew_coefficient", maritime.crew_coefficient),
            ("crew_rate", maritime.crew_rate),
            ("capital_coefficient", maritime.capital_coefficient),
            ("capital_value", maritime.capital_value),
            ("offset", maritime.offset),
        ] {
            if !value.is_finite() {
                return invalid(&format!("maritime.{}", name), "must be finite");
            }
        }

        for mode in Mode::ALL {
            let settings = self.modes.get(mode);
            if !settings.freight_volume.is_finite() || settings.freight_volume < 0.0 {
                return invalid(
                    &format!("modes.{}.freight_volume", mode.name().to_lowercase()),
                    "must be finite and non-negative",
                );
            }
        }

        for entry in &self.fuel_properties {
            let field = format!("fuel_properties[{} / {}]", entry.fuel, entry.mode);
            let density_ok = entry.density.map_or(true, |d| d.is_finite() && d > 0.0);
            if !(entry.lhv.is_finite() && entry.lhv > 0.0)
                || !(entry.consumption.is_finite() && entry.consumption > 0.0)
                || !density_ok
            {
                return invalid(&field, "lhv, density and consumption must be positive numbers");
            }
        }

        Ok(())
    }
}
