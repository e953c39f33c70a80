//! Domain data structures shared by the engine components

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::SolveFailure;

/// Value of the `Biomass Supply` column that triggers the FT-biofuel price override
pub const BIOMASS_CONSTRAINED: &str = "Constrained";

/// Freight transport mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Highway,
    Rail,
    Maritime,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Highway, Mode::Rail, Mode::Maritime];

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Highway => "Highway",
            Mode::Rail => "Rail",
            Mode::Maritime => "Maritime",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "highway" => Ok(Mode::Highway),
            "rail" => Ok(Mode::Rail),
            "maritime" => Ok(Mode::Maritime),
            other => Err(format!("unknown mode '{}' (use highway, rail or maritime)", other)),
        }
    }
}

/// Fuel price for one (year, scenario, fuel)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub year: u32,
    pub scenario: String,
    pub fuel: String,
    /// USD per GJ
    pub price_per_gj: f64,
    pub biomass_supply: Option<String>,
}

impl PriceRecord {
    pub fn is_biomass_constrained(&self) -> bool {
        self.biomass_supply.as_deref().map(str::trim) == Some(BIOMASS_CONSTRAINED)
    }
}

/// One emission-intensity component for a (year, scenario, fuel); components are summed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmissionRecord {
    pub year: u32,
    pub scenario: String,
    pub fuel: String,
    /// kg CO2e per GJ
    pub kg_co2e_per_gj: f64,
}

/// Physical properties of a fuel when used in a given mode.
/// A missing entry means the fuel cannot be used in that mode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FuelProperties {
    pub fuel: String,
    pub mode: Mode,
    /// Lower heating value, MJ per fuel unit
    pub lhv: f64,
    /// kg per gallon; only the maritime cost model needs it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>,
    /// Fuel units per ton-mile
    pub consumption: f64,
}

/// Per-mode inputs the optimizer works against
#[derive(Clone, Debug, PartialEq)]
pub struct ModeContext {
    pub mode: Mode,
    /// Billion ton-miles
    pub freight_volume: f64,
    /// Allow-list of fuels considered for this mode
    pub fuels: Vec<String>,
}

impl ModeContext {
    pub fn allows(&self, fuel: &str) -> bool {
        self.fuels.iter().any(|f| f == fuel)
    }
}

/// Per-fuel LP coefficients for one scenario and mode
#[derive(Clone, Debug, PartialEq)]
pub struct FuelCoefficient {
    pub fuel: String,
    pub cost: f64,
    pub emission: f64,
}

/// Optimized fuel mix for one scenario and mode
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FuelMix {
    /// Fraction of freight volume per fuel, in eligible-fuel order
    pub allocations: IndexMap<String, f64>,
    pub total_emission: f64,
    pub total_cost: f64,
    pub percent_ghg: f64,
    pub percent_cost: f64,
}

/// Result of a single scenario/mode solve.
/// Serialized flat: a failure carries `null` allocations and metrics next to its reason.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "OutcomeRecord", try_from = "OutcomeRecord")]
pub enum ScenarioOutcome {
    Optimal(FuelMix),
    Failed { reason: SolveFailure },
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum OutcomeStatus {
    Optimal,
    Failed,
}

/// Wire shape of a `ScenarioOutcome`
#[derive(Serialize, Deserialize)]
struct OutcomeRecord {
    status: OutcomeStatus,
    allocations: Option<IndexMap<String, f64>>,
    total_emission: Option<f64>,
    total_cost: Option<f64>,
    percent_ghg: Option<f64>,
    percent_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<SolveFailure>,
}

impl From<ScenarioOutcome> for OutcomeRecord {
    fn from(outcome: ScenarioOutcome) -> Self {
        match outcome {
            ScenarioOutcome::Optimal(mix) => OutcomeRecord {
                status: OutcomeStatus::Optimal,
                allocations: Some(mix.allocations),
                total_emission: Some(mix.total_emission),
                total_cost: Some(mix.total_cost),
                percent_ghg: Some(mix.percent_ghg),
                percent_cost: Some(mix.percent_cost),
                reason: None,
            },
            ScenarioOutcome::Failed { reason } => OutcomeRecord {
                status: OutcomeStatus::Failed,
                allocations: None,
                total_emission: None,
                total_cost: None,
                percent_ghg: None,
                percent_cost: None,
                reason: Some(reason),
            },
        }
    }
}

impl TryFrom<OutcomeRecord> for ScenarioOutcome {
    type Error = String;

    fn try_from(record: OutcomeRecord) -> Result<Self, Self::Error> {
        match record.status {
            OutcomeStatus::Failed => Ok(ScenarioOutcome::Failed {
                reason: record.reason.ok_or("failed outcome without a reason")?,
            }),
            OutcomeStatus::Optimal => match (
                record.allocations,
                record.total_emission,
                record.total_cost,
                record.percent_ghg,
                record.percent_cost,
            ) {
                (
                    Some(allocations),
                    Some(total_emission),
                    Some(total_cost),
                    Some(percent_ghg),
                    Some(percent_cost),
                ) => Ok(ScenarioOutcome::Optimal(FuelMix {
                    allocations,
                    total_emission,
                    total_cost,
                    percent_ghg,
                    percent_cost,
                })),
                _ => Err("optimal outcome with missing allocations or metrics".to_string()),
            },
        }
    }
}

impl ScenarioOutcome {
    pub fn fuel_mix(&self) -> Option<&FuelMix> {
        match self {
            ScenarioOutcome::Optimal(mix) => Some(mix),
            ScenarioOutcome::Failed { .. } => None,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.fuel_mix().is_some()
    }
}

impl From<SolveFailure> for ScenarioOutcome {
    fn from(reason: SolveFailure) -> Self {
        ScenarioOutcome::Failed { reason }
    }
}

/// Outcome tagged with the (scenario, mode) it belongs to
#[derive(Clone, Debug, PartialEq)]
pub struct AllocationResult {
    pub scenario: String,
    pub mode: Mode,
    pub outcome: ScenarioOutcome,
}
