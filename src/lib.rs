//! Freight fuel-mix optimization
//!
//! For every scenario of a fuel price / emission dataset and every freight mode, finds the
//! fuel allocation with the lowest greenhouse-gas emission whose cost stays within a
//! configured increase over an all-diesel baseline.

pub mod aggregator;
pub mod baseline;
pub mod coefficients;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod models;
pub mod optimizer;
pub mod provider;
pub mod reporting;
pub mod tables;

pub use aggregator::{FuelMixReport, ModeReport, ModeSummary};
pub use config::EngineConfig;
pub use engine::FuelMixEngine;
pub use error::{ConfigError, EngineError, ProviderError, SolveFailure};
pub use models::{FuelMix, Mode, ScenarioOutcome};
pub use optimizer::SolverKind;
pub use provider::{CsvDataProvider, DataProvider, EngineInputs};
