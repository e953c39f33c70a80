//! Error types for the fuel-mix engine
//! Run-level errors abort a batch; `SolveFailure` is carried inside a scenario outcome instead

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::models::Mode;

/// Fatal errors that stop a run before any scenario is solved
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("'{fuel}' is not present in the {table} table. Check your {table} data.")]
    MissingBaselineFuel { fuel: String, table: &'static str },

    #[error("no physical properties for baseline fuel '{fuel}' in mode {mode}")]
    MissingBaselineProperties { fuel: String, mode: Mode },

    #[error("invalid input in {table} row {row}: {reason}")]
    InvalidInput {
        table: &'static str,
        row: usize,
        reason: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("failed to start solver worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Invalid or unreadable engine configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Errors raised while ingesting input tables
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("failed to read {table} table from {path}: {source}")]
    Csv {
        table: &'static str,
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("malformed {table} record: {source}")]
    Record {
        table: &'static str,
        #[source]
        source: csv::Error,
    },
}

/// Why a single scenario/mode solve produced no allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SolveFailure {
    #[error("no eligible fuels for this mode")]
    NoEligibleFuels,

    #[error("no allocation satisfies the cost cap")]
    Infeasible,

    #[error("scenario has no baseline price or emission row")]
    MissingBaseline,

    #[error("baseline cost or emission is zero or not finite")]
    DegenerateBaseline,

    #[error("solver error: {0}")]
    Solver(String),
}
