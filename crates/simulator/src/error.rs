//! Error types for the simulator.

use salesim_types::ConfigError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a simulation before or while it starts.
#[derive(Debug, Error)]
pub enum SimulatorError {
    /// Run or sweep parameters are unusable.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The configuration file could not be read.
    #[error("Failed to read config file {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid TOML for a sweep.
    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A report or timing output could not be created.
    #[error("Failed to open output {}: {source}", .path.display())]
    SinkUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The OS refused to start a worker thread.
    #[error("Failed to spawn worker thread {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// A broken run invariant. Indicates a bug, never an expected runtime state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    /// Records were lost or duplicated between producers and consumers.
    #[error("Record count mismatch: expected {expected}, produced {produced}, consumed {consumed}")]
    RecordCount {
        expected: u64,
        produced: u64,
        consumed: u64,
    },

    /// The grand total disagrees with the per-store or per-month buckets.
    #[error("Totals diverged: grand {grand}, store sum {stores}, month sum {months}")]
    TotalsDiverged { grand: f64, stores: f64, months: f64 },

    /// Consumer private totals disagree with the grand total.
    #[error("Consumer totals sum to {consumers}, grand total is {grand}")]
    ConsumerTotals { consumers: f64, grand: f64 },

    /// The buffer held more records than its capacity.
    #[error("Peak occupancy {peak} exceeded capacity {capacity}")]
    OccupancyExceeded { peak: usize, capacity: usize },
}
