//! Per-run configuration.

use std::fmt;
use thiserror::Error;

/// Errors from validating a run configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The buffer must be able to hold at least one record.
    #[error("buffer capacity must be at least 1")]
    ZeroCapacity,

    /// At least one consumer is needed to drain the buffer.
    #[error("at least one consumer is required")]
    NoConsumers,

    /// A sweep dimension has no values.
    #[error("sweep parameter `{0}` must list at least one value")]
    EmptySweep(&'static str),

    /// Delay range with min above max.
    #[error("invalid {name} delay range: min {min_ms}ms exceeds max {max_ms}ms")]
    InvalidDelay {
        name: &'static str,
        min_ms: u128,
        max_ms: u128,
    },
}

/// Configuration for a single simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// Number of producer workers (one store each).
    pub producers: u32,

    /// Number of consumer workers.
    pub consumers: u32,

    /// Maximum number of records the shared buffer holds.
    pub capacity: usize,

    /// Records each producer generates before it finishes.
    pub quota: u64,
}

impl RunConfig {
    /// Create a new run configuration.
    pub fn new(producers: u32, consumers: u32, capacity: usize, quota: u64) -> Self {
        Self {
            producers,
            consumers,
            capacity,
            quota,
        }
    }

    /// Total records the run is expected to move through the buffer.
    pub fn total_records(&self) -> u64 {
        self.producers as u64 * self.quota
    }

    /// Check that the run can complete.
    ///
    /// Zero producers or a zero quota are allowed: such a run shuts the
    /// buffer down immediately and consumes nothing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.consumers == 0 {
            return Err(ConfigError::NoConsumers);
        }
        Ok(())
    }
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "p={}, c={}, b={}",
            self.producers, self.consumers, self.capacity
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_records() {
        assert_eq!(RunConfig::new(10, 2, 3, 1000).total_records(), 10_000);
        assert_eq!(RunConfig::new(0, 2, 3, 1000).total_records(), 0);
    }

    #[test]
    fn test_validate() {
        assert!(RunConfig::new(2, 2, 3, 1000).validate().is_ok());
        assert!(RunConfig::new(1, 1, 1, 0).validate().is_ok());
        assert!(RunConfig::new(0, 1, 1, 10).validate().is_ok());
        assert_eq!(
            RunConfig::new(2, 2, 0, 10).validate(),
            Err(ConfigError::ZeroCapacity)
        );
        assert_eq!(
            RunConfig::new(2, 0, 3, 10).validate(),
            Err(ConfigError::NoConsumers)
        );
    }

    #[test]
    fn test_display_matches_run_banner() {
        assert_eq!(RunConfig::new(5, 2, 10, 1).to_string(), "p=5, c=2, b=10");
    }
}
