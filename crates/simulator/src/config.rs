//! Configuration types for the simulator.

use crate::error::SimulatorError;
use rand::Rng;
use salesim_types::{ConfigError, RunConfig};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Inclusive range a worker's per-record sleep is drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelayRange {
    /// Shortest sleep.
    pub min: Duration,
    /// Longest sleep.
    pub max: Duration,
}

impl DelayRange {
    /// Create a delay range.
    pub const fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// Create a delay range from millisecond bounds.
    pub const fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    /// No sleeping between records.
    pub const fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Whether workers skip sleeping entirely.
    pub fn is_none(&self) -> bool {
        self.max.is_zero()
    }

    /// Draw a sleep duration, uniform over the range at microsecond resolution.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min >= self.max {
            return self.min;
        }
        let min_us = self.min.as_micros() as u64;
        let max_us = self.max.as_micros() as u64;
        Duration::from_micros(rng.gen_range(min_us..=max_us))
    }

    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::InvalidDelay {
                name,
                min_ms: self.min.as_millis(),
                max_ms: self.max.as_millis(),
            });
        }
        Ok(())
    }
}

impl Default for DelayRange {
    /// 5 to 40 milliseconds.
    fn default() -> Self {
        Self::from_millis(5, 40)
    }
}

/// Configuration for a full parameter sweep.
///
/// Every combination of buffer capacity, producer count and consumer count
/// becomes one run.
#[derive(Clone, Debug, PartialEq)]
pub struct SweepConfig {
    /// Buffer capacities to test.
    pub buffer_capacities: Vec<usize>,

    /// Producer counts to test.
    pub producer_counts: Vec<u32>,

    /// Consumer counts to test.
    pub consumer_counts: Vec<u32>,

    /// Records generated by each producer per run.
    pub quota: u64,

    /// Sleep after each inserted record.
    pub producer_delay: DelayRange,

    /// Sleep after each consumed record.
    pub consumer_delay: DelayRange,

    /// Base seed for record generation. Random when `None`.
    pub seed: Option<u64>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            buffer_capacities: vec![3, 10],
            producer_counts: vec![2, 5, 10],
            consumer_counts: vec![2, 5, 10],
            quota: 1000,
            producer_delay: DelayRange::default(),
            consumer_delay: DelayRange::default(),
            seed: None,
        }
    }
}

impl SweepConfig {
    /// Parse a sweep configuration from TOML, starting from the defaults.
    ///
    /// ```toml
    /// buffer_sizes = [3, 10]
    /// producers = [2, 5]
    /// consumers = [2]
    /// quota = 500
    /// seed = 7
    /// producer_delay_ms = [5, 40]
    /// consumer_delay_ms = [0, 0]
    /// ```
    pub fn from_toml_str(contents: &str) -> Result<Self, SimulatorError> {
        let file: SweepFile = toml::from_str(contents)?;
        Ok(Self::default().merge_file(file))
    }

    /// Load a sweep configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, SimulatorError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| SimulatorError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml_str(&contents)
    }

    /// Set the buffer capacities.
    pub fn with_buffer_capacities(mut self, capacities: Vec<usize>) -> Self {
        self.buffer_capacities = capacities;
        self
    }

    /// Set the producer counts.
    pub fn with_producer_counts(mut self, counts: Vec<u32>) -> Self {
        self.producer_counts = counts;
        self
    }

    /// Set the consumer counts.
    pub fn with_consumer_counts(mut self, counts: Vec<u32>) -> Self {
        self.consumer_counts = counts;
        self
    }

    /// Set the per-producer quota.
    pub fn with_quota(mut self, quota: u64) -> Self {
        self.quota = quota;
        self
    }

    /// Set the same delay range for producers and consumers.
    pub fn with_delay(mut self, delay: DelayRange) -> Self {
        self.producer_delay = delay;
        self.consumer_delay = delay;
        self
    }

    /// Disable all worker sleeps.
    pub fn without_delay(self) -> Self {
        self.with_delay(DelayRange::none())
    }

    /// Set the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of runs in the sweep.
    pub fn num_runs(&self) -> usize {
        self.buffer_capacities.len() * self.producer_counts.len() * self.consumer_counts.len()
    }

    /// All run configurations, capacities outermost and consumer counts innermost.
    pub fn run_configs(&self) -> Vec<RunConfig> {
        let mut configs = Vec::with_capacity(self.num_runs());
        for &capacity in &self.buffer_capacities {
            for &producers in &self.producer_counts {
                for &consumers in &self.consumer_counts {
                    configs.push(RunConfig::new(producers, consumers, capacity, self.quota));
                }
            }
        }
        configs
    }

    /// Check every run in the sweep is able to complete.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacities.is_empty() {
            return Err(ConfigError::EmptySweep("buffer_sizes"));
        }
        if self.producer_counts.is_empty() {
            return Err(ConfigError::EmptySweep("producers"));
        }
        if self.consumer_counts.is_empty() {
            return Err(ConfigError::EmptySweep("consumers"));
        }
        self.producer_delay.validate("producer")?;
        self.consumer_delay.validate("consumer")?;
        self.run_configs().iter().try_for_each(RunConfig::validate)
    }

    fn merge_file(mut self, file: SweepFile) -> Self {
        if let Some(capacities) = file.buffer_sizes {
            self.buffer_capacities = capacities;
        }
        if let Some(producers) = file.producers {
            self.producer_counts = producers;
        }
        if let Some(consumers) = file.consumers {
            self.consumer_counts = consumers;
        }
        if let Some(quota) = file.quota {
            self.quota = quota;
        }
        if let Some([min, max]) = file.producer_delay_ms {
            self.producer_delay = DelayRange::from_millis(min, max);
        }
        if let Some([min, max]) = file.consumer_delay_ms {
            self.consumer_delay = DelayRange::from_millis(min, max);
        }
        if file.seed.is_some() {
            self.seed = file.seed;
        }
        self
    }
}

/// On-disk layout of a sweep configuration. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SweepFile {
    buffer_sizes: Option<Vec<usize>>,
    producers: Option<Vec<u32>>,
    consumers: Option<Vec<u32>>,
    quota: Option<u64>,
    seed: Option<u64>,
    producer_delay_ms: Option<[u64; 2]>,
    consumer_delay_ms: Option<[u64; 2]>,
}
