//! Parameter sweep over buffer capacity, producer count and consumer count.

use crate::config::SweepConfig;
use crate::error::SimulatorError;
use crate::report::{ReportSink, TimingSink};
use crate::runner::{RunReport, Simulator};
use crate::workload::{RecordGenerator, SalesWorkload};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// One row of the timing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingRow {
    pub capacity: usize,
    pub producers: u32,
    pub consumers: u32,
    /// Wall time of the whole run, report writing included.
    pub elapsed: Duration,
}

/// Results of a completed sweep.
#[derive(Debug, Clone)]
pub struct SweepReport {
    /// Base seed run seeds were derived from.
    pub seed: u64,
    /// Per-run reports in execution order.
    pub runs: Vec<RunReport>,
    /// Per-run timings in execution order.
    pub timings: Vec<TimingRow>,
    /// Wall time of the whole sweep.
    pub elapsed: Duration,
}

impl SweepReport {
    /// The run that took longest.
    pub fn slowest(&self) -> Option<&TimingRow> {
        self.timings.iter().max_by_key(|row| row.elapsed)
    }

    /// The run that finished fastest.
    pub fn fastest(&self) -> Option<&TimingRow> {
        self.timings.iter().min_by_key(|row| row.elapsed)
    }

    /// Records consumed across every run.
    pub fn total_records(&self) -> u64 {
        self.runs.iter().map(|run| run.totals.records).sum()
    }
}

/// Runs every configuration of a [`SweepConfig`] sequentially.
pub struct Sweep<G = SalesWorkload> {
    config: SweepConfig,
    simulator: Simulator<G>,
}

impl Sweep<SalesWorkload> {
    /// Validate `config` and build a sweep with the default workload.
    pub fn new(config: SweepConfig) -> Result<Self, SimulatorError> {
        config.validate()?;
        let simulator = Simulator::new()
            .with_producer_delay(config.producer_delay)
            .with_consumer_delay(config.consumer_delay);
        Ok(Self { config, simulator })
    }
}

impl<G: RecordGenerator> Sweep<G> {
    /// The sweep configuration.
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Execute every run in order.
    pub fn run(
        &self,
        reports: &dyn ReportSink,
        timings: &mut dyn TimingSink,
    ) -> Result<SweepReport, SimulatorError> {
        self.run_with_progress(reports, timings, |_, _, _| {})
    }

    /// Execute every run in order, calling `progress` after each one.
    pub fn run_with_progress<F>(
        &self,
        reports: &dyn ReportSink,
        timings: &mut dyn TimingSink,
        mut progress: F,
    ) -> Result<SweepReport, SimulatorError>
    where
        F: FnMut(usize, &RunReport, &TimingRow),
    {
        let seed = self.config.seed.unwrap_or_else(rand::random);
        let configs = self.config.run_configs();
        info!(runs = configs.len(), seed, "Starting sweep");

        let sweep_start = Instant::now();
        let mut runs = Vec::with_capacity(configs.len());
        let mut rows = Vec::with_capacity(configs.len());

        for (index, config) in configs.iter().enumerate() {
            let run_seed = seed.wrapping_add(index as u64);

            let start = Instant::now();
            let report = self.simulator.run(config, run_seed, reports)?;
            let row = TimingRow {
                capacity: config.capacity,
                producers: config.producers,
                consumers: config.consumers,
                elapsed: start.elapsed(),
            };

            if let Err(e) = timings.record(&row) {
                warn!(config = %config, error = %e, "Failed to write timing row");
            }
            progress(index, &report, &row);

            runs.push(report);
            rows.push(row);
        }

        let elapsed = sweep_start.elapsed();
        info!(
            runs = runs.len(),
            elapsed_secs = elapsed.as_secs_f64(),
            "Sweep completed"
        );

        Ok(SweepReport {
            seed,
            runs,
            timings: rows,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{CsvTimingSink, MemoryReportSink};
    use salesim_types::ConfigError;
    use std::io;

    struct FailingTimingSink;

    impl TimingSink for FailingTimingSink {
        fn record(&mut self, _row: &TimingRow) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }
    }

    fn small_config() -> SweepConfig {
        SweepConfig::default()
            .with_buffer_capacities(vec![1, 4])
            .with_producer_counts(vec![1, 2])
            .with_consumer_counts(vec![1, 3])
            .with_quota(20)
            .with_seed(99)
            .without_delay()
    }

    #[test]
    fn test_sweep_order_and_rows() {
        let sweep = Sweep::new(small_config()).unwrap();
        let sink = MemoryReportSink::new();
        let mut timings = CsvTimingSink::new(Vec::new()).unwrap();

        let report = sweep.run(&sink, &mut timings).unwrap();

        let order: Vec<(usize, u32, u32)> = report
            .timings
            .iter()
            .map(|row| (row.capacity, row.producers, row.consumers))
            .collect();
        assert_eq!(
            order,
            vec![
                (1, 1, 1),
                (1, 1, 3),
                (1, 2, 1),
                (1, 2, 3),
                (4, 1, 1),
                (4, 1, 3),
                (4, 2, 1),
                (4, 2, 3),
            ]
        );
        assert_eq!(sink.runs_finished(), 8);
        assert_eq!(report.seed, 99);
        assert_eq!(report.total_records(), 4 * 20 + 4 * 40);

        let text = String::from_utf8(timings.into_inner()).unwrap();
        assert_eq!(text.lines().count(), 9);
        assert!(text.lines().nth(1).unwrap().starts_with("1, 1, 1, "));
    }

    #[test]
    fn test_run_seeds_follow_index() {
        let report = Sweep::new(small_config())
            .unwrap()
            .run(&MemoryReportSink::new(), &mut FailingTimingSink)
            .unwrap();

        let seeds: Vec<u64> = report.runs.iter().map(|run| run.seed).collect();
        assert_eq!(seeds, (99..107).collect::<Vec<u64>>());
    }

    #[test]
    fn test_timing_failure_does_not_stop_sweep() {
        let mut calls = 0;
        let report = Sweep::new(small_config())
            .unwrap()
            .run_with_progress(&MemoryReportSink::new(), &mut FailingTimingSink, |i, _, _| {
                assert_eq!(i, calls);
                calls += 1;
            })
            .unwrap();

        assert_eq!(calls, 8);
        assert_eq!(report.runs.len(), 8);
        assert!(report.slowest().unwrap().elapsed >= report.fastest().unwrap().elapsed);
    }

    #[test]
    fn test_invalid_sweep_rejected() {
        let config = small_config().with_consumer_counts(vec![2, 0]);
        assert!(matches!(
            Sweep::new(config),
            Err(SimulatorError::Config(ConfigError::NoConsumers))
        ));
    }
}
