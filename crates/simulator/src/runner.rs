//! Single-run orchestration.
//!
//! A run moves through four phases:
//!
//! ```text
//! Init ──▶ ProducersRunning ──▶ Draining ──▶ Done
//!   │            │                  │           │
//!   │  spawn producers + consumers  │   join consumers,
//!   │            │                  │   collect report
//!   │   join every producer, then   │
//!   │   signal_shutdown (once)  ────┘
//!   └─ fresh buffer, aggregator, metrics
//! ```
//!
//! Shutdown is signalled only after the last producer has been joined, so no
//! insert can race with it. The runner thread never touches the buffer
//! contents itself.

use crate::config::DelayRange;
use crate::error::{InvariantViolation, SimulatorError};
use crate::metrics::{ResidenceLatency, RunMetrics};
use crate::report::ReportSink;
use crate::stats::{totals_agree, SalesTotals, StatsAggregator};
use crate::worker::{ConsumerSummary, ConsumerWorker, ProducerWorker, Queued};
use crate::workload::{RecordGenerator, SalesWorkload};
use salesim_buffer::{BoundedBuffer, BufferMetrics};
use salesim_types::{ConsumerId, RunConfig, StoreId};
use std::thread::{self, ScopedJoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Phase of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunPhase {
    /// Fresh buffer and aggregator allocated.
    Init,
    /// Workers started; producers may still insert.
    ProducersRunning,
    /// All producers finished and shutdown signalled; consumers drain.
    Draining,
    /// All consumers finished; results collected.
    Done,
}

impl RunPhase {
    /// The phase that follows this one, if any.
    pub fn next(self) -> Option<RunPhase> {
        match self {
            RunPhase::Init => Some(RunPhase::ProducersRunning),
            RunPhase::ProducersRunning => Some(RunPhase::Draining),
            RunPhase::Draining => Some(RunPhase::Done),
            RunPhase::Done => None,
        }
    }
}

/// Tracks the phase of the run in progress.
struct PhaseTracker {
    phase: RunPhase,
}

impl PhaseTracker {
    fn new() -> Self {
        Self {
            phase: RunPhase::Init,
        }
    }

    fn advance(&mut self) -> RunPhase {
        let from = self.phase;
        match from.next() {
            Some(to) => {
                debug!(?from, ?to, "Run phase transition");
                self.phase = to;
            }
            None => debug_assert!(false, "run already done"),
        }
        self.phase
    }
}

/// Everything observed during one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The configuration that was run.
    pub config: RunConfig,
    /// Seed records were generated from.
    pub seed: u64,
    /// Wall-clock time from worker start to the last consumer exiting.
    pub elapsed: Duration,
    /// Aggregated sales.
    pub totals: SalesTotals,
    /// Per-consumer results, ordered by consumer id.
    pub consumers: Vec<ConsumerSummary>,
    /// Records producers inserted.
    pub records_produced: u64,
    /// Buffer counters at the end of the run.
    pub buffer: BufferMetrics,
    /// Buffer residence time summary.
    pub residence: ResidenceLatency,
}

impl RunReport {
    /// Sum of every consumer's private total.
    pub fn consumer_total(&self) -> f64 {
        self.consumers.iter().map(|c| c.local_total).sum()
    }

    /// Records consumed across all consumers.
    pub fn records_consumed(&self) -> u64 {
        self.consumers.iter().map(|c| c.records).sum()
    }

    /// Records consumed per second of wall time.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.records_consumed() as f64 / secs
        } else {
            0.0
        }
    }

    /// Check the run's conservation, completeness and occupancy invariants.
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        let expected = self.config.total_records();
        let consumed = self.records_consumed();
        if self.records_produced != expected
            || consumed != expected
            || self.totals.records != expected
        {
            return Err(InvariantViolation::RecordCount {
                expected,
                produced: self.records_produced,
                consumed,
            });
        }

        self.totals.check_conservation()?;

        let consumers = self.consumer_total();
        if !totals_agree(consumers, self.totals.grand_total) {
            return Err(InvariantViolation::ConsumerTotals {
                consumers,
                grand: self.totals.grand_total,
            });
        }

        if self.buffer.peak_occupancy > self.config.capacity {
            return Err(InvariantViolation::OccupancyExceeded {
                peak: self.buffer.peak_occupancy,
                capacity: self.config.capacity,
            });
        }

        Ok(())
    }
}

/// Runs one configuration at a time.
///
/// Every call to [`run`](Self::run) builds its own buffer, aggregator and
/// metrics; nothing carries over between runs.
pub struct Simulator<G = SalesWorkload> {
    generator: G,
    producer_delay: DelayRange,
    consumer_delay: DelayRange,
}

impl Simulator<SalesWorkload> {
    /// Create a simulator with the default workload and delays.
    pub fn new() -> Self {
        Self::with_generator(SalesWorkload::new())
    }
}

impl Default for Simulator<SalesWorkload> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: RecordGenerator> Simulator<G> {
    /// Create a simulator around a custom record generator.
    pub fn with_generator(generator: G) -> Self {
        Self {
            generator,
            producer_delay: DelayRange::default(),
            consumer_delay: DelayRange::default(),
        }
    }

    /// Set the producer sleep range.
    pub fn with_producer_delay(mut self, delay: DelayRange) -> Self {
        self.producer_delay = delay;
        self
    }

    /// Set the consumer sleep range.
    pub fn with_consumer_delay(mut self, delay: DelayRange) -> Self {
        self.consumer_delay = delay;
        self
    }

    /// Disable all worker sleeps.
    pub fn without_delay(self) -> Self {
        self.with_producer_delay(DelayRange::none())
            .with_consumer_delay(DelayRange::none())
    }

    /// Execute one run to completion.
    pub fn run(
        &self,
        config: &RunConfig,
        seed: u64,
        sink: &dyn ReportSink,
    ) -> Result<RunReport, SimulatorError> {
        config.validate()?;

        let mut phase = PhaseTracker::new();
        let buffer = BoundedBuffer::<Queued>::new(config.capacity);
        let stats = StatsAggregator::new();
        let metrics = RunMetrics::new();

        info!(
            producers = config.producers,
            consumers = config.consumers,
            capacity = config.capacity,
            quota = config.quota,
            seed,
            "Starting simulation"
        );
        if let Err(e) = sink.run_started(config) {
            warn!(error = %e, "Failed to write run header");
        }

        let start = Instant::now();
        let consumers = thread::scope(|s| -> Result<Vec<ConsumerSummary>, SimulatorError> {
            phase.advance();

            let mut producers = Vec::with_capacity(config.producers as usize);
            for id in 1..=config.producers {
                let worker = ProducerWorker {
                    store: StoreId(id),
                    quota: config.quota,
                    generator: &self.generator,
                    buffer: &buffer,
                    metrics: &metrics,
                    delay: self.producer_delay,
                    run_seed: seed,
                };
                producers.push(spawn_worker(s, format!("producer-{id}"), &buffer, move || {
                    worker.run()
                })?);
            }

            let mut consumers = Vec::with_capacity(config.consumers as usize);
            for id in 1..=config.consumers {
                let worker = ConsumerWorker {
                    consumer: ConsumerId(id),
                    buffer: &buffer,
                    stats: &stats,
                    metrics: &metrics,
                    sink,
                    delay: self.consumer_delay,
                    run_seed: seed,
                };
                consumers.push(spawn_worker(s, format!("consumer-{id}"), &buffer, move || {
                    worker.run()
                })?);
            }

            for producer in producers {
                join_worker(producer, &buffer);
            }

            phase.advance();
            buffer.signal_shutdown();

            Ok(consumers
                .into_iter()
                .map(|consumer| join_worker(consumer, &buffer))
                .collect())
        })?;
        let elapsed = start.elapsed();
        phase.advance();

        let report = RunReport {
            config: *config,
            seed,
            elapsed,
            totals: stats.into_totals(),
            consumers,
            records_produced: metrics.produced(),
            buffer: buffer.metrics(),
            residence: metrics.residence(),
        };

        if let Err(violation) = report.verify() {
            error!(%violation, config = %config, "Run invariant violated");
            debug_assert!(false, "run invariant violated: {violation}");
        }

        info!(
            elapsed_secs = elapsed.as_secs_f64(),
            records = report.totals.records,
            grand_total = report.totals.grand_total,
            peak_occupancy = report.buffer.peak_occupancy,
            "Simulation completed"
        );
        if let Err(e) = sink.run_finished(&report) {
            warn!(error = %e, "Failed to write run report");
        }

        Ok(report)
    }
}

/// Start a named worker thread inside the run's scope.
///
/// On failure the buffer is shut down so workers already started can exit
/// and the scope can close.
fn spawn_worker<'scope, 'env, T, F>(
    scope: &'scope thread::Scope<'scope, 'env>,
    name: String,
    buffer: &BoundedBuffer<Queued>,
    f: F,
) -> Result<ScopedJoinHandle<'scope, T>, SimulatorError>
where
    F: FnOnce() -> T + Send + 'scope,
    T: Send + 'scope,
{
    thread::Builder::new()
        .name(name.clone())
        .spawn_scoped(scope, f)
        .map_err(|source| {
            buffer.signal_shutdown();
            SimulatorError::Spawn { name, source }
        })
}

/// Join a worker, re-raising its panic after unblocking the others.
fn join_worker<T>(handle: ScopedJoinHandle<'_, T>, buffer: &BoundedBuffer<Queued>) -> T {
    match handle.join() {
        Ok(value) => value,
        Err(panic) => {
            buffer.signal_shutdown();
            std::panic::resume_unwind(panic)
        }
    }
}
