//! Producer and consumer workers.
//!
//! Workers borrow the run's buffer, aggregator and metrics; they are started
//! on scoped threads by the runner and never outlive a run.

use crate::config::DelayRange;
use crate::metrics::RunMetrics;
use crate::report::ReportSink;
use crate::stats::StatsAggregator;
use crate::workload::RecordGenerator;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use salesim_buffer::{BoundedBuffer, Removed};
use salesim_types::{ConsumerId, SalesRecord, StoreId};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Seed of the record RNG for a producer.
///
/// Records generated for `store` in a run depend only on the run seed, not
/// on how threads interleave.
pub fn producer_seed(run_seed: u64, store: StoreId) -> u64 {
    run_seed.wrapping_add(u64::from(store.0) * 1000)
}

fn consumer_seed(run_seed: u64, consumer: ConsumerId) -> u64 {
    run_seed
        .wrapping_add(u64::from(consumer.0) * 1000)
        .wrapping_add(500)
}

/// ChaCha stream reserved for sleep intervals. Record RNGs use stream 0.
const DELAY_STREAM: u64 = 1;

/// RNG for worker sleeps. Never yields the same sequence as a record RNG,
/// whatever the seed.
fn delay_rng(seed: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(DELAY_STREAM);
    rng
}

/// A record in transit, stamped with the instant it entered the buffer.
#[derive(Debug)]
pub(crate) struct Queued {
    pub record: SalesRecord,
    pub enqueued_at: Instant,
}

/// What a consumer accumulated over its lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumerSummary {
    /// Which consumer.
    pub consumer: ConsumerId,
    /// Private running total of every amount this consumer took.
    pub local_total: f64,
    /// Number of records this consumer took.
    pub records: u64,
}

/// Generates a fixed quota of records for one store.
pub(crate) struct ProducerWorker<'a, G: ?Sized> {
    pub store: StoreId,
    pub quota: u64,
    pub generator: &'a G,
    pub buffer: &'a BoundedBuffer<Queued>,
    pub metrics: &'a RunMetrics,
    pub delay: DelayRange,
    pub run_seed: u64,
}

impl<G: RecordGenerator + ?Sized> ProducerWorker<'_, G> {
    /// Produce the quota, returning how many records were inserted.
    pub fn run(self) -> u64 {
        let seed = producer_seed(self.run_seed, self.store);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut sleep_rng = delay_rng(seed);
        let mut inserted = 0;

        for _ in 0..self.quota {
            let record = self.generator.generate_one(self.store, &mut rng);
            let queued = Queued {
                record,
                enqueued_at: Instant::now(),
            };

            if self.buffer.insert(queued).is_err() {
                // Only reachable if the run is being torn down early.
                warn!(store = %self.store, inserted, "Buffer shut down before quota was met");
                break;
            }
            inserted += 1;
            self.metrics.record_produced();

            if !self.delay.is_none() {
                thread::sleep(self.delay.sample(&mut sleep_rng));
            }
        }

        debug!(store = %self.store, inserted, "Producer finished");
        inserted
    }
}

/// Drains the buffer into the shared aggregator until it is closed.
pub(crate) struct ConsumerWorker<'a> {
    pub consumer: ConsumerId,
    pub buffer: &'a BoundedBuffer<Queued>,
    pub stats: &'a StatsAggregator,
    pub metrics: &'a RunMetrics,
    pub sink: &'a dyn ReportSink,
    pub delay: DelayRange,
    pub run_seed: u64,
}

impl ConsumerWorker<'_> {
    /// Consume until `Closed`, then report the private total.
    pub fn run(self) -> ConsumerSummary {
        let mut sleep_rng = delay_rng(consumer_seed(self.run_seed, self.consumer));
        let mut summary = ConsumerSummary {
            consumer: self.consumer,
            local_total: 0.0,
            records: 0,
        };

        while let Removed::Item(queued) = self.buffer.remove() {
            self.metrics.record_residence(queued.enqueued_at.elapsed());

            summary.local_total += queued.record.amount;
            summary.records += 1;
            self.stats.record(&queued.record);

            if !self.delay.is_none() {
                thread::sleep(self.delay.sample(&mut sleep_rng));
            }
        }

        info!(
            consumer = %self.consumer,
            records = summary.records,
            local_total = summary.local_total,
            "Consumer finished"
        );
        if let Err(e) = self.sink.consumer_finished(&summary) {
            warn!(consumer = %self.consumer, error = %e, "Failed to report consumer total");
        }
        summary
    }
}
