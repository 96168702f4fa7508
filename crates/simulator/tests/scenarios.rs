//! End-to-end runs of the simulator against small, fully checked workloads.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use salesim_simulator::{
    producer_seed, CsvTimingSink, DelayRange, MemoryReportSink, RecordGenerator, RunReport,
    SalesWorkload, Simulator, Sweep, SweepConfig,
};
use salesim_test_helpers::{approx_eq, TEST_SEED};
use salesim_types::{RunConfig, StoreId};
use std::collections::HashSet;
use std::time::Duration;

fn run(config: RunConfig, seed: u64) -> (RunReport, MemoryReportSink) {
    let sink = MemoryReportSink::new();
    let report = Simulator::new()
        .without_delay()
        .run(&config, seed, &sink)
        .expect("run should succeed");
    (report, sink)
}

/// Amounts a producer for `store` generates under `seed`, in order.
fn expected_amounts(seed: u64, store: StoreId, quota: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(producer_seed(seed, store));
    SalesWorkload::new()
        .generate_batch(store, quota as usize, &mut rng)
        .into_iter()
        .map(|record| record.amount)
        .collect()
}

#[test]
fn single_producer_single_consumer() {
    let (report, sink) = run(RunConfig::new(1, 1, 3, 5), TEST_SEED);

    assert_eq!(report.totals.records, 5);
    assert_eq!(report.consumers.len(), 1);
    assert_eq!(report.consumers[0].records, 5);

    let expected: f64 = expected_amounts(TEST_SEED, StoreId(1), 5).iter().sum();
    assert!(approx_eq(report.totals.grand_total, expected));
    assert!(approx_eq(report.consumers[0].local_total, expected));
    assert_eq!(report.totals.by_store.keys().copied().collect::<Vec<_>>(), vec![StoreId(1)]);

    assert_eq!(sink.consumer_summaries(), report.consumers);
    assert!(report.buffer.peak_occupancy <= 3);
    assert!(report.verify().is_ok());
}

#[test]
fn more_consumers_than_records_in_flight() {
    let (report, sink) = run(RunConfig::new(2, 3, 2, 4), TEST_SEED);

    assert_eq!(report.totals.records, 8);
    assert_eq!(report.records_consumed(), 8);
    assert_eq!(report.totals.by_store.len(), 2);

    let expected: f64 = [StoreId(1), StoreId(2)]
        .into_iter()
        .flat_map(|store| expected_amounts(TEST_SEED, store, 4))
        .sum();
    assert!(approx_eq(report.totals.grand_total, expected));
    assert!(approx_eq(report.consumer_total(), report.totals.grand_total));

    // Every consumer reports exactly once, even those that took nothing.
    let reported: HashSet<u32> = sink
        .consumer_summaries()
        .iter()
        .map(|summary| summary.consumer.0)
        .collect();
    assert_eq!(reported, HashSet::from([1, 2, 3]));
    assert!(report.buffer.peak_occupancy <= 2);
}

#[test]
fn zero_quota_terminates_with_empty_totals() {
    let (report, sink) = run(RunConfig::new(3, 2, 4, 0), TEST_SEED);

    assert_eq!(report.totals.records, 0);
    assert_eq!(report.totals.grand_total, 0.0);
    assert!(report.totals.by_store.is_empty());
    assert!(report.totals.by_month.is_empty());
    assert!(report.consumers.iter().all(|c| c.local_total == 0.0 && c.records == 0));
    assert_eq!(sink.consumer_summaries().len(), 2);
    assert_eq!(sink.runs_finished(), 1);
}

#[test]
fn zero_producers_terminates() {
    let (report, _) = run(RunConfig::new(0, 4, 1, 100), TEST_SEED);

    assert_eq!(report.records_produced, 0);
    assert_eq!(report.consumers.len(), 4);
    assert!(report.verify().is_ok());
}

#[test]
fn conservation_across_configurations() {
    let configs = [
        RunConfig::new(1, 5, 1, 200),
        RunConfig::new(5, 1, 1, 200),
        RunConfig::new(4, 4, 3, 250),
        RunConfig::new(10, 2, 10, 100),
        RunConfig::new(2, 10, 10, 100),
    ];

    for (i, config) in configs.into_iter().enumerate() {
        let (report, _) = run(config, TEST_SEED + i as u64);

        assert_eq!(report.totals.records, config.total_records(), "{config}");
        assert!(report.totals.check_conservation().is_ok(), "{config}");
        assert!(report.verify().is_ok(), "{config}");
        assert!(report.buffer.peak_occupancy <= config.capacity, "{config}");
        assert_eq!(report.buffer.inserted, report.buffer.removed, "{config}");
        assert_eq!(report.residence.samples, config.total_records(), "{config}");

        for store in 1..=config.producers {
            let expected: f64 = expected_amounts(report.seed, StoreId(store), config.quota)
                .iter()
                .sum();
            let actual = report.totals.by_store[&StoreId(store)];
            assert!(approx_eq(actual, expected), "{config} store {store}");
        }
    }
}

#[test]
fn same_seed_same_totals() {
    let config = RunConfig::new(3, 3, 2, 150);
    let (first, _) = run(config, 7);
    let (second, _) = run(config, 7);

    assert!(approx_eq(first.totals.grand_total, second.totals.grand_total));
    assert_eq!(
        first.totals.by_store.keys().collect::<Vec<_>>(),
        second.totals.by_store.keys().collect::<Vec<_>>()
    );
    for (store, total) in &first.totals.by_store {
        assert!(approx_eq(*total, second.totals.by_store[store]));
    }
    for (month, total) in &first.totals.by_month {
        assert!(approx_eq(*total, second.totals.by_month[month]));
    }
}

#[test]
fn short_delays_still_complete() {
    let sink = MemoryReportSink::new();
    let config = RunConfig::new(2, 2, 1, 10);
    let report = Simulator::new()
        .with_producer_delay(DelayRange::from_millis(0, 2))
        .with_consumer_delay(DelayRange::from_millis(1, 2))
        .run(&config, TEST_SEED, &sink)
        .unwrap();

    assert_eq!(report.totals.records, 20);
    assert!(report.verify().is_ok());
}

#[test]
fn residence_reflects_slow_consumer() {
    let config = RunConfig::new(1, 1, 3, 10);
    let report = Simulator::new()
        .with_producer_delay(DelayRange::none())
        .with_consumer_delay(DelayRange::from_millis(5, 5))
        .run(&config, TEST_SEED, &MemoryReportSink::new())
        .unwrap();

    // The producer fills the buffer at once, so queued records wait out
    // at least one consumer sleep.
    assert_eq!(report.residence.samples, 10);
    assert!(report.residence.max >= Duration::from_millis(5));
    assert!(report.residence.p99 >= Duration::from_millis(5));
    assert!(report.residence.max <= report.elapsed);
}

#[test]
fn small_sweep_writes_every_row() {
    let config = SweepConfig::default()
        .with_buffer_capacities(vec![2, 5])
        .with_producer_counts(vec![1, 3])
        .with_consumer_counts(vec![2])
        .with_quota(30)
        .with_seed(TEST_SEED)
        .without_delay();

    let sink = MemoryReportSink::new();
    let mut timings = CsvTimingSink::new(Vec::new()).unwrap();
    let report = Sweep::new(config).unwrap().run(&sink, &mut timings).unwrap();

    assert_eq!(report.runs.len(), 4);
    assert_eq!(sink.runs_finished(), 4);
    assert!(report.runs.iter().all(|run| run.verify().is_ok()));

    let text = String::from_utf8(timings.into_inner()).unwrap();
    let rows: Vec<&str> = text.lines().skip(1).collect();
    assert_eq!(rows.len(), 4);
    assert!(rows[0].starts_with("2, 1, 2, "));
    assert!(rows[3].starts_with("5, 3, 2, "));
}
