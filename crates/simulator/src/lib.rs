//! Sales Simulator
//!
//! A concurrent producer/consumer simulation of retail sales. Producer
//! threads, one per store, generate sales records into a shared bounded
//! buffer; consumer threads drain it into shared aggregate statistics.
//!
//! # Architecture
//!
//! - **Buffer**: `salesim-buffer` provides the blocking, shutdown-aware queue
//! - **Workload Generation**: Pluggable record generators ([`SalesWorkload`] by default)
//! - **Statistics**: Grand, per-store and per-month totals under one lock
//! - **Metrics Collection**: Produced counts and buffer residence percentiles
//! - **Runner**: One run per [`RunConfig`](salesim_types::RunConfig), phases `Init → ProducersRunning → Draining → Done`
//! - **Sweep**: Every combination of capacity, producers and consumers, timed
//!
//! # Example
//!
//! ```ignore
//! use salesim_simulator::{CsvTimingSink, FileReportSink, Sweep, SweepConfig};
//!
//! let config = SweepConfig::default().with_quota(100).with_seed(7);
//! let reports = FileReportSink::create("output/results.txt")?;
//! let mut timings = CsvTimingSink::create("output/timing_results.txt")?;
//!
//! let report = Sweep::new(config)?.run(&reports, &mut timings)?;
//! println!("Slowest run: {:?}", report.slowest());
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod stats;
pub mod sweep;
pub mod worker;
pub mod workload;

pub use config::{DelayRange, SweepConfig};
pub use error::{InvariantViolation, SimulatorError};
pub use metrics::{ResidenceLatency, RunMetrics};
pub use report::{
    CsvTimingSink, FileReportSink, MemoryReportSink, ReportEvent, ReportSink, TimingSink,
};
pub use runner::{RunPhase, RunReport, Simulator};
pub use stats::{SalesTotals, StatsAggregator};
pub use sweep::{Sweep, SweepReport, TimingRow};
pub use worker::{producer_seed, ConsumerSummary};
pub use workload::{RecordGenerator, SalesWorkload};
