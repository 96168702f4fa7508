//! Report and timing outputs.
//!
//! Sinks are collaborators of the runner, not part of the coordination core:
//! a failed write is logged and the simulation carries on. Only creating a
//! file sink can fail hard, and that happens before any run starts.

use crate::error::SimulatorError;
use crate::runner::RunReport;
use crate::sweep::TimingRow;
use crate::worker::ConsumerSummary;
use parking_lot::Mutex;
use salesim_types::RunConfig;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Receives the human-readable report of every run.
///
/// Shared by reference with consumer threads, hence `&self` and `Sync`.
pub trait ReportSink: Send + Sync {
    /// A run is about to start.
    fn run_started(&self, config: &RunConfig) -> io::Result<()>;

    /// A consumer has drained its last record.
    fn consumer_finished(&self, summary: &ConsumerSummary) -> io::Result<()>;

    /// A run has reached `Done`.
    fn run_finished(&self, report: &RunReport) -> io::Result<()>;
}

/// Receives one timing row per run.
pub trait TimingSink {
    fn record(&mut self, row: &TimingRow) -> io::Result<()>;
}

/// Create `path` (and its parent directories), truncating any existing file.
fn create_output(path: &Path) -> Result<BufWriter<File>, SimulatorError> {
    let unavailable = |source| SimulatorError::SinkUnavailable {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(unavailable)?;
    }
    let file = File::create(path).map_err(unavailable)?;
    Ok(BufWriter::new(file))
}

const RUN_SEPARATOR: &str = "--------------------------------------";

/// Plain-text report file.
pub struct FileReportSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileReportSink {
    /// Create the report file, replacing any previous contents.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SimulatorError> {
        let path = path.as_ref();
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(create_output(path)?),
        })
    }

    /// Location of the report file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffered output to disk.
    pub fn flush(&self) -> io::Result<()> {
        self.writer.lock().flush()
    }
}

impl ReportSink for FileReportSink {
    fn run_started(&self, config: &RunConfig) -> io::Result<()> {
        let mut w = self.writer.lock();
        writeln!(w, "Starting simulation with {}", config)?;
        writeln!(
            w,
            "Launching {} producers and {} consumers...",
            config.producers, config.consumers
        )
    }

    fn consumer_finished(&self, summary: &ConsumerSummary) -> io::Result<()> {
        writeln!(
            self.writer.lock(),
            "{} local sales: {:.2} ({} records)",
            summary.consumer,
            summary.local_total,
            summary.records
        )
    }

    fn run_finished(&self, report: &RunReport) -> io::Result<()> {
        let mut w = self.writer.lock();
        let totals = &report.totals;

        writeln!(w, "Simulation completed.")?;
        writeln!(w, "Records consumed: {}", totals.records)?;
        writeln!(w, "Global sales: {:.2}", totals.grand_total)?;
        writeln!(w, "Elapsed time: {:.6} seconds", report.elapsed.as_secs_f64())?;
        writeln!(
            w,
            "Buffer: peak occupancy {}/{}, producer waits {}, consumer waits {}",
            report.buffer.peak_occupancy,
            report.config.capacity,
            report.buffer.producer_waits,
            report.buffer.consumer_waits
        )?;
        writeln!(
            w,
            "Residence latency: mean {:?}, p50 {:?}, p99 {:?}, max {:?}",
            report.residence.mean, report.residence.p50, report.residence.p99, report.residence.max
        )?;

        writeln!(w, "Store-wise sales:")?;
        for (store, total) in &totals.by_store {
            writeln!(w, "  {}: {:.2}", store, total)?;
        }
        writeln!(w, "Month-wise sales:")?;
        for (month, total) in &totals.by_month {
            writeln!(w, "  {}: {:.2}", month, total)?;
        }
        writeln!(w, "{}", RUN_SEPARATOR)?;
        w.flush()
    }
}

/// Event captured by [`MemoryReportSink`].
#[derive(Debug, Clone)]
pub enum ReportEvent {
    RunStarted(RunConfig),
    ConsumerFinished(ConsumerSummary),
    RunFinished(Box<RunReport>),
}

/// Report sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryReportSink {
    events: Mutex<Vec<ReportEvent>>,
}

impl MemoryReportSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events received so far, in arrival order.
    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().clone()
    }

    /// Consumer summaries received so far, in arrival order.
    pub fn consumer_summaries(&self) -> Vec<ConsumerSummary> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ReportEvent::ConsumerFinished(summary) => Some(*summary),
                _ => None,
            })
            .collect()
    }

    /// Number of runs that finished.
    pub fn runs_finished(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| matches!(event, ReportEvent::RunFinished(_)))
            .count()
    }
}

impl ReportSink for MemoryReportSink {
    fn run_started(&self, config: &RunConfig) -> io::Result<()> {
        self.events.lock().push(ReportEvent::RunStarted(*config));
        Ok(())
    }

    fn consumer_finished(&self, summary: &ConsumerSummary) -> io::Result<()> {
        self.events.lock().push(ReportEvent::ConsumerFinished(*summary));
        Ok(())
    }

    fn run_finished(&self, report: &RunReport) -> io::Result<()> {
        self.events
            .lock()
            .push(ReportEvent::RunFinished(Box::new(report.clone())));
        Ok(())
    }
}

/// Comma-separated timing table, one row per run.
pub struct CsvTimingSink<W: Write> {
    writer: W,
}

impl<W: Write> CsvTimingSink<W> {
    /// Column header written when the sink is created.
    pub const HEADER: &'static str =
        "Buffer Size (b), Producers (p), Consumers (c), Time (seconds)";

    /// Wrap a writer and emit the header line.
    pub fn new(mut writer: W) -> io::Result<Self> {
        writeln!(writer, "{}", Self::HEADER)?;
        Ok(Self { writer })
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl CsvTimingSink<BufWriter<File>> {
    /// Create the timing file, replacing any previous contents.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SimulatorError> {
        let path = path.as_ref();
        let writer = create_output(path)?;
        Self::new(writer).map_err(|source| SimulatorError::SinkUnavailable {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl<W: Write> TimingSink for CsvTimingSink<W> {
    fn record(&mut self, row: &TimingRow) -> io::Result<()> {
        writeln!(
            self.writer,
            "{}, {}, {}, {:.6}",
            row.capacity,
            row.producers,
            row.consumers,
            row.elapsed.as_secs_f64()
        )?;
        self.writer.flush()
    }
}
