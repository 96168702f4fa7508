//! Sales Simulator CLI
//!
//! Sweep a producer/consumer sales simulation over buffer capacities,
//! producer counts and consumer counts, timing every run.
//!
//! # Example
//!
//! ```bash
//! # The full default sweep, reports under ./output
//! salesim
//!
//! # A quick reproducible sweep without worker sleeps
//! salesim --buffer-sizes 2,8 --producers 1,4 --consumers 1,4 --quota 200 --seed 7 --no-delay
//!
//! # Start from a config file and override the output directory
//! salesim --config sweep.toml --output-dir /tmp/salesim
//! ```

use anyhow::Context;
use clap::Parser;
use salesim_simulator::{CsvTimingSink, DelayRange, FileReportSink, Sweep, SweepConfig, SweepReport};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Sales Simulator
///
/// Producers generate sales records into a bounded buffer, consumers
/// aggregate them. One run per combination of the swept parameters.
#[derive(Parser, Debug)]
#[command(name = "salesim")]
#[command(version, about, long_about = None)]
struct Args {
    /// TOML sweep configuration. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Buffer capacities to sweep (comma-separated)
    #[arg(short = 'b', long, value_delimiter = ',')]
    buffer_sizes: Option<Vec<usize>>,

    /// Producer counts to sweep (comma-separated)
    #[arg(short = 'p', long, value_delimiter = ',')]
    producers: Option<Vec<u32>>,

    /// Consumer counts to sweep (comma-separated)
    #[arg(short = 'c', long, value_delimiter = ',')]
    consumers: Option<Vec<u32>>,

    /// Records generated by each producer per run
    #[arg(short = 'q', long)]
    quota: Option<u64>,

    /// Base seed for reproducible records. When omitted, a random seed is used.
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for results.txt and timing_results.txt
    #[arg(short = 'o', long, default_value = "output")]
    output_dir: PathBuf,

    /// Shortest worker sleep per record (e.g. "5ms")
    #[arg(long, conflicts_with = "no_delay")]
    min_delay: Option<humantime::Duration>,

    /// Longest worker sleep per record (e.g. "40ms")
    #[arg(long, conflicts_with = "no_delay")]
    max_delay: Option<humantime::Duration>,

    /// Disable worker sleeps entirely
    #[arg(long)]
    no_delay: bool,
}

impl Args {
    /// Defaults, then the config file, then flags.
    fn sweep_config(&self) -> anyhow::Result<SweepConfig> {
        let mut config = match &self.config {
            Some(path) => SweepConfig::load(path)?,
            None => SweepConfig::default(),
        };

        if let Some(sizes) = &self.buffer_sizes {
            config = config.with_buffer_capacities(sizes.clone());
        }
        if let Some(producers) = &self.producers {
            config = config.with_producer_counts(producers.clone());
        }
        if let Some(consumers) = &self.consumers {
            config = config.with_consumer_counts(consumers.clone());
        }
        if let Some(quota) = self.quota {
            config = config.with_quota(quota);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }

        if self.no_delay {
            config = config.without_delay();
        } else {
            let override_delay = |current: DelayRange| {
                DelayRange::new(
                    self.min_delay.as_ref().map_or(current.min, |d| **d),
                    self.max_delay.as_ref().map_or(current.max, |d| **d),
                )
            };
            config.producer_delay = override_delay(config.producer_delay);
            config.consumer_delay = override_delay(config.consumer_delay);
        }

        Ok(config)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,salesim_simulator=info")),
        )
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(report) => {
            print_summary(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<SweepReport> {
    let config = args.sweep_config()?;
    let sweep = Sweep::new(config).context("invalid sweep configuration")?;

    let reports = FileReportSink::create(args.output_dir.join("results.txt"))?;
    let mut timings = CsvTimingSink::create(args.output_dir.join("timing_results.txt"))?;

    println!(
        "Running {} simulations, results in {}",
        sweep.config().num_runs(),
        args.output_dir.display()
    );

    let report = sweep.run_with_progress(&reports, &mut timings, |_, _, row| {
        println!(
            "Simulation (b={}, p={}, c={}) completed in {:.6} seconds.",
            row.capacity,
            row.producers,
            row.consumers,
            row.elapsed.as_secs_f64()
        );
    })?;

    if let Err(e) = reports.flush() {
        tracing::warn!(path = %reports.path().display(), error = %e, "Failed to flush report");
    }

    Ok(report)
}

fn print_summary(report: &SweepReport) {
    println!("\n=== Sweep Summary (seed {}) ===", report.seed);
    println!(
        "{:>6} {:>6} {:>6} {:>12} {:>14} {:>14}",
        "b", "p", "c", "time (s)", "records/s", "global sales"
    );
    for (row, run) in report.timings.iter().zip(&report.runs) {
        println!(
            "{:>6} {:>6} {:>6} {:>12.6} {:>14.1} {:>14.2}",
            row.capacity,
            row.producers,
            row.consumers,
            row.elapsed.as_secs_f64(),
            run.throughput(),
            run.totals.grand_total
        );
    }
    println!(
        "Total: {} runs, {} records in {:.3} seconds",
        report.runs.len(),
        report.total_records(),
        report.elapsed.as_secs_f64()
    );
}
