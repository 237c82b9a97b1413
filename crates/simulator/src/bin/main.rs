//! Flashsim CLI
//!
//! Run deterministic flash-array workload simulations with configurable
//! topology and traffic parameters.
//!
//! # Example
//!
//! ```bash
//! # Run a deterministic simulation with a fixed seed
//! flashsim --seed 42 -c 4 --chips 2 -d 100
//!
//! # Heavier, write-leaning workload with suspension disabled
//! flashsim --batch-size 32 --read-ratio 0.3 --no-suspension
//! ```

use clap::Parser;
use flashsim_simulator::{Simulator, SimulatorConfig, WorkloadConfig};
use flashsim_types::{SuspensionConfig, TopologyConfig};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Flashsim: discrete-event flash scheduling simulator.
///
/// Single-threaded and reproducible when the same seed is used.
#[derive(Parser, Debug)]
#[command(name = "flashsim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of channels
    #[arg(short = 'c', long, default_value = "8")]
    channels: u32,

    /// Chips per channel
    #[arg(long, default_value = "4")]
    chips: u32,

    /// Dies per chip
    #[arg(long, default_value = "2")]
    dies: u32,

    /// Planes per die
    #[arg(long, default_value = "4")]
    planes: u32,

    /// Simulated duration in milliseconds
    #[arg(short = 'd', long, default_value = "100")]
    duration_ms: u64,

    /// Random seed for reproducible runs. When omitted, a random seed is used.
    #[arg(long)]
    seed: Option<u64>,

    /// Transactions per workload batch
    #[arg(long, default_value = "8")]
    batch_size: usize,

    /// Microseconds between workload batches
    #[arg(long, default_value = "100")]
    batch_interval_us: u64,

    /// Fraction of host transactions that are reads (0.0-1.0)
    #[arg(long, default_value = "0.7")]
    read_ratio: f64,

    /// Fraction of traffic generated by garbage collection (0.0-1.0)
    #[arg(long, default_value = "0.1")]
    gc_ratio: f64,

    /// Fraction of traffic that is mapping maintenance (0.0-1.0)
    #[arg(long, default_value = "0.05")]
    mapping_ratio: f64,

    /// Disable program/erase suspension
    #[arg(long)]
    no_suspension: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,flashsim_simulator=info")),
        )
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);

    let topology = TopologyConfig {
        channels: args.channels,
        chips_per_channel: args.chips,
        dies_per_chip: args.dies,
        planes_per_die: args.planes,
        ..Default::default()
    };
    let suspension = if args.no_suspension {
        SuspensionConfig::disabled()
    } else {
        SuspensionConfig::default()
    };
    let workload = WorkloadConfig::default()
        .with_batch_size(args.batch_size)
        .with_batch_interval(Duration::from_micros(args.batch_interval_us))
        .with_read_ratio(args.read_ratio)
        .with_gc_ratio(args.gc_ratio)
        .with_mapping_ratio(args.mapping_ratio);

    let config = SimulatorConfig::default()
        .with_topology(topology)
        .with_suspension(suspension)
        .with_workload(workload)
        .with_seed(seed);

    info!(
        channels = args.channels,
        chips = args.chips,
        dies = args.dies,
        planes = args.planes,
        duration_ms = args.duration_ms,
        seed,
        "starting simulation"
    );

    let mut simulator = match Simulator::new(config) {
        Ok(simulator) => simulator,
        Err(error) => {
            eprintln!("invalid configuration: {error}");
            std::process::exit(1);
        }
    };

    let report = simulator.run_for(Duration::from_millis(args.duration_ms));
    report.print_summary();
}
