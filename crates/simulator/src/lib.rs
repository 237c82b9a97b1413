//! Flashsim workload harness.
//!
//! A long-running workload driver built on top of the simulation crate.
//! Provides deterministic synthetic traffic (host reads/writes, garbage
//! collection, mapping maintenance), configuration builders, and an
//! end-of-run report.
//!
//! # Example
//!
//! ```ignore
//! use flashsim_simulator::{Simulator, SimulatorConfig, WorkloadConfig};
//! use std::time::Duration;
//!
//! let config = SimulatorConfig::default()
//!     .with_seed(42)
//!     .with_workload(WorkloadConfig::default().with_batch_size(16));
//!
//! let mut simulator = Simulator::new(config)?;
//! let report = simulator.run_for(Duration::from_millis(100));
//! report.print_summary();
//! ```

mod config;
mod report;
mod runner;
mod workload;

pub use config::{SimulatorConfig, WorkloadConfig};
pub use report::SimulationReport;
pub use runner::Simulator;
pub use workload::WorkloadGenerator;
