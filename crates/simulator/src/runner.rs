//! Workload-driving simulator.

use crate::config::SimulatorConfig;
use crate::report::SimulationReport;
use crate::workload::WorkloadGenerator;
use flashsim_simulation::SimulationRunner;
use flashsim_types::TopologyError;
use std::time::Duration;
use tracing::info;

/// Drives a [`SimulationRunner`] with generated traffic.
pub struct Simulator {
    runner: SimulationRunner,
    generator: WorkloadGenerator,
    config: SimulatorConfig,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Result<Self, TopologyError> {
        let runner =
            SimulationRunner::new(config.topology, config.suspension, config.timing)?;
        let generator = WorkloadGenerator::new(config.topology, config.workload, config.seed);
        info!(
            seed = config.seed,
            batch_size = config.workload.batch_size,
            batch_interval = ?config.workload.batch_interval,
            "created simulator"
        );
        Ok(Self {
            runner,
            generator,
            config,
        })
    }

    /// Feed batches at the configured interval for `duration` of simulated
    /// time, then let in-flight work drain. Returns the run summary.
    pub fn run_for(&mut self, duration: Duration) -> SimulationReport {
        let interval = self.config.workload.batch_interval;
        let mut next_batch_at = Duration::ZERO;

        while next_batch_at < duration {
            let batch = self.generator.next_batch();
            self.runner
                .submit_after(next_batch_at - self.runner.now(), batch);
            self.runner.run_until(next_batch_at);
            next_batch_at += interval;
        }
        // Injection stops at `duration`; drain whatever is still in flight.
        self.runner.run_to_completion();

        let report = SimulationReport {
            duration: self.runner.now(),
            stats: self.runner.stats().clone(),
            controller: self.runner.controller_stats().clone(),
            queued_at_end: self.runner.scheduler().queued(),
        };
        info!(
            serviced = report.stats.transactions_serviced,
            commands = report.controller.commands_issued,
            "run complete"
        );
        report
    }

    /// The underlying simulation runner.
    pub fn runner(&self) -> &SimulationRunner {
        &self.runner
    }
}
