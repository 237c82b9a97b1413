//! End-of-run reporting.

use flashsim_simulation::{ControllerStats, SimulationStats};
use std::time::Duration;

/// Summary of a completed simulation run.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Simulated time covered by the run.
    pub duration: Duration,
    pub stats: SimulationStats,
    pub controller: ControllerStats,
    /// Transactions still queued when the run stopped.
    pub queued_at_end: usize,
}

impl SimulationReport {
    /// Serviced transactions per simulated second.
    pub fn serviced_per_second(&self) -> f64 {
        let seconds = self.duration.as_secs_f64();
        if seconds == 0.0 {
            0.0
        } else {
            self.stats.transactions_serviced as f64 / seconds
        }
    }

    /// Fraction of commands that bundled more than one plane.
    pub fn multi_plane_fraction(&self) -> f64 {
        if self.controller.commands_issued == 0 {
            0.0
        } else {
            self.controller.multi_plane_commands as f64 / self.controller.commands_issued as f64
        }
    }

    pub fn print_summary(&self) {
        println!("=== Simulation Report ===");
        println!("Simulated time:       {:?}", self.duration);
        println!("Events processed:     {}", self.stats.events_processed);
        println!(
            "Transactions:         {} submitted, {} serviced ({} queued at end)",
            self.stats.transactions_submitted, self.stats.transactions_serviced, self.queued_at_end
        );
        println!(
            "  reads / writes / erases: {} / {} / {}",
            self.stats.reads_serviced, self.stats.writes_serviced, self.stats.erases_serviced
        );
        println!(
            "Commands issued:      {} ({:.1}% multi-plane)",
            self.controller.commands_issued,
            self.multi_plane_fraction() * 100.0
        );
        println!(
            "Suspensions:          {} ({} resumed)",
            self.controller.suspensions, self.controller.resumes
        );
        println!("Throughput:           {:.0} serviced/s", self.serviced_per_second());
    }
}
