//! Simulator configuration.

use flashsim_simulation::NvmTiming;
use flashsim_types::{SuspensionConfig, TopologyConfig};
use std::time::Duration;

/// Shape of the synthetic workload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkloadConfig {
    /// Transactions per batch.
    pub batch_size: usize,
    /// Simulated time between batches.
    pub batch_interval: Duration,
    /// Fraction of host transactions that are reads (the rest are writes).
    pub read_ratio: f64,
    /// Fraction of all transactions generated by garbage collection.
    pub gc_ratio: f64,
    /// Fraction of all transactions that are mapping-table maintenance.
    pub mapping_ratio: f64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            batch_size: 8,
            batch_interval: Duration::from_micros(100),
            read_ratio: 0.7,
            gc_ratio: 0.1,
            mapping_ratio: 0.05,
        }
    }
}

impl WorkloadConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_batch_interval(mut self, batch_interval: Duration) -> Self {
        self.batch_interval = batch_interval;
        self
    }

    pub fn with_read_ratio(mut self, read_ratio: f64) -> Self {
        self.read_ratio = read_ratio;
        self
    }

    pub fn with_gc_ratio(mut self, gc_ratio: f64) -> Self {
        self.gc_ratio = gc_ratio;
        self
    }

    pub fn with_mapping_ratio(mut self, mapping_ratio: f64) -> Self {
        self.mapping_ratio = mapping_ratio;
        self
    }

    /// Host traffic only: no GC, no mapping maintenance.
    pub fn host_only() -> Self {
        Self {
            gc_ratio: 0.0,
            mapping_ratio: 0.0,
            ..Self::default()
        }
    }
}

/// Full simulator setup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatorConfig {
    pub topology: TopologyConfig,
    pub suspension: SuspensionConfig,
    pub timing: NvmTiming,
    pub workload: WorkloadConfig,
    /// Seed for the workload generator; identical seeds reproduce identical
    /// runs exactly.
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            topology: TopologyConfig::default(),
            suspension: SuspensionConfig::default(),
            timing: NvmTiming::default(),
            workload: WorkloadConfig::default(),
            seed: 0,
        }
    }
}

impl SimulatorConfig {
    pub fn with_topology(mut self, topology: TopologyConfig) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_suspension(mut self, suspension: SuspensionConfig) -> Self {
        self.suspension = suspension;
        self
    }

    pub fn with_timing(mut self, timing: NvmTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_workload(mut self, workload: WorkloadConfig) -> Self {
        self.workload = workload;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}
