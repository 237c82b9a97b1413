//! Deterministic synthetic workload generation.

use crate::config::WorkloadConfig;
use flashsim_types::{
    FlashTransaction, PhysicalPageAddress, TopologyConfig, TransactionId, TransactionSource,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Generates batches of flash transactions from a seeded RNG.
///
/// The same seed and configuration produce the identical transaction stream
/// every run; the simulation's determinism tests depend on it.
pub struct WorkloadGenerator {
    rng: ChaCha8Rng,
    topology: TopologyConfig,
    config: WorkloadConfig,
    next_id: u64,
}

impl WorkloadGenerator {
    pub fn new(topology: TopologyConfig, config: WorkloadConfig, seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            topology,
            config,
            next_id: 0,
        }
    }

    /// Produce the next batch of transactions.
    pub fn next_batch(&mut self) -> Vec<FlashTransaction> {
        (0..self.config.batch_size)
            .map(|_| self.next_transaction())
            .collect()
    }

    fn next_transaction(&mut self) -> FlashTransaction {
        let id = TransactionId(self.next_id);
        self.next_id += 1;
        let address = self.random_address();
        let class: f64 = self.rng.gen();

        if class < self.config.mapping_ratio {
            // Mapping-table maintenance: an even read/write mix.
            if self.rng.gen_bool(0.5) {
                FlashTransaction::read(id, TransactionSource::Mapping, address, id.0, id.0)
            } else {
                FlashTransaction::write(id, TransactionSource::Mapping, address, id.0, id.0)
            }
        } else if class < self.config.mapping_ratio + self.config.gc_ratio {
            // Garbage collection: page movements plus the occasional erase.
            let pick: f64 = self.rng.gen();
            if pick < 0.2 {
                FlashTransaction::erase(id, address)
            } else if pick < 0.6 {
                FlashTransaction::read(id, TransactionSource::GcWl, address, id.0, id.0)
            } else {
                FlashTransaction::write(id, TransactionSource::GcWl, address, id.0, id.0)
            }
        } else if self.rng.gen_bool(self.config.read_ratio) {
            FlashTransaction::read(id, TransactionSource::UserIo, address, id.0, id.0)
        } else {
            FlashTransaction::write(id, TransactionSource::UserIo, address, id.0, id.0)
        }
    }

    fn random_address(&mut self) -> PhysicalPageAddress {
        PhysicalPageAddress::new(
            self.rng.gen_range(0..self.topology.channels),
            self.rng.gen_range(0..self.topology.chips_per_channel),
            self.rng.gen_range(0..self.topology.dies_per_chip),
            self.rng.gen_range(0..self.topology.planes_per_die),
            self.rng.gen_range(0..self.topology.pages_per_die),
        )
    }
}
