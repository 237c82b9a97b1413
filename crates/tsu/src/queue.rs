//! Transaction queues, indexed by hardware address tier.

use flashsim_types::{ChipLocation, FlashTransaction, TopologyConfig};

/// FIFO queue of transactions awaiting dispatch.
///
/// Insertion order is preserved; bundling scans by index and removes matches
/// in place, so no iterator is ever invalidated mid-scan.
#[derive(Debug, Clone, Default)]
pub struct TransactionQueue {
    entries: Vec<FlashTransaction>,
}

impl TransactionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, transaction: FlashTransaction) {
        self.entries.push(transaction);
    }

    pub fn front(&self) -> Option<&FlashTransaction> {
        self.entries.first()
    }

    pub fn get(&self, index: usize) -> Option<&FlashTransaction> {
        self.entries.get(index)
    }

    /// Remove and return the entry at `index`. Panics on out-of-range
    /// indices; bundling only removes indices it has just inspected.
    pub fn remove_at(&mut self, index: usize) -> FlashTransaction {
        self.entries.remove(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlashTransaction> {
        self.entries.iter()
    }
}

/// One [`TransactionQueue`] per chip, stored as a flat arena indexed by
/// channel×chip with bounds-checked access.
#[derive(Debug, Clone)]
pub struct QueueSet {
    topology: TopologyConfig,
    queues: Vec<TransactionQueue>,
}

impl QueueSet {
    pub fn new(topology: TopologyConfig) -> Self {
        Self {
            topology,
            queues: vec![TransactionQueue::new(); topology.chip_count()],
        }
    }

    pub fn get(&self, chip: ChipLocation) -> &TransactionQueue {
        &self.queues[self.topology.chip_index(chip)]
    }

    pub fn get_mut(&mut self, chip: ChipLocation) -> &mut TransactionQueue {
        let index = self.topology.chip_index(chip);
        &mut self.queues[index]
    }

    /// Transactions queued across all chips.
    pub fn total_len(&self) -> usize {
        self.queues.iter().map(TransactionQueue::len).sum()
    }
}
