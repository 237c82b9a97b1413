//! Out-of-order, priority-aware, suspension-capable scheduling policy.
//!
//! Seven independent queue sets separate traffic classes: host traffic,
//! garbage collection, and mapping-table maintenance each get their own
//! read/write queues (plus a GC erase queue), indexed per chip. Mapping
//! traffic is served first (the address-translation path stalls everything
//! behind it), then host traffic, with GC filling whatever plane slots
//! remain.

use crate::base::{SchedulerBase, SchedulerPolicy};
use crate::queue::QueueSet;
use crate::traits::{FlashController, TransactionScheduler};
use flashsim_types::{
    ChannelId, ChannelStatus, ChipLocation, ChipStatus, FlashTransaction, SuspensionConfig,
    TopologyConfig, TopologyError, TransactionKind, TransactionSource,
};
use std::time::Duration;
use tracing::debug;

/// Out-of-order transaction scheduler.
///
/// Supports out-of-order execution of flash transactions across queues and
/// program/erase suspension: a read arriving while a long program or erase
/// is in flight forces a suspension when the remaining time justifies it.
pub struct OutOfOrderScheduler {
    base: SchedulerBase,
    user_read: QueueSet,
    user_write: QueueSet,
    gc_read: QueueSet,
    gc_write: QueueSet,
    gc_erase: QueueSet,
    mapping_read: QueueSet,
    mapping_write: QueueSet,
}

impl OutOfOrderScheduler {
    /// Build the scheduler. Fails on an inconsistent topology before any
    /// simulation starts.
    pub fn new(
        topology: TopologyConfig,
        suspension: SuspensionConfig,
    ) -> Result<Self, TopologyError> {
        let base = SchedulerBase::new(topology, suspension)?;
        Ok(Self {
            base,
            user_read: QueueSet::new(topology),
            user_write: QueueSet::new(topology),
            gc_read: QueueSet::new(topology),
            gc_write: QueueSet::new(topology),
            gc_erase: QueueSet::new(topology),
            mapping_read: QueueSet::new(topology),
            mapping_write: QueueSet::new(topology),
        })
    }

    /// Total transactions waiting across every queue set.
    pub fn queued(&self) -> usize {
        self.user_read.total_len()
            + self.user_write.total_len()
            + self.gc_read.total_len()
            + self.gc_write.total_len()
            + self.gc_erase.total_len()
            + self.mapping_read.total_len()
            + self.mapping_write.total_len()
    }

    /// Transactions waiting for one chip, across every queue set.
    pub fn queued_for(&self, chip: ChipLocation) -> usize {
        self.user_read.get(chip).len()
            + self.user_write.get(chip).len()
            + self.gc_read.get(chip).len()
            + self.gc_write.get(chip).len()
            + self.gc_erase.get(chip).len()
            + self.mapping_read.get(chip).len()
            + self.mapping_write.get(chip).len()
    }

    fn route(&mut self, transaction: FlashTransaction) {
        let chip = transaction.address.chip_location();
        let queue = match (transaction.kind, transaction.source) {
            (TransactionKind::Read, TransactionSource::UserIo | TransactionSource::Cache) => {
                &mut self.user_read
            }
            (TransactionKind::Read, TransactionSource::Mapping) => &mut self.mapping_read,
            (TransactionKind::Read, TransactionSource::GcWl) => &mut self.gc_read,
            (TransactionKind::Write, TransactionSource::UserIo | TransactionSource::Cache) => {
                &mut self.user_write
            }
            (TransactionKind::Write, TransactionSource::Mapping) => &mut self.mapping_write,
            (TransactionKind::Write, TransactionSource::GcWl) => &mut self.gc_write,
            (TransactionKind::Erase, _) => &mut self.gc_erase,
        };
        queue.get_mut(chip).push_back(transaction);
    }

    /// Whether a read can go to this chip right now, and whether it must
    /// suspend the running operation to do so. `None` means the read waits.
    fn read_suspension(
        &self,
        controller: &dyn FlashController,
        chip: ChipLocation,
    ) -> Option<bool> {
        let policy = self.base.suspension();
        match controller.chip_status(chip) {
            ChipStatus::Idle => Some(false),
            ChipStatus::Writing => {
                if !policy.program_suspension_enabled || controller.has_suspended_command(chip) {
                    return None;
                }
                let remaining = self.remaining_time(controller, chip);
                (remaining >= policy.write_reasonable_suspension_for_read).then_some(true)
            }
            ChipStatus::Erasing => {
                if !policy.erase_suspension_enabled || controller.has_suspended_command(chip) {
                    return None;
                }
                let remaining = self.remaining_time(controller, chip);
                (remaining >= policy.erase_reasonable_suspension_for_read).then_some(true)
            }
            _ => None,
        }
    }

    /// Same decision for a write: only an erase may be suspended under it.
    fn write_suspension(
        &self,
        controller: &dyn FlashController,
        chip: ChipLocation,
    ) -> Option<bool> {
        let policy = self.base.suspension();
        match controller.chip_status(chip) {
            ChipStatus::Idle => Some(false),
            ChipStatus::Erasing => {
                if !policy.erase_suspension_enabled || controller.has_suspended_command(chip) {
                    return None;
                }
                let remaining = self.remaining_time(controller, chip);
                (remaining >= policy.erase_reasonable_suspension_for_write).then_some(true)
            }
            _ => None,
        }
    }

    fn remaining_time(&self, controller: &dyn FlashController, chip: ChipLocation) -> Duration {
        controller
            .expected_finish_time(chip)
            .saturating_sub(self.base.now())
    }
}

impl SchedulerPolicy for OutOfOrderScheduler {
    fn base(&self) -> &SchedulerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SchedulerBase {
        &mut self.base
    }

    fn service_read_transaction(
        &mut self,
        controller: &mut dyn FlashController,
        chip: ChipLocation,
    ) -> bool {
        let has_mapping = !self.mapping_read.get(chip).is_empty();
        let has_user = !self.user_read.get(chip).is_empty();
        let has_gc = !self.gc_read.get(chip).is_empty();
        if !(has_mapping || has_user || has_gc) {
            return false;
        }

        let Some(suspension_required) = self.read_suspension(&*controller, chip) else {
            return false;
        };

        if has_mapping {
            let secondary = if has_user {
                Some(self.user_read.get_mut(chip))
            } else if has_gc {
                Some(self.gc_read.get_mut(chip))
            } else {
                None
            };
            self.base.issue_command_to_chip(
                controller,
                chip,
                self.mapping_read.get_mut(chip),
                secondary,
                TransactionKind::Read,
                suspension_required,
            )
        } else if has_user {
            let secondary = has_gc.then(|| self.gc_read.get_mut(chip));
            self.base.issue_command_to_chip(
                controller,
                chip,
                self.user_read.get_mut(chip),
                secondary,
                TransactionKind::Read,
                suspension_required,
            )
        } else {
            self.base.issue_command_to_chip(
                controller,
                chip,
                self.gc_read.get_mut(chip),
                None,
                TransactionKind::Read,
                suspension_required,
            )
        }
    }

    fn service_write_transaction(
        &mut self,
        controller: &mut dyn FlashController,
        chip: ChipLocation,
    ) -> bool {
        let has_mapping = !self.mapping_write.get(chip).is_empty();
        let has_user = !self.user_write.get(chip).is_empty();
        let has_gc = !self.gc_write.get(chip).is_empty();
        if !(has_mapping || has_user || has_gc) {
            return false;
        }

        let Some(suspension_required) = self.write_suspension(&*controller, chip) else {
            return false;
        };

        if has_mapping {
            let secondary = if has_user {
                Some(self.user_write.get_mut(chip))
            } else if has_gc {
                Some(self.gc_write.get_mut(chip))
            } else {
                None
            };
            self.base.issue_command_to_chip(
                controller,
                chip,
                self.mapping_write.get_mut(chip),
                secondary,
                TransactionKind::Write,
                suspension_required,
            )
        } else if has_user {
            let secondary = has_gc.then(|| self.gc_write.get_mut(chip));
            self.base.issue_command_to_chip(
                controller,
                chip,
                self.user_write.get_mut(chip),
                secondary,
                TransactionKind::Write,
                suspension_required,
            )
        } else {
            self.base.issue_command_to_chip(
                controller,
                chip,
                self.gc_write.get_mut(chip),
                None,
                TransactionKind::Write,
                suspension_required,
            )
        }
    }

    fn service_erase_transaction(
        &mut self,
        controller: &mut dyn FlashController,
        chip: ChipLocation,
    ) -> bool {
        if self.gc_erase.get(chip).is_empty() {
            return false;
        }
        // An erase is never worth suspending anything for.
        if controller.chip_status(chip) != ChipStatus::Idle {
            return false;
        }
        self.base.issue_command_to_chip(
            controller,
            chip,
            self.gc_erase.get_mut(chip),
            None,
            TransactionKind::Erase,
            false,
        )
    }
}

impl TransactionScheduler for OutOfOrderScheduler {
    fn prepare_for_submission(&mut self) {
        self.base.prepare_for_submission();
    }

    fn submit(&mut self, transaction: FlashTransaction) {
        self.base.submit(transaction);
    }

    fn schedule(&mut self, controller: &mut dyn FlashController) {
        if !self.base.close_submission() {
            return;
        }
        let intake = self.base.take_intake();
        if intake.is_empty() {
            return;
        }
        debug!(count = intake.len(), "routing staged transactions");
        for transaction in intake {
            self.route(transaction);
        }
        for channel in 0..self.base.topology().channels {
            if controller.channel_status(channel) == ChannelStatus::Idle {
                self.scan_channel(controller, channel);
            }
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.base.set_time(now);
    }

    fn on_transaction_serviced(&mut self, _transaction: &FlashTransaction) {
        // Completion handling belongs to the transaction's originator.
    }

    fn on_channel_idle(&mut self, controller: &mut dyn FlashController, channel: ChannelId) {
        self.scan_channel(controller, channel);
    }

    fn on_chip_idle(&mut self, controller: &mut dyn FlashController, chip: ChipLocation) {
        // The chip announced availability, so the round-robin is bypassed.
        // The channel still serializes one command at a time.
        if controller.channel_status(chip.channel) == ChannelStatus::Idle {
            self.process_chip_requests(controller, chip);
        }
    }
}
