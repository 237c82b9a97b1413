//! Simulated flash controller: channel/chip state and command timing.
//!
//! This is the hardware-state collaborator the scheduler talks to. It tracks
//! per-channel and per-chip status, times command phases (bus transfer, then
//! die operation), and implements program/erase suspension by parking the
//! in-flight operation with its remaining time.
//!
//! The controller never touches the event queue that drives it; instead it
//! emits [`ControllerAction`]s into an outbox the runner drains after each
//! handler returns.

use crate::runner::SimEvent;
use flashsim_tsu::FlashController;
use flashsim_types::{
    ChannelId, ChannelStatus, ChipLocation, ChipStatus, FlashTransaction, PlaneMask,
    TopologyConfig, TransactionKind,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::trace;

/// Operation and transfer latencies of the simulated NVM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvmTiming {
    /// Page read (array-to-register) time.
    pub read_latency: Duration,
    /// Page program time.
    pub program_latency: Duration,
    /// Block erase time.
    pub erase_latency: Duration,
    /// Command/data transfer time over the channel bus.
    pub transfer_latency: Duration,
}

impl Default for NvmTiming {
    fn default() -> Self {
        Self {
            read_latency: Duration::from_micros(65),
            program_latency: Duration::from_micros(350),
            erase_latency: Duration::from_micros(3500),
            transfer_latency: Duration::from_micros(25),
        }
    }
}

impl NvmTiming {
    fn operation_latency(&self, kind: TransactionKind) -> Duration {
        match kind {
            TransactionKind::Read => self.read_latency,
            TransactionKind::Write => self.program_latency,
            TransactionKind::Erase => self.erase_latency,
        }
    }
}

/// Deferred work the controller asks the runner to perform on the event
/// queue once the current handler returns.
#[derive(Debug)]
pub(crate) enum ControllerAction {
    Schedule { after: Duration, event: SimEvent },
    CancelCompletion { chip: ChipLocation },
}

/// Counters kept by the controller.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ControllerStats {
    /// Hardware commands dispatched.
    pub commands_issued: u64,
    /// Commands bundling more than one plane.
    pub multi_plane_commands: u64,
    /// In-flight operations suspended for a newer command.
    pub suspensions: u64,
    /// Suspended operations resumed.
    pub resumes: u64,
}

struct InFlight {
    kind: TransactionKind,
    transactions: Vec<FlashTransaction>,
    finish: Duration,
}

struct Suspended {
    kind: TransactionKind,
    transactions: Vec<FlashTransaction>,
    remaining: Duration,
}

#[derive(Default)]
struct ChipState {
    /// Bundle currently moving over the channel bus.
    transferring: Option<Vec<FlashTransaction>>,
    /// Operation executing on the die.
    in_flight: Option<InFlight>,
    /// At most one operation parked by a suspension.
    suspended: Option<Suspended>,
}

/// Result of an operation finishing on a chip.
pub(crate) struct CompletedCommand {
    pub(crate) transactions: Vec<FlashTransaction>,
    /// Remaining run time of a resumed suspended operation, if any.
    pub(crate) resumed: Option<Duration>,
}

/// The simulated hardware-state model.
pub struct SimFlashController {
    topology: TopologyConfig,
    timing: NvmTiming,
    now: Duration,
    channels: Vec<ChannelStatus>,
    chips: Vec<ChipState>,
    outbox: Vec<ControllerAction>,
    stats: ControllerStats,
}

impl SimFlashController {
    pub fn new(topology: TopologyConfig, timing: NvmTiming) -> Self {
        let mut chips = Vec::with_capacity(topology.chip_count());
        chips.resize_with(topology.chip_count(), ChipState::default);
        Self {
            topology,
            timing,
            now: Duration::ZERO,
            channels: vec![ChannelStatus::Idle; topology.channels as usize],
            chips,
            outbox: Vec::new(),
            stats: ControllerStats::default(),
        }
    }

    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    pub(crate) fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    pub(crate) fn take_actions(&mut self) -> Vec<ControllerAction> {
        std::mem::take(&mut self.outbox)
    }

    /// The bus transfer for `chip` finished: free the channel and start the
    /// operation on the die. Returns the operation's duration.
    pub(crate) fn complete_transfer(&mut self, chip: ChipLocation) -> Duration {
        self.channels[chip.channel as usize] = ChannelStatus::Idle;

        let index = self.topology.chip_index(chip);
        let bundle = self.chips[index]
            .transferring
            .take()
            .expect("transfer completion without a transfer in flight");
        let kind = bundle[0].kind;
        let duration = self.timing.operation_latency(kind);
        self.chips[index].in_flight = Some(InFlight {
            kind,
            transactions: bundle,
            finish: self.now + duration,
        });
        trace!(
            channel = chip.channel,
            chip = chip.chip,
            kind = kind.label(),
            ?duration,
            "operation started on die"
        );
        duration
    }

    /// The operation on `chip` finished: hand back its transactions and
    /// resume a suspended operation if one is parked.
    pub(crate) fn complete_command(&mut self, chip: ChipLocation) -> CompletedCommand {
        let index = self.topology.chip_index(chip);
        let done = self.chips[index]
            .in_flight
            .take()
            .expect("command completion without an operation in flight");

        let resumed = self.chips[index].suspended.take().map(|suspended| {
            self.stats.resumes += 1;
            flashsim_metrics::record_resume(suspended.kind.label());
            trace!(
                channel = chip.channel,
                chip = chip.chip,
                kind = suspended.kind.label(),
                remaining = ?suspended.remaining,
                "resuming suspended operation"
            );
            let remaining = suspended.remaining;
            self.chips[index].in_flight = Some(InFlight {
                kind: suspended.kind,
                transactions: suspended.transactions,
                finish: self.now + remaining,
            });
            remaining
        });

        CompletedCommand {
            transactions: done.transactions,
            resumed,
        }
    }
}

impl FlashController for SimFlashController {
    fn channel_status(&self, channel: ChannelId) -> ChannelStatus {
        self.channels[channel as usize]
    }

    fn chip_status(&self, chip: ChipLocation) -> ChipStatus {
        let state = &self.chips[self.topology.chip_index(chip)];
        if state.transferring.is_some() {
            ChipStatus::Transferring
        } else if let Some(in_flight) = &state.in_flight {
            match in_flight.kind {
                TransactionKind::Read => ChipStatus::Reading,
                TransactionKind::Write => ChipStatus::Writing,
                TransactionKind::Erase => ChipStatus::Erasing,
            }
        } else {
            ChipStatus::Idle
        }
    }

    fn expected_finish_time(&self, chip: ChipLocation) -> Duration {
        self.chips[self.topology.chip_index(chip)]
            .in_flight
            .as_ref()
            .map(|in_flight| in_flight.finish)
            .unwrap_or(Duration::ZERO)
    }

    fn has_suspended_command(&self, chip: ChipLocation) -> bool {
        self.chips[self.topology.chip_index(chip)]
            .suspended
            .is_some()
    }

    fn send_command(&mut self, chip: ChipLocation, bundle: Vec<FlashTransaction>) {
        assert!(!bundle.is_empty(), "empty command bundle");
        assert_eq!(
            self.channels[chip.channel as usize],
            ChannelStatus::Idle,
            "command issued on busy channel {}",
            chip.channel
        );

        // Concurrency invariants: one die per bundle, one plane per member.
        let die = bundle[0].address.die;
        let mut claimed = PlaneMask::default();
        for transaction in &bundle {
            assert_eq!(transaction.address.die, die, "bundle spans dies");
            assert!(
                !claimed.contains(transaction.address.plane),
                "bundle members share plane {}",
                transaction.address.plane
            );
            claimed.set(transaction.address.plane);
        }

        let index = self.topology.chip_index(chip);
        assert!(
            self.chips[index].transferring.is_none(),
            "command issued to chip mid-transfer"
        );

        if let Some(running) = self.chips[index].in_flight.take() {
            // Cutting in ahead of a running operation is only legal as a
            // suspension the scheduler asked for.
            assert!(
                bundle[0].suspend_required,
                "command issued to busy chip without suspension"
            );
            assert!(
                self.chips[index].suspended.is_none(),
                "chip already holds a suspended command"
            );
            let remaining = running.finish.saturating_sub(self.now);
            trace!(
                channel = chip.channel,
                chip = chip.chip,
                kind = running.kind.label(),
                ?remaining,
                "suspending in-flight operation"
            );
            self.stats.suspensions += 1;
            flashsim_metrics::record_suspension(running.kind.label());
            self.chips[index].suspended = Some(Suspended {
                kind: running.kind,
                transactions: running.transactions,
                remaining,
            });
            self.outbox.push(ControllerAction::CancelCompletion { chip });
        }

        self.channels[chip.channel as usize] = ChannelStatus::Busy;
        self.stats.commands_issued += 1;
        if bundle.len() > 1 {
            self.stats.multi_plane_commands += 1;
        }
        self.chips[index].transferring = Some(bundle);
        self.outbox.push(ControllerAction::Schedule {
            after: self.timing.transfer_latency,
            event: SimEvent::TransferComplete { chip },
        });
    }
}
