//! Interfaces between the scheduler and its collaborators.

use flashsim_types::{ChannelId, ChannelStatus, ChipLocation, ChipStatus, FlashTransaction};
use std::time::Duration;

/// The hardware-state collaborator as seen by the scheduler.
///
/// Status is mutated only by the hardware model as commands start and finish;
/// the scheduler reads it to decide whether to search for work, and dispatches
/// through the single [`send_command`](FlashController::send_command) call.
pub trait FlashController {
    fn channel_status(&self, channel: ChannelId) -> ChannelStatus;

    fn chip_status(&self, chip: ChipLocation) -> ChipStatus;

    /// Absolute simulation time at which the chip's in-flight operation is
    /// expected to finish. Only meaningful while the chip is executing.
    fn expected_finish_time(&self, chip: ChipLocation) -> Duration;

    /// Whether the chip already holds a suspended operation. At most one
    /// operation may be suspended per chip; a second suspension is never
    /// requested.
    fn has_suspended_command(&self, chip: ChipLocation) -> bool;

    /// Dispatch one hardware command. All bundle members target the same die
    /// and distinct planes; the channel must be idle. Issuing on a busy
    /// channel is a scheduler defect and the implementation must fail fast.
    fn send_command(&mut self, chip: ChipLocation, bundle: Vec<FlashTransaction>);
}

/// The scheduler as seen by its collaborators.
///
/// Producers stage work through the three-phase protocol:
///
/// ```text
/// prepare_for_submission()
/// submit(transaction)
/// ...
/// submit(transaction)
/// schedule(controller)
/// ```
///
/// Staging a whole logical request before scheduling lets the scheduler see
/// all of it at once and exploit die- and plane-level parallelism. Prepare
/// calls may nest when a producer evaluates several transactions together;
/// only the outermost `schedule` runs the policy.
///
/// The hardware model delivers its signals through the `on_*` observer
/// methods; the runner calls [`set_time`](TransactionScheduler::set_time)
/// before each delivery.
pub trait TransactionScheduler {
    fn prepare_for_submission(&mut self);

    fn submit(&mut self, transaction: FlashTransaction);

    /// Route staged transactions into the policy queues and try to dispatch
    /// on every idle channel.
    fn schedule(&mut self, controller: &mut dyn FlashController);

    /// Current simulation time, injected by the dispatch loop before each
    /// signal delivery.
    fn set_time(&mut self, now: Duration);

    /// A transaction finished on the hardware. Informational: completion
    /// handling belongs to the transaction's originator.
    fn on_transaction_serviced(&mut self, transaction: &FlashTransaction);

    /// A channel bus went idle; scan its chips round-robin for work.
    fn on_channel_idle(&mut self, controller: &mut dyn FlashController, channel: ChannelId);

    /// A chip went idle; serve it immediately if its channel is free.
    fn on_chip_idle(&mut self, controller: &mut dyn FlashController, chip: ChipLocation);
}
