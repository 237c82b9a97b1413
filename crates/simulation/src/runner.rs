//! Simulation dispatch loop.
//!
//! Cooperative and single-threaded: the runner pops the minimum event,
//! advances the virtual clock to its timestamp, invokes the owning
//! component's handler synchronously, and only then processes the next
//! event. Handlers schedule follow-up work as future events; scheduling
//! into the past is a causality break and fails loudly.

use crate::controller::{ControllerAction, ControllerStats, NvmTiming, SimFlashController};
use crate::event_queue::{EventKey, EventQueue};
use flashsim_tsu::{OutOfOrderScheduler, TransactionScheduler};
use flashsim_types::{
    ChipLocation, FlashTransaction, SuspensionConfig, TopologyConfig, TopologyError,
    TransactionKind,
};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Everything that can happen in the simulated world.
#[derive(Debug)]
pub enum SimEvent {
    /// A producer hands a batch of transactions to the scheduler.
    SubmitTransactions { transactions: Vec<FlashTransaction> },
    /// A command finished its bus transfer; the channel is free again and
    /// the operation starts on the die.
    TransferComplete { chip: ChipLocation },
    /// The operation on a die finished.
    CommandComplete { chip: ChipLocation },
}

/// Statistics collected during simulation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimulationStats {
    /// Total events processed.
    pub events_processed: u64,
    /// Transactions handed to the scheduler.
    pub transactions_submitted: u64,
    /// Transactions fully serviced by the hardware model.
    pub transactions_serviced: u64,
    /// Serviced reads.
    pub reads_serviced: u64,
    /// Serviced writes.
    pub writes_serviced: u64,
    /// Serviced erases.
    pub erases_serviced: u64,
}

/// Deterministic simulation runner.
///
/// Owns the event queue, the virtual clock, the simulated controller and the
/// scheduler. Given the same submitted workload it produces the identical
/// event and dispatch sequence every run.
pub struct SimulationRunner {
    queue: EventQueue<SimEvent>,
    now: Duration,
    controller: SimFlashController,
    scheduler: OutOfOrderScheduler,
    /// Pending operation-completion events, for suspension cancellation.
    completion_keys: HashMap<ChipLocation, EventKey>,
    stats: SimulationStats,
}

impl SimulationRunner {
    pub fn new(
        topology: TopologyConfig,
        suspension: SuspensionConfig,
        timing: NvmTiming,
    ) -> Result<Self, TopologyError> {
        let scheduler = OutOfOrderScheduler::new(topology, suspension)?;
        let controller = SimFlashController::new(topology, timing);
        info!(
            channels = topology.channels,
            chips_per_channel = topology.chips_per_channel,
            dies_per_chip = topology.dies_per_chip,
            planes_per_die = topology.planes_per_die,
            "created simulation runner"
        );
        Ok(Self {
            queue: EventQueue::new(),
            now: Duration::ZERO,
            controller,
            scheduler,
            completion_keys: HashMap::new(),
            stats: SimulationStats::default(),
        })
    }

    /// Current simulation time.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    pub fn controller_stats(&self) -> &ControllerStats {
        self.controller.stats()
    }

    pub fn scheduler(&self) -> &OutOfOrderScheduler {
        &self.scheduler
    }

    /// Events still outstanding.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Stage a workload batch for delivery `delay` from now.
    pub fn submit_after(&mut self, delay: Duration, transactions: Vec<FlashTransaction>) {
        let time = self.now + delay;
        self.schedule_event(time, SimEvent::SubmitTransactions { transactions });
    }

    /// Run until the queue is exhausted or `end` is reached. Always advances
    /// the clock to `end`, so polling callers never spin in place.
    pub fn run_until(&mut self, end: Duration) {
        while let Some(key) = self.queue.peek_min_key() {
            if key.time > end {
                debug!(remaining_events = self.queue.len(), "time limit reached");
                break;
            }
            let (key, event) = self.queue.pop_first().expect("peeked event exists");
            self.now = key.time;
            self.stats.events_processed += 1;
            self.dispatch(event);
        }
        if self.now < end {
            self.now = end;
        }
    }

    /// Drain every outstanding event.
    pub fn run_to_completion(&mut self) {
        while let Some((key, event)) = self.queue.pop_first() {
            self.now = key.time;
            self.stats.events_processed += 1;
            self.dispatch(event);
        }
        trace!(
            events_processed = self.stats.events_processed,
            final_time = ?self.now,
            "simulation drained"
        );
    }

    fn schedule_event(&mut self, time: Duration, event: SimEvent) -> EventKey {
        assert!(
            time >= self.now,
            "event scheduled into the past: {time:?} < {:?}",
            self.now
        );
        self.queue.insert(time, event)
    }

    fn dispatch(&mut self, event: SimEvent) {
        self.controller.set_time(self.now);
        self.scheduler.set_time(self.now);

        match event {
            SimEvent::SubmitTransactions { transactions } => {
                trace!(
                    time = ?self.now,
                    count = transactions.len(),
                    "delivering workload batch"
                );
                self.stats.transactions_submitted += transactions.len() as u64;
                self.scheduler.prepare_for_submission();
                for transaction in transactions {
                    self.scheduler.submit(transaction);
                }
                self.scheduler.schedule(&mut self.controller);
            }

            SimEvent::TransferComplete { chip } => {
                let operation_time = self.controller.complete_transfer(chip);
                let finish = self.now + operation_time;
                let key = self.schedule_event(finish, SimEvent::CommandComplete { chip });
                self.completion_keys.insert(chip, key);
                // The bus is free: give the channel's chips a chance.
                self.scheduler
                    .on_channel_idle(&mut self.controller, chip.channel);
            }

            SimEvent::CommandComplete { chip } => {
                self.completion_keys.remove(&chip);
                let completed = self.controller.complete_command(chip);
                for transaction in &completed.transactions {
                    self.record_serviced(transaction.kind);
                    self.scheduler.on_transaction_serviced(transaction);
                }
                if let Some(remaining) = completed.resumed {
                    let key = self
                        .schedule_event(self.now + remaining, SimEvent::CommandComplete { chip });
                    self.completion_keys.insert(chip, key);
                } else {
                    self.scheduler.on_chip_idle(&mut self.controller, chip);
                }
            }
        }

        self.drain_controller_actions();
    }

    fn record_serviced(&mut self, kind: TransactionKind) {
        self.stats.transactions_serviced += 1;
        match kind {
            TransactionKind::Read => self.stats.reads_serviced += 1,
            TransactionKind::Write => self.stats.writes_serviced += 1,
            TransactionKind::Erase => self.stats.erases_serviced += 1,
        }
        flashsim_metrics::record_transaction_serviced(kind.label());
    }

    fn drain_controller_actions(&mut self) {
        for action in self.controller.take_actions() {
            match action {
                ControllerAction::Schedule { after, event } => {
                    let time = self.now + after;
                    self.schedule_event(time, event);
                }
                ControllerAction::CancelCompletion { chip } => {
                    let key = self
                        .completion_keys
                        .remove(&chip)
                        .expect("suspended operation has a pending completion");
                    self.queue.remove(&key);
                }
            }
        }
        flashsim_metrics::set_event_queue_depth(self.queue.len());
    }
}
