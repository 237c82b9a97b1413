//! Transaction Scheduling Unit.
//!
//! The TSU decides, at each hardware-idle opportunity, which pending flash
//! transactions to bundle into a command and dispatch. It is built from:
//!
//! - [`TransactionQueue`] / [`QueueSet`]: per-chip FIFO queues, one set per
//!   priority class
//! - [`FlashController`]: the interface the hardware model exposes to the
//!   scheduler (status queries plus the single dispatch call)
//! - [`TransactionScheduler`]: the interface the scheduler exposes back,
//!   the three-phase submission protocol plus the idle signals
//! - [`SchedulerBase`]: machinery shared by all scheduling policies:
//!   submission batching, round-robin chip selection, multi-plane bundling
//! - [`OutOfOrderScheduler`]: the out-of-order, suspension-capable policy
//!
//! # Architecture
//!
//! The scheduler is:
//! - **Synchronous**: handlers never block; deferred work becomes a future
//!   event scheduled by the caller
//! - **Deterministic**: same queue state + same signals = same dispatches
//! - **I/O-free**: the hardware model owns all timing; the scheduler only
//!   reads status and calls `send_command`

mod base;
mod out_of_order;
mod queue;
mod traits;

pub use base::SchedulerBase;
pub use out_of_order::OutOfOrderScheduler;
pub use queue::{QueueSet, TransactionQueue};
pub use traits::{FlashController, TransactionScheduler};
