//! Deterministic discrete-event simulation of the flash array.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SimulationRunner                       │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     EventQueue (BTreeMap<EventKey, SimEvent>)      │ │
//! │  │     Ordered by: time, then insertion sequence      │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │ pop minimum, advance clock  │
//! │                           ▼                             │
//! │  ┌──────────────────┐  signals   ┌────────────────────┐ │
//! │  │ SimFlashCtrl     │───────────▶│ OutOfOrderScheduler│ │
//! │  │ (channel/chip    │◀───────────│ (queues, bundling, │ │
//! │  │  state, timing)  │ send_command  suspension)       │ │
//! │  └────────┬─────────┘            └────────────────────┘ │
//! │           │ outbox actions → schedule / cancel events   │
//! └───────────┴─────────────────────────────────────────────┘
//! ```
//!
//! Everything runs single-threaded; hardware parallelism is simulated state,
//! never real concurrency. Given the same inputs the runner produces the
//! identical event and dispatch sequence every time.

mod controller;
mod event_queue;
mod runner;

pub use controller::{ControllerStats, NvmTiming, SimFlashController};
pub use event_queue::{EventKey, EventQueue};
pub use runner::{SimEvent, SimulationRunner, SimulationStats};
