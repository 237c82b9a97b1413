//! Core types for the flashsim NVM scheduling simulator.
//!
//! This crate provides the foundational types used throughout the
//! implementation:
//!
//! - **Addressing**: channel/chip/die/plane/page identifiers and
//!   [`PhysicalPageAddress`]
//! - **Transactions**: [`FlashTransaction`] and its readiness rules
//! - **Hardware state**: [`ChannelStatus`] and [`ChipStatus`]
//! - **Configuration**: [`TopologyConfig`], [`SuspensionConfig`] and their
//!   construction-time validation
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not depend
//! on any other workspace crates, making it the foundation layer.

mod address;
mod plane_mask;
mod status;
mod topology;
mod transaction;

pub use address::{
    ChannelId, ChipId, ChipLocation, DieId, Lpn, PageId, PhysicalPageAddress, PlaneId, Ppn,
    TransactionId,
};
pub use plane_mask::{PlaneMask, MAX_PLANES_PER_DIE};
pub use status::{ChannelStatus, ChipStatus};
pub use topology::{SuspensionConfig, TopologyConfig, TopologyError};
pub use transaction::{FlashTransaction, TransactionKind, TransactionSource};
