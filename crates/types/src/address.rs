//! Flash address hierarchy identifiers.

use serde::{Deserialize, Serialize};

/// Index of a channel (shared command/data bus).
pub type ChannelId = u32;

/// Index of a chip within its channel.
pub type ChipId = u32;

/// Index of a die within its chip.
pub type DieId = u32;

/// Index of a plane within its die.
pub type PlaneId = u32;

/// Index of a page within its die (block-relative structure is not modeled;
/// erase transactions carry the page index of their target block).
pub type PageId = u32;

/// Logical page number, assigned by the address-mapping layer.
pub type Lpn = u64;

/// Physical page number, resolved by the address-mapping layer.
pub type Ppn = u64;

/// Unique identifier of a transaction, assigned by its producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub u64);

/// Position of a chip in the topology: which channel it hangs off, and its
/// index on that channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChipLocation {
    pub channel: ChannelId,
    pub chip: ChipId,
}

impl ChipLocation {
    pub fn new(channel: ChannelId, chip: ChipId) -> Self {
        Self { channel, chip }
    }
}

/// Full physical address of one page: the command routing target.
///
/// The channel/chip pair selects the command target; die and plane select the
/// parallel unit inside the chip; page is the offset a multi-plane command
/// must agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhysicalPageAddress {
    pub channel: ChannelId,
    pub chip: ChipId,
    pub die: DieId,
    pub plane: PlaneId,
    pub page: PageId,
}

impl PhysicalPageAddress {
    pub fn new(channel: ChannelId, chip: ChipId, die: DieId, plane: PlaneId, page: PageId) -> Self {
        Self {
            channel,
            chip,
            die,
            plane,
            page,
        }
    }

    /// The chip this address routes to.
    pub fn chip_location(&self) -> ChipLocation {
        ChipLocation {
            channel: self.channel,
            chip: self.chip,
        }
    }
}
