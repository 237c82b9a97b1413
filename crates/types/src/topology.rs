//! Hardware topology and suspension configuration.

use crate::plane_mask::MAX_PLANES_PER_DIE;
use crate::{ChipLocation, PhysicalPageAddress};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors detected when validating a topology before simulation starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("topology dimension `{0}` must be non-zero")]
    ZeroDimension(&'static str),

    #[error("planes_per_die {planes} exceeds the plane mask width {max}")]
    PlaneCountExceedsMaskWidth { planes: u32, max: u32 },
}

/// Dimensions of the flash array: channels → chips → dies → planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Number of independent channel buses.
    pub channels: u32,
    /// Chips sharing each channel bus.
    pub chips_per_channel: u32,
    /// Dies per chip; each die executes one command at a time.
    pub dies_per_chip: u32,
    /// Planes per die; the upper bound on multi-plane bundle size.
    pub planes_per_die: u32,
    /// Pages addressable per die (page index space for workloads).
    pub pages_per_die: u32,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            channels: 8,
            chips_per_channel: 4,
            dies_per_chip: 2,
            planes_per_die: 4,
            pages_per_die: 4096,
        }
    }
}

impl TopologyConfig {
    /// Check the configuration for inconsistencies.
    ///
    /// Must pass before any scheduler or controller is built; a plane count
    /// wider than the bundling bitmask is a construction-time fatal error,
    /// never a scheduling-time one.
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.channels == 0 {
            return Err(TopologyError::ZeroDimension("channels"));
        }
        if self.chips_per_channel == 0 {
            return Err(TopologyError::ZeroDimension("chips_per_channel"));
        }
        if self.dies_per_chip == 0 {
            return Err(TopologyError::ZeroDimension("dies_per_chip"));
        }
        if self.planes_per_die == 0 {
            return Err(TopologyError::ZeroDimension("planes_per_die"));
        }
        if self.pages_per_die == 0 {
            return Err(TopologyError::ZeroDimension("pages_per_die"));
        }
        if self.planes_per_die > MAX_PLANES_PER_DIE {
            return Err(TopologyError::PlaneCountExceedsMaskWidth {
                planes: self.planes_per_die,
                max: MAX_PLANES_PER_DIE,
            });
        }
        Ok(())
    }

    /// Total chips across all channels.
    pub fn chip_count(&self) -> usize {
        self.channels as usize * self.chips_per_channel as usize
    }

    /// Flat index of a chip, for channel×chip arenas.
    pub fn chip_index(&self, chip: ChipLocation) -> usize {
        assert!(
            chip.channel < self.channels && chip.chip < self.chips_per_channel,
            "chip {chip:?} outside topology ({}x{})",
            self.channels,
            self.chips_per_channel,
        );
        chip.channel as usize * self.chips_per_channel as usize + chip.chip as usize
    }

    /// Whether an address falls inside this topology.
    pub fn contains(&self, address: &PhysicalPageAddress) -> bool {
        address.channel < self.channels
            && address.chip < self.chips_per_channel
            && address.die < self.dies_per_chip
            && address.plane < self.planes_per_die
            && address.page < self.pages_per_die
    }
}

/// Program/erase suspension policy.
///
/// An in-flight program or erase is only worth suspending when its remaining
/// time is at least the matching threshold; below it, the waiting operation
/// rides out the tail instead of paying the suspend/resume overhead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspensionConfig {
    pub program_suspension_enabled: bool,
    pub erase_suspension_enabled: bool,
    /// Minimum remaining program time for a read to suspend it.
    pub write_reasonable_suspension_for_read: Duration,
    /// Minimum remaining erase time for a read to suspend it.
    pub erase_reasonable_suspension_for_read: Duration,
    /// Minimum remaining erase time for a write to suspend it.
    pub erase_reasonable_suspension_for_write: Duration,
}

impl Default for SuspensionConfig {
    fn default() -> Self {
        Self {
            program_suspension_enabled: true,
            erase_suspension_enabled: true,
            write_reasonable_suspension_for_read: Duration::from_micros(500),
            erase_reasonable_suspension_for_read: Duration::from_micros(700),
            erase_reasonable_suspension_for_write: Duration::from_micros(700),
        }
    }
}

impl SuspensionConfig {
    /// Policy with suspension fully disabled.
    pub fn disabled() -> Self {
        Self {
            program_suspension_enabled: false,
            erase_suspension_enabled: false,
            ..Self::default()
        }
    }
}
