//! The physical memory left to decay.

use std::fmt;

use crate::common::constants::CELL_WORD_BYTES;
use crate::common::{PhysAddr, PufError};
use crate::protocol::CellPointer;

/// Who owns the backing memory of a [`DecayRegion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionOrigin {
    /// Allocated by the engine; freed on shutdown.
    Allocated,
    /// Supplied through configuration; never freed by the engine.
    CallerSupplied,
}

/// A row-aligned range of DRAM excluded from refresh while a decay round runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecayRegion {
    base: PhysAddr,
    size: u64,
    origin: RegionOrigin,
}

impl DecayRegion {
    /// Describes a region; placement is checked by `Config::check_placement`.
    pub const fn new(base: PhysAddr, size: u64, origin: RegionOrigin) -> Self {
        Self { base, size, origin }
    }

    /// First byte of the region.
    pub const fn base(&self) -> PhysAddr {
        self.base
    }

    /// Size in bytes.
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// One past the last byte of the region.
    pub const fn end(&self) -> PhysAddr {
        self.base.offset(self.size)
    }

    /// Whether the engine must free the memory on shutdown.
    pub const fn origin(&self) -> RegionOrigin {
        self.origin
    }

    /// Returns `true` if `[addr, addr + len)` intersects the region.
    pub const fn overlaps(&self, addr: PhysAddr, len: u64) -> bool {
        addr.val() < self.end().val() && addr.val().saturating_add(len) > self.base.val()
    }

    /// Resolves a cell pointer to the address of its 16-bit word.
    ///
    /// Fails with [`PufError::CellOutOfRange`] when the word does not lie
    /// entirely inside the region.
    pub const fn cell_addr(&self, pointer: CellPointer) -> Result<PhysAddr, PufError> {
        let offset = pointer.byte_offset();
        if offset + CELL_WORD_BYTES > self.size {
            return Err(PufError::CellOutOfRange { pointer: pointer.0 });
        }
        Ok(self.base.offset(offset))
    }
}

impl fmt::Display for DecayRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}) {:?}", self.base, self.end(), self.origin)
    }
}
