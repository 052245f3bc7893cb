//! Physical address type.
//!
//! This module defines the strong type used for every physical location the engine touches. It provides:
//! 1. **Type Safety:** Keeps physical addresses apart from byte counts and block indices.
//! 2. **Address Arithmetic:** Offsetting, row alignment and range checks used by the refresh sweep.
//! 3. **Register Access:** MMIO register addresses share the same type as DRAM addresses.

use std::fmt;

/// A physical address on the memory bus.
///
/// Used both for DRAM locations (PUF region, refresh sweep rows) and for
/// memory-mapped controller registers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PhysAddr(pub u64);

impl PhysAddr {
    /// Creates a new physical address from a raw 64-bit value.
    ///
    /// # Arguments
    ///
    /// * `addr` - The raw 64-bit address value.
    ///
    /// # Returns
    ///
    /// A new `PhysAddr` instance wrapping the provided address.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(&self) -> u64 {
        self.0
    }

    /// Returns the address `bytes` past this one, saturating at the top of the address space.
    #[inline]
    pub const fn offset(&self, bytes: u64) -> Self {
        Self(self.0.saturating_add(bytes))
    }

    /// Returns `true` if the address is a multiple of `align`.
    ///
    /// An alignment of zero is treated as "no constraint".
    pub const fn is_aligned(&self, align: u64) -> bool {
        align == 0 || self.0 % align == 0
    }

    /// Returns `true` if the address lies in `[base, base + size)`.
    ///
    /// # Arguments
    ///
    /// * `base` - First address of the range.
    /// * `size` - Length of the range in bytes.
    pub const fn within(&self, base: Self, size: u64) -> bool {
        self.0 >= base.0 && self.0 - base.0 < size
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl From<u64> for PhysAddr {
    fn from(addr: u64) -> Self {
        Self(addr)
    }
}
