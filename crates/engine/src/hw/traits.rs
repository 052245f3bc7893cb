//! Hardware access traits.
//!
//! The engine never touches hardware directly. It is generic over:
//! 1. **RegisterBus:** 32-bit memory-mapped control registers (EMIF refresh
//!    control, control module bandgap sensor).
//! 2. **PhysMemory:** Physical DRAM reads and writes plus contiguous allocation
//!    of the decay region.
//!
//! Every access is fallible; a failed translation or mapping surfaces as
//! [`HwError`] instead of a panic. Implementors must be `Send` so an engine
//! can be moved onto the thread that drives its timers.

use crate::common::{HwError, PhysAddr};

/// Memory-mapped 32-bit register access.
pub trait RegisterBus: Send {
    /// Reads the register at `addr`.
    fn read_u32(&mut self, addr: PhysAddr) -> Result<u32, HwError>;

    /// Writes `val` to the register at `addr`.
    fn write_u32(&mut self, addr: PhysAddr, val: u32) -> Result<(), HwError>;

    /// Sets the bits of `mask` and returns the previous and new values.
    fn set_bits(&mut self, addr: PhysAddr, mask: u32) -> Result<(u32, u32), HwError> {
        let old = self.read_u32(addr)?;
        let new = old | mask;
        self.write_u32(addr, new)?;
        Ok((old, new))
    }

    /// Clears the bits of `mask` and returns the previous and new values.
    fn clear_bits(&mut self, addr: PhysAddr, mask: u32) -> Result<(u32, u32), HwError> {
        let old = self.read_u32(addr)?;
        let new = old & !mask;
        self.write_u32(addr, new)?;
        Ok((old, new))
    }
}

/// Physical DRAM access.
pub trait PhysMemory: Send {
    /// Reads the 16-bit word at `addr`.
    fn read_u16(&mut self, addr: PhysAddr) -> Result<u16, HwError>;

    /// Reads the 32-bit word at `addr`.
    fn read_u32(&mut self, addr: PhysAddr) -> Result<u32, HwError>;

    /// Writes the 32-bit word at `addr`.
    fn write_u32(&mut self, addr: PhysAddr, val: u32) -> Result<(), HwError>;

    /// Zeroes `size` bytes starting at `base`.
    ///
    /// The default implementation writes one word at a time.
    fn zero(&mut self, base: PhysAddr, size: u64) -> Result<(), HwError> {
        let mut offset = 0;
        while offset < size {
            self.write_u32(base.offset(offset), 0)?;
            offset += 4;
        }
        Ok(())
    }

    /// Allocates `size` bytes of physically contiguous memory.
    ///
    /// # Returns
    ///
    /// The physical base of the allocation, aligned to `align` bytes.
    fn allocate_contiguous(&mut self, size: u64, align: u64) -> Result<PhysAddr, HwError>;

    /// Returns memory obtained from [`PhysMemory::allocate_contiguous`].
    fn free_contiguous(&mut self, base: PhysAddr, size: u64);
}
