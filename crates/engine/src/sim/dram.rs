//! Simulated physical DRAM.
//!
//! A flat byte array mapped at a physical base address, stored little-endian
//! like the AM335x. It provides:
//! 1. **Access:** Checked 16/32-bit reads and writes with fault injection.
//! 2. **Allocation:** A bump allocator standing in for contiguous page allocation.
//! 3. **Access log:** Every 32-bit read is recorded so tests can check which rows a
//!    refresh sweep touched.

use std::collections::HashSet;

use crate::common::{HwError, PhysAddr};
use crate::hw::PhysMemory;

/// Byte-backed DRAM.
#[derive(Debug, Clone)]
pub struct SimDram {
    base: PhysAddr,
    data: Vec<u8>,
    next_free: u64,
    allocations: Vec<(PhysAddr, u64)>,
    faults: HashSet<PhysAddr>,
    reads: Vec<PhysAddr>,
}

impl SimDram {
    /// Creates zeroed DRAM of `size` bytes at `base`.
    pub fn new(base: PhysAddr, size: usize) -> Self {
        Self::from_image(base, vec![0; size])
    }

    /// Maps an existing image, such as a region dump, at `base`.
    pub fn from_image(base: PhysAddr, data: Vec<u8>) -> Self {
        Self {
            base,
            data,
            next_free: 0,
            allocations: Vec::new(),
            faults: HashSet::new(),
            reads: Vec::new(),
        }
    }

    /// First mapped address.
    pub const fn base(&self) -> PhysAddr {
        self.base
    }

    /// Mapped size in bytes.
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing is mapped.
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Makes every access covering `addr` fail.
    pub fn inject_fault(&mut self, addr: PhysAddr) {
        let _ = self.faults.insert(addr);
    }

    /// Removes all injected faults.
    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    /// Addresses of all 32-bit reads since the last [`SimDram::clear_reads`].
    pub fn reads(&self) -> &[PhysAddr] {
        &self.reads
    }

    /// Clears the read log.
    pub fn clear_reads(&mut self) {
        self.reads.clear();
    }

    /// Live allocations as `(base, size)`.
    pub fn allocations(&self) -> &[(PhysAddr, u64)] {
        &self.allocations
    }

    /// Borrows `len` bytes at `addr`.
    pub fn bytes(&self, addr: PhysAddr, len: usize) -> Result<&[u8], HwError> {
        let start = self.index(addr, len)?;
        Ok(&self.data[start..start + len])
    }

    /// Writes a 16-bit word, e.g. to plant a decayed cell pattern.
    pub fn write_u16(&mut self, addr: PhysAddr, val: u16) -> Result<(), HwError> {
        let start = self.index(addr, 2)?;
        self.data[start..start + 2].copy_from_slice(&val.to_le_bytes());
        Ok(())
    }

    /// Copies `bytes` to `addr`.
    pub fn write_bytes(&mut self, addr: PhysAddr, bytes: &[u8]) -> Result<(), HwError> {
        let start = self.index(addr, bytes.len())?;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn index(&self, addr: PhysAddr, len: usize) -> Result<usize, HwError> {
        let err = HwError::MemoryAccess { addr };
        let offset = addr.val().checked_sub(self.base.val()).ok_or_else(|| err.clone())?;
        let start = usize::try_from(offset).map_err(|_| err.clone())?;
        if start.checked_add(len).is_none_or(|end| end > self.data.len()) {
            return Err(err);
        }
        let faulted = (0..len as u64).any(|i| self.faults.contains(&addr.offset(i)));
        if faulted {
            return Err(err);
        }
        Ok(start)
    }
}

impl PhysMemory for SimDram {
    fn read_u16(&mut self, addr: PhysAddr) -> Result<u16, HwError> {
        let start = self.index(addr, 2)?;
        Ok(u16::from_le_bytes([self.data[start], self.data[start + 1]]))
    }

    fn read_u32(&mut self, addr: PhysAddr) -> Result<u32, HwError> {
        let start = self.index(addr, 4)?;
        self.reads.push(addr);
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.data[start..start + 4]);
        Ok(u32::from_le_bytes(word))
    }

    fn write_u32(&mut self, addr: PhysAddr, val: u32) -> Result<(), HwError> {
        let start = self.index(addr, 4)?;
        self.data[start..start + 4].copy_from_slice(&val.to_le_bytes());
        Ok(())
    }

    fn zero(&mut self, base: PhysAddr, size: u64) -> Result<(), HwError> {
        let len = usize::try_from(size).map_err(|_| HwError::MemoryAccess { addr: base })?;
        let start = self.index(base, len)?;
        self.data[start..start + len].fill(0);
        Ok(())
    }

    fn allocate_contiguous(&mut self, size: u64, align: u64) -> Result<PhysAddr, HwError> {
        let failed = HwError::AllocationFailed { size };
        let align = align.max(1);
        let start = self
            .base
            .val()
            .checked_add(self.next_free)
            .and_then(|a| a.checked_next_multiple_of(align))
            .ok_or_else(|| failed.clone())?;
        let end = start.checked_add(size).ok_or_else(|| failed.clone())?;
        if size == 0 || end > self.base.val() + self.data.len() as u64 {
            return Err(failed);
        }
        self.next_free = end - self.base.val();
        let base = PhysAddr::new(start);
        self.allocations.push((base, size));
        Ok(base)
    }

    fn free_contiguous(&mut self, base: PhysAddr, size: u64) {
        self.allocations.retain(|&(b, s)| (b, s) != (base, size));
        if base.val() + size == self.base.val() + self.next_free {
            self.next_free = base.val() - self.base.val();
        }
    }
}
