//! Simulated register file.

use std::collections::{HashMap, HashSet};

use crate::common::{HwError, PhysAddr};
use crate::hw::RegisterBus;

/// Direction of an access for fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Register read.
    Read,
    /// Register write.
    Write,
}

/// Sparse 32-bit register file; unwritten registers read as zero.
#[derive(Debug, Default, Clone)]
pub struct SimRegisters {
    regs: HashMap<PhysAddr, u32>,
    faults: HashSet<(PhysAddr, Access)>,
    writes: Vec<(PhysAddr, u32)>,
}

impl SimRegisters {
    /// Creates an empty register file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a register without recording a write.
    pub fn preset(&mut self, addr: PhysAddr, val: u32) {
        let _ = self.regs.insert(addr, val);
    }

    /// Current value of a register.
    pub fn value(&self, addr: PhysAddr) -> u32 {
        self.regs.get(&addr).copied().unwrap_or(0)
    }

    /// Makes every subsequent `access` to `addr` fail.
    pub fn inject_fault(&mut self, addr: PhysAddr, access: Access) {
        let _ = self.faults.insert((addr, access));
    }

    /// Removes all injected faults.
    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    /// Writes performed through [`RegisterBus::write_u32`], oldest first.
    pub fn writes(&self) -> &[(PhysAddr, u32)] {
        &self.writes
    }

    fn check(&self, addr: PhysAddr, access: Access) -> Result<(), HwError> {
        if self.faults.contains(&(addr, access)) {
            return Err(HwError::RegisterAccess { addr });
        }
        Ok(())
    }
}

impl RegisterBus for SimRegisters {
    fn read_u32(&mut self, addr: PhysAddr) -> Result<u32, HwError> {
        self.check(addr, Access::Read)?;
        Ok(self.value(addr))
    }

    fn write_u32(&mut self, addr: PhysAddr, val: u32) -> Result<(), HwError> {
        self.check(addr, Access::Write)?;
        let _ = self.regs.insert(addr, val);
        self.writes.push((addr, val));
        Ok(())
    }
}
