use drampuf_core::common::{HwError, PhysAddr};
use drampuf_core::hw::RegisterBus;
use mockall::mock;

mock! {
    pub Registers {}
    impl RegisterBus for Registers {
        fn read_u32(&mut self, addr: PhysAddr) -> Result<u32, HwError>;
        fn write_u32(&mut self, addr: PhysAddr, val: u32) -> Result<(), HwError>;
    }
}

/// A bus on which every access to `addr` fails and nothing is ever written.
pub fn dead_register(addr: PhysAddr) -> MockRegisters {
    let mut regs = MockRegisters::new();
    let _ = regs
        .expect_read_u32()
        .returning(move |_| Err(HwError::RegisterAccess { addr }));
    let _ = regs.expect_write_u32().never();
    regs
}
