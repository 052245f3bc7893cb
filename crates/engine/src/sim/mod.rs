//! Simulated hardware backends.
//!
//! In-memory implementations of [`RegisterBus`](crate::hw::RegisterBus) and
//! [`PhysMemory`](crate::hw::PhysMemory). They back the test suite and the
//! offline `pufctl verify` replay of region dumps, and both support fault
//! injection so hardware failure paths can be exercised.

/// Byte-backed DRAM.
pub mod dram;
/// Sparse register file.
pub mod registers;

pub use dram::SimDram;
pub use registers::{Access, SimRegisters};
