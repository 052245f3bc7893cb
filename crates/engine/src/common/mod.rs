//! Common utilities and types used throughout the PUF engine.
//!
//! This module provides the building blocks shared by every component. It includes:
//! 1. **Address Types:** A strong type for physical addresses.
//! 2. **Constants:** Response width, cell pointer layout and wire field widths.
//! 3. **Error Handling:** Protocol, ECC, hardware, configuration and device errors.

/// Physical address type.
pub mod addr;

/// Constants shared by the codec, reconstructor and engine.
pub mod constants;

/// Error types.
pub mod error;

pub use addr::PhysAddr;
pub use error::{ConfigError, EccError, HwError, ProtocolError, PufError};
