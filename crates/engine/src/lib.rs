//! DRAM physically unclonable function engine.
//!
//! This crate derives device-unique responses from the decay of DRAM cells
//! left unrefreshed for a chosen time. It provides:
//! 1. **Protocol:** The big-endian enrollment wire format and its JSON interchange.
//! 2. **ECC:** Reed-Solomon correction of noisy 32-bit responses over GF(2^8).
//! 3. **Hardware:** Refresh suppression, the software refresh sweep, warm-up and
//!    temperature polling behind the `RegisterBus` and `PhysMemory` traits.
//! 4. **Engine:** The single-owner session state machine and response reconstruction.
//! 5. **Simulation:** In-memory register and DRAM backends with fault injection.

/// Common types (addresses, constants, errors).
pub mod common;
/// Engine configuration (defaults, hierarchical config structures, validation).
pub mod config;
/// Reed-Solomon error correction.
pub mod ecc;
/// Session state machine and response reconstruction.
pub mod engine;
/// Hardware traits, decay region, refresh control, warm-up and thermal polling.
pub mod hw;
/// Enrollment wire protocol and JSON interchange.
pub mod protocol;
/// Virtual-time task scheduler.
pub mod sched;
/// Simulated hardware backends.
pub mod sim;

/// Root configuration type; use `Config::default()` or `Config::from_json`.
pub use crate::config::Config;
/// Device-level error type.
pub use crate::common::PufError;
/// The engine; construct with `PufEngine::new`.
pub use crate::engine::{PufEngine, PufState, SessionHandle};
