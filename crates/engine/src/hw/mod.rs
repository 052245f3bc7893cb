//! Hardware side of the engine.
//!
//! This module provides:
//! 1. **Traits:** `RegisterBus` and `PhysMemory`, the only way the engine touches hardware.
//! 2. **Region:** The decay region and its cell addressing.
//! 3. **Refresh:** Refresh suppression, the software sweep and the decay lifecycle.
//! 4. **Warm-up:** Conditioning cycles run before the first session.
//! 5. **Thermal:** Bandgap temperature polling.

/// Decay region description.
pub mod region;
/// Refresh latch and sweep.
pub mod refresh;
/// Temperature sensor polling.
pub mod thermal;
/// Register and memory access traits.
pub mod traits;
/// Warm-up cycles.
pub mod warmup;

pub use region::{DecayRegion, RegionOrigin};
pub use refresh::{DecayController, RefreshLatch, SweepReport, SweepRows};
pub use thermal::ThermalMonitor;
pub use traits::{PhysMemory, RegisterBus};
pub use warmup::{WarmUp, WarmUpContext, WarmUpProgress};
