use drampuf_core::common::PhysAddr;
use drampuf_core::config::Config;
use drampuf_core::sim::{SimDram, SimRegisters};
use drampuf_core::{PufEngine, SessionHandle};
use tracing_subscriber::EnvFilter;

/// First address of the simulated DRAM.
pub const DRAM_BASE: u64 = 0x8000_0000;
/// Size of the simulated DRAM (32 rows of 2 KiB).
pub const DRAM_SIZE: u64 = 64 * 1024;
/// Size of the decay region (4 rows).
pub const REGION_SIZE: u64 = 8 * 1024;

pub type SimEngine = PufEngine<SimRegisters, SimDram>;

/// Routes engine logs to the test output; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A small board: 64 KiB of DRAM, an 8 KiB region, no warm-up and no
/// temperature polling.
pub fn small_config() -> Config {
    let mut config = Config::default();
    config.dram.base = DRAM_BASE;
    config.dram.end = DRAM_BASE + DRAM_SIZE - 1;
    config.region.size = REGION_SIZE;
    config.warm_up.retries = 0;
    config.thermal.enabled = false;
    config
}

pub fn sim_dram() -> SimDram {
    SimDram::new(PhysAddr::new(DRAM_BASE), DRAM_SIZE as usize)
}

pub struct TestContext {
    pub engine: SimEngine,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(small_config())
    }

    pub fn with_config(config: Config) -> Self {
        init_tracing();
        let engine = PufEngine::new(config, SimRegisters::new(), sim_dram())
            .expect("engine bring-up failed");
        Self { engine }
    }

    /// Opens a session and submits `blob`.
    pub fn enroll(&mut self, blob: &[u8]) -> SessionHandle {
        let handle = self.engine.open().expect("open failed");
        let written = self.engine.write(handle, blob).expect("enrollment rejected");
        assert_eq!(written, blob.len());
        handle
    }

    /// Reads one response, returning the byte count and the big-endian value.
    pub fn read(&mut self, handle: SessionHandle) -> (usize, u32) {
        let mut buf = [0u8; 4];
        let n = self.engine.read(handle, &mut buf).expect("read failed");
        (n, u32::from_be_bytes(buf))
    }

    pub fn region_base(&self) -> PhysAddr {
        self.engine.region().base()
    }

    pub fn ctrl_value(&self) -> u32 {
        let reg = PhysAddr::new(self.engine.config().refresh.ctrl_reg);
        self.engine.registers().value(reg)
    }

    pub fn shadow_value(&self) -> u32 {
        let reg = PhysAddr::new(self.engine.config().refresh.shadow_reg);
        self.engine.registers().value(reg)
    }
}
