//! Configuration system for the PUF engine.
//!
//! This module defines all configuration structures used to parameterize the engine. It provides:
//! 1. **Defaults:** Baseline hardware constants for the AM335x EMIF and control module.
//! 2. **Structures:** Hierarchical config for DRAM geometry, the decay region, refresh control,
//!    warm-up, temperature polling and session behavior.
//! 3. **Validation:** Region size, alignment and placement checks performed before startup.
//!
//! Configuration is supplied as JSON by the driver glue, or use `Config::default()`.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::common::{ConfigError, PhysAddr};

/// Default configuration constants for the engine.
///
/// These values describe a BeagleBone Black (AM335x, 512 MiB DDR3) when not
/// explicitly overridden.
mod defaults {
    /// First DRAM address visible to the CPU.
    pub const DDR_BASE: u64 = 0x8000_0000;

    /// Last DRAM address visible to the CPU (inclusive).
    pub const DDR_END: u64 = 0x9FDF_FFFF;

    /// CPU word size in bytes.
    pub const WORD_BYTES: u64 = 4;

    /// Words per DRAM page; row size is `WORD_BYTES * PAGE_WORDS`.
    pub const PAGE_WORDS: u64 = 1 << 9;

    /// Size of the decay region (64 KiB).
    pub const REGION_SIZE: u64 = 64 * 1024;

    /// Period of the software refresh sweep in milliseconds.
    pub const REFRESH_PERIOD_MS: u64 = 55;

    /// EMIF0 SDRAM refresh control register.
    pub const SDRAM_REF_CTRL: u64 = 0x4C00_0010;

    /// EMIF0 SDRAM refresh control shadow register.
    pub const SDRAM_REF_CTRL_SHDW: u64 = 0x4C00_0014;

    /// Bit that disables hardware auto-refresh in both control registers.
    pub const DISABLE_REFRESH: u32 = 1 << 31;

    /// Number of zero-and-decay cycles before the device accepts sessions.
    pub const WARM_UP_RETRIES: u32 = 3;

    /// Decay period of each warm-up cycle in milliseconds.
    pub const WARM_UP_SETTLE_MS: u64 = 10_000;

    /// Control module bandgap (temperature sensor) register.
    pub const BANDGAP_CTRL: u64 = 0x44E1_0448;

    /// Temperature poll period in milliseconds.
    pub const TEMP_POLL_PERIOD_MS: u64 = 2_000;

    /// Largest enrollment accepted by a single `write` (64 KiB).
    pub const MAX_ENROLLMENT_BYTES: usize = 64 * 1024;
}

/// What happens after the last enrollment record has been read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum EndOfList {
    /// Wrap to the first record and keep cycling through the challenges.
    #[default]
    Restart,
    /// Release the session so another client can open the device.
    Release,
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use drampuf_core::config::{Config, EndOfList};
///
/// let json = r#"{
///     "region": { "size": 131072, "phys_base": 2415919104 },
///     "refresh": { "period_ms": 64 },
///     "session": { "end_of_list": "Release" }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.region.size, 128 * 1024);
/// assert_eq!(config.refresh.period_ms, 64);
/// assert_eq!(config.session.end_of_list, EndOfList::Release);
/// assert_eq!(config.dram.row_size(), 2048);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// DRAM geometry and the range covered by the refresh sweep.
    pub dram: DramConfig,
    /// The decay region owned by the PUF.
    pub region: RegionConfig,
    /// Refresh control registers and sweep period.
    pub refresh: RefreshConfig,
    /// Warm-up phase before the first session.
    pub warm_up: WarmUpConfig,
    /// Temperature polling.
    pub thermal: ThermalConfig,
    /// Session behavior.
    pub session: SessionConfig,
}

impl Config {
    /// Parses a configuration from JSON; missing sections take their defaults.
    ///
    /// # Arguments
    ///
    /// * `json` - Configuration text.
    ///
    /// # Returns
    ///
    /// The parsed and validated configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Checks DRAM geometry and region size, alignment and placement.
    ///
    /// A caller-supplied base must be row aligned and the whole region must fit
    /// inside `[dram.base, dram.end]`, otherwise the refresh sweep could not
    /// skip it cleanly.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let row_size = self.dram.row_size();
        if row_size == 0 {
            return Err(ConfigError::Geometry("row size is zero".into()));
        }
        if self.dram.end < self.dram.base {
            return Err(ConfigError::Geometry(format!(
                "DRAM end {:#x} precedes base {:#x}",
                self.dram.end, self.dram.base
            )));
        }
        if self.region.size == 0 || self.region.size % row_size != 0 {
            return Err(ConfigError::RegionSize {
                size: self.region.size,
                row_size,
            });
        }
        if let Some(base) = self.region.phys_base {
            self.check_placement(PhysAddr::new(base))?;
        }
        Ok(())
    }

    /// Checks that a region starting at `base` is row aligned and inside DRAM.
    pub fn check_placement(&self, base: PhysAddr) -> Result<(), ConfigError> {
        let row_size = self.dram.row_size();
        if !base.is_aligned(row_size) {
            return Err(ConfigError::RegionAlignment { base, row_size });
        }
        let last = base.val().checked_add(self.region.size - 1);
        match last {
            Some(last) if base.val() >= self.dram.base && last <= self.dram.end => Ok(()),
            _ => Err(ConfigError::RegionPlacement {
                base,
                size: self.region.size,
                dram_base: PhysAddr::new(self.dram.base),
                dram_end: PhysAddr::new(self.dram.end),
            }),
        }
    }
}

/// DRAM geometry.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DramConfig {
    /// First DRAM address swept by the software refresh.
    pub base: u64,
    /// Last DRAM address swept by the software refresh (inclusive).
    pub end: u64,
    /// CPU word size in bytes.
    pub word_bytes: u64,
    /// Words per DRAM page.
    pub page_words: u64,
}

impl DramConfig {
    /// Returns the row size in bytes (word size times page size).
    pub const fn row_size(&self) -> u64 {
        self.word_bytes * self.page_words
    }
}

impl Default for DramConfig {
    fn default() -> Self {
        Self {
            base: defaults::DDR_BASE,
            end: defaults::DDR_END,
            word_bytes: defaults::WORD_BYTES,
            page_words: defaults::PAGE_WORDS,
        }
    }
}

/// The decay region.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Region size in bytes; must be a multiple of the row size.
    pub size: u64,
    /// Caller-supplied physical base. When absent the engine allocates the
    /// region itself and frees it on teardown.
    pub phys_base: Option<u64>,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            size: defaults::REGION_SIZE,
            phys_base: None,
        }
    }
}

/// Refresh control.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Software refresh sweep period in milliseconds.
    pub period_ms: u64,
    /// Live refresh control register.
    pub ctrl_reg: u64,
    /// Shadow refresh control register.
    pub shadow_reg: u64,
    /// Bit that disables auto-refresh when set.
    pub disable_bit: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            period_ms: defaults::REFRESH_PERIOD_MS,
            ctrl_reg: defaults::SDRAM_REF_CTRL,
            shadow_reg: defaults::SDRAM_REF_CTRL_SHDW,
            disable_bit: defaults::DISABLE_REFRESH,
        }
    }
}

/// Warm-up phase.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WarmUpConfig {
    /// Number of zero-and-decay cycles. Zero skips warm-up.
    pub retries: u32,
    /// Decay period of each cycle in milliseconds.
    pub settle_ms: u64,
}

impl Default for WarmUpConfig {
    fn default() -> Self {
        Self {
            retries: defaults::WARM_UP_RETRIES,
            settle_ms: defaults::WARM_UP_SETTLE_MS,
        }
    }
}

/// Temperature polling.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThermalConfig {
    /// Poll the bandgap sensor while the engine runs.
    pub enabled: bool,
    /// Bandgap control register.
    pub bandgap_reg: u64,
    /// Poll period in milliseconds.
    pub poll_period_ms: u64,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bandgap_reg: defaults::BANDGAP_CTRL,
            poll_period_ms: defaults::TEMP_POLL_PERIOD_MS,
        }
    }
}

/// Session behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Behavior once the last record has been consumed.
    pub end_of_list: EndOfList,
    /// Largest enrollment accepted by a single write.
    pub max_enrollment_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            end_of_list: EndOfList::Restart,
            max_enrollment_bytes: defaults::MAX_ENROLLMENT_BYTES,
        }
    }
}
