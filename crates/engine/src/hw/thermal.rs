//! Bandgap temperature sensor polling.
//!
//! Temperature is an auxiliary signal: decay speed depends on it, so the
//! driver keeps a running sum of the sensor readings taken while it is loaded.
//! Nothing in the response path depends on these values.

use tracing::{info, warn};

use super::traits::RegisterBus;
use crate::common::{HwError, PhysAddr};
use crate::config::ThermalConfig;
use crate::sched::{Scheduler, TaskHandle, TaskKind};

/// Temperature field of the bandgap control register.
pub const DTEMP_MASK: u32 = 0x0000_FF00;
/// Bit offset of the temperature field.
pub const DTEMP_SHIFT: u32 = 8;
/// Powers the sensor down.
pub const TMPOFF: u32 = 1 << 5;
/// Starts a conversion.
pub const SOC: u32 = 1 << 4;
/// Releases the sensor from reset.
pub const CLRZ: u32 = 1 << 3;
/// Continuous conversion mode.
pub const CONTCONV: u32 = 1 << 2;

/// Accumulates bandgap readings on a fixed period.
#[derive(Debug)]
pub struct ThermalMonitor {
    reg: PhysAddr,
    period_ms: u64,
    task: Option<TaskHandle>,
    total: u64,
    polls: u64,
    faults: u64,
}

impl ThermalMonitor {
    /// Creates a stopped monitor.
    pub const fn new(config: &ThermalConfig) -> Self {
        Self {
            reg: PhysAddr::new(config.bandgap_reg),
            period_ms: config.poll_period_ms,
            task: None,
            total: 0,
            polls: 0,
            faults: 0,
        }
    }

    /// Switches the sensor to continuous conversion and schedules the first poll.
    pub fn start<R: RegisterBus>(
        &mut self,
        regs: &mut R,
        sched: &mut Scheduler,
    ) -> Result<(), HwError> {
        regs.write_u32(self.reg, SOC | CLRZ | CONTCONV)?;
        if self.task.is_none() {
            self.task = Some(sched.schedule(TaskKind::TemperaturePoll, self.period_ms));
        }
        Ok(())
    }

    /// Handles a fired [`TaskKind::TemperaturePoll`]: re-arms, then samples.
    pub fn poll<R: RegisterBus>(&mut self, regs: &mut R, sched: &mut Scheduler) {
        self.task = Some(sched.schedule(TaskKind::TemperaturePoll, self.period_ms));
        match regs.read_u32(self.reg) {
            Ok(ctrl) => {
                self.total += u64::from((ctrl & DTEMP_MASK) >> DTEMP_SHIFT);
                self.polls += 1;
            }
            Err(err) => {
                self.faults += 1;
                warn!(%err, "temperature poll failed");
            }
        }
    }

    /// Cancels polling and powers the sensor down.
    pub fn stop<R: RegisterBus>(
        &mut self,
        regs: &mut R,
        sched: &mut Scheduler,
    ) -> Result<(), HwError> {
        if let Some(handle) = self.task.take() {
            let _ = sched.cancel(handle);
        }
        info!(total = self.total, polls = self.polls, "temperature polling stopped");
        regs.write_u32(self.reg, TMPOFF)
    }

    /// Returns `true` while a poll is scheduled.
    pub const fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Sum of all readings.
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Number of successful readings.
    pub const fn polls(&self) -> u64 {
        self.polls
    }

    /// Number of failed readings.
    pub const fn faults(&self) -> u64 {
        self.faults
    }

    /// Mean reading in sensor units, if any reading was taken.
    pub fn average(&self) -> Option<f64> {
        (self.polls > 0).then(|| self.total as f64 / self.polls as f64)
    }
}
