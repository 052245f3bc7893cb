//! Refresh suppression and the software refresh sweep.
//!
//! While a decay round runs, hardware auto-refresh is disabled through the
//! EMIF refresh control register and its shadow. Everything else in DRAM must
//! keep its contents, so a periodic sweep reads one word from every row except
//! the rows of the decay region, which is enough to refresh them.
//!
//! This module provides:
//! 1. **Latch:** Read-modify-write of both refresh control registers with an audit log.
//! 2. **Sweep:** A row iterator that skips the decay region, and the sweep pass over it.
//! 3. **Decay lifecycle:** `begin_decay` / `end_decay`, which pair the latch with the
//!    periodic sweep task.
//!
//! When a register access fails the latch becomes [`RefreshLatch::Unknown`].
//! The sweep is then kept running until a later restore succeeds, since DRAM
//! outside the region may no longer be refreshed by the controller.

use tracing::{debug, error, info, warn};

use super::region::DecayRegion;
use super::traits::{PhysMemory, RegisterBus};
use crate::common::{HwError, PhysAddr};
use crate::config::{DramConfig, RefreshConfig};
use crate::sched::{Scheduler, TaskHandle, TaskKind};

/// What the engine knows about the hardware auto-refresh setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshLatch {
    /// Auto-refresh is on in both registers.
    #[default]
    Enabled,
    /// Auto-refresh is off in both registers.
    Suppressed,
    /// A register access failed; the hardware state is not known.
    Unknown,
}

/// Row start addresses of a DRAM range, skipping every row that overlaps a region.
#[derive(Debug, Clone)]
pub struct SweepRows {
    next: Option<u64>,
    last: u64,
    row_size: u64,
    skip_base: u64,
    skip_end: u64,
}

impl SweepRows {
    /// Creates the iterator.
    ///
    /// # Arguments
    ///
    /// * `dram_base` - First row start.
    /// * `dram_end` - Last byte of DRAM (inclusive).
    /// * `row_size` - Stride between rows; must be non-zero.
    /// * `region` - Range never yielded.
    pub fn new(dram_base: u64, dram_end: u64, row_size: u64, region: &DecayRegion) -> Self {
        Self {
            next: (dram_base <= dram_end && row_size > 0).then_some(dram_base),
            last: dram_end,
            row_size,
            skip_base: region.base().val(),
            skip_end: region.end().val(),
        }
    }
}

impl Iterator for SweepRows {
    type Item = PhysAddr;

    fn next(&mut self) -> Option<PhysAddr> {
        loop {
            let row = self.next?;
            if row > self.last {
                self.next = None;
                return None;
            }
            self.next = row.checked_add(self.row_size);
            let overlaps =
                row < self.skip_end && row.saturating_add(self.row_size) > self.skip_base;
            if !overlaps {
                return Some(PhysAddr::new(row));
            }
            // Jump to the first row starting at or after the region end.
            let rows_past = self.skip_end.saturating_sub(row).div_ceil(self.row_size);
            self.next = row.checked_add(rows_past * self.row_size);
        }
    }
}

/// Counters of one sweep pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    /// Rows read.
    pub rows: u64,
    /// Rows whose read failed.
    pub faults: u64,
}

/// Owns the refresh latch and the sweep task for the decay region.
#[derive(Debug)]
pub struct DecayController {
    refresh: RefreshConfig,
    dram: DramConfig,
    latch: RefreshLatch,
    /// Set between `begin_decay` and `end_decay`.
    decaying: bool,
    sweep: Option<TaskHandle>,
    register_faults: u64,
    sweeps: u64,
}

impl DecayController {
    /// Creates a controller; hardware refresh is assumed enabled.
    pub const fn new(dram: DramConfig, refresh: RefreshConfig) -> Self {
        Self {
            refresh,
            dram,
            latch: RefreshLatch::Enabled,
            decaying: false,
            sweep: None,
            register_faults: 0,
            sweeps: 0,
        }
    }

    /// Current latch state.
    pub const fn latch(&self) -> RefreshLatch {
        self.latch
    }

    /// Number of failed refresh register accesses so far.
    pub const fn register_faults(&self) -> u64 {
        self.register_faults
    }

    /// Number of completed sweep passes.
    pub const fn sweeps(&self) -> u64 {
        self.sweeps
    }

    /// Returns `true` while a decay round holds refresh suppressed.
    pub const fn is_decaying(&self) -> bool {
        self.decaying
    }

    /// Returns `true` while the sweep task is armed.
    pub const fn sweep_active(&self) -> bool {
        self.sweep.is_some()
    }

    const fn ctrl(&self) -> PhysAddr {
        PhysAddr::new(self.refresh.ctrl_reg)
    }

    const fn shadow(&self) -> PhysAddr {
        PhysAddr::new(self.refresh.shadow_reg)
    }

    fn latch_fault(&mut self, op: &'static str, err: &HwError) {
        self.latch = RefreshLatch::Unknown;
        self.register_faults += 1;
        error!(op, %err, faults = self.register_faults, "refresh latch state unknown");
    }

    /// Sets the disable bit in the live and shadow refresh control registers.
    ///
    /// If the shadow write fails after the live register was changed, the live
    /// register is rolled back on a best-effort basis. Any failure leaves the
    /// latch [`RefreshLatch::Unknown`].
    pub fn suppress_refresh<R: RegisterBus>(&mut self, regs: &mut R) -> Result<(), HwError> {
        let bit = self.refresh.disable_bit;
        let (ctrl, shadow) = (self.ctrl(), self.shadow());
        let (ctrl_old, ctrl_new) = match regs.set_bits(ctrl, bit) {
            Ok(v) => v,
            Err(err) => {
                self.latch_fault("suppress", &err);
                return Err(err);
            }
        };
        let (shadow_old, shadow_new) = match regs.set_bits(shadow, bit) {
            Ok(v) => v,
            Err(err) => {
                if regs.write_u32(ctrl, ctrl_old).is_err() {
                    warn!(reg = %ctrl, "rollback of refresh control failed");
                }
                self.latch_fault("suppress", &err);
                return Err(err);
            }
        };
        info!(
            rctrl_old = format_args!("{ctrl_old:#010x}"),
            rctrl_new = format_args!("{ctrl_new:#010x}"),
            shdw_old = format_args!("{shadow_old:#010x}"),
            shdw_new = format_args!("{shadow_new:#010x}"),
            "refresh disabled"
        );
        self.latch = RefreshLatch::Suppressed;
        Ok(())
    }

    /// Clears the disable bit in both refresh control registers.
    ///
    /// Both registers are attempted even if the first access fails.
    pub fn restore_refresh<R: RegisterBus>(&mut self, regs: &mut R) -> Result<(), HwError> {
        let bit = self.refresh.disable_bit;
        let ctrl = regs.clear_bits(self.ctrl(), bit);
        let shadow = regs.clear_bits(self.shadow(), bit);
        match (ctrl, shadow) {
            (Ok((ctrl_old, ctrl_new)), Ok((shadow_old, shadow_new))) => {
                info!(
                    rctrl_old = format_args!("{ctrl_old:#010x}"),
                    rctrl_new = format_args!("{ctrl_new:#010x}"),
                    shdw_old = format_args!("{shadow_old:#010x}"),
                    shdw_new = format_args!("{shadow_new:#010x}"),
                    "refresh enabled"
                );
                self.latch = RefreshLatch::Enabled;
                Ok(())
            }
            (Err(err), _) | (_, Err(err)) => {
                self.latch_fault("restore", &err);
                Err(err)
            }
        }
    }

    /// Row starts touched by one sweep pass.
    pub fn sweep_rows(&self, region: &DecayRegion) -> SweepRows {
        SweepRows::new(self.dram.base, self.dram.end, self.dram.row_size(), region)
    }

    /// Reads one word from every DRAM row outside `region`.
    ///
    /// A failed read is counted and the pass continues with the next row.
    pub fn refresh_sweep<M: PhysMemory>(
        &mut self,
        mem: &mut M,
        region: &DecayRegion,
    ) -> SweepReport {
        let mut report = SweepReport::default();
        for row in self.sweep_rows(region) {
            match mem.read_u32(row) {
                Ok(_) => report.rows += 1,
                Err(err) => {
                    if report.faults == 0 {
                        warn!(%err, "refresh sweep read failed");
                    }
                    report.faults += 1;
                }
            }
        }
        self.sweeps += 1;
        debug!(rows = report.rows, faults = report.faults, "refresh sweep");
        report
    }

    fn arm_sweep(&mut self, sched: &mut Scheduler) {
        if self.sweep.is_none() {
            self.sweep = Some(sched.schedule(TaskKind::RefreshSweep, self.refresh.period_ms));
        }
    }

    /// Suppresses refresh and starts the periodic sweep.
    ///
    /// The sweep is started even if suppression failed, so the rest of DRAM
    /// stays refreshed whatever state the hardware ended up in. Calling this
    /// while already decaying does not arm a second sweep.
    pub fn begin_decay<R: RegisterBus>(
        &mut self,
        regs: &mut R,
        sched: &mut Scheduler,
    ) -> Result<(), HwError> {
        self.decaying = true;
        let result = self.suppress_refresh(regs);
        self.arm_sweep(sched);
        result
    }

    /// Restores refresh and cancels the sweep.
    ///
    /// If the restore fails the sweep keeps running; it retries the restore on
    /// each pass until one succeeds.
    pub fn end_decay<R: RegisterBus>(
        &mut self,
        regs: &mut R,
        sched: &mut Scheduler,
    ) -> Result<(), HwError> {
        self.decaying = false;
        self.restore_refresh(regs)?;
        if let Some(handle) = self.sweep.take() {
            let _ = sched.cancel(handle);
        }
        Ok(())
    }

    /// Handles a fired [`TaskKind::RefreshSweep`].
    ///
    /// Re-arms the task first, then sweeps. Outside a decay round with an
    /// unknown latch, a restore is retried and the sweep stops once it succeeds.
    pub fn on_sweep<R: RegisterBus, M: PhysMemory>(
        &mut self,
        regs: &mut R,
        mem: &mut M,
        region: &DecayRegion,
        sched: &mut Scheduler,
    ) -> Option<SweepReport> {
        self.sweep = None;
        if !self.decaying
            && (self.latch == RefreshLatch::Enabled || self.restore_refresh(regs).is_ok())
        {
            return None;
        }
        self.arm_sweep(sched);
        Some(self.refresh_sweep(mem, region))
    }

    /// Drops the sweep task without touching the registers.
    pub fn cancel_sweep(&mut self, sched: &mut Scheduler) {
        if let Some(handle) = self.sweep.take() {
            let _ = sched.cancel(handle);
        }
    }
}
