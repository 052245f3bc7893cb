//! Warm-up before the first session.
//!
//! Freshly written DRAM cells show a bias toward their initial value for the
//! first few decay cycles. Warm-up zeroes the region and lets it decay for a
//! settle period, `retries` times in a row, with refresh suppressed for the
//! whole phase. After the last cycle refresh is restored once and the device
//! starts accepting sessions.

use tracing::{debug, info, warn};

use super::refresh::DecayController;
use super::region::DecayRegion;
use super::traits::{PhysMemory, RegisterBus};
use crate::config::WarmUpConfig;
use crate::sched::{Scheduler, TaskHandle, TaskKind};

/// Result of a warm-up step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmUpProgress {
    /// Another settle cycle is running.
    Settling {
        /// Cycles left, including the one just started.
        remaining: u32,
    },
    /// Warm-up is over and refresh has been restored.
    Complete,
}

/// Hardware the warm-up cycles operate on.
#[derive(Debug)]
pub struct WarmUpContext<'a, R, M> {
    /// Refresh control registers.
    pub regs: &'a mut R,
    /// Physical DRAM.
    pub mem: &'a mut M,
    /// Region to condition.
    pub region: &'a DecayRegion,
    /// Refresh latch and sweep.
    pub decay: &'a mut DecayController,
    /// Timer queue.
    pub sched: &'a mut Scheduler,
}

/// Counts down the warm-up cycles.
#[derive(Debug)]
pub struct WarmUp {
    remaining: u32,
    settle_ms: u64,
    task: Option<TaskHandle>,
}

impl WarmUp {
    /// Creates an idle warm-up with the configured number of cycles.
    pub const fn new(config: &WarmUpConfig) -> Self {
        Self {
            remaining: config.retries,
            settle_ms: config.settle_ms,
            task: None,
        }
    }

    /// Cycles left.
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Returns `true` while a settle timer is pending.
    pub const fn is_running(&self) -> bool {
        self.task.is_some()
    }

    fn cycle<R: RegisterBus, M: PhysMemory>(&mut self, ctx: &mut WarmUpContext<'_, R, M>) {
        if let Err(err) = ctx.mem.zero(ctx.region.base(), ctx.region.size()) {
            warn!(%err, "warm-up zeroing failed");
        }
        self.task = Some(ctx.sched.schedule(TaskKind::WarmUpSettle, self.settle_ms));
        debug!(remaining = self.remaining, "warm-up cycle");
    }

    /// Starts the first cycle, or completes at once when no cycles are configured.
    pub fn start<R: RegisterBus, M: PhysMemory>(
        &mut self,
        ctx: &mut WarmUpContext<'_, R, M>,
    ) -> WarmUpProgress {
        if self.remaining == 0 {
            info!("warm-up skipped");
            return WarmUpProgress::Complete;
        }
        info!(cycles = self.remaining, settle_ms = self.settle_ms, "warm-up started");
        // Failures are recorded on the latch; the sweep runs regardless.
        let _ = ctx.decay.begin_decay(ctx.regs, ctx.sched);
        self.cycle(ctx);
        WarmUpProgress::Settling {
            remaining: self.remaining,
        }
    }

    /// Handles a fired [`TaskKind::WarmUpSettle`].
    pub fn on_settle<R: RegisterBus, M: PhysMemory>(
        &mut self,
        ctx: &mut WarmUpContext<'_, R, M>,
    ) -> WarmUpProgress {
        self.task = None;
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            self.cycle(ctx);
            return WarmUpProgress::Settling {
                remaining: self.remaining,
            };
        }
        let _ = ctx.decay.end_decay(ctx.regs, ctx.sched);
        info!("warm-up complete");
        WarmUpProgress::Complete
    }

    /// Abandons warm-up; the caller is responsible for ending the decay.
    pub fn cancel(&mut self, sched: &mut Scheduler) {
        if let Some(handle) = self.task.take() {
            let _ = sched.cancel(handle);
        }
        self.remaining = 0;
    }
}
