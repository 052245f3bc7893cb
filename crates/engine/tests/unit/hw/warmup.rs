//! # Warm-Up Tests
//!
//! The device conditions its region with repeated zero-and-decay cycles
//! before the first session, holding refresh suppressed throughout.

use drampuf_core::PufError;
use drampuf_core::common::PhysAddr;
use drampuf_core::config::{Config, WarmUpConfig};
use drampuf_core::engine::PufState;
use drampuf_core::hw::{
    DecayController, DecayRegion, RefreshLatch, RegionOrigin, WarmUp, WarmUpContext,
    WarmUpProgress,
};
use drampuf_core::sched::{Scheduler, TaskKind};
use drampuf_core::sim::{SimDram, SimRegisters};
use pretty_assertions::assert_eq;

use crate::common::harness::{TestContext, small_config};

const SETTLE_MS: u64 = 10_000;

fn warm_up_config(retries: u32) -> Config {
    let mut config = small_config();
    config.warm_up = WarmUpConfig {
        retries,
        settle_ms: SETTLE_MS,
    };
    config
}

#[test]
fn sessions_are_refused_while_warming_up() {
    let mut ctx = TestContext::with_config(warm_up_config(2));
    assert_eq!(ctx.engine.state(), PufState::WarmingUp);
    assert!(matches!(ctx.engine.open(), Err(PufError::AlreadyOwned)));
    assert_eq!(ctx.engine.decay().latch(), RefreshLatch::Suppressed);
    assert_eq!(ctx.engine.scheduler().pending_of(TaskKind::WarmUpSettle), 1);
    assert_eq!(ctx.engine.scheduler().pending_of(TaskKind::RefreshSweep), 1);
}

#[test]
fn refresh_stays_suppressed_across_cycles() {
    let mut ctx = TestContext::with_config(warm_up_config(2));

    ctx.engine.advance(SETTLE_MS);
    assert_eq!(ctx.engine.state(), PufState::WarmingUp);
    assert_eq!(ctx.engine.decay().latch(), RefreshLatch::Suppressed);
    assert_eq!(ctx.ctrl_value() & (1 << 31), 1 << 31);

    ctx.engine.advance(SETTLE_MS);
    assert_eq!(ctx.engine.state(), PufState::Idle);
    assert_eq!(ctx.engine.decay().latch(), RefreshLatch::Enabled);
    assert_eq!(ctx.ctrl_value() & (1 << 31), 0);
    assert_eq!(ctx.shadow_value() & (1 << 31), 0);
    assert!(ctx.engine.scheduler().is_empty());
    assert!(ctx.engine.open().is_ok());
}

#[test]
fn each_cycle_starts_from_a_zeroed_region() {
    let mut ctx = TestContext::with_config(warm_up_config(2));
    let base = ctx.region_base();
    ctx.engine.memory_mut().write_u16(base.offset(6), 0xFFFF).unwrap();

    ctx.engine.advance(SETTLE_MS);
    assert_eq!(ctx.engine.memory().bytes(base.offset(6), 2).unwrap(), &[0, 0]);
}

#[test]
fn sweep_refreshes_everything_but_the_region() {
    let mut ctx = TestContext::with_config(warm_up_config(1));
    ctx.engine.advance(SETTLE_MS);

    // Sweeps fire every 55 ms; the last one before 10 s is at 9955 ms.
    assert_eq!(ctx.engine.health().sweeps, 181);
    let region = *ctx.engine.region();
    let reads = ctx.engine.memory().reads();
    assert_eq!(reads.len(), 181 * 28);
    assert!(reads.iter().all(|a| !region.overlaps(*a, 4)));
}

#[test]
fn cancel_abandons_remaining_cycles() {
    let mut regs = SimRegisters::new();
    let mut mem = SimDram::new(PhysAddr::new(0), 4096);
    let region = DecayRegion::new(PhysAddr::new(0), 1024, RegionOrigin::CallerSupplied);
    let config = small_config();
    let mut decay = DecayController::new(config.dram.clone(), config.refresh.clone());
    let mut sched = Scheduler::new();
    let mut warm_up = WarmUp::new(&WarmUpConfig {
        retries: 3,
        settle_ms: SETTLE_MS,
    });

    let progress = warm_up.start(&mut WarmUpContext {
        regs: &mut regs,
        mem: &mut mem,
        region: &region,
        decay: &mut decay,
        sched: &mut sched,
    });
    assert_eq!(progress, WarmUpProgress::Settling { remaining: 3 });
    assert!(warm_up.is_running());

    warm_up.cancel(&mut sched);
    assert!(!warm_up.is_running());
    assert_eq!(warm_up.remaining(), 0);
    assert_eq!(sched.pending_of(TaskKind::WarmUpSettle), 0);
    assert!(decay.is_decaying());
}

#[test]
fn shutdown_during_warm_up_restores_refresh() {
    let mut ctx = TestContext::with_config(warm_up_config(3));
    ctx.engine.advance(SETTLE_MS / 2);
    ctx.engine.shutdown();

    assert_eq!(ctx.engine.decay().latch(), RefreshLatch::Enabled);
    assert_eq!(ctx.ctrl_value() & (1 << 31), 0);
    assert!(ctx.engine.scheduler().is_empty());
    assert!(matches!(ctx.engine.open(), Err(PufError::ShutDown)));
}
