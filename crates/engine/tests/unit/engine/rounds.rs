//! # Decay Round Tests
//!
//! Drives complete sessions in virtual time: enrollment, the decay timeout,
//! the refresh sweep while refresh is off, and the responses read back.

use drampuf_core::config::EndOfList;
use drampuf_core::engine::PufState;
use drampuf_core::hw::RefreshLatch;
use drampuf_core::protocol::encode_records;
use drampuf_core::sched::TaskKind;
use pretty_assertions::assert_eq;

use crate::common::fixtures::{self, flip_cell, plant};
use crate::common::harness::{TestContext, small_config};

const DISABLE: u32 = 1 << 31;

#[test]
fn response_is_ready_after_the_decay_time() {
    let mut ctx = TestContext::new();
    let record = fixtures::record(2, vec![]);
    let handle = ctx.enroll(&encode_records(&[record.clone()]).unwrap());
    assert_eq!(ctx.engine.state(), PufState::Decaying);
    assert_eq!(ctx.engine.decay().latch(), RefreshLatch::Suppressed);
    assert_eq!(ctx.ctrl_value() & DISABLE, DISABLE);
    assert_eq!(ctx.shadow_value() & DISABLE, DISABLE);

    let base = ctx.region_base();
    plant(ctx.engine.memory_mut(), base, &record, 0xDEAD_BEEF);

    ctx.engine.advance(1_999);
    assert_eq!(ctx.read(handle).0, 0);
    assert_eq!(ctx.engine.state(), PufState::Decaying);

    ctx.engine.advance(1);
    assert_eq!(ctx.engine.state(), PufState::ResponseReady);
    assert_eq!(ctx.engine.decay().latch(), RefreshLatch::Enabled);
    assert_eq!(ctx.ctrl_value() & DISABLE, 0);
    assert!(!ctx.engine.decay().sweep_active());

    assert_eq!(ctx.read(handle), (4, 0xDEAD_BEEF));
}

#[test]
fn response_bytes_are_big_endian() {
    let mut ctx = TestContext::new();
    let record = fixtures::record(1, vec![]);
    let handle = ctx.enroll(&encode_records(&[record.clone()]).unwrap());
    let base = ctx.region_base();
    plant(ctx.engine.memory_mut(), base, &record, 0x0102_0304);
    ctx.engine.advance(1_000);

    let mut buf = [0u8; 4];
    assert_eq!(ctx.engine.read(handle, &mut buf).unwrap(), 4);
    assert_eq!(buf, [0x01, 0x02, 0x03, 0x04]);
}

#[test]
fn reading_arms_the_next_round_from_a_zeroed_region() {
    let mut ctx = TestContext::new();
    let record = fixtures::record(3, vec![]);
    let handle = ctx.enroll(&encode_records(&[record.clone()]).unwrap());
    let base = ctx.region_base();
    plant(ctx.engine.memory_mut(), base, &record, u32::MAX);
    ctx.engine.advance(3_000);

    assert_eq!(ctx.read(handle), (4, u32::MAX));
    assert_eq!(ctx.engine.state(), PufState::Decaying);
    assert_eq!(ctx.engine.session().unwrap().rounds(), 2);
    assert_eq!(ctx.engine.decay().latch(), RefreshLatch::Suppressed);
    assert_eq!(ctx.engine.next_deadline(), Some(ctx.engine.now() + 55));
    assert_eq!(ctx.engine.scheduler().pending_of(TaskKind::DecayTimeout), 1);

    ctx.engine.advance(3_000);
    assert_eq!(ctx.read(handle), (4, 0));
}

#[test]
fn records_are_used_in_order_and_wrap() {
    let mut ctx = TestContext::new();
    let first = fixtures::record(1, vec![]);
    let mut second = fixtures::record(3, vec![]);
    second.pointers = fixtures::spread_pointers_from(100);
    let blob = encode_records(&[first.clone(), second.clone()]).unwrap();
    let handle = ctx.enroll(&blob);
    let base = ctx.region_base();

    plant(ctx.engine.memory_mut(), base, &first, 0x1111_1111);
    ctx.engine.advance(1_000);
    assert_eq!(ctx.read(handle), (4, 0x1111_1111));

    plant(ctx.engine.memory_mut(), base, &second, 0x2222_2222);
    ctx.engine.advance(2_999);
    assert_eq!(ctx.read(handle).0, 0);
    ctx.engine.advance(1);
    assert_eq!(ctx.read(handle), (4, 0x2222_2222));

    // Wrapped back to the first record, so the next round lasts one second.
    let enrollment = ctx.engine.session().unwrap().enrollment().unwrap();
    assert_eq!(enrollment.cursor(), first.encoded_len());
    plant(ctx.engine.memory_mut(), base, &first, 0x3333_3333);
    ctx.engine.advance(1_000);
    assert_eq!(ctx.read(handle), (4, 0x3333_3333));
    assert_eq!(ctx.engine.health().stats.responses, 3);
}

#[test]
fn release_policy_ends_session_after_last_record() {
    let mut config = small_config();
    config.session.end_of_list = EndOfList::Release;
    let mut ctx = TestContext::with_config(config);
    let first = fixtures::record(1, vec![]);
    let second = fixtures::record(1, vec![]);
    let handle = ctx.enroll(&encode_records(&[first, second]).unwrap());

    ctx.engine.advance(1_000);
    assert_eq!(ctx.read(handle).0, 4);
    assert_eq!(ctx.engine.state(), PufState::Decaying);

    ctx.engine.advance(1_000);
    assert_eq!(ctx.read(handle).0, 4);
    assert_eq!(ctx.engine.state(), PufState::Idle);
    assert!(ctx.engine.session().is_none());
    assert!(ctx.engine.scheduler().is_empty());
    assert_eq!(ctx.engine.decay().latch(), RefreshLatch::Enabled);
    assert!(ctx.engine.open().is_ok());
}

#[test]
fn flipped_cells_are_corrected_by_parity() {
    let mut ctx = TestContext::new();
    let record = fixtures::sealed_record(2, 0xC0FF_EE00, 4);
    let handle = ctx.enroll(&encode_records(&[record.clone()]).unwrap());
    let base = ctx.region_base();
    plant(ctx.engine.memory_mut(), base, &record, 0xC0FF_EE00);
    flip_cell(ctx.engine.memory_mut(), base, &record, 0);
    flip_cell(ctx.engine.memory_mut(), base, &record, 20);

    ctx.engine.advance(2_000);
    assert_eq!(ctx.read(handle), (4, 0xC0FF_EE00));
    assert_eq!(ctx.engine.health().stats.corrected_symbols, 2);
}

#[test]
fn sweep_runs_only_while_decaying_and_skips_the_region() {
    let mut ctx = TestContext::new();
    let _handle = ctx.enroll(&encode_records(&[fixtures::record(1, vec![])]).unwrap());
    ctx.engine.advance(1_000);

    // Sweeps at 55 ms intervals until the timeout at 1000 ms.
    assert_eq!(ctx.engine.health().sweeps, 18);
    let region = *ctx.engine.region();
    assert!(ctx.engine.memory().reads().iter().all(|a| !region.overlaps(*a, 4)));

    ctx.engine.memory_mut().clear_reads();
    ctx.engine.advance(5_000);
    assert_eq!(ctx.engine.state(), PufState::ResponseReady);
    assert!(ctx.engine.memory().reads().is_empty());
    assert_eq!(ctx.engine.health().sweeps, 18);
}

#[test]
fn health_reports_session_counters() {
    let mut ctx = TestContext::new();
    let handle = ctx.enroll(&encode_records(&[fixtures::record(1, vec![])]).unwrap());
    ctx.engine.advance(1_000);
    let _ = ctx.read(handle);

    let health = ctx.engine.health();
    assert_eq!(health.state, PufState::Decaying);
    assert_eq!(health.latch, RefreshLatch::Suppressed);
    assert_eq!(health.register_faults, 0);
    assert_eq!(health.temperature, None);
    assert_eq!(health.stats.sessions, 1);
    assert_eq!(health.stats.rounds, 2);
    assert_eq!(health.stats.responses, 1);
}
