//! # Response Reconstruction Tests
//!
//! Samples planted cells directly, without the session state machine.

use drampuf_core::PufError;
use drampuf_core::common::{EccError, HwError, PhysAddr};
use drampuf_core::engine::ResponseReconstructor;
use drampuf_core::hw::{DecayRegion, RegionOrigin};
use drampuf_core::protocol::CellPointer;
use drampuf_core::sim::SimDram;
use pretty_assertions::assert_eq;

use crate::common::fixtures::{self, flip_cell, plant};

const BASE: PhysAddr = PhysAddr(0x8000_0000);

fn setup() -> (SimDram, DecayRegion) {
    let dram = SimDram::new(BASE, 4096);
    let region = DecayRegion::new(BASE, 4096, RegionOrigin::CallerSupplied);
    (dram, region)
}

#[test]
fn pointer_order_is_msb_first() {
    let (mut dram, region) = setup();
    let record = fixtures::record(1, vec![]);
    // Only the cell behind pointer 0 holds a one.
    dram.write_u16(BASE, 1).unwrap();
    assert_eq!(
        ResponseReconstructor::sample(&mut dram, &region, &record).unwrap(),
        0x8000_0000
    );
}

#[test]
fn cells_are_little_endian_words() {
    let (mut dram, region) = setup();
    let mut record = fixtures::record(1, vec![]);
    record.pointers = [CellPointer::new(0, 8); 32];
    dram.write_bytes(BASE, &[0x00, 0x01]).unwrap();
    assert_eq!(
        ResponseReconstructor::sample(&mut dram, &region, &record).unwrap(),
        u32::MAX
    );
}

#[test]
fn pointers_may_share_a_word() {
    let (mut dram, region) = setup();
    let mut record = fixtures::record(1, vec![]);
    record.pointers = std::array::from_fn(|i| CellPointer::new(7, (i % 16) as u32));
    dram.write_u16(BASE.offset(14), 0x00FF).unwrap();
    // Bits 0..8 of word 7 are set; pointers i and i + 16 select bit i % 16.
    assert_eq!(
        ResponseReconstructor::sample(&mut dram, &region, &record).unwrap(),
        0xFF00_FF00
    );
}

#[test]
fn reconstruct_corrects_with_parity() {
    let (mut dram, region) = setup();
    let record = fixtures::sealed_record(1, 0x5EED_1234, 6);
    plant(&mut dram, BASE, &record, 0x5EED_1234);
    for i in [3, 9, 27] {
        flip_cell(&mut dram, BASE, &record, i);
    }

    let corrected = ResponseReconstructor::new()
        .reconstruct(&mut dram, &region, &record)
        .unwrap();
    assert_eq!((corrected.value, corrected.errors), (0x5EED_1234, 3));
}

#[test]
fn uncorrectable_response_is_an_ecc_error() {
    let (mut dram, region) = setup();
    let record = fixtures::sealed_record(1, 0x5EED_1234, 1);
    plant(&mut dram, BASE, &record, 0x5EED_1234);
    flip_cell(&mut dram, BASE, &record, 12);

    let err = ResponseReconstructor::new()
        .reconstruct(&mut dram, &region, &record)
        .unwrap_err();
    assert!(matches!(err, PufError::Ecc(EccError::Uncorrectable)));
    assert_eq!(err.status(), -74);
}

#[test]
fn failed_cell_read_aborts_the_sample() {
    let (mut dram, region) = setup();
    let record = fixtures::record(1, vec![]);
    let addr = BASE.offset(record.pointers[17].byte_offset());
    dram.inject_fault(addr);

    let err = ResponseReconstructor::sample(&mut dram, &region, &record).unwrap_err();
    assert!(matches!(err, PufError::Hw(HwError::MemoryAccess { addr: a }) if a == addr));
    assert_eq!(err.status(), -5);
}

#[test]
fn pointer_past_region_end_is_rejected() {
    let (mut dram, _) = setup();
    let small = DecayRegion::new(BASE, 32, RegionOrigin::CallerSupplied);
    let record = fixtures::record(1, vec![]);
    assert!(matches!(
        ResponseReconstructor::sample(&mut dram, &small, &record),
        Err(PufError::CellOutOfRange { .. })
    ));
}
