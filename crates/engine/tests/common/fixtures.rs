use drampuf_core::common::PhysAddr;
use drampuf_core::ecc::EccCorrector;
use drampuf_core::hw::PhysMemory;
use drampuf_core::protocol::{CellPointer, EnrollmentRecord};
use drampuf_core::sim::SimDram;

/// Pointer `i` selects bit `i % 16` of word `i` in the region, so every
/// response bit lives in its own word.
pub fn spread_pointers() -> [CellPointer; 32] {
    std::array::from_fn(|i| CellPointer::new(i as u32, (i % 16) as u32))
}

/// Like [`spread_pointers`], shifted by `first_block` words.
pub fn spread_pointers_from(first_block: u32) -> [CellPointer; 32] {
    std::array::from_fn(|i| CellPointer::new(first_block + i as u32, (i % 16) as u32))
}

pub fn record(decay_seconds: u16, parity: Vec<u16>) -> EnrollmentRecord {
    EnrollmentRecord {
        decay_seconds,
        parity,
        pointers: spread_pointers(),
    }
}

/// A record whose parity protects `value` with `parity_count` symbols.
pub fn sealed_record(decay_seconds: u16, value: u32, parity_count: usize) -> EnrollmentRecord {
    let parity = EccCorrector::new()
        .seal(value, parity_count)
        .expect("parity count within range");
    record(decay_seconds, parity)
}

/// Writes the cells of `record` so that sampling them yields `value`.
///
/// Only the selected bit of each word is set; every pointer must address a
/// distinct word.
pub fn plant(dram: &mut SimDram, region_base: PhysAddr, record: &EnrollmentRecord, value: u32) {
    for (i, pointer) in record.pointers.iter().enumerate() {
        let bit = ((value >> (31 - i)) & 1) as u16;
        let addr = region_base.offset(pointer.byte_offset());
        dram.write_u16(addr, bit << pointer.bit())
            .expect("cell inside simulated DRAM");
    }
}

/// Flips the sampled bit of pointer `index` in place.
pub fn flip_cell(dram: &mut SimDram, region_base: PhysAddr, record: &EnrollmentRecord, index: usize) {
    let pointer = record.pointers[index];
    let addr = region_base.offset(pointer.byte_offset());
    let word = dram.read_u16(addr).expect("cell inside simulated DRAM");
    dram.write_u16(addr, word ^ (1 << pointer.bit()))
        .expect("cell inside simulated DRAM");
}
