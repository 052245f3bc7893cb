//! Enrollment records and their wire layout.
//!
//! One record is encoded as
//!
//! ```text
//! decay_seconds:u16 | parity_count:u8 | parity_count x parity:u16 | 32 x pointer:u32
//! ```
//!
//! big-endian, concatenated with no padding.

use std::fmt;

use super::cursor::{Cursor, CursorMut};
use crate::common::ProtocolError;
use crate::common::constants::{
    CELL_BIT_MASK, CELL_BLOCK_SHIFT, CELL_WORD_BYTES, DECAY_FIELD_BYTES, PARITY_COUNT_BYTES,
    PARITY_SYMBOL_BYTES, POINTER_BYTES, POINTERS_PER_RECORD,
};

/// Packed reference to one bit of a 16-bit word in the decay region.
///
/// The high bits select the word (block index), the low four bits the bit within it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellPointer(pub u32);

impl CellPointer {
    /// Packs a block index and a bit index.
    ///
    /// # Arguments
    ///
    /// * `block` - Index of the 16-bit word from the start of the region.
    /// * `bit` - Bit within the word (only the low four bits are kept).
    pub const fn new(block: u32, bit: u32) -> Self {
        Self((block << CELL_BLOCK_SHIFT) | (bit & CELL_BIT_MASK))
    }

    /// Index of the 16-bit word this pointer selects.
    pub const fn block(self) -> u32 {
        self.0 >> CELL_BLOCK_SHIFT
    }

    /// Bit index within the word.
    pub const fn bit(self) -> u32 {
        self.0 & CELL_BIT_MASK
    }

    /// Byte offset of the selected word from the start of the region.
    pub const fn byte_offset(self) -> u64 {
        self.block() as u64 * CELL_WORD_BYTES
    }
}

impl fmt::Debug for CellPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CellPointer({}:{})", self.block(), self.bit())
    }
}

/// One decay challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentRecord {
    /// Seconds to let the region decay before sampling.
    pub decay_seconds: u16,
    /// Reed-Solomon parity symbols protecting the response.
    pub parity: Vec<u16>,
    /// One cell per response bit, most significant bit first.
    pub pointers: [CellPointer; POINTERS_PER_RECORD],
}

impl EnrollmentRecord {
    /// Size of this record on the wire.
    pub const fn encoded_len(&self) -> usize {
        Self::encoded_len_for(self.parity.len())
    }

    /// Size of a record with `parity_count` symbols on the wire.
    pub const fn encoded_len_for(parity_count: usize) -> usize {
        DECAY_FIELD_BYTES
            + PARITY_COUNT_BYTES
            + parity_count * PARITY_SYMBOL_BYTES
            + POINTERS_PER_RECORD * POINTER_BYTES
    }

    /// Decodes the record body that follows an already consumed `decay_seconds` field.
    ///
    /// # Arguments
    ///
    /// * `decay_seconds` - Value read by the caller.
    /// * `cur` - Cursor positioned at the parity count.
    pub fn decode_body(decay_seconds: u16, cur: &mut Cursor<'_>) -> Result<Self, ProtocolError> {
        let parity_count = cur.read_u8()? as usize;
        let mut parity = Vec::with_capacity(parity_count);
        for _ in 0..parity_count {
            parity.push(cur.read_u16_be()?);
        }
        let mut pointers = [CellPointer::default(); POINTERS_PER_RECORD];
        for ptr in &mut pointers {
            *ptr = CellPointer(cur.read_u32_be()?);
        }
        Ok(Self {
            decay_seconds,
            parity,
            pointers,
        })
    }

    /// Decodes one full record, including its `decay_seconds` field.
    ///
    /// A zero decay time is returned as-is; end-of-list handling belongs to the caller.
    pub fn decode(cur: &mut Cursor<'_>) -> Result<Self, ProtocolError> {
        let decay_seconds = cur.read_u16_be()?;
        Self::decode_body(decay_seconds, cur)
    }

    /// Encodes the record at the cursor.
    ///
    /// Fails with [`ProtocolError::ParityCount`] when more than 255 parity
    /// symbols are attached (the length prefix is a single byte); `record`
    /// only labels that error.
    pub fn encode(&self, cur: &mut CursorMut<'_>, record: usize) -> Result<(), ProtocolError> {
        let parity_count = u8::try_from(self.parity.len()).map_err(|_| ProtocolError::ParityCount {
            record,
            count: self.parity.len(),
        })?;
        cur.write_u16_be(self.decay_seconds)?;
        cur.write_u8(parity_count)?;
        for &symbol in &self.parity {
            cur.write_u16_be(symbol)?;
        }
        for ptr in &self.pointers {
            cur.write_u32_be(ptr.0)?;
        }
        Ok(())
    }

    /// Encodes the record into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut out = vec![0u8; self.encoded_len()];
        self.encode(&mut CursorMut::new(&mut out), 0)?;
        Ok(out)
    }
}

/// Encodes a list of records back to back, the layout accepted by `write`.
pub fn encode_records(records: &[EnrollmentRecord]) -> Result<Vec<u8>, ProtocolError> {
    let len = records.iter().map(EnrollmentRecord::encoded_len).sum();
    let mut out = vec![0u8; len];
    let mut cur = CursorMut::new(&mut out);
    for (i, record) in records.iter().enumerate() {
        record.encode(&mut cur, i)?;
    }
    Ok(out)
}
