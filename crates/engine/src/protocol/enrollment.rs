//! Enrollment buffer with end-of-list sentinel.
//!
//! A client submits all of its records in one write. The engine validates
//! the whole submission up front, copies it into an owned buffer with
//! [`SENTINEL_BYTES`] trailing zero bytes, and then consumes one record per
//! decay round. Reading a zero `decay_seconds` (the sentinel) wraps the
//! cursor back to the first record.

use std::collections::TryReserveError;

use super::cursor::Cursor;
use super::record::EnrollmentRecord;
use crate::common::ProtocolError;
use crate::common::constants::{DECAY_FIELD_BYTES, SENTINEL_BYTES};

/// Checks that `data` is a sequence of one or more complete records.
///
/// Every record must have a non-zero decay time, otherwise the records
/// following it would never be reached.
///
/// # Returns
///
/// The number of records in `data`.
pub fn validate(data: &[u8]) -> Result<usize, ProtocolError> {
    let mut cur = Cursor::new(data);
    let mut records = 0;
    while cur.remaining() > 0 {
        let record = EnrollmentRecord::decode(&mut cur)?;
        if record.decay_seconds == 0 {
            return Err(ProtocolError::ZeroDecay { record: records });
        }
        records += 1;
    }
    if records == 0 {
        return Err(ProtocolError::EmptyEnrollment);
    }
    Ok(records)
}

/// A record handed out by [`Enrollment::next_record`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextRecord {
    /// The decoded record.
    pub record: EnrollmentRecord,
    /// Byte offset the record was decoded from.
    pub offset: usize,
    /// `true` if the sentinel was hit and the cursor restarted at the first record.
    pub wrapped: bool,
}

/// Owned enrollment data plus the cursor of the next record to consume.
#[derive(Debug, Clone)]
pub struct Enrollment {
    bytes: Vec<u8>,
    cursor: usize,
    records: usize,
}

impl Enrollment {
    /// Copies validated enrollment data into a buffer with a zeroed sentinel tail.
    ///
    /// # Arguments
    ///
    /// * `data` - Bytes accepted by [`validate`].
    /// * `records` - Record count returned by [`validate`].
    ///
    /// # Returns
    ///
    /// The new enrollment, or the allocation failure.
    pub fn with_sentinel(data: &[u8], records: usize) -> Result<Self, TryReserveError> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(data.len() + SENTINEL_BYTES)?;
        bytes.extend_from_slice(data);
        bytes.resize(data.len() + SENTINEL_BYTES, 0);
        Ok(Self {
            bytes,
            cursor: 0,
            records,
        })
    }

    /// Validates `data` and builds an enrollment from it.
    ///
    /// A buffer that cannot be allocated is reported as
    /// [`ProtocolError::OutOfMemory`].
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        let records = validate(data)?;
        Self::with_sentinel(data, records).map_err(|_| ProtocolError::OutOfMemory {
            requested: data.len() + SENTINEL_BYTES,
        })
    }

    /// Number of records in the enrollment.
    pub const fn records(&self) -> usize {
        self.records
    }

    /// Byte offset of the next record to consume.
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Total buffer length including the sentinel.
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the buffer holds nothing but the sentinel.
    pub const fn is_empty(&self) -> bool {
        self.bytes.len() <= SENTINEL_BYTES
    }

    /// Returns `true` if the cursor rests on the sentinel, i.e. the last
    /// record has been consumed.
    pub fn at_sentinel(&self) -> bool {
        Cursor::at(&self.bytes, self.cursor)
            .read_u16_be()
            .is_ok_and(|decay| decay == 0)
    }

    /// Decodes the record at the cursor and advances past it.
    ///
    /// A zero decay time resets the cursor to 0 and the first record is
    /// decoded instead.
    pub fn next_record(&mut self) -> Result<NextRecord, ProtocolError> {
        let mut cur = Cursor::at(&self.bytes, self.cursor);
        let mut decay_seconds = cur.read_u16_be()?;
        let mut wrapped = false;
        if decay_seconds == 0 {
            wrapped = true;
            cur.seek(0);
            decay_seconds = cur.read_u16_be()?;
            if decay_seconds == 0 {
                return Err(ProtocolError::EmptyEnrollment);
            }
        }
        let offset = cur.position() - DECAY_FIELD_BYTES;
        let record = EnrollmentRecord::decode_body(decay_seconds, &mut cur)?;
        self.cursor = cur.position();
        Ok(NextRecord {
            record,
            offset,
            wrapped,
        })
    }

    /// Zeroes the buffer and rewinds the cursor.
    pub fn wipe(&mut self) {
        self.bytes.iter_mut().for_each(|b| *b = 0);
        self.cursor = 0;
    }
}
