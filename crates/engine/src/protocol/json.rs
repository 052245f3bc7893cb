//! Enrollment JSON interchange.
//!
//! The offline enrollment tool describes each challenge as
//!
//! ```json
//! { "decay_time": 120, "pointers": [ ...32 values... ], "auth_value": 3735928559, "parity": [ ... ] }
//! ```
//!
//! where `auth_value` is the response the device is expected to produce.
//! This module converts such lists into [`EnrollmentRecord`]s and the wire
//! blob accepted by `write`, and can seal new entries by computing their
//! parity from `auth_value`.

use serde::{Deserialize, Serialize};

use super::record::{CellPointer, EnrollmentRecord, encode_records};
use crate::common::constants::POINTERS_PER_RECORD;
use crate::common::{EccError, ProtocolError};
use crate::ecc::EccCorrector;

/// One challenge as exchanged with the enrollment tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentEntry {
    /// Decay time in seconds.
    pub decay_time: i64,
    /// Packed cell pointers, one per response bit.
    pub pointers: Vec<u32>,
    /// Expected response.
    pub auth_value: u32,
    /// Reed-Solomon parity of `auth_value`.
    #[serde(default)]
    pub parity: Vec<u16>,
}

impl EnrollmentEntry {
    /// Builds an entry whose parity protects `auth_value` with `parity_count` symbols.
    ///
    /// # Arguments
    ///
    /// * `decay_time` - Decay time in seconds.
    /// * `pointers` - Cells sampled for each response bit, most significant first.
    /// * `auth_value` - Expected response.
    /// * `parity_count` - Number of parity symbols to attach.
    pub fn sealed(
        decay_time: i64,
        pointers: Vec<u32>,
        auth_value: u32,
        parity_count: usize,
    ) -> Result<Self, EccError> {
        let parity = EccCorrector::new().seal(auth_value, parity_count)?;
        Ok(Self {
            decay_time,
            pointers,
            auth_value,
            parity,
        })
    }

    /// Converts the entry to a wire record; `index` labels errors.
    pub fn to_record(&self, index: usize) -> Result<EnrollmentRecord, ProtocolError> {
        let decay_seconds = u16::try_from(self.decay_time)
            .ok()
            .filter(|&d| d > 0)
            .ok_or_else(|| ProtocolError::DecayOutOfRange {
                record: index,
                value: self.decay_time,
            })?;
        let pointers: [u32; POINTERS_PER_RECORD] =
            self.pointers
                .as_slice()
                .try_into()
                .map_err(|_| ProtocolError::PointerCount {
                    record: index,
                    count: self.pointers.len(),
                })?;
        if self.parity.len() > usize::from(u8::MAX) {
            return Err(ProtocolError::ParityCount {
                record: index,
                count: self.parity.len(),
            });
        }
        Ok(EnrollmentRecord {
            decay_seconds,
            parity: self.parity.clone(),
            pointers: pointers.map(CellPointer),
        })
    }

    /// Builds an entry back from a wire record.
    pub fn from_record(record: &EnrollmentRecord, auth_value: u32) -> Self {
        Self {
            decay_time: i64::from(record.decay_seconds),
            pointers: record.pointers.iter().map(|p| p.0).collect(),
            auth_value,
            parity: record.parity.clone(),
        }
    }
}

impl TryFrom<&EnrollmentEntry> for EnrollmentRecord {
    type Error = ProtocolError;

    fn try_from(entry: &EnrollmentEntry) -> Result<Self, Self::Error> {
        entry.to_record(0)
    }
}

/// Converts a list of entries to the wire blob accepted by `write`.
pub fn encode_enrollment(entries: &[EnrollmentEntry]) -> Result<Vec<u8>, ProtocolError> {
    if entries.is_empty() {
        return Err(ProtocolError::EmptyEnrollment);
    }
    let records = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| entry.to_record(i))
        .collect::<Result<Vec<_>, _>>()?;
    encode_records(&records)
}
