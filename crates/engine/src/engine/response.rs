//! Response reconstruction from decayed cells.

use crate::common::PufError;
use crate::common::constants::RESPONSE_BITS;
use crate::ecc::{Corrected, EccCorrector};
use crate::hw::{DecayRegion, PhysMemory};
use crate::protocol::EnrollmentRecord;

/// Samples the cells of a record and error-corrects the result.
#[derive(Debug, Default)]
pub struct ResponseReconstructor {
    ecc: EccCorrector,
}

impl ResponseReconstructor {
    /// Creates a reconstructor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the raw response bits selected by `record`.
    ///
    /// Pointer `i` supplies bit `31 - i`. Any failed read aborts the whole
    /// sample.
    pub fn sample<M: PhysMemory>(
        mem: &mut M,
        region: &DecayRegion,
        record: &EnrollmentRecord,
    ) -> Result<u32, PufError> {
        let mut raw = 0u32;
        for (i, &pointer) in record.pointers.iter().enumerate() {
            let word = mem.read_u16(region.cell_addr(pointer)?)?;
            let bit = u32::from((word >> pointer.bit()) & 1);
            raw |= bit << (RESPONSE_BITS - 1 - i);
        }
        Ok(raw)
    }

    /// Samples `record` and corrects it with its parity.
    ///
    /// # Returns
    ///
    /// The corrected response, or the I/O or ECC failure. No partial response
    /// is ever produced.
    pub fn reconstruct<M: PhysMemory>(
        &mut self,
        mem: &mut M,
        region: &DecayRegion,
        record: &EnrollmentRecord,
    ) -> Result<Corrected, PufError> {
        let raw = Self::sample(mem, region, record)?;
        Ok(self.ecc.correct(raw, &record.parity)?)
    }
}
