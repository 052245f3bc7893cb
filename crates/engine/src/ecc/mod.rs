//! Error correction for recovered responses.
//!
//! A 32-bit response is carried as 32 message symbols of value 0 or 1, most
//! significant bit first: symbol `i` holds bit `31 - i`. The parity symbols
//! attached to each enrollment record are the Reed-Solomon parity of that
//! message, so up to `floor(k / 2)` flipped bits are repaired on read.
//!
//! 1. **Field:** [`gf256`] table arithmetic over 0x11d.
//! 2. **Code:** [`reed_solomon`] systematic encoder and decoder.
//! 3. **Corrector:** [`EccCorrector`] maps responses onto codewords.

pub mod gf256;
pub mod reed_solomon;

use tracing::debug;

use crate::common::EccError;
use crate::common::constants::RESPONSE_BITS;
pub use reed_solomon::ReedSolomon;

/// Largest parity count that still leaves room for the 32 message symbols.
pub const MAX_PARITY: usize = gf256::FIELD_ORDER - RESPONSE_BITS;

/// Outcome of a successful correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Corrected {
    /// The corrected response.
    pub value: u32,
    /// Number of symbols that had to be repaired.
    pub errors: usize,
}

/// Splits `value` into 32 one-bit symbols, most significant bit first.
pub fn unpack_bits(value: u32) -> [u8; RESPONSE_BITS] {
    let mut bits = [0u8; RESPONSE_BITS];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = ((value >> (RESPONSE_BITS - 1 - i)) & 1) as u8;
    }
    bits
}

/// Inverse of [`unpack_bits`]; any symbol other than 0 or 1 is rejected.
pub fn pack_bits(bits: &[u8]) -> Result<u32, EccError> {
    bits.iter().try_fold(0u32, |acc, &bit| match bit {
        0 | 1 => Ok((acc << 1) | u32::from(bit)),
        _ => Err(EccError::Uncorrectable),
    })
}

/// Reed-Solomon corrector for 32-bit responses.
///
/// Stateless apart from a cache of the last generator polynomial, since
/// consecutive records usually carry the same parity count.
#[derive(Debug, Default)]
pub struct EccCorrector {
    code: Option<ReedSolomon>,
}

impl EccCorrector {
    /// Creates a corrector with an empty code cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn code_for(&mut self, parity: usize) -> Result<&ReedSolomon, EccError> {
        if parity > MAX_PARITY {
            return Err(EccError::TooManyParity {
                count: parity,
                max: MAX_PARITY,
            });
        }
        let stale = self.code.as_ref().is_none_or(|c| c.parity_len() != parity);
        if stale {
            self.code = Some(ReedSolomon::new(parity)?);
        }
        self.code.as_ref().ok_or(EccError::Uncorrectable)
    }

    /// Corrects a raw response against its enrollment parity.
    ///
    /// With no parity symbols the raw value is returned unchanged.
    ///
    /// # Arguments
    ///
    /// * `raw` - Sampled bits, pointer 0 in bit 31.
    /// * `parity` - Parity symbols from the enrollment record; each must fit in a byte.
    ///
    /// # Returns
    ///
    /// The corrected response. [`EccError::Uncorrectable`] means the sampled
    /// bits must not be trusted.
    pub fn correct(&mut self, raw: u32, parity: &[u16]) -> Result<Corrected, EccError> {
        if parity.is_empty() {
            return Ok(Corrected {
                value: raw,
                errors: 0,
            });
        }
        let mut codeword = Vec::with_capacity(RESPONSE_BITS + parity.len());
        codeword.extend_from_slice(&unpack_bits(raw));
        for (index, &symbol) in parity.iter().enumerate() {
            let byte =
                u8::try_from(symbol).map_err(|_| EccError::InvalidSymbol { index, value: symbol })?;
            codeword.push(byte);
        }

        let errors = self.code_for(parity.len())?.decode(&mut codeword)?;
        let value = pack_bits(&codeword[..RESPONSE_BITS])?;
        if errors > 0 {
            debug!(
                errors,
                raw = format_args!("{raw:#010x}"),
                value = format_args!("{value:#010x}"),
                "corrected response"
            );
        }
        Ok(Corrected { value, errors })
    }

    /// Computes the parity an enrollment record needs to protect `value`.
    ///
    /// # Arguments
    ///
    /// * `value` - The expected response.
    /// * `parity` - Number of parity symbols to produce.
    pub fn seal(&mut self, value: u32, parity: usize) -> Result<Vec<u16>, EccError> {
        if parity == 0 {
            return Ok(Vec::new());
        }
        let symbols = self.code_for(parity)?.encode(&unpack_bits(value))?;
        Ok(symbols.into_iter().map(u16::from).collect())
    }
}
