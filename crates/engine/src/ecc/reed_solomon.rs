//! Systematic Reed-Solomon code over GF(2^8).
//!
//! Codewords are stored highest degree first: the message symbols followed by
//! the parity symbols, so `c(x) = m(x) * x^k + (m(x) * x^k mod g(x))`. The
//! generator has the consecutive roots `alpha^0 .. alpha^(k-1)` (first
//! consecutive root 0, primitive element 1), which is the layout produced by
//! the kernel `encode_rs8` routine used at enrollment time.
//!
//! Decoding is the classic pipeline:
//! 1. **Syndromes:** `S_i = r(alpha^i)`.
//! 2. **Berlekamp-Massey:** error locator `Lambda(x)`, lowest degree first.
//! 3. **Chien search:** roots of `Lambda` give the error positions.
//! 4. **Forney:** error magnitudes from `Omega(x) = S(x) * Lambda(x) mod x^k`.

use super::gf256::{self, FIELD_ORDER};
use crate::common::EccError;

/// A Reed-Solomon code with a fixed number of parity symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReedSolomon {
    /// Generator polynomial, highest degree first, monic.
    generator: Vec<u8>,
}

impl ReedSolomon {
    /// Builds the code for `parity` symbols.
    ///
    /// # Arguments
    ///
    /// * `parity` - Number of parity symbols `k`; must leave room for at
    ///   least one message symbol in a 255 symbol block.
    pub fn new(parity: usize) -> Result<Self, EccError> {
        if parity >= FIELD_ORDER {
            return Err(EccError::TooManyParity {
                count: parity,
                max: FIELD_ORDER - 1,
            });
        }
        let mut generator = vec![1u8];
        for i in 0..parity {
            let root = gf256::alpha_pow(i as i64);
            let mut next = vec![0u8; generator.len() + 1];
            for (j, &coef) in generator.iter().enumerate() {
                next[j] ^= coef;
                next[j + 1] ^= gf256::mul(coef, root);
            }
            generator = next;
        }
        Ok(Self { generator })
    }

    /// Number of parity symbols.
    pub const fn parity_len(&self) -> usize {
        self.generator.len() - 1
    }

    /// Maximum number of symbol errors the code corrects.
    pub const fn capacity(&self) -> usize {
        self.parity_len() / 2
    }

    /// Computes the parity symbols for `message`.
    pub fn encode(&self, message: &[u8]) -> Result<Vec<u8>, EccError> {
        let k = self.parity_len();
        self.check_length(message.len() + k)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let mut remainder = vec![0u8; k];
        for &symbol in message {
            let feedback = symbol ^ remainder.first().copied().unwrap_or(0);
            remainder.rotate_left(1);
            if let Some(last) = remainder.last_mut() {
                *last = 0;
            }
            if feedback != 0 {
                for (r, &g) in remainder.iter_mut().zip(&self.generator[1..]) {
                    *r ^= gf256::mul(g, feedback);
                }
            }
        }
        Ok(remainder)
    }

    /// Corrects `codeword` in place.
    ///
    /// # Returns
    ///
    /// The number of corrected symbols, or [`EccError::Uncorrectable`] when the
    /// error pattern exceeds the correction capacity or is inconsistent. On
    /// failure `codeword` is left untouched.
    pub fn decode(&self, codeword: &mut [u8]) -> Result<usize, EccError> {
        let k = self.parity_len();
        let n = codeword.len();
        self.check_length(n)?;
        if n <= k {
            return Err(EccError::Uncorrectable);
        }

        let syndromes: Vec<u8> = (0..k)
            .map(|i| gf256::poly_eval_high_first(codeword, gf256::alpha_pow(i as i64)))
            .collect();
        if syndromes.iter().all(|&s| s == 0) {
            return Ok(0);
        }

        let (locator, errors) = berlekamp_massey(&syndromes);
        if errors == 0 || errors * 2 > k {
            return Err(EccError::Uncorrectable);
        }

        // Position j holds the coefficient of x^(n-1-j); its locator is alpha^(n-1-j).
        let positions: Vec<usize> = (0..n)
            .filter(|&j| {
                let degree = (n - 1 - j) as i64;
                gf256::poly_eval_low_first(&locator, gf256::alpha_pow(-degree)) == 0
            })
            .collect();
        if positions.len() != errors {
            return Err(EccError::Uncorrectable);
        }

        let mut evaluator = poly_mul_low_first(&syndromes, &locator);
        evaluator.truncate(k);
        let derivative: Vec<u8> = locator
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, &c)| if i % 2 == 1 { c } else { 0 })
            .collect();

        let mut fixes = Vec::with_capacity(errors);
        for &j in &positions {
            let degree = (n - 1 - j) as i64;
            let x = gf256::alpha_pow(degree);
            let x_inv = gf256::alpha_pow(-degree);
            let denom = gf256::poly_eval_low_first(&derivative, x_inv);
            if denom == 0 {
                return Err(EccError::Uncorrectable);
            }
            let num = gf256::mul(x, gf256::poly_eval_low_first(&evaluator, x_inv));
            fixes.push((j, gf256::div(num, denom)));
        }
        for (j, magnitude) in fixes {
            codeword[j] ^= magnitude;
        }
        Ok(errors)
    }

    const fn check_length(&self, n: usize) -> Result<(), EccError> {
        if n > FIELD_ORDER {
            return Err(EccError::TooManyParity {
                count: self.parity_len(),
                max: FIELD_ORDER.saturating_sub(n - self.parity_len()),
            });
        }
        Ok(())
    }
}

/// Returns the connection polynomial (lowest degree first) and its length `L`.
fn berlekamp_massey(syndromes: &[u8]) -> (Vec<u8>, usize) {
    let mut current = vec![1u8];
    let mut previous = vec![1u8];
    let mut len = 0usize;
    let mut shift = 1usize;
    let mut last_discrepancy = 1u8;

    for n in 0..syndromes.len() {
        let mut discrepancy = syndromes[n];
        for i in 1..=len.min(current.len() - 1) {
            discrepancy ^= gf256::mul(current[i], syndromes[n - i]);
        }
        if discrepancy == 0 {
            shift += 1;
            continue;
        }
        let scale = gf256::div(discrepancy, last_discrepancy);
        let snapshot = current.clone();
        if current.len() < previous.len() + shift {
            current.resize(previous.len() + shift, 0);
        }
        for (i, &b) in previous.iter().enumerate() {
            current[i + shift] ^= gf256::mul(scale, b);
        }
        if 2 * len <= n {
            len = n + 1 - len;
            previous = snapshot;
            last_discrepancy = discrepancy;
            shift = 1;
        } else {
            shift += 1;
        }
    }
    (current, len)
}

fn poly_mul_low_first(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        if x == 0 {
            continue;
        }
        for (j, &y) in b.iter().enumerate() {
            out[i + j] ^= gf256::mul(x, y);
        }
    }
    out
}
