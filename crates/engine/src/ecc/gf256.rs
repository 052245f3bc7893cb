//! GF(2^8) arithmetic over the primitive polynomial x^8 + x^4 + x^3 + x^2 + 1.
//!
//! Elements are bytes; addition is XOR. Multiplication, division and powers go
//! through log/antilog tables generated at compile time with primitive
//! element alpha = 2.

/// Primitive polynomial x^8 + x^4 + x^3 + x^2 + 1.
pub const PRIMITIVE_POLY: u16 = 0x11D;

/// Number of non-zero field elements (order of alpha).
pub const FIELD_ORDER: usize = 255;

const fn build_tables() -> ([u8; 512], [u8; 256]) {
    let mut exp = [0u8; 512];
    let mut log = [0u8; 256];
    let mut x: u16 = 1;
    let mut i = 0;
    while i < FIELD_ORDER {
        exp[i] = x as u8;
        log[x as usize] = i as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= PRIMITIVE_POLY;
        }
        i += 1;
    }
    // Doubled so that exp[log a + log b] needs no reduction.
    while i < 512 {
        exp[i] = exp[i - FIELD_ORDER];
        i += 1;
    }
    (exp, log)
}

const TABLES: ([u8; 512], [u8; 256]) = build_tables();
const EXP: [u8; 512] = TABLES.0;
const LOG: [u8; 256] = TABLES.1;

/// Returns alpha^`power`; negative and large powers wrap modulo 255.
#[inline]
pub const fn alpha_pow(power: i64) -> u8 {
    EXP[power.rem_euclid(FIELD_ORDER as i64) as usize]
}

/// Multiplies two field elements.
#[inline]
pub const fn mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        0
    } else {
        EXP[LOG[a as usize] as usize + LOG[b as usize] as usize]
    }
}

/// Divides `a` by `b`.
///
/// Division by zero is a caller bug; it yields zero rather than panicking in
/// the decode path.
#[inline]
pub const fn div(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        0
    } else {
        EXP[LOG[a as usize] as usize + FIELD_ORDER - LOG[b as usize] as usize]
    }
}

/// Multiplicative inverse; zero maps to zero.
#[inline]
pub const fn inv(a: u8) -> u8 {
    div(1, a)
}

/// Evaluates a polynomial stored highest degree first at `x` (Horner's rule).
pub fn poly_eval_high_first(poly: &[u8], x: u8) -> u8 {
    poly.iter().fold(0, |acc, &c| mul(acc, x) ^ c)
}

/// Evaluates a polynomial stored lowest degree first at `x`.
pub fn poly_eval_low_first(poly: &[u8], x: u8) -> u8 {
    poly.iter().rev().fold(0, |acc, &c| mul(acc, x) ^ c)
}
