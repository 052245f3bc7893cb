//! # Error Correction Tests
//!
//! Seals responses, corrupts the sampled bits and parity, and checks the
//! corrector repairs up to `k / 2` symbol errors and rejects heavier damage.

use drampuf_core::common::EccError;
use drampuf_core::ecc::{Corrected, EccCorrector, MAX_PARITY, ReedSolomon};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

#[test]
fn no_parity_passes_raw_value_through() {
    let mut ecc = EccCorrector::new();
    assert_eq!(
        ecc.correct(0xCAFE_F00D, &[]),
        Ok(Corrected { value: 0xCAFE_F00D, errors: 0 })
    );
}

#[test]
fn clean_response_needs_no_correction() {
    let mut ecc = EccCorrector::new();
    let parity = ecc.seal(0x0F0F_1234, 8).unwrap();
    assert_eq!(
        ecc.correct(0x0F0F_1234, &parity),
        Ok(Corrected { value: 0x0F0F_1234, errors: 0 })
    );
}

#[rstest]
#[case::msb(31)]
#[case::lsb(0)]
#[case::middle(17)]
fn single_flip_is_repaired_with_two_parity(#[case] bit: u32) {
    let mut ecc = EccCorrector::new();
    let value = 0xA5A5_5A5A;
    let parity = ecc.seal(value, 2).unwrap();
    assert_eq!(
        ecc.correct(value ^ (1 << bit), &parity),
        Ok(Corrected { value, errors: 1 })
    );
}

#[test]
fn single_flip_with_one_parity_is_uncorrectable() {
    let mut ecc = EccCorrector::new();
    let parity = ecc.seal(0x1357_9BDF, 1).unwrap();
    assert_eq!(ecc.correct(0x1357_9BDF ^ 0x10, &parity), Err(EccError::Uncorrectable));
}

#[test]
fn parity_outside_field_is_rejected() {
    let mut ecc = EccCorrector::new();
    assert_eq!(
        ecc.correct(0, &[0x12, 0x1FF]),
        Err(EccError::InvalidSymbol { index: 1, value: 0x1FF })
    );
}

#[test]
fn parity_count_is_bounded_by_block_length() {
    let mut ecc = EccCorrector::new();
    assert_eq!(MAX_PARITY, 223);
    assert!(ecc.seal(1, MAX_PARITY).is_ok());
    assert_eq!(
        ecc.correct(0, &vec![0; MAX_PARITY + 1]),
        Err(EccError::TooManyParity { count: MAX_PARITY + 1, max: MAX_PARITY })
    );
}

#[test]
fn maximum_parity_corrects_many_flips() {
    let mut ecc = EccCorrector::new();
    let value = 0x8421_1248;
    let parity = ecc.seal(value, MAX_PARITY).unwrap();
    let received = !value;
    assert_eq!(ecc.correct(received, &parity), Ok(Corrected { value, errors: 32 }));
}

#[test]
fn decode_leaves_codeword_untouched_on_failure() {
    let code = ReedSolomon::new(8).unwrap();
    let message = [0u8, 1, 1, 0, 1, 0, 0, 1];
    let mut codeword = message.to_vec();
    codeword.extend(code.encode(&message).unwrap());
    for symbol in &mut codeword[..6] {
        *symbol ^= 0x5A;
    }
    let damaged = codeword.clone();
    assert!(code.decode(&mut codeword).is_err());
    assert_eq!(codeword, damaged);
}

/// Picks `count` distinct positions out of `len`.
fn positions(len: usize, count: usize, seed: &[prop::sample::Index]) -> Vec<usize> {
    let mut pool: Vec<usize> = (0..len).collect();
    seed.iter()
        .take(count)
        .map(|idx| pool.swap_remove(idx.index(pool.len())))
        .collect()
}

/// Corrupts the chosen symbols: data positions flip their bit, parity
/// positions take a different byte value.
fn corrupt(value: u32, parity: &[u16], hits: &[usize], noise: u8) -> (u32, Vec<u16>) {
    let mut raw = value;
    let mut parity = parity.to_vec();
    for &pos in hits {
        if pos < 32 {
            raw ^= 1 << (31 - pos);
        } else {
            parity[pos - 32] ^= u16::from(noise.max(1));
        }
    }
    (raw, parity)
}

proptest! {
    #[test]
    fn repairs_up_to_half_the_parity(
        value in any::<u32>(),
        k in 2usize..=24,
        seed in prop::collection::vec(any::<prop::sample::Index>(), 12),
        noise in any::<u8>(),
        load in any::<prop::sample::Index>(),
    ) {
        let mut ecc = EccCorrector::new();
        let parity = ecc.seal(value, k).unwrap();
        let errors = load.index(k / 2 + 1);
        let hits = positions(32 + k, errors, &seed);
        let (raw, parity) = corrupt(value, &parity, &hits, noise);

        prop_assert_eq!(ecc.correct(raw, &parity), Ok(Corrected { value, errors }));
    }

    #[test]
    fn heavier_damage_is_never_silently_accepted(
        value in any::<u32>(),
        k in 8usize..=16,
        extra in 1usize..=2,
        seed in prop::collection::vec(any::<prop::sample::Index>(), 10),
    ) {
        let mut ecc = EccCorrector::new();
        let parity = ecc.seal(value, k).unwrap();
        let hits = positions(32, k / 2 + extra, &seed);
        let (raw, parity) = corrupt(value, &parity, &hits, 0);

        prop_assert_eq!(ecc.correct(raw, &parity), Err(EccError::Uncorrectable));
    }
}
