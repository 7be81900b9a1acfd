//! Failure maps.
//!
//! When a proposal executes its actions, bit `i` of the failure map tells
//! the DAO whether action `i` is allowed to revert without reverting the
//! whole execution.
use ethereum_types::U256;
use thiserror::Error;

/// The number of entries a failure map holds.
pub const BITMAP_SIZE: usize = 256;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BitmapError {
    #[error("the array is too big: {0} entries, at most {} are allowed", BITMAP_SIZE)]
    TooManyEntries(usize),

    #[error("the bitmap value is too big")]
    BitmapTooLarge,

    #[error("invalid bitmap")]
    InvalidBitmap,
}

/// Sets bit `i` for every `true` entry. An empty slice gives `0`.
pub fn bool_array_to_bitmap(bools: &[bool]) -> Result<U256, BitmapError> {
    if bools.len() > BITMAP_SIZE {
        return Err(BitmapError::TooManyEntries(bools.len()));
    }
    Ok(bools
        .iter()
        .enumerate()
        .filter(|(_, allowed)| **allowed)
        .fold(U256::zero(), |bitmap, (i, _)| bitmap | (U256::one() << i)))
}

pub fn bitmap_to_bool_array(bitmap: U256) -> [bool; BITMAP_SIZE] {
    let mut bools = [false; BITMAP_SIZE];
    for (i, entry) in bools.iter_mut().enumerate() {
        *entry = bitmap.bit(i);
    }
    bools
}

/// Parses a bitmap given either as a decimal number or as a `0x` prefixed
/// hex number, as the indexer and the contract events expose it.
pub fn parse_bitmap(s: &str) -> Result<U256, BitmapError> {
    match s.strip_prefix("0x") {
        Some(digits) => {
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(BitmapError::InvalidBitmap);
            }
            let digits = digits.trim_start_matches('0');
            if digits.len() > BITMAP_SIZE / 4 {
                return Err(BitmapError::BitmapTooLarge);
            }
            let padded = format!("{:0>64}", digits);
            let bytes = hex::decode(padded).map_err(|_| BitmapError::InvalidBitmap)?;
            Ok(U256::from_big_endian(&bytes))
        }
        None => U256::from_dec_str(s).map_err(|e| match e {
            ethereum_types::FromDecStrErr::InvalidLength => BitmapError::BitmapTooLarge,
            ethereum_types::FromDecStrErr::InvalidCharacter => BitmapError::InvalidBitmap,
        }),
    }
}

/// Same as [`bitmap_to_bool_array`] for a textual bitmap.
pub fn parse_bitmap_to_bool_array(s: &str) -> Result<[bool; BITMAP_SIZE], BitmapError> {
    parse_bitmap(s).map(bitmap_to_bool_array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::{collection::vec, prelude::*};
    use test_strategy::proptest;

    #[test]
    fn bools_to_bitmap() {
        assert_eq!(bool_array_to_bitmap(&[]), Ok(U256::zero()));
        assert_eq!(bool_array_to_bitmap(&[false]), Ok(U256::zero()));
        assert_eq!(bool_array_to_bitmap(&[true]), Ok(U256::from(1)));
        assert_eq!(bool_array_to_bitmap(&[true, false, true]), Ok(U256::from(5)));
        assert_eq!(
            bool_array_to_bitmap(&[false, false, false, true]),
            Ok(U256::from(8))
        );
        assert_eq!(bool_array_to_bitmap(&[true; 256]), Ok(U256::MAX));
        assert_eq!(
            bool_array_to_bitmap(&[false; 257]),
            Err(BitmapError::TooManyEntries(257))
        );
    }

    #[test]
    fn bitmap_to_bools() {
        let bools = bitmap_to_bool_array(U256::from(5));
        assert_eq!(bools.len(), BITMAP_SIZE);
        assert_eq!(&bools[..4], &[true, false, true, false]);
        assert!(bools[4..].iter().all(|b| !b));

        let bools = bitmap_to_bool_array(U256::one() << 255);
        assert!(bools[255]);
        assert!(bools[..255].iter().all(|b| !b));
    }

    #[test]
    fn three_entries_round_trip() {
        let bitmap = bool_array_to_bitmap(&[true, false, true]).unwrap();
        let mut expected = [false; BITMAP_SIZE];
        expected[0] = true;
        expected[2] = true;
        assert_eq!(bitmap_to_bool_array(bitmap), expected);
    }

    #[test]
    fn textual_bitmaps() {
        assert_eq!(parse_bitmap("5"), Ok(U256::from(5)));
        assert_eq!(parse_bitmap("0x05"), Ok(U256::from(5)));
        assert_eq!(parse_bitmap(&format!("0x{}", "f".repeat(64))), Ok(U256::MAX));
        assert_eq!(
            parse_bitmap(&format!("0x1{}", "0".repeat(64))),
            Err(BitmapError::BitmapTooLarge)
        );
        // 2^256
        assert_eq!(
            parse_bitmap(
                "115792089237316195423570985008687907853269984665640564039457584007913129639936"
            ),
            Err(BitmapError::BitmapTooLarge)
        );
        assert_eq!(parse_bitmap("0x"), Err(BitmapError::InvalidBitmap));
        assert_eq!(parse_bitmap("12a"), Err(BitmapError::InvalidBitmap));
        assert_eq!(
            parse_bitmap_to_bool_array("2").map(|bools| bools[1]),
            Ok(true)
        );
    }

    #[proptest]
    fn bools_round_trip(#[strategy(vec(any::<bool>(), 0..=BITMAP_SIZE))] bools: Vec<bool>) {
        let bitmap = bool_array_to_bitmap(&bools).unwrap();
        let decoded = bitmap_to_bool_array(bitmap);
        prop_assert_eq!(&decoded[..bools.len()], &bools[..]);
        prop_assert!(decoded[bools.len()..].iter().all(|b| !b));
    }
}
