//! Fixed-width big-endian integer conversions.
//!
//! Amounts and other numeric fields travel as fixed-width big-endian
//! buffers. These helpers move between those buffers and arbitrary
//! precision integers with an explicit byte width.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::PrimitivesError;

/// Encode `value` as exactly `width` big-endian bytes, left-padded with zeros.
///
/// # Returns
/// The encoded buffer, or `NumberTooLarge` if `value` needs more than
/// `width` bytes.
pub fn from_big_int(value: &BigUint, width: usize) -> Result<Vec<u8>, PrimitivesError> {
    let raw = if value.is_zero() {
        Vec::new()
    } else {
        value.to_bytes_be()
    };
    if raw.len() > width {
        return Err(PrimitivesError::NumberTooLarge { width });
    }
    let mut out = vec![0u8; width];
    out[width - raw.len()..].copy_from_slice(&raw);
    Ok(out)
}

/// Interpret a big-endian buffer of any width as an unsigned integer.
pub fn to_big_int(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

/// Encode a `u64` into `width` big-endian bytes.
pub fn u64_to_width(value: u64, width: usize) -> Result<Vec<u8>, PrimitivesError> {
    from_big_int(&BigUint::from(value), width)
}

/// Decode a big-endian buffer of at most eight significant bytes into a `u64`.
pub fn width_to_u64(bytes: &[u8]) -> Result<u64, PrimitivesError> {
    let value = to_big_int(bytes);
    let digits = value.to_u64_digits();
    match digits.as_slice() {
        [] => Ok(0),
        [v] => Ok(*v),
        _ => Err(PrimitivesError::NumberTooLarge { width: 8 }),
    }
}
