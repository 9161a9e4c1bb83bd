//! Base58 encoding and the checksummed cb58 form.
//!
//! cb58 is `base58(payload || checksum)` where the checksum is the first
//! four bytes of SHA-256d(payload). It is the human-facing form of
//! transaction IDs, asset IDs, blockchain IDs, serialized UTXOs and
//! private keys.

use crate::PrimitivesError;
use crate::hash::sha256d;

/// The Base58 alphabet.
///
/// Excludes 0, O, I, l to reduce visual ambiguity.
const ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Length of the cb58 checksum suffix.
pub const CHECKSUM_LEN: usize = 4;

/// Encode a byte slice to a Base58 string.
///
/// Leading zero bytes are encoded as leading '1' characters.
pub fn encode(data: &[u8]) -> String {
    bs58::encode(data).with_alphabet(bs58::Alphabet::BITCOIN).into_string()
}

/// Decode a Base58 string to a byte vector.
///
/// Characters outside the alphabet are rejected before decoding.
///
/// # Returns
/// `Ok(Vec<u8>)` on success, or `InvalidBase58` for invalid characters.
pub fn decode(s: &str) -> Result<Vec<u8>, PrimitivesError> {
    if let Some(bad) = s.bytes().find(|b| !ALPHABET.contains(b)) {
        return Err(PrimitivesError::InvalidBase58(format!(
            "character {:?} is not in the base58 alphabet",
            bad as char
        )));
    }
    bs58::decode(s)
        .with_alphabet(bs58::Alphabet::BITCOIN)
        .into_vec()
        .map_err(|e| PrimitivesError::InvalidBase58(e.to_string()))
}

/// Return true when every character of `s` belongs to the Base58 alphabet.
pub fn is_valid(s: &str) -> bool {
    s.bytes().all(|b| ALPHABET.contains(&b))
}

/// Append the 4-byte SHA-256d checksum to `data`.
pub fn add_checksum(data: &[u8]) -> Vec<u8> {
    let checksum = sha256d(data);
    let mut payload = Vec::with_capacity(data.len() + CHECKSUM_LEN);
    payload.extend_from_slice(data);
    payload.extend_from_slice(&checksum[..CHECKSUM_LEN]);
    payload
}

/// Verify and strip the trailing 4-byte SHA-256d checksum.
///
/// # Returns
/// The payload without its checksum, or `ChecksumMismatch`.
pub fn strip_checksum(data: &[u8]) -> Result<Vec<u8>, PrimitivesError> {
    if data.len() < CHECKSUM_LEN {
        return Err(PrimitivesError::InvalidBase58(
            "data too short for checksum".to_string(),
        ));
    }
    let (payload, checksum) = data.split_at(data.len() - CHECKSUM_LEN);
    let expected = sha256d(payload);
    if checksum != &expected[..CHECKSUM_LEN] {
        return Err(PrimitivesError::ChecksumMismatch);
    }
    Ok(payload.to_vec())
}

/// Encode a byte slice as cb58: Base58 of the payload with its checksum.
pub fn check_encode(data: &[u8]) -> String {
    encode(&add_checksum(data))
}

/// Decode a cb58 string, verifying the 4-byte checksum.
///
/// # Returns
/// `Ok(Vec<u8>)` of the payload (without checksum) on success, or an
/// error for invalid encoding or checksum mismatch.
pub fn check_decode(s: &str) -> Result<Vec<u8>, PrimitivesError> {
    strip_checksum(&decode(s)?)
}
