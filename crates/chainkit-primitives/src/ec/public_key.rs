//! secp256k1 public key.
//!
//! Supports compressed/uncompressed serialization, address derivation,
//! signature verification and the point tweak used by public hierarchical
//! derivation.

use k256::ecdsa::VerifyingKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::PrimeField;
use k256::{ProjectivePoint, Scalar};
use std::fmt;

use crate::ec::signature::Signature;
use crate::hash::hash160;
use crate::ids::Address;
use crate::PrimitivesError;

/// Length of a compressed public key in bytes (prefix + 32 byte x-coordinate).
pub const COMPRESSED_LEN: usize = 33;

/// Length of an uncompressed public key in bytes (prefix + 32 byte x + 32 byte y).
const UNCOMPRESSED_LEN: usize = 65;

/// A secp256k1 public key.
#[derive(Clone, Debug)]
pub struct PublicKey {
    /// The underlying k256 verifying key.
    inner: VerifyingKey,
}

impl PublicKey {
    /// Create a PublicKey from raw SEC1 encoded bytes.
    ///
    /// Accepts both compressed (33-byte) and uncompressed (65-byte) formats.
    ///
    /// # Arguments
    /// * `bytes` - SEC1-encoded public key bytes.
    ///
    /// # Returns
    /// `Ok(PublicKey)` on success, or an error if the bytes don't represent a valid point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.is_empty() {
            return Err(PrimitivesError::InvalidPublicKey(
                "pubkey bytes are empty".to_string(),
            ));
        }
        let vk = VerifyingKey::from_sec1_bytes(bytes)?;
        Ok(PublicKey { inner: vk })
    }

    /// Create a PublicKey from a hex-encoded SEC1 string.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Serialize the public key in 33-byte compressed form.
    pub fn to_compressed(&self) -> [u8; COMPRESSED_LEN] {
        let encoded = self.inner.to_encoded_point(true);
        let mut out = [0u8; COMPRESSED_LEN];
        out.copy_from_slice(encoded.as_bytes());
        out
    }

    /// Serialize the public key in 65-byte uncompressed form.
    pub fn to_uncompressed(&self) -> [u8; UNCOMPRESSED_LEN] {
        let encoded = self.inner.to_encoded_point(false);
        let mut out = [0u8; UNCOMPRESSED_LEN];
        out.copy_from_slice(encoded.as_bytes());
        out
    }

    /// Compressed form as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_compressed())
    }

    /// The 20-byte address: `ripemd160(sha256(compressed))`.
    pub fn address(&self) -> Address {
        Address::new(hash160(&self.to_compressed()))
    }

    /// Verify a recoverable signature over a 32-byte hash.
    pub fn verify(&self, hash: &[u8], sig: &Signature) -> bool {
        sig.verify(hash, self)
    }

    /// Add `tweak * G` to this point.
    ///
    /// Fails if the tweak is not a canonical scalar or the result is the
    /// point at infinity.
    pub(crate) fn tweak_add(&self, tweak: &[u8; 32]) -> Result<PublicKey, PrimitivesError> {
        let tweak: Option<Scalar> = Scalar::from_repr((*tweak).into()).into();
        let tweak = tweak.ok_or_else(|| {
            PrimitivesError::InvalidPublicKey("tweak is not below the curve order".to_string())
        })?;
        let point = ProjectivePoint::GENERATOR * tweak + self.to_projective_point();
        let encoded = point.to_affine().to_encoded_point(true);
        PublicKey::from_bytes(encoded.as_bytes())
    }

    /// Construct a PublicKey from a k256 `VerifyingKey`.
    pub(crate) fn from_k256_verifying_key(vk: &VerifyingKey) -> Self {
        PublicKey { inner: *vk }
    }

    pub(crate) fn to_projective_point(&self) -> ProjectivePoint {
        ProjectivePoint::from(*self.inner.as_affine())
    }

    /// Access the underlying k256 `VerifyingKey`.
    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.inner
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_compressed() == other.to_compressed()
    }
}

impl Eq for PublicKey {}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ec::PrivateKey;

    const COMPRESSED_EVEN: [u8; 33] = [
        0x02, 0xce, 0x0b, 0x14, 0xfb, 0x84, 0x2b, 0x1b, 0xa5, 0x49, 0xfd, 0xd6, 0x75, 0xc9,
        0x80, 0x75, 0xf1, 0x2e, 0x9c, 0x51, 0x0f, 0x8e, 0xf5, 0x2b, 0xd0, 0x21, 0xa9, 0xa1,
        0xf4, 0x80, 0x9d, 0x3b, 0x4d,
    ];

    const COMPRESSED_ODD: [u8; 33] = [
        0x03, 0x26, 0x89, 0xc7, 0xc2, 0xda, 0xb1, 0x33, 0x09, 0xfb, 0x14, 0x3e, 0x0e, 0x8f,
        0xe3, 0x96, 0x34, 0x25, 0x21, 0x88, 0x7e, 0x97, 0x66, 0x90, 0xb6, 0xb4, 0x7f, 0x5b,
        0x2a, 0x4b, 0x7d, 0x44, 0x8e,
    ];

    #[test]
    fn test_pub_keys() {
        struct PubKeyTest {
            name: &'static str,
            key: Vec<u8>,
            is_valid: bool,
        }

        let uncompressed = vec![
            0x04, 0x11, 0xdb, 0x93, 0xe1, 0xdc, 0xdb, 0x8a, 0x01, 0x6b, 0x49, 0x84, 0x0f, 0x8c,
            0x53, 0xbc, 0x1e, 0xb6, 0x8a, 0x38, 0x2e, 0x97, 0xb1, 0x48, 0x2e, 0xca, 0xd7, 0xb1,
            0x48, 0xa6, 0x90, 0x9a, 0x5c, 0xb2, 0xe0, 0xea, 0xdd, 0xfb, 0x84, 0xcc, 0xf9, 0x74,
            0x44, 0x64, 0xf8, 0x2e, 0x16, 0x0b, 0xfa, 0x9b, 0x8b, 0x64, 0xf9, 0xd4, 0xc0, 0x3f,
            0x99, 0x9b, 0x86, 0x43, 0xf6, 0x56, 0xb4, 0x12, 0xa3,
        ];
        let mut x_changed = uncompressed.clone();
        x_changed[1] = 0x15;

        let tests = vec![
            PubKeyTest { name: "uncompressed ok", key: uncompressed, is_valid: true },
            PubKeyTest { name: "uncompressed x changed", key: x_changed, is_valid: false },
            PubKeyTest { name: "compressed ok (ybit = 0)", key: COMPRESSED_EVEN.to_vec(), is_valid: true },
            PubKeyTest { name: "compressed ok (ybit = 1)", key: COMPRESSED_ODD.to_vec(), is_valid: true },
            PubKeyTest { name: "wrong length", key: vec![0x05], is_valid: false },
            PubKeyTest { name: "empty", key: vec![], is_valid: false },
        ];

        for test in &tests {
            let result = PublicKey::from_bytes(&test.key);
            assert_eq!(result.is_ok(), test.is_valid, "{}", test.name);
        }
    }

    #[test]
    fn test_public_key_is_equal() {
        let pk1 = PublicKey::from_bytes(&COMPRESSED_ODD).unwrap();
        let pk2 = PublicKey::from_bytes(&COMPRESSED_EVEN).unwrap();
        assert_eq!(pk1, pk1.clone());
        assert_ne!(pk1, pk2);
    }

    #[test]
    fn test_compressed_round_trip() {
        let pk = PublicKey::from_bytes(&COMPRESSED_EVEN).unwrap();
        assert_eq!(pk.to_compressed(), COMPRESSED_EVEN);
        let again = PublicKey::from_bytes(&pk.to_uncompressed()).unwrap();
        assert_eq!(again, pk);
    }

    #[test]
    fn test_display() {
        let pk = PublicKey::from_bytes(&COMPRESSED_EVEN).unwrap();
        assert_eq!(
            format!("{}", pk),
            "02ce0b14fb842b1ba549fdd675c98075f12e9c510f8ef52bd021a9a1f4809d3b4d"
        );
        assert_eq!(PublicKey::from_hex(&pk.to_hex()).unwrap(), pk);
    }

    #[test]
    fn test_address_is_hash160_of_compressed() {
        let pk = PublicKey::from_bytes(&COMPRESSED_EVEN).unwrap();
        assert_eq!(pk.address().as_bytes(), &hash160(&COMPRESSED_EVEN));
    }

    #[test]
    fn test_generator_address() {
        // Private key 1 maps to the generator point.
        let mut one = [0u8; 32];
        one[31] = 1;
        let key = PrivateKey::from_bytes(&one).unwrap();
        assert_eq!(
            key.pub_key().to_hex(),
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
        assert_eq!(
            key.address().to_hex(),
            "751e76e8199196d454941c45d1b3a323f1433bd6"
        );
    }
}
