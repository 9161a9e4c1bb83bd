//! secp256k1 private key.
//!
//! Wraps the k256 signing key and adds the `PrivateKey-<cb58>` string form,
//! recoverable signing over 32-byte hashes, and the scalar tweak used by
//! hierarchical derivation.

use k256::ecdsa::SigningKey;
use k256::elliptic_curve::PrimeField;
use k256::Scalar;
use rand::rngs::OsRng;
use zeroize::{ZeroizeOnDrop, Zeroizing};

use crate::base58;
use crate::ec::public_key::PublicKey;
use crate::ec::signature::Signature;
use crate::ids::Address;
use crate::PrimitivesError;

/// Prefix of the human-readable private key form.
pub const PRIVATE_KEY_PREFIX: &str = "PrivateKey-";

/// Length of a serialized private key in bytes.
const PRIVATE_KEY_BYTES_LEN: usize = 32;

/// A secp256k1 private key used to sign transaction hashes.
#[derive(Clone, Debug)]
pub struct PrivateKey {
    /// The underlying k256 signing key.
    inner: SigningKey,
}

impl PrivateKey {
    /// Generate a new random private key using the OS random number generator.
    pub fn new() -> Self {
        PrivateKey {
            inner: SigningKey::random(&mut OsRng),
        }
    }

    /// Create a private key from a raw 32-byte scalar.
    ///
    /// # Arguments
    /// * `bytes` - A 32-byte big-endian scalar.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` if the scalar is in `[1, n)`, or `InvalidPrivateKey`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != PRIVATE_KEY_BYTES_LEN {
            return Err(PrimitivesError::InvalidPrivateKey(format!(
                "expected {} bytes, got {}",
                PRIVATE_KEY_BYTES_LEN,
                bytes.len()
            )));
        }
        let signing_key = SigningKey::from_bytes(bytes.into())
            .map_err(|e| PrimitivesError::InvalidPrivateKey(e.to_string()))?;
        Ok(PrivateKey { inner: signing_key })
    }

    /// Create a private key from a hexadecimal string.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        if hex_str.is_empty() {
            return Err(PrimitivesError::InvalidPrivateKey(
                "private key hex is empty".to_string(),
            ));
        }
        let bytes = Zeroizing::new(hex::decode(hex_str)?);
        Self::from_bytes(&bytes)
    }

    /// Parse the `PrivateKey-<cb58>` form.
    ///
    /// The bare cb58 body without the prefix is accepted as well.
    ///
    /// # Arguments
    /// * `s` - The encoded key.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` on success, or an error if the checksum or scalar is invalid.
    pub fn from_cb58_string(s: &str) -> Result<Self, PrimitivesError> {
        let body = s.strip_prefix(PRIVATE_KEY_PREFIX).unwrap_or(s);
        let bytes = Zeroizing::new(base58::check_decode(body)?);
        Self::from_bytes(&bytes)
    }

    /// Encode the key as `PrivateKey-<cb58>`.
    pub fn to_cb58_string(&self) -> String {
        let bytes = Zeroizing::new(self.to_bytes());
        format!("{}{}", PRIVATE_KEY_PREFIX, base58::check_encode(bytes.as_ref()))
    }

    /// Serialize the private key as a 32-byte big-endian array.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.inner.to_bytes());
        out
    }

    /// Serialize the private key as a lowercase hexadecimal string.
    pub fn to_hex(&self) -> String {
        hex::encode(Zeroizing::new(self.to_bytes()).as_ref())
    }

    /// Derive the corresponding public key.
    pub fn pub_key(&self) -> PublicKey {
        PublicKey::from_k256_verifying_key(self.inner.verifying_key())
    }

    /// The 20-byte address controlled by this key.
    pub fn address(&self) -> Address {
        self.pub_key().address()
    }

    /// Sign a 32-byte hash, producing a 65-byte recoverable signature.
    ///
    /// # Arguments
    /// * `hash` - The digest to sign. Must be exactly 32 bytes.
    ///
    /// # Returns
    /// `Ok(Signature)` on success, or `InvalidSignature` if the hash has the
    /// wrong length.
    pub fn sign(&self, hash: &[u8]) -> Result<Signature, PrimitivesError> {
        Signature::sign(hash, self)
    }

    /// Add a tweak scalar to this key: `k' = k + tweak (mod n)`.
    ///
    /// Fails if the tweak is not a canonical scalar or the sum is zero.
    pub(crate) fn tweak_add(&self, tweak: &[u8; 32]) -> Result<PrivateKey, PrimitivesError> {
        let tweak: Option<Scalar> = Scalar::from_repr((*tweak).into()).into();
        let tweak = tweak.ok_or_else(|| {
            PrimitivesError::InvalidPrivateKey("tweak is not below the curve order".to_string())
        })?;
        let sum = self.to_scalar() + tweak;
        PrivateKey::from_bytes(&sum.to_repr())
    }

    /// Access the underlying k256 `SigningKey`.
    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.inner
    }

    fn to_scalar(&self) -> Scalar {
        *self.inner.as_nonzero_scalar().as_ref()
    }
}

impl Default for PrivateKey {
    fn default() -> Self {
        Self::new()
    }
}

// The k256 signing key wipes its scalar when dropped.
impl ZeroizeOnDrop for PrivateKey {}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PrivateKey {}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_BYTES: [u8; 32] = [
        0xea, 0xf0, 0x2c, 0xa3, 0x48, 0xc5, 0x24, 0xe6, 0x39, 0x26, 0x55, 0xba, 0x4d, 0x29,
        0x60, 0x3c, 0xd1, 0xa7, 0x34, 0x7d, 0x9d, 0x65, 0xcf, 0xe9, 0x3c, 0xe1, 0xeb, 0xff,
        0xdc, 0xa2, 0x26, 0x94,
    ];

    fn assert_zeroize_on_drop<T: ZeroizeOnDrop>() {}

    #[test]
    fn test_key_material_is_wiped_on_drop() {
        assert_zeroize_on_drop::<SigningKey>();
        assert_zeroize_on_drop::<PrivateKey>();
    }

    #[test]
    fn test_priv_keys() {
        let priv_key = PrivateKey::from_bytes(&KEY_BYTES).unwrap();
        let pub_key = priv_key.pub_key();

        let uncompressed = pub_key.to_uncompressed();
        let _parsed = PublicKey::from_bytes(&uncompressed).unwrap();

        let hash = crate::hash::sha256(b"chainkit");
        let sig = priv_key.sign(&hash).unwrap();
        assert!(pub_key.verify(&hash, &sig));

        assert_eq!(priv_key.to_bytes(), KEY_BYTES);
    }

    #[test]
    fn test_private_key_serialization_and_deserialization() {
        let pk = PrivateKey::new();

        let deserialized = PrivateKey::from_bytes(&pk.to_bytes()).unwrap();
        assert_eq!(pk, deserialized);

        let deserialized = PrivateKey::from_hex(&pk.to_hex()).unwrap();
        assert_eq!(pk, deserialized);

        let encoded = pk.to_cb58_string();
        assert!(encoded.starts_with(PRIVATE_KEY_PREFIX));
        let deserialized = PrivateKey::from_cb58_string(&encoded).unwrap();
        assert_eq!(pk, deserialized);

        let bare = &encoded[PRIVATE_KEY_PREFIX.len()..];
        assert_eq!(PrivateKey::from_cb58_string(bare).unwrap(), pk);
    }

    #[test]
    fn test_private_key_from_invalid_input() {
        assert!(PrivateKey::from_hex("").is_err());
        assert!(PrivateKey::from_hex("zz").is_err());
        assert!(PrivateKey::from_bytes(&[0u8; 32]).is_err());
        assert!(PrivateKey::from_bytes(&[1u8; 31]).is_err());

        let mut encoded = PrivateKey::from_bytes(&KEY_BYTES).unwrap().to_cb58_string();
        let last = encoded.pop().unwrap();
        encoded.push(if last == '2' { '3' } else { '2' });
        assert!(PrivateKey::from_cb58_string(&encoded).is_err());
    }

    #[test]
    fn test_sign_rejects_short_hash() {
        let key = PrivateKey::from_bytes(&KEY_BYTES).unwrap();
        assert!(matches!(
            key.sign(&[1u8; 31]),
            Err(PrimitivesError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_tweak_add_matches_public_tweak() {
        let key = PrivateKey::from_bytes(&KEY_BYTES).unwrap();
        let mut tweak = [0u8; 32];
        tweak[31] = 5;
        let child = key.tweak_add(&tweak).unwrap();
        let child_pub = key.pub_key().tweak_add(&tweak).unwrap();
        assert_eq!(child.pub_key(), child_pub);
    }

    #[test]
    fn test_tweak_add_rejects_out_of_range() {
        let key = PrivateKey::from_bytes(&KEY_BYTES).unwrap();
        assert!(key.tweak_add(&[0xff; 32]).is_err());
    }
}
