//! 65-byte recoverable ECDSA signature: `r (32) || s (32) || v (1)`.
//!
//! Signatures are produced with RFC6979 deterministic nonces and are always
//! low-S; `v` is the recovery id in `0..=3`. Credentials carry these bytes
//! verbatim and the signer is recovered from the hash alone.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{self, RecoveryId, VerifyingKey};

use crate::ec::private_key::PrivateKey;
use crate::ec::public_key::PublicKey;
use crate::ids::Address;
use crate::PrimitivesError;

/// Serialized length of a recoverable signature.
pub const SIGNATURE_LEN: usize = 65;

/// Length of the digest a signature commits to.
pub const HASH_LEN: usize = 32;

/// A recoverable secp256k1 ECDSA signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    /// The R component (32 bytes, big-endian).
    r: [u8; 32],
    /// The S component (32 bytes, big-endian, low-S).
    s: [u8; 32],
    /// Recovery id.
    v: u8,
}

impl Signature {
    /// Access the R component.
    pub fn r(&self) -> &[u8; 32] {
        &self.r
    }

    /// Access the S component.
    pub fn s(&self) -> &[u8; 32] {
        &self.s
    }

    /// Access the recovery id.
    pub fn v(&self) -> u8 {
        self.v
    }

    /// Parse the 65-byte `r || s || v` form.
    ///
    /// # Arguments
    /// * `bytes` - Exactly 65 bytes.
    ///
    /// # Returns
    /// `Ok(Signature)` if `r` and `s` are valid non-zero scalars and `v` is a
    /// valid recovery id, or `InvalidSignature`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != SIGNATURE_LEN {
            return Err(PrimitivesError::InvalidSignature(format!(
                "expected {} bytes, got {}",
                SIGNATURE_LEN,
                bytes.len()
            )));
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        let v = bytes[64];
        if RecoveryId::from_byte(v).is_none() {
            return Err(PrimitivesError::InvalidSignature(format!(
                "invalid recovery id {v}"
            )));
        }
        let sig = Signature { r, s, v };
        sig.to_k256()?;
        Ok(sig)
    }

    /// Serialize as `r || s || v`.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        let mut out = [0u8; SIGNATURE_LEN];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v;
        out
    }

    /// Sign a 32-byte hash with RFC6979 nonces.
    ///
    /// The k256 signer normalizes to low-S and adjusts the recovery id to
    /// match, so the result always recovers to the signer's key.
    ///
    /// # Arguments
    /// * `hash` - The digest to sign. Must be exactly 32 bytes.
    /// * `priv_key` - The private key to sign with.
    pub fn sign(hash: &[u8], priv_key: &PrivateKey) -> Result<Self, PrimitivesError> {
        check_hash(hash)?;
        let (k256_sig, recovery_id) = priv_key
            .signing_key()
            .sign_prehash_recoverable(hash)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;

        let (r_bytes, s_bytes) = k256_sig.split_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&r_bytes);
        s.copy_from_slice(&s_bytes);

        Ok(Signature {
            r,
            s,
            v: recovery_id.to_byte(),
        })
    }

    /// Verify this signature against a hash and public key.
    pub fn verify(&self, hash: &[u8], pub_key: &PublicKey) -> bool {
        if check_hash(hash).is_err() {
            return false;
        }
        match self.to_k256() {
            Ok(sig) => pub_key.verifying_key().verify_prehash(hash, &sig).is_ok(),
            Err(_) => false,
        }
    }

    /// Recover the public key that produced this signature over `hash`.
    pub fn recover_public_key(&self, hash: &[u8]) -> Result<PublicKey, PrimitivesError> {
        check_hash(hash)?;
        let recovery_id = RecoveryId::from_byte(self.v).ok_or_else(|| {
            PrimitivesError::InvalidSignature(format!("invalid recovery id {}", self.v))
        })?;
        let sig = self.to_k256()?;
        let recovered = VerifyingKey::recover_from_prehash(hash, &sig, recovery_id)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
        Ok(PublicKey::from_k256_verifying_key(&recovered))
    }

    /// Recover the signer's 20-byte address.
    pub fn recover_address(&self, hash: &[u8]) -> Result<Address, PrimitivesError> {
        Ok(self.recover_public_key(hash)?.address())
    }

    fn to_k256(&self) -> Result<ecdsa::Signature, PrimitivesError> {
        ecdsa::Signature::from_scalars(
            k256::FieldBytes::from(self.r),
            k256::FieldBytes::from(self.s),
        )
        .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({})", hex::encode(self.to_bytes()))
    }
}

fn check_hash(hash: &[u8]) -> Result<(), PrimitivesError> {
    if hash.len() != HASH_LEN {
        return Err(PrimitivesError::InvalidSignature(format!(
            "expected a {}-byte hash, got {}",
            HASH_LEN,
            hash.len()
        )));
    }
    Ok(())
}
