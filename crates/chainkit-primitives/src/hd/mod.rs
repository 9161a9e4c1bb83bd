//! BIP-32 hierarchical deterministic keys.
//!
//! An `HdNode` is a key plus chain code at a position in the derivation
//! tree. Private nodes derive both hardened and normal children; public
//! (neutered) nodes derive normal children only. Nodes serialize to the
//! standard 78-byte extended key form under base58check.

use std::fmt;

use crate::base58;
use crate::ec::{PrivateKey, PublicKey, Signature};
use crate::hash::{hash160, sha512_hmac};
use crate::ids::Address;
use crate::PrimitivesError;

/// First hardened child index.
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Version bytes of a serialized extended private key (`xprv`).
pub const XPRV_VERSION: [u8; 4] = [0x04, 0x88, 0xAD, 0xE4];

/// Version bytes of a serialized extended public key (`xpub`).
pub const XPUB_VERSION: [u8; 4] = [0x04, 0x88, 0xB2, 0x1E];

/// Derivation path of the first account key on this network's coin type.
pub const DEFAULT_ACCOUNT_PATH: &str = "m/44'/9000'/0'";

const MASTER_HMAC_KEY: &[u8] = b"Bitcoin seed";
const EXTENDED_KEY_LEN: usize = 78;
const MIN_SEED_LEN: usize = 16;
const MAX_SEED_LEN: usize = 64;

#[derive(Clone, PartialEq, Eq)]
enum NodeKey {
    Private(PrivateKey),
    Public(PublicKey),
}

/// A node of the BIP-32 derivation tree.
#[derive(Clone, PartialEq, Eq)]
pub struct HdNode {
    key: NodeKey,
    chain_code: [u8; 32],
    depth: u8,
    parent_fingerprint: [u8; 4],
    child_number: u32,
}

impl HdNode {
    /// Build the master node from a seed.
    ///
    /// # Arguments
    /// * `seed` - Between 16 and 64 bytes of entropy.
    ///
    /// # Returns
    /// The master private node, or an error if the seed length is out of
    /// range or the derived scalar is invalid.
    pub fn from_seed(seed: &[u8]) -> Result<Self, PrimitivesError> {
        if !(MIN_SEED_LEN..=MAX_SEED_LEN).contains(&seed.len()) {
            return Err(PrimitivesError::InvalidKeyLength {
                expected: MAX_SEED_LEN,
                got: seed.len(),
            });
        }
        let i = sha512_hmac(MASTER_HMAC_KEY, seed);
        let key = PrivateKey::from_bytes(&i[..32])?;
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&i[32..]);
        Ok(HdNode {
            key: NodeKey::Private(key),
            chain_code,
            depth: 0,
            parent_fingerprint: [0u8; 4],
            child_number: 0,
        })
    }

    /// Parse a base58check `xprv` or `xpub` string.
    pub fn from_extended_key(s: &str) -> Result<Self, PrimitivesError> {
        let data = base58::check_decode(s)
            .map_err(|e| PrimitivesError::InvalidExtendedKey(e.to_string()))?;
        if data.len() != EXTENDED_KEY_LEN {
            return Err(PrimitivesError::InvalidExtendedKey(format!(
                "expected {} bytes, got {}",
                EXTENDED_KEY_LEN,
                data.len()
            )));
        }

        let mut version = [0u8; 4];
        version.copy_from_slice(&data[0..4]);
        let depth = data[4];
        let mut parent_fingerprint = [0u8; 4];
        parent_fingerprint.copy_from_slice(&data[5..9]);
        let mut child = [0u8; 4];
        child.copy_from_slice(&data[9..13]);
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&data[13..45]);
        let key_data = &data[45..78];

        let key = match version {
            XPRV_VERSION => {
                if key_data[0] != 0x00 {
                    return Err(PrimitivesError::InvalidExtendedKey(
                        "private key data must start with 0x00".to_string(),
                    ));
                }
                NodeKey::Private(PrivateKey::from_bytes(&key_data[1..])?)
            }
            XPUB_VERSION => NodeKey::Public(PublicKey::from_bytes(key_data)?),
            other => {
                return Err(PrimitivesError::InvalidExtendedKey(format!(
                    "unknown version {}",
                    hex::encode(other)
                )))
            }
        };

        if depth == 0 && (parent_fingerprint != [0u8; 4] || child != [0u8; 4]) {
            return Err(PrimitivesError::InvalidExtendedKey(
                "master key with non-zero parent".to_string(),
            ));
        }

        Ok(HdNode {
            key,
            chain_code,
            depth,
            parent_fingerprint,
            child_number: u32::from_be_bytes(child),
        })
    }

    /// Serialize as a base58check `xprv` string.
    ///
    /// # Returns
    /// The encoded key, or `InvalidExtendedKey` for a neutered node.
    pub fn to_extended_private_key(&self) -> Result<String, PrimitivesError> {
        match &self.key {
            NodeKey::Private(k) => {
                let mut key_data = [0u8; 33];
                key_data[1..].copy_from_slice(&k.to_bytes());
                Ok(self.serialize(XPRV_VERSION, &key_data))
            }
            NodeKey::Public(_) => Err(PrimitivesError::InvalidExtendedKey(
                "node has no private key".to_string(),
            )),
        }
    }

    /// Serialize as a base58check `xpub` string.
    pub fn to_extended_public_key(&self) -> String {
        self.serialize(XPUB_VERSION, &self.public_key().to_compressed())
    }

    fn serialize(&self, version: [u8; 4], key_data: &[u8; 33]) -> String {
        let mut data = Vec::with_capacity(EXTENDED_KEY_LEN);
        data.extend_from_slice(&version);
        data.push(self.depth);
        data.extend_from_slice(&self.parent_fingerprint);
        data.extend_from_slice(&self.child_number.to_be_bytes());
        data.extend_from_slice(&self.chain_code);
        data.extend_from_slice(key_data);
        base58::check_encode(&data)
    }

    /// Derive the child at `index`. Indices at or above `HARDENED_OFFSET`
    /// are hardened.
    ///
    /// # Returns
    /// The child node, `HardenedDerivationRequiresPrivateKey` for a hardened
    /// index on a neutered node, or an error for the (negligible) invalid
    /// child case.
    pub fn derive_child(&self, index: u32) -> Result<HdNode, PrimitivesError> {
        let parent_pub = self.public_key();
        let mut data = Vec::with_capacity(37);
        if index >= HARDENED_OFFSET {
            match &self.key {
                NodeKey::Private(k) => {
                    data.push(0x00);
                    data.extend_from_slice(&k.to_bytes());
                }
                NodeKey::Public(_) => {
                    return Err(PrimitivesError::HardenedDerivationRequiresPrivateKey)
                }
            }
        } else {
            data.extend_from_slice(&parent_pub.to_compressed());
        }
        data.extend_from_slice(&index.to_be_bytes());

        let i = sha512_hmac(&self.chain_code, &data);
        let mut tweak = [0u8; 32];
        tweak.copy_from_slice(&i[..32]);
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&i[32..]);

        let key = match &self.key {
            NodeKey::Private(k) => NodeKey::Private(k.tweak_add(&tweak)?),
            NodeKey::Public(p) => NodeKey::Public(p.tweak_add(&tweak)?),
        };

        Ok(HdNode {
            key,
            chain_code,
            depth: self.depth.checked_add(1).ok_or_else(|| {
                PrimitivesError::InvalidDerivationPath("maximum depth exceeded".to_string())
            })?,
            parent_fingerprint: fingerprint(&parent_pub),
            child_number: index,
        })
    }

    /// Derive along a path such as `m/44'/9000'/0'/0/0`.
    ///
    /// Hardened segments may be marked with `'`, `h` or `H`. The leading
    /// `m` is optional; an empty path or `m` returns this node.
    pub fn derive(&self, path: &str) -> Result<HdNode, PrimitivesError> {
        let mut node = self.clone();
        for index in parse_path(path)? {
            node = node.derive_child(index)?;
        }
        Ok(node)
    }

    /// Drop the private key, keeping the public half.
    pub fn neuter(&self) -> HdNode {
        HdNode {
            key: NodeKey::Public(self.public_key()),
            ..self.clone()
        }
    }

    /// The node's public key.
    pub fn public_key(&self) -> PublicKey {
        match &self.key {
            NodeKey::Private(k) => k.pub_key(),
            NodeKey::Public(p) => p.clone(),
        }
    }

    /// The node's private key, if it has one.
    pub fn private_key(&self) -> Option<&PrivateKey> {
        match &self.key {
            NodeKey::Private(k) => Some(k),
            NodeKey::Public(_) => None,
        }
    }

    /// The 20-byte address of the node's public key.
    pub fn address(&self) -> Address {
        self.public_key().address()
    }

    /// Sign a 32-byte hash with the node's private key.
    pub fn sign(&self, hash: &[u8]) -> Result<Signature, PrimitivesError> {
        match &self.key {
            NodeKey::Private(k) => k.sign(hash),
            NodeKey::Public(_) => Err(PrimitivesError::InvalidPrivateKey(
                "node has no private key".to_string(),
            )),
        }
    }

    /// Verify a signature against the node's public key.
    pub fn verify(&self, hash: &[u8], sig: &Signature) -> bool {
        self.public_key().verify(hash, sig)
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn child_number(&self) -> u32 {
        self.child_number
    }

    pub fn parent_fingerprint(&self) -> [u8; 4] {
        self.parent_fingerprint
    }

    /// First four bytes of the Hash160 of this node's public key.
    pub fn fingerprint(&self) -> [u8; 4] {
        fingerprint(&self.public_key())
    }
}

impl fmt::Debug for HdNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HdNode")
            .field("public_key", &self.public_key().to_hex())
            .field("private", &self.private_key().is_some())
            .field("depth", &self.depth)
            .field("child_number", &self.child_number)
            .finish()
    }
}

fn fingerprint(key: &PublicKey) -> [u8; 4] {
    let h = hash160(&key.to_compressed());
    [h[0], h[1], h[2], h[3]]
}

/// Parse a derivation path into child indices.
pub fn parse_path(path: &str) -> Result<Vec<u32>, PrimitivesError> {
    let trimmed = path.trim();
    let body = match trimmed.strip_prefix('m').or_else(|| trimmed.strip_prefix('M')) {
        Some(rest) => rest.strip_prefix('/').unwrap_or(rest),
        None => trimmed,
    };
    if body.is_empty() {
        return Ok(Vec::new());
    }

    body.split('/')
        .map(|segment| {
            let (digits, hardened) = match segment
                .strip_suffix('\'')
                .or_else(|| segment.strip_suffix('h'))
                .or_else(|| segment.strip_suffix('H'))
            {
                Some(d) => (d, true),
                None => (segment, false),
            };
            let index: u32 = digits.parse().map_err(|_| {
                PrimitivesError::InvalidDerivationPath(format!("bad segment {segment:?}"))
            })?;
            if index >= HARDENED_OFFSET {
                return Err(PrimitivesError::InvalidDerivationPath(format!(
                    "index {index} out of range"
                )));
            }
            Ok(if hardened { index + HARDENED_OFFSET } else { index })
        })
        .collect()
}
