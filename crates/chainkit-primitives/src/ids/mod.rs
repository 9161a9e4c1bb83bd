//! Fixed-length identifiers.
//!
//! `Id` is the 32-byte content identifier (hash of defining data) used for
//! transactions, assets, blockchains and subnets; it is displayed as cb58.
//! `Address` is the 20-byte public-key hash; `NodeId` is a 20-byte
//! validator identity displayed as `NodeID-<cb58>`.
//! Equality is byte equality for all three.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::base58;
use crate::PrimitivesError;

/// Size of an `Id` in bytes.
pub const ID_LEN: usize = 32;

/// Size of an `Address` or `NodeId` in bytes.
pub const SHORT_ID_LEN: usize = 20;

/// Prefix of the human-readable node identity.
const NODE_ID_PREFIX: &str = "NodeID-";

/// A 32-byte content identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Id([u8; ID_LEN]);

/// Hash of an asset's creation transaction.
pub type AssetId = Id;
/// Identifier of a blockchain.
pub type BlockchainId = Id;
/// Hash of a signed transaction.
pub type TxId = Id;
/// Identifier of a subnet.
pub type SubnetId = Id;

impl Id {
    /// The all-zero identifier.
    pub const EMPTY: Id = Id([0u8; ID_LEN]);

    /// Create an `Id` from a raw 32-byte array.
    pub const fn new(bytes: [u8; ID_LEN]) -> Self {
        Id(bytes)
    }

    /// Create an `Id` from a byte slice that must be exactly 32 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let arr: [u8; ID_LEN] = bytes.try_into().map_err(|_| {
            PrimitivesError::InvalidId(format!(
                "invalid id length of {}, want {}",
                bytes.len(),
                ID_LEN
            ))
        })?;
        Ok(Id(arr))
    }

    /// Parse a cb58-encoded identifier.
    pub fn from_cb58(s: &str) -> Result<Self, PrimitivesError> {
        Self::from_slice(&base58::check_decode(s)?)
    }

    /// Encode the identifier as cb58.
    pub fn to_cb58(&self) -> String {
        base58::check_encode(&self.0)
    }

    /// Access the raw bytes.
    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }

    /// Return true for the all-zero identifier.
    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; ID_LEN]
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_cb58())
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.to_cb58())
    }
}

impl FromStr for Id {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_cb58(s)
    }
}

impl From<[u8; ID_LEN]> for Id {
    fn from(bytes: [u8; ID_LEN]) -> Self {
        Id(bytes)
    }
}

impl AsRef<[u8]> for Id {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_cb58())
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Id::from_cb58(&s).map_err(serde::de::Error::custom)
    }
}

/// A 20-byte public-key hash identifying the owner of an output.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; SHORT_ID_LEN]);

impl Address {
    /// Create an `Address` from a raw 20-byte array.
    pub const fn new(bytes: [u8; SHORT_ID_LEN]) -> Self {
        Address(bytes)
    }

    /// Create an `Address` from a slice that must be exactly 20 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let arr: [u8; SHORT_ID_LEN] = bytes.try_into().map_err(|_| {
            PrimitivesError::InvalidAddress(format!(
                "invalid address length of {}, want {}",
                bytes.len(),
                SHORT_ID_LEN
            ))
        })?;
        Ok(Address(arr))
    }

    /// Parse a hex string (with or without `0x`).
    pub fn from_hex(s: &str) -> Result<Self, PrimitivesError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        Self::from_slice(&hex::decode(s)?)
    }

    /// Lowercase hex without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Access the raw bytes.
    pub fn as_bytes(&self) -> &[u8; SHORT_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", self.to_hex())
    }
}

impl From<[u8; SHORT_ID_LEN]> for Address {
    fn from(bytes: [u8; SHORT_ID_LEN]) -> Self {
        Address(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A 20-byte validator node identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId([u8; SHORT_ID_LEN]);

impl NodeId {
    /// Create a `NodeId` from a raw 20-byte array.
    pub const fn new(bytes: [u8; SHORT_ID_LEN]) -> Self {
        NodeId(bytes)
    }

    /// Parse the `NodeID-<cb58>` form.
    pub fn parse(s: &str) -> Result<Self, PrimitivesError> {
        let body = s.strip_prefix(NODE_ID_PREFIX).ok_or_else(|| {
            PrimitivesError::InvalidId(format!("node id must start with {NODE_ID_PREFIX}"))
        })?;
        let bytes = base58::check_decode(body)?;
        let arr: [u8; SHORT_ID_LEN] = bytes.as_slice().try_into().map_err(|_| {
            PrimitivesError::InvalidId(format!("invalid node id length of {}", bytes.len()))
        })?;
        Ok(NodeId(arr))
    }

    /// Access the raw bytes.
    pub fn as_bytes(&self) -> &[u8; SHORT_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", NODE_ID_PREFIX, base58::check_encode(&self.0))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for NodeId {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
