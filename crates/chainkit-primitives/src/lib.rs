/// Chainkit - Cryptographic primitives, encodings, and binary helpers.
///
/// This crate provides the foundational building blocks shared by every
/// chain of the network:
/// - Hash functions (SHA-256, SHA-256d, RIPEMD-160, Hash160, HMAC-SHA512)
/// - Base58 and cb58 (checksummed Base58) encoding
/// - Bech32 human-readable addresses with chain alias prefixes
/// - Big-endian binary reader/writer and fixed-width big-integer helpers
/// - 20-byte addresses and 32-byte content identifiers
/// - secp256k1 keys with 65-byte recoverable signatures
/// - BIP-32 style hierarchical key derivation

pub mod hash;
pub mod base58;
pub mod addressing;
pub mod util;
pub mod bintools;
pub mod ids;
pub mod ec;
pub mod hd;

mod error;
pub use error::PrimitivesError;
pub use ids::{Address, Id, NodeId};
