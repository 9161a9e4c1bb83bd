/// Unified error type for all primitives operations.
///
/// Covers errors from hashing, EC operations, encodings, identifier parsing
/// and hierarchical key derivation.
#[derive(Debug, thiserror::Error)]
pub enum PrimitivesError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("checksum mismatch")]
    ChecksumMismatch,

    #[error("invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("invalid base58: {0}")]
    InvalidBase58(String),

    #[error("invalid bech32: {0}")]
    InvalidBech32(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("number does not fit in {width} bytes")]
    NumberTooLarge { width: usize },

    #[error("invalid derivation path: {0}")]
    InvalidDerivationPath(String),

    #[error("invalid extended key: {0}")]
    InvalidExtendedKey(String),

    #[error("hardened derivation requires a private key")]
    HardenedDerivationRequiresPrivateKey,

    #[error("length prefix {0} exceeds remaining data")]
    LengthOverflow(u64),

    #[error("unexpected end of data")]
    UnexpectedEof,

    #[error("{0}")]
    Other(String),
}

impl From<hex::FromHexError> for PrimitivesError {
    fn from(e: hex::FromHexError) -> Self {
        PrimitivesError::InvalidHex(e.to_string())
    }
}

impl From<k256::ecdsa::Error> for PrimitivesError {
    fn from(e: k256::ecdsa::Error) -> Self {
        PrimitivesError::InvalidPublicKey(e.to_string())
    }
}
