use chainkit_primitives::Address;

/// Error types for key custody and signing.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("no private key for address {0}")]
    MissingKey(Address),
    #[error("threshold of {threshold} unsatisfiable for signer slot {slot}")]
    ThresholdUnsatisfiable { slot: usize, threshold: u32 },
    #[error("signature index mismatch: {0}")]
    SignatureIndexMismatch(String),
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    #[error("signatures were collected for a different transaction hash")]
    HashMismatch,
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("transaction error: {0}")]
    Transaction(#[from] chainkit_transaction::TransactionError),
    #[error("primitives error: {0}")]
    Primitives(#[from] chainkit_primitives::PrimitivesError),
}
