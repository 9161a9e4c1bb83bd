use chainkit_primitives::ids::AssetId;
use chainkit_primitives::Address;

use crate::codec::{ChainKind, TypeTag};
use crate::utxo::UtxoId;

/// Error types for codec, UTXO and transaction-building operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The transaction structure is invalid (e.g. a field out of range).
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
    /// Bytes could not be decoded into the expected structure.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// Fee calculation failed.
    #[error("fee calculation error: {0}")]
    FeeError(String),
    /// A type id that is not registered for the chain and codec version.
    #[error("unknown type id {type_id} for {chain:?} codec {version}")]
    UnknownTypeId {
        chain: ChainKind,
        version: u16,
        type_id: u32,
    },
    /// A codec version the chain does not define.
    #[error("unsupported codec version {version} for {chain:?}")]
    UnsupportedCodecVersion { chain: ChainKind, version: u16 },
    /// A primitive that does not exist on the chain being encoded for.
    #[error("{tag:?} is not registered on the {chain:?} chain")]
    TypeNotSupported { chain: ChainKind, tag: TypeTag },
    /// Threshold is zero or exceeds the number of owner addresses.
    #[error("invalid threshold {threshold} for {addresses} addresses")]
    InvalidThreshold { threshold: u32, addresses: usize },
    /// An owner group lists the same address twice.
    #[error("duplicate owner address {0}")]
    DuplicateAddress(Address),
    /// Signature indices are not strictly increasing or out of range.
    #[error("invalid signature indices: {0}")]
    InvalidSignatureIndices(String),
    /// Memo exceeds the protocol maximum.
    #[error("memo of {len} bytes exceeds maximum of {max}")]
    InvalidMemo { len: usize, max: usize },
    /// The same UTXO is spent more than once in one transaction.
    #[error("utxo {0} is spent more than once")]
    DuplicateInput(UtxoId),
    /// An input list is not in canonical order.
    #[error("inputs are not in canonical order: {0}")]
    UnsortedInputs(String),
    /// A UTXO lookup missed.
    #[error("utxo {0} not found")]
    NotFound(UtxoId),
    /// The UTXO exists but the available addresses cannot spend it.
    #[error("utxo {0} is not spendable by the provided addresses")]
    Unspendable(UtxoId),
    /// The available addresses cannot meet a subnet owner group's threshold.
    #[error("subnet {0} owners cannot be satisfied by the provided addresses")]
    SubnetUnauthorized(chainkit_primitives::ids::SubnetId),
    /// Not enough spendable funds of an asset.
    #[error("insufficient funds for asset {asset_id}: need {needed}, have {available}")]
    InsufficientFunds {
        asset_id: AssetId,
        needed: u64,
        available: u64,
    },
    /// Alias resolution nested too deeply (or cycled).
    #[error("multisig alias nesting exceeds depth {0}")]
    AliasDepthExceeded(usize),
    /// Credentials do not line up with the inputs that need them.
    #[error("credential mismatch: {0}")]
    CredentialMismatch(String),
    /// Network settings could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
    /// An underlying primitives error (forwarded from `chainkit-primitives`).
    #[error("primitives error: {0}")]
    Primitives(#[from] chainkit_primitives::PrimitivesError),
}
