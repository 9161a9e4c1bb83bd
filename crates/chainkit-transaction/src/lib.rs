/// Chainkit - Typed transaction codec, UTXO model and transaction builders.
///
/// Provides everything a client needs to go from a set of unspent outputs
/// to an unsigned transaction ready for signing:
/// - Per-chain, per-version type-id registry (`codec`)
/// - Owner groups with nested multisig alias resolution (`owners`)
/// - Outputs, inputs, operations and credentials in canonical order
/// - Every transaction body of the exchange, platform and contract chains
/// - `UtxoSet` with set algebra and balance queries
/// - Pluggable fee strategies and network settings
/// - Coin selection and transaction builders

pub mod codec;
pub mod owners;
pub mod output;
pub mod input;
pub mod operation;
pub mod credential;
pub mod utxo;
pub mod tx;
pub mod fee;
pub mod settings;
pub mod builder;

mod error;
pub use error::TransactionError;
pub use codec::{ChainKind, Codec};
pub use credential::{Credential, CredentialKind};
pub use input::TransferableInput;
pub use output::{Output, TransferableOutput};
pub use owners::{AliasMap, OutputOwners};
pub use tx::{SignerSlot, SlotOrigin, Tx, TxBody, TxKind, UnsignedTx};
pub use utxo::{Utxo, UtxoId, UtxoSet};
