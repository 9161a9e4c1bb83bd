/// Chainkit - Key custody and transaction signing.
///
/// A `KeyChain` signs with locally held keys; a `MultisigKeyChain`
/// assembles partial signatures from independent co-signers into the
/// credentials of a threshold multisig transaction.

mod error;
pub use error::WalletError;

pub mod keychain;
pub mod multisig;

pub use keychain::{slot_owners, KeyChain};
pub use multisig::{MultisigKeyChain, ResolvedSignatures, ResolvedSlot};
