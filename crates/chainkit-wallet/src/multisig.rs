//! Threshold multisig assembly.
//!
//! Each co-signer signs the canonical hash on their own. The partial
//! signatures are collected in a `MultisigKeyChain`, which resolves which
//! collected signers fill each signer slot. Resolution produces a separate
//! `ResolvedSignatures`; the unsigned transaction is never touched, so one
//! unsigned transaction can be reused across signing sessions.

use std::collections::BTreeMap;

use chainkit_primitives::addressing::format_address;
use chainkit_primitives::ec::{PrivateKey, Signature};
use chainkit_primitives::Address;
use chainkit_transaction::owners::{resolve_signers, AliasMap, OutputOwners};
use chainkit_transaction::utxo::UtxoSet;
use chainkit_transaction::{Credential, CredentialKind, Tx, UnsignedTx};
use tracing::{debug, warn};

use crate::keychain::slot_owners;
use crate::WalletError;

/// Collects partial signatures over one canonical hash.
#[derive(Clone, Debug)]
pub struct MultisigKeyChain {
    hash: [u8; 32],
    hrp: String,
    chain_alias: String,
    kind: CredentialKind,
    owners: Vec<OutputOwners>,
    aliases: AliasMap,
    signatures: BTreeMap<Address, Signature>,
}

impl MultisigKeyChain {
    /// Create a multisig keychain.
    ///
    /// # Arguments
    /// * `hash` - Canonical hash of the unsigned transaction.
    /// * `hrp` - Network human-readable prefix, used in log output.
    /// * `chain_alias` - Chain letter, used in log output.
    /// * `kind` - Credential kind of every produced credential.
    /// * `owners` - Owner group per signer slot, in slot order.
    /// * `aliases` - Every multisig alias reachable from `owners`.
    pub fn new(
        hash: [u8; 32],
        hrp: impl Into<String>,
        chain_alias: impl Into<String>,
        kind: CredentialKind,
        owners: Vec<OutputOwners>,
        aliases: AliasMap,
    ) -> Self {
        MultisigKeyChain {
            hash,
            hrp: hrp.into(),
            chain_alias: chain_alias.into(),
            kind,
            owners,
            aliases,
            signatures: BTreeMap::new(),
        }
    }

    /// Set up a keychain for `unsigned`, taking each slot's owners from
    /// the UTXOs it spends.
    pub fn for_transaction(
        unsigned: &UnsignedTx,
        utxos: &UtxoSet,
        subnet_owner: Option<&OutputOwners>,
        hrp: impl Into<String>,
        chain_alias: impl Into<String>,
        aliases: AliasMap,
    ) -> Result<Self, WalletError> {
        let owners = slot_owners(&unsigned.signer_slots(), utxos, subnet_owner)?;
        Ok(MultisigKeyChain::new(
            unsigned.hash()?,
            hrp,
            chain_alias,
            CredentialKind::Secp,
            owners,
            aliases,
        ))
    }

    pub fn hash(&self) -> &[u8; 32] {
        &self.hash
    }

    /// Addresses that have contributed a signature, ascending.
    pub fn signers(&self) -> Vec<Address> {
        self.signatures.keys().copied().collect()
    }

    /// Add `address`'s signature over the hash.
    ///
    /// The signature must recover to `address`; anything else is rejected
    /// with `InvalidSignature`. A second signature from the same address
    /// replaces the first.
    pub fn add_key(&mut self, address: Address, signature: Signature) -> Result<(), WalletError> {
        let recovered = signature
            .recover_address(&self.hash)
            .map_err(|e| WalletError::InvalidSignature(e.to_string()))?;
        if recovered != address {
            warn!(
                signer = %self.display(&address),
                recovered = %self.display(&recovered),
                "rejected partial signature"
            );
            return Err(WalletError::InvalidSignature(format!(
                "signature does not recover to {}",
                self.display(&address)
            )));
        }
        self.signatures.insert(address, signature);
        Ok(())
    }

    /// Sign the hash with `key` and add the result.
    pub fn add_signer(&mut self, key: &PrivateKey) -> Result<Address, WalletError> {
        let address = key.address();
        let signature = key.sign(&self.hash)?;
        self.add_key(address, signature)?;
        Ok(address)
    }

    /// Resolve, for every signer slot, which collected signatures meet its
    /// threshold, in owner-list order.
    ///
    /// # Returns
    /// The resolved signatures, or `ThresholdUnsatisfiable` naming the
    /// first slot whose owners did not sign in sufficient number.
    pub fn build_signature_indices(&self) -> Result<ResolvedSignatures, WalletError> {
        let mut slots = Vec::with_capacity(self.owners.len());
        for (slot, owners) in self.owners.iter().enumerate() {
            let resolution = resolve_signers(owners, &self.aliases, |a| self.signatures.contains_key(a))?
                .ok_or(WalletError::ThresholdUnsatisfiable {
                    slot,
                    threshold: owners.threshold(),
                })?;
            let signatures = resolution
                .signers
                .iter()
                .map(|a| self.signatures.get(a).copied().ok_or(WalletError::MissingKey(*a)))
                .collect::<Result<Vec<_>, _>>()?;
            debug!(slot, indices = ?resolution.sig_indices, "resolved signer slot");
            slots.push(ResolvedSlot {
                sig_indices: resolution.sig_indices,
                signers: resolution.signers,
                signatures,
            });
        }
        Ok(ResolvedSignatures {
            hash: self.hash,
            kind: self.kind,
            slots,
        })
    }

    fn display(&self, address: &Address) -> String {
        format_address(&self.chain_alias, &self.hrp, address).unwrap_or_else(|_| address.to_string())
    }
}

/// The signers and signatures chosen for one slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSlot {
    pub sig_indices: Vec<u32>,
    pub signers: Vec<Address>,
    pub signatures: Vec<Signature>,
}

/// Output of `MultisigKeyChain::build_signature_indices`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSignatures {
    hash: [u8; 32],
    kind: CredentialKind,
    slots: Vec<ResolvedSlot>,
}

impl ResolvedSignatures {
    pub fn slots(&self) -> &[ResolvedSlot] {
        &self.slots
    }

    /// Attach the resolved credentials to `unsigned`.
    ///
    /// # Returns
    /// The signed transaction, `HashMismatch` if `unsigned` is not the
    /// transaction that was signed, or `SignatureIndexMismatch` if its
    /// signature indices differ from the resolved ones.
    pub fn sign(&self, unsigned: &UnsignedTx) -> Result<Tx, WalletError> {
        if unsigned.hash()? != self.hash {
            return Err(WalletError::HashMismatch);
        }
        let tx_slots = unsigned.signer_slots();
        if tx_slots.len() != self.slots.len() {
            return Err(WalletError::SignatureIndexMismatch(format!(
                "transaction has {} signer slots, resolved {}",
                tx_slots.len(),
                self.slots.len()
            )));
        }
        for (i, (expected, resolved)) in tx_slots.iter().zip(&self.slots).enumerate() {
            if expected.sig_indices != resolved.sig_indices {
                return Err(WalletError::SignatureIndexMismatch(format!(
                    "slot {i}: transaction expects {:?}, signers resolved {:?}",
                    expected.sig_indices, resolved.sig_indices
                )));
            }
        }
        let credentials = self
            .slots
            .iter()
            .map(|s| Credential::new(self.kind, s.signatures.clone()))
            .collect();
        Ok(Tx::new(unsigned.clone(), credentials)?)
    }
}
