//! Single-signer key custody.
//!
//! A `KeyChain` holds private keys by address and turns an unsigned
//! transaction into a signed one. Builders record which address signs at
//! each signature index, so `sign` only has to look keys up. Decoded
//! transactions carry indices but no signers; `sign_with_utxos` recovers
//! the signers from the owner lists of the spent UTXOs.

use std::collections::BTreeMap;

use chainkit_primitives::addressing::format_address;
use chainkit_primitives::ec::PrivateKey;
use chainkit_primitives::hd::HdNode;
use chainkit_primitives::Address;
use chainkit_transaction::owners::{leaf_addresses, AliasMap, OutputOwners};
use chainkit_transaction::utxo::UtxoSet;
use chainkit_transaction::{Credential, SignerSlot, SlotOrigin, Tx, UnsignedTx};
use tracing::debug;

use crate::WalletError;

/// Private keys for one chain, indexed by address.
#[derive(Clone, Debug)]
pub struct KeyChain {
    hrp: String,
    chain_alias: String,
    keys: BTreeMap<Address, PrivateKey>,
}

impl KeyChain {
    /// Create an empty keychain for the chain `chain_alias` on the network
    /// with human-readable prefix `hrp`.
    pub fn new(hrp: impl Into<String>, chain_alias: impl Into<String>) -> Self {
        KeyChain {
            hrp: hrp.into(),
            chain_alias: chain_alias.into(),
            keys: BTreeMap::new(),
        }
    }

    pub fn hrp(&self) -> &str {
        &self.hrp
    }

    pub fn chain_alias(&self) -> &str {
        &self.chain_alias
    }

    /// Generate and store a fresh random key.
    pub fn generate(&mut self) -> Address {
        self.import_key(PrivateKey::new())
    }

    /// Store `key`, returning its address.
    pub fn import_key(&mut self, key: PrivateKey) -> Address {
        let address = key.address();
        self.keys.insert(address, key);
        address
    }

    /// Import a key given as `PrivateKey-<cb58>`, bare cb58 or 64 hex digits.
    pub fn import_key_str(&mut self, s: &str) -> Result<Address, WalletError> {
        let s = s.trim();
        let key = if s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            PrivateKey::from_hex(s)?
        } else {
            PrivateKey::from_cb58_string(s)?
        };
        Ok(self.import_key(key))
    }

    /// Derive `path` from `root`, then import its first `count` children.
    ///
    /// # Arguments
    /// * `root` - A private HD node.
    /// * `path` - Account path, e.g. `m/44'/9000'/0'/0`.
    /// * `count` - Number of consecutive child keys to import.
    ///
    /// # Returns
    /// The imported addresses in child order.
    pub fn import_hd(&mut self, root: &HdNode, path: &str, count: u32) -> Result<Vec<Address>, WalletError> {
        let account = root.derive(path)?;
        let mut addresses = Vec::with_capacity(count as usize);
        for index in 0..count {
            let child = account.derive_child(index)?;
            let key = child
                .private_key()
                .cloned()
                .ok_or_else(|| WalletError::InvalidKey(format!("HD node at {path}/{index} is public only")))?;
            addresses.push(self.import_key(key));
        }
        debug!(path, count, "imported HD keys");
        Ok(addresses)
    }

    /// Addresses with a stored key, ascending.
    pub fn addresses(&self) -> Vec<Address> {
        self.keys.keys().copied().collect()
    }

    pub fn has_key(&self, address: &Address) -> bool {
        self.keys.contains_key(address)
    }

    pub fn get_key(&self, address: &Address) -> Option<&PrivateKey> {
        self.keys.get(address)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// `address` in `<alias>-<bech32>` form for this keychain's chain.
    pub fn formatted_address(&self, address: &Address) -> Result<String, WalletError> {
        Ok(format_address(&self.chain_alias, &self.hrp, address)?)
    }

    pub fn formatted_addresses(&self) -> Result<Vec<String>, WalletError> {
        self.keys.keys().map(|a| self.formatted_address(a)).collect()
    }

    /// Sign a builder-produced transaction.
    ///
    /// Every signer slot must name its signing addresses, which builders
    /// always do. The unsigned transaction is left untouched.
    ///
    /// # Returns
    /// The signed transaction, `MissingKey` for a signer without a stored
    /// key, or `SignatureIndexMismatch` for slots without known signers.
    pub fn sign(&self, unsigned: &UnsignedTx) -> Result<Tx, WalletError> {
        let slots = unsigned.signer_slots();
        let mut signers = Vec::with_capacity(slots.len());
        for (i, slot) in slots.iter().enumerate() {
            if slot.signers.len() != slot.sig_indices.len() {
                return Err(WalletError::SignatureIndexMismatch(format!(
                    "slot {i} has {} indices but {} known signers",
                    slot.sig_indices.len(),
                    slot.signers.len()
                )));
            }
            signers.push(slot.signers.clone());
        }
        self.sign_slots(unsigned, &slots, signers)
    }

    /// Sign a transaction whose signers are not recorded, such as one
    /// decoded from bytes.
    ///
    /// # Arguments
    /// * `unsigned` - The transaction to sign.
    /// * `utxos` - Must contain every UTXO the transaction spends.
    /// * `subnet_owner` - Owner group of the subnet, for subnet-authorized bodies.
    /// * `aliases` - Multisig aliases appearing among the owners.
    pub fn sign_with_utxos(
        &self,
        unsigned: &UnsignedTx,
        utxos: &UtxoSet,
        subnet_owner: Option<&OutputOwners>,
        aliases: &AliasMap,
    ) -> Result<Tx, WalletError> {
        let slots = unsigned.signer_slots();
        let owners = slot_owners(&slots, utxos, subnet_owner)?;
        let mut signers = Vec::with_capacity(slots.len());
        for (i, (slot, owners)) in slots.iter().zip(&owners).enumerate() {
            let leaves = leaf_addresses(owners, aliases)?;
            let addresses = slot
                .sig_indices
                .iter()
                .map(|&index| {
                    leaves.get(index as usize).copied().ok_or_else(|| {
                        WalletError::SignatureIndexMismatch(format!(
                            "slot {i}: index {index} outside {} owners",
                            leaves.len()
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            signers.push(addresses);
        }
        self.sign_slots(unsigned, &slots, signers)
    }

    fn sign_slots(
        &self,
        unsigned: &UnsignedTx,
        slots: &[SignerSlot],
        signers: Vec<Vec<Address>>,
    ) -> Result<Tx, WalletError> {
        let hash = unsigned.hash()?;
        let mut credentials = Vec::with_capacity(slots.len());
        for (slot, addresses) in slots.iter().zip(signers) {
            let mut signatures = Vec::with_capacity(addresses.len());
            for address in &addresses {
                let key = self.keys.get(address).ok_or(WalletError::MissingKey(*address))?;
                signatures.push(key.sign(&hash)?);
            }
            credentials.push(Credential::new(slot.kind, signatures));
        }
        debug!(
            kind = %unsigned.kind(),
            credentials = credentials.len(),
            hash = %hex::encode(hash),
            "signed transaction"
        );
        Ok(Tx::new(unsigned.clone(), credentials)?)
    }
}

/// The owner group behind each signer slot.
///
/// Inputs and operations take the owners of the UTXO they consume,
/// subnet authorization takes `subnet_owner`, and account debits are a
/// 1-of-1 group of the account address.
pub fn slot_owners(
    slots: &[SignerSlot],
    utxos: &UtxoSet,
    subnet_owner: Option<&OutputOwners>,
) -> Result<Vec<OutputOwners>, WalletError> {
    let mut owners = Vec::with_capacity(slots.len());
    for slot in slots {
        let group = match &slot.origin {
            SlotOrigin::Input(id) => utxos.get_utxo(id)?.output.owners().clone(),
            SlotOrigin::Operation(ids) => {
                let first = ids.first().ok_or_else(|| {
                    WalletError::SignatureIndexMismatch("operation consumes no UTXO".into())
                })?;
                utxos.get_utxo(first)?.output.owners().clone()
            }
            SlotOrigin::SubnetAuth => subnet_owner.cloned().ok_or_else(|| {
                WalletError::SignatureIndexMismatch("subnet owner needed to sign subnet auth".into())
            })?,
            SlotOrigin::Account(address) => OutputOwners::single(*address),
        };
        owners.push(group);
    }
    Ok(owners)
}
