//! Owner groups and signer resolution.
//!
//! An `OutputOwners` is the (addresses, threshold, locktime) triple that
//! controls an output. Addresses are kept sorted and unique, which makes
//! an address's position in the list its signature index.
//!
//! An owner address may itself be a multisig alias: a named owner group
//! registered in an `AliasMap`. Resolution walks owners depth first,
//! expanding aliases in place. Every leaf address visited advances a
//! single counter, and the counter value at a signing leaf is that
//! signer's signature index. For a group without aliases this is simply
//! the position in the owner list.

use std::collections::BTreeMap;

use chainkit_primitives::util::{BinaryReader, BinaryWriter};
use chainkit_primitives::Address;

use crate::TransactionError;

/// Maximum nesting of multisig aliases. Deeper chains are treated as cycles.
pub const MAX_ALIAS_DEPTH: usize = 8;

/// Alias address to the owner group it stands for.
pub type AliasMap = BTreeMap<Address, OutputOwners>;

/// Addresses, threshold and locktime controlling an output.
///
/// # Wire format
///
/// | Field     | Size            |
/// |-----------|-----------------|
/// | locktime  | 8 bytes         |
/// | threshold | 4 bytes         |
/// | count     | 4 bytes         |
/// | addresses | 20 bytes each   |
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OutputOwners {
    locktime: u64,
    threshold: u32,
    addresses: Vec<Address>,
}

impl OutputOwners {
    /// Create an owner group.
    ///
    /// Addresses are sorted; duplicates are rejected.
    ///
    /// # Arguments
    /// * `addresses` - Owner addresses in any order.
    /// * `threshold` - Signatures required, in `1..=addresses.len()`.
    /// * `locktime` - Unix time before which the output cannot be spent.
    ///
    /// # Returns
    /// The owner group, or `InvalidThreshold` / `DuplicateAddress`.
    pub fn new(
        addresses: Vec<Address>,
        threshold: u32,
        locktime: u64,
    ) -> Result<Self, TransactionError> {
        let mut addresses = addresses;
        addresses.sort();
        if let Some(w) = addresses.windows(2).find(|w| w[0] == w[1]) {
            return Err(TransactionError::DuplicateAddress(w[0]));
        }
        check_threshold(threshold, addresses.len())?;
        Ok(OutputOwners {
            locktime,
            threshold,
            addresses,
        })
    }

    /// A 1-of-1 group with no locktime.
    pub fn single(address: Address) -> Self {
        OutputOwners {
            locktime: 0,
            threshold: 1,
            addresses: vec![address],
        }
    }

    pub fn locktime(&self) -> u64 {
        self.locktime
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    /// Position of `address` in the owner list.
    pub fn address_index(&self, address: &Address) -> Option<u32> {
        self.addresses
            .binary_search(address)
            .ok()
            .map(|i| i as u32)
    }

    /// True once `as_of` has reached the locktime.
    pub fn is_unlocked(&self, as_of: u64) -> bool {
        self.locktime <= as_of
    }

    /// Deserialize an owner group, enforcing the same invariants as `new`.
    pub fn read_from(reader: &mut BinaryReader) -> Result<Self, TransactionError> {
        let locktime = reader.read_u64()?;
        let threshold = reader.read_u32()?;
        let n = reader.read_len()?;
        let mut addresses = Vec::with_capacity(n);
        for _ in 0..n {
            addresses.push(reader.read_address()?);
        }
        if let Some(w) = addresses.windows(2).find(|w| w[0] >= w[1]) {
            return Err(if w[0] == w[1] {
                TransactionError::DuplicateAddress(w[0])
            } else {
                TransactionError::SerializationError("owner addresses not sorted".to_string())
            });
        }
        check_threshold(threshold, addresses.len())?;
        Ok(OutputOwners {
            locktime,
            threshold,
            addresses,
        })
    }

    /// Serialize the owner group.
    pub fn write_to(&self, writer: &mut BinaryWriter) -> Result<(), TransactionError> {
        writer.write_u64(self.locktime);
        writer.write_u32(self.threshold);
        writer.write_len(self.addresses.len())?;
        for address in &self.addresses {
            writer.write_address(address);
        }
        Ok(())
    }
}

fn check_threshold(threshold: u32, addresses: usize) -> Result<(), TransactionError> {
    if threshold == 0 || threshold as usize > addresses {
        return Err(TransactionError::InvalidThreshold {
            threshold,
            addresses,
        });
    }
    Ok(())
}

/// The signers chosen for one owner group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignerResolution {
    /// Signature indices, strictly increasing.
    pub sig_indices: Vec<u32>,
    /// The address that signs at each index.
    pub signers: Vec<Address>,
}

/// Pick signers for `owners` from the addresses `can_sign` accepts.
///
/// Within each group, members are taken in owner-list order until that
/// group's threshold is met; a nested alias counts as one member when its
/// own threshold is met. Members past the threshold are still counted so
/// that indices stay aligned with the flattened owner list.
///
/// # Returns
/// `Ok(Some(resolution))` when the threshold can be met, `Ok(None)` when
/// it cannot, or `AliasDepthExceeded` for alias chains deeper than
/// `MAX_ALIAS_DEPTH`.
pub fn resolve_signers<F>(
    owners: &OutputOwners,
    aliases: &AliasMap,
    can_sign: F,
) -> Result<Option<SignerResolution>, TransactionError>
where
    F: Fn(&Address) -> bool,
{
    let mut counter = 0u32;
    let mut picked = Vec::new();
    let ok = visit(owners, aliases, &can_sign, 0, true, &mut counter, &mut picked)?;
    if !ok {
        return Ok(None);
    }
    let (sig_indices, signers): (Vec<u32>, Vec<Address>) = picked.into_iter().unzip();
    Ok(Some(SignerResolution {
        sig_indices,
        signers,
    }))
}

/// The flattened leaf addresses of `owners`, aliases expanded in place.
///
/// A signature index over `owners` is a position in this list.
pub fn leaf_addresses(owners: &OutputOwners, aliases: &AliasMap) -> Result<Vec<Address>, TransactionError> {
    let mut leaves = Vec::new();
    flatten(owners, aliases, 0, &mut leaves)?;
    Ok(leaves)
}

fn flatten(
    owners: &OutputOwners,
    aliases: &AliasMap,
    depth: usize,
    leaves: &mut Vec<Address>,
) -> Result<(), TransactionError> {
    if depth > MAX_ALIAS_DEPTH {
        return Err(TransactionError::AliasDepthExceeded(MAX_ALIAS_DEPTH));
    }
    for address in owners.addresses() {
        match aliases.get(address) {
            Some(nested) => flatten(nested, aliases, depth + 1, leaves)?,
            None => leaves.push(*address),
        }
    }
    Ok(())
}

fn visit<F>(
    owners: &OutputOwners,
    aliases: &AliasMap,
    can_sign: &F,
    depth: usize,
    collect: bool,
    counter: &mut u32,
    picked: &mut Vec<(u32, Address)>,
) -> Result<bool, TransactionError>
where
    F: Fn(&Address) -> bool,
{
    if depth > MAX_ALIAS_DEPTH {
        return Err(TransactionError::AliasDepthExceeded(MAX_ALIAS_DEPTH));
    }
    let mut satisfied = 0u32;
    for address in owners.addresses() {
        let want = collect && satisfied < owners.threshold();
        match aliases.get(address) {
            Some(nested) => {
                let mark = picked.len();
                let ok = visit(nested, aliases, can_sign, depth + 1, want, counter, picked)?;
                if want {
                    if ok {
                        satisfied += 1;
                    } else {
                        picked.truncate(mark);
                    }
                }
            }
            None => {
                let position = *counter;
                *counter += 1;
                if want && can_sign(address) {
                    picked.push((position, *address));
                    satisfied += 1;
                }
            }
        }
    }
    Ok(satisfied >= owners.threshold())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    #[test]
    fn test_new_sorts_and_validates() {
        let owners = OutputOwners::new(vec![addr(3), addr(1), addr(2)], 2, 7).unwrap();
        assert_eq!(owners.addresses(), &[addr(1), addr(2), addr(3)]);
        assert_eq!(owners.address_index(&addr(3)), Some(2));
        assert_eq!(owners.address_index(&addr(9)), None);

        assert!(matches!(
            OutputOwners::new(vec![addr(1)], 0, 0),
            Err(TransactionError::InvalidThreshold { .. })
        ));
        assert!(matches!(
            OutputOwners::new(vec![addr(1)], 2, 0),
            Err(TransactionError::InvalidThreshold { .. })
        ));
        assert!(matches!(
            OutputOwners::new(vec![addr(1), addr(1)], 1, 0),
            Err(TransactionError::DuplicateAddress(_))
        ));
    }

    #[test]
    fn test_wire_layout() {
        let owners = OutputOwners::new(vec![addr(0xaa)], 1, 0x0102).unwrap();
        let mut w = BinaryWriter::new();
        owners.write_to(&mut w).unwrap();
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 8 + 4 + 4 + 20);
        assert_eq!(&bytes[..16], &[0, 0, 0, 0, 0, 0, 1, 2, 0, 0, 0, 1, 0, 0, 0, 1]);
        let back = OutputOwners::read_from(&mut BinaryReader::new(&bytes)).unwrap();
        assert_eq!(back, owners);
    }

    #[test]
    fn test_read_rejects_unsorted() {
        let mut w = BinaryWriter::new();
        w.write_u64(0);
        w.write_u32(1);
        w.write_u32(2);
        w.write_address(&addr(2));
        w.write_address(&addr(1));
        let bytes = w.into_bytes();
        assert!(OutputOwners::read_from(&mut BinaryReader::new(&bytes)).is_err());
    }

    #[test]
    fn test_resolve_flat_group_uses_owner_order() {
        let owners = OutputOwners::new(vec![addr(1), addr(2), addr(3)], 2, 0).unwrap();
        let aliases = AliasMap::new();
        let r = resolve_signers(&owners, &aliases, |a| *a == addr(3) || *a == addr(1))
            .unwrap()
            .unwrap();
        assert_eq!(r.sig_indices, vec![0, 2]);
        assert_eq!(r.signers, vec![addr(1), addr(3)]);

        let none = resolve_signers(&owners, &aliases, |a| *a == addr(2)).unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_resolve_stops_at_threshold() {
        let owners = OutputOwners::new(vec![addr(1), addr(2), addr(3)], 1, 0).unwrap();
        let r = resolve_signers(&owners, &AliasMap::new(), |_| true)
            .unwrap()
            .unwrap();
        assert_eq!(r.sig_indices, vec![0]);
    }

    #[test]
    fn test_resolve_nested_alias() {
        // alias 0x10 = 1-of-{0x01, 0x02}; output = 2-of-{0x10, 0x20}
        let mut aliases = AliasMap::new();
        aliases.insert(
            addr(0x10),
            OutputOwners::new(vec![addr(1), addr(2)], 1, 0).unwrap(),
        );
        let owners = OutputOwners::new(vec![addr(0x10), addr(0x20)], 2, 0).unwrap();
        let r = resolve_signers(&owners, &aliases, |a| *a == addr(2) || *a == addr(0x20))
            .unwrap()
            .unwrap();
        // leaves in order: 0x01 (0), 0x02 (1), 0x20 (2)
        assert_eq!(r.sig_indices, vec![1, 2]);
        assert_eq!(r.signers, vec![addr(2), addr(0x20)]);
    }

    #[test]
    fn test_failed_alias_does_not_contribute() {
        let mut aliases = AliasMap::new();
        aliases.insert(
            addr(0x10),
            OutputOwners::new(vec![addr(1), addr(2)], 2, 0).unwrap(),
        );
        let owners = OutputOwners::new(vec![addr(0x10), addr(0x20)], 1, 0).unwrap();
        let r = resolve_signers(&owners, &aliases, |a| *a == addr(1) || *a == addr(0x20))
            .unwrap()
            .unwrap();
        assert_eq!(r.sig_indices, vec![2]);
        assert_eq!(r.signers, vec![addr(0x20)]);
    }

    #[test]
    fn test_alias_cycle_is_rejected() {
        let mut aliases = AliasMap::new();
        aliases.insert(addr(0x10), OutputOwners::single(addr(0x11)));
        aliases.insert(addr(0x11), OutputOwners::single(addr(0x10)));
        let owners = OutputOwners::single(addr(0x10));
        assert!(matches!(
            resolve_signers(&owners, &aliases, |_| true),
            Err(TransactionError::AliasDepthExceeded(_))
        ));
    }

    #[test]
    fn test_leaf_addresses_match_resolution_indices() {
        let mut aliases = AliasMap::new();
        aliases.insert(
            addr(0x10),
            OutputOwners::new(vec![addr(1), addr(2)], 1, 0).unwrap(),
        );
        let owners = OutputOwners::new(vec![addr(0x10), addr(0x20)], 2, 0).unwrap();
        let leaves = leaf_addresses(&owners, &aliases).unwrap();
        assert_eq!(leaves, vec![addr(1), addr(2), addr(0x20)]);

        let r = resolve_signers(&owners, &aliases, |a| *a == addr(2) || *a == addr(0x20))
            .unwrap()
            .unwrap();
        let mapped: Vec<Address> = r.sig_indices.iter().map(|&i| leaves[i as usize]).collect();
        assert_eq!(mapped, r.signers);
    }
}
