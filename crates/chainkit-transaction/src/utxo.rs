//! UTXOs and the working set builders select from.
//!
//! A UTXO is identified by `(tx_id, output_index)`. A `UtxoSet` never holds
//! two UTXOs with the same id; adding a known id is a no-op. Iteration
//! follows insertion order so results are deterministic, but nothing
//! consensus-relevant depends on that order.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use chainkit_primitives::base58;
use chainkit_primitives::ids::{AssetId, TxId};
use chainkit_primitives::util::{BinaryReader, BinaryWriter};
use chainkit_primitives::Address;

use crate::codec::{ChainKind, Codec};
use crate::output::Output;
use crate::TransactionError;

/// Identity of a UTXO: the transaction that created it and its position.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtxoId {
    pub tx_id: TxId,
    pub output_index: u32,
}

impl UtxoId {
    pub fn new(tx_id: TxId, output_index: u32) -> Self {
        UtxoId { tx_id, output_index }
    }
}

impl fmt::Display for UtxoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_id, self.output_index)
    }
}

impl fmt::Debug for UtxoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// An unspent output.
///
/// # Wire format
///
/// | Field         | Size     |
/// |---------------|----------|
/// | codec_version | 2 bytes  |
/// | tx_id         | 32 bytes |
/// | output_index  | 4 bytes  |
/// | asset_id      | 32 bytes |
/// | type_id       | 4 bytes  |
/// | output        | variable |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utxo {
    pub codec_version: u16,
    pub tx_id: TxId,
    pub output_index: u32,
    pub asset_id: AssetId,
    pub output: Output,
}

impl Utxo {
    pub fn new(tx_id: TxId, output_index: u32, asset_id: AssetId, output: Output) -> Self {
        Utxo {
            codec_version: 0,
            tx_id,
            output_index,
            asset_id,
            output,
        }
    }

    pub fn utxo_id(&self) -> UtxoId {
        UtxoId::new(self.tx_id, self.output_index)
    }

    pub fn amount(&self) -> u64 {
        self.output.amount()
    }

    /// Decode a UTXO of `chain` from raw bytes.
    pub fn from_bytes(bytes: &[u8], chain: ChainKind) -> Result<Self, TransactionError> {
        let mut reader = BinaryReader::new(bytes);
        let codec_version = reader.read_u16()?;
        let codec = Codec::new(chain, codec_version)?;
        let tx_id = reader.read_id()?;
        let output_index = reader.read_u32()?;
        let asset_id = reader.read_id()?;
        let output = Output::read_typed(&mut reader, codec)?;
        if reader.remaining() != 0 {
            return Err(TransactionError::SerializationError(format!(
                "trailing {} bytes after utxo",
                reader.remaining()
            )));
        }
        Ok(Utxo {
            codec_version,
            tx_id,
            output_index,
            asset_id,
            output,
        })
    }

    /// Encode this UTXO for `chain`.
    pub fn to_bytes(&self, chain: ChainKind) -> Result<Vec<u8>, TransactionError> {
        let codec = Codec::new(chain, self.codec_version)?;
        let mut writer = BinaryWriter::with_capacity(128);
        writer.write_u16(self.codec_version);
        writer.write_id(&self.tx_id);
        writer.write_u32(self.output_index);
        writer.write_id(&self.asset_id);
        self.output.write_typed(&mut writer, codec)?;
        Ok(writer.into_bytes())
    }

    /// Decode the cb58 string form returned by node APIs.
    pub fn from_cb58(s: &str, chain: ChainKind) -> Result<Self, TransactionError> {
        Self::from_bytes(&base58::check_decode(s)?, chain)
    }

    pub fn to_cb58(&self, chain: ChainKind) -> Result<String, TransactionError> {
        Ok(base58::check_encode(&self.to_bytes(chain)?))
    }
}

/// How `UtxoSet::merge_by_rule` combines two sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeRule {
    /// UTXOs in both sets.
    Intersection,
    /// UTXOs only in `self`.
    DifferenceSelf,
    /// UTXOs only in the other set.
    DifferenceNew,
    /// UTXOs in exactly one of the sets.
    SymDifference,
    /// UTXOs in either set.
    Union,
    /// The union with everything from the other set removed.
    UnionMinusNew,
    /// The union with everything from `self` removed.
    UnionMinusSelf,
}

/// Deposit and bond transaction ids referenced by locked UTXOs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LockedTxIds {
    pub deposit_tx_ids: BTreeSet<TxId>,
    pub bond_tx_ids: BTreeSet<TxId>,
}

/// A deduplicated collection of UTXOs.
#[derive(Clone, Debug, Default)]
pub struct UtxoSet {
    order: Vec<UtxoId>,
    utxos: HashMap<UtxoId, Utxo>,
    by_address: HashMap<Address, BTreeSet<UtxoId>>,
}

impl UtxoSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &UtxoId) -> bool {
        self.utxos.contains_key(id)
    }

    /// Insert a UTXO.
    ///
    /// # Returns
    /// `true` if it was inserted, `false` if its id was already present (the
    /// existing entry is kept).
    pub fn add(&mut self, utxo: Utxo) -> bool {
        let id = utxo.utxo_id();
        if self.utxos.contains_key(&id) {
            return false;
        }
        for address in utxo.output.owners().addresses() {
            self.by_address.entry(*address).or_default().insert(id);
        }
        self.order.push(id);
        self.utxos.insert(id, utxo);
        true
    }

    /// Insert several UTXOs, returning how many were new.
    pub fn add_all<I: IntoIterator<Item = Utxo>>(&mut self, utxos: I) -> usize {
        let mut added = 0;
        for utxo in utxos {
            if self.add(utxo) {
                added += 1;
            }
        }
        added
    }

    /// Remove a UTXO, returning it if present.
    pub fn remove(&mut self, id: &UtxoId) -> Option<Utxo> {
        let utxo = self.utxos.remove(id)?;
        self.order.retain(|o| o != id);
        for address in utxo.output.owners().addresses() {
            if let Some(ids) = self.by_address.get_mut(address) {
                ids.remove(id);
                if ids.is_empty() {
                    self.by_address.remove(address);
                }
            }
        }
        Some(utxo)
    }

    /// Look up a UTXO.
    ///
    /// # Returns
    /// The UTXO, or `NotFound`.
    pub fn get_utxo(&self, id: &UtxoId) -> Result<&Utxo, TransactionError> {
        self.utxos.get(id).ok_or(TransactionError::NotFound(*id))
    }

    /// All ids in insertion order.
    pub fn get_utxo_ids(&self) -> Vec<UtxoId> {
        self.order.clone()
    }

    /// All UTXOs in insertion order.
    pub fn get_all_utxos(&self) -> Vec<&Utxo> {
        self.order.iter().filter_map(|id| self.utxos.get(id)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Utxo> {
        self.order.iter().filter_map(move |id| self.utxos.get(id))
    }

    /// Ids of UTXOs owned (at least in part) by any of `addresses`.
    pub fn get_utxo_ids_by_address(&self, addresses: &[Address]) -> Vec<UtxoId> {
        let wanted: BTreeSet<UtxoId> = addresses
            .iter()
            .filter_map(|a| self.by_address.get(a))
            .flatten()
            .copied()
            .collect();
        self.order
            .iter()
            .filter(|id| wanted.contains(id))
            .copied()
            .collect()
    }

    /// Sum of unlocked `asset_id` transfer amounts owned by `addresses`.
    ///
    /// Only outputs whose threshold the given addresses meet on their own
    /// and whose locktime has passed at `as_of` are counted.
    pub fn get_balance(&self, addresses: &[Address], asset_id: &AssetId, as_of: u64) -> u64 {
        self.get_utxo_ids_by_address(addresses)
            .iter()
            .filter_map(|id| self.utxos.get(id))
            .filter(|u| u.asset_id == *asset_id && matches!(u.output, Output::SecpTransfer(_)))
            .filter(|u| {
                let owners = u.output.owners();
                let held = owners
                    .addresses()
                    .iter()
                    .filter(|a| addresses.contains(a))
                    .count();
                owners.is_unlocked(as_of) && held >= owners.threshold() as usize
            })
            .fold(0u64, |acc, u| acc.saturating_add(u.amount()))
    }

    /// Distinct asset ids present.
    pub fn get_asset_ids(&self) -> BTreeSet<AssetId> {
        self.utxos.values().map(|u| u.asset_id).collect()
    }

    /// A new set with the UTXOs matching `predicate`, in the same order.
    pub fn filter<F: Fn(&Utxo) -> bool>(&self, predicate: F) -> UtxoSet {
        let mut out = UtxoSet::new();
        for utxo in self.iter().filter(|u| predicate(u)) {
            out.add(utxo.clone());
        }
        out
    }

    /// Add every UTXO of `other` not already present.
    pub fn merge(&mut self, other: &UtxoSet) {
        for utxo in other.iter() {
            self.add(utxo.clone());
        }
    }

    /// Combine with `other` under `rule`, returning a new set.
    ///
    /// Entries from `self` come first, then entries only in `other`.
    pub fn merge_by_rule(&self, other: &UtxoSet, rule: MergeRule) -> UtxoSet {
        let keep_self = |id: &UtxoId| match rule {
            MergeRule::Intersection => other.contains(id),
            MergeRule::DifferenceSelf | MergeRule::SymDifference | MergeRule::UnionMinusNew => {
                !other.contains(id)
            }
            MergeRule::Union => true,
            MergeRule::DifferenceNew | MergeRule::UnionMinusSelf => false,
        };
        let keep_other_only = matches!(
            rule,
            MergeRule::DifferenceNew
                | MergeRule::SymDifference
                | MergeRule::Union
                | MergeRule::UnionMinusSelf
        );

        let mut out = UtxoSet::new();
        for utxo in self.iter().filter(|u| keep_self(&u.utxo_id())) {
            out.add(utxo.clone());
        }
        if keep_other_only {
            for utxo in other.iter().filter(|u| !self.contains(&u.utxo_id())) {
                out.add(utxo.clone());
            }
        }
        out
    }

    /// Deposit and bond transaction ids referenced by locked UTXOs.
    pub fn get_locked_tx_ids(&self) -> LockedTxIds {
        let mut ids = LockedTxIds::default();
        for lock in self.utxos.values().filter_map(|u| u.output.lock_ids()) {
            if lock.is_deposited() {
                ids.deposit_tx_ids.insert(lock.deposit_tx_id);
            }
            if lock.is_bonded() {
                ids.bond_tx_ids.insert(lock.bond_tx_id);
            }
        }
        ids
    }

    /// Build a set from cb58 UTXO strings as returned by node APIs.
    pub fn from_cb58_list<S: AsRef<str>>(
        encoded: &[S],
        chain: ChainKind,
    ) -> Result<UtxoSet, TransactionError> {
        let mut set = UtxoSet::new();
        for s in encoded {
            set.add(Utxo::from_cb58(s.as_ref(), chain)?);
        }
        Ok(set)
    }

    /// Encode every UTXO as cb58, in insertion order.
    pub fn to_cb58_list(&self, chain: ChainKind) -> Result<Vec<String>, TransactionError> {
        self.iter().map(|u| u.to_cb58(chain)).collect()
    }
}

impl PartialEq for UtxoSet {
    /// Set equality: same ids mapping to equal UTXOs, regardless of order.
    fn eq(&self, other: &Self) -> bool {
        self.utxos == other.utxos
    }
}

impl Eq for UtxoSet {}

impl FromIterator<Utxo> for UtxoSet {
    fn from_iter<I: IntoIterator<Item = Utxo>>(iter: I) -> Self {
        let mut set = UtxoSet::new();
        set.add_all(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{LockIds, LockedOutput};
    use crate::owners::OutputOwners;
    use chainkit_primitives::Id;

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    fn utxo(tx: u8, idx: u32, amount: u64, owner: u8) -> Utxo {
        Utxo::new(
            Id::new([tx; 32]),
            idx,
            Id::new([0xaa; 32]),
            Output::transfer(amount, OutputOwners::single(addr(owner))),
        )
    }

    fn set(items: &[Utxo]) -> UtxoSet {
        items.iter().cloned().collect()
    }

    #[test]
    fn test_add_is_noop_for_known_id() {
        let mut s = UtxoSet::new();
        assert!(s.add(utxo(1, 0, 10, 1)));
        assert!(!s.add(utxo(1, 0, 99, 2)));
        assert_eq!(s.len(), 1);
        assert_eq!(s.get_utxo(&UtxoId::new(Id::new([1; 32]), 0)).unwrap().amount(), 10);
    }

    #[test]
    fn test_get_utxo_not_found() {
        let s = UtxoSet::new();
        let id = UtxoId::new(Id::new([1; 32]), 0);
        assert!(matches!(s.get_utxo(&id), Err(TransactionError::NotFound(_))));
    }

    #[test]
    fn test_insertion_order_and_remove() {
        let mut s = set(&[utxo(3, 0, 1, 1), utxo(1, 0, 1, 1), utxo(2, 0, 1, 2)]);
        let ids = s.get_utxo_ids();
        assert_eq!(ids[0].tx_id, Id::new([3; 32]));
        assert_eq!(ids[2].tx_id, Id::new([2; 32]));
        assert!(s.remove(&ids[1]).is_some());
        assert!(s.remove(&ids[1]).is_none());
        assert_eq!(s.len(), 2);
        assert_eq!(s.get_utxo_ids_by_address(&[addr(1)]), vec![ids[0]]);
    }

    #[test]
    fn test_balance_respects_locktime_and_threshold() {
        let mut s = set(&[utxo(1, 0, 100, 1), utxo(2, 0, 50, 1)]);
        s.add(Utxo::new(
            Id::new([3; 32]),
            0,
            Id::new([0xaa; 32]),
            Output::transfer(7, OutputOwners::new(vec![addr(1)], 1, 1000).unwrap()),
        ));
        s.add(Utxo::new(
            Id::new([4; 32]),
            0,
            Id::new([0xaa; 32]),
            Output::transfer(9, OutputOwners::new(vec![addr(1), addr(2)], 2, 0).unwrap()),
        ));
        let asset = Id::new([0xaa; 32]);
        assert_eq!(s.get_balance(&[addr(1)], &asset, 0), 150);
        assert_eq!(s.get_balance(&[addr(1)], &asset, 1000), 157);
        assert_eq!(s.get_balance(&[addr(1), addr(2)], &asset, 0), 159);
        assert_eq!(s.get_balance(&[addr(1)], &Id::EMPTY, 0), 0);
    }

    #[test]
    fn test_merge_rules() {
        let a = set(&[utxo(1, 0, 1, 1), utxo(2, 0, 1, 1)]);
        let b = set(&[utxo(2, 0, 1, 1), utxo(3, 0, 1, 1)]);
        let ids = |s: &UtxoSet| -> Vec<u8> {
            s.get_utxo_ids().iter().map(|id| id.tx_id.as_bytes()[0]).collect()
        };

        assert_eq!(ids(&a.merge_by_rule(&b, MergeRule::Intersection)), vec![2]);
        assert_eq!(ids(&a.merge_by_rule(&b, MergeRule::DifferenceSelf)), vec![1]);
        assert_eq!(ids(&a.merge_by_rule(&b, MergeRule::DifferenceNew)), vec![3]);
        assert_eq!(ids(&a.merge_by_rule(&b, MergeRule::SymDifference)), vec![1, 3]);
        assert_eq!(ids(&a.merge_by_rule(&b, MergeRule::Union)), vec![1, 2, 3]);
        assert_eq!(ids(&a.merge_by_rule(&b, MergeRule::UnionMinusNew)), vec![1]);
        assert_eq!(ids(&a.merge_by_rule(&b, MergeRule::UnionMinusSelf)), vec![3]);
    }

    #[test]
    fn test_union_with_self_is_identity() {
        let a = set(&[utxo(1, 0, 1, 1), utxo(2, 1, 5, 2)]);
        assert_eq!(a.merge_by_rule(&a, MergeRule::Union), a);
        let mut b = a.clone();
        b.merge(&a);
        assert_eq!(b, a);
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn test_locked_tx_ids() {
        let mut s = UtxoSet::new();
        s.add(Utxo::new(
            Id::new([1; 32]),
            0,
            Id::new([0xaa; 32]),
            Output::Locked(LockedOutput {
                lock_ids: LockIds {
                    deposit_tx_id: Id::new([0xd1; 32]),
                    bond_tx_id: Id::new([0xb1; 32]),
                },
                inner: Box::new(Output::transfer(5, OutputOwners::single(addr(1)))),
            }),
        ));
        s.add(utxo(2, 0, 1, 1));
        let locked = s.get_locked_tx_ids();
        assert_eq!(locked.deposit_tx_ids.len(), 1);
        assert!(locked.bond_tx_ids.contains(&Id::new([0xb1; 32])));
    }

    #[test]
    fn test_utxo_cb58_round_trip() {
        let u = utxo(1, 4, 1234, 9);
        let s = u.to_cb58(ChainKind::Exchange).unwrap();
        assert_eq!(Utxo::from_cb58(&s, ChainKind::Exchange).unwrap(), u);

        let list = UtxoSet::from_cb58_list(&[s.clone(), s], ChainKind::Exchange).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.to_cb58_list(ChainKind::Exchange).unwrap().len(), 1);
    }

    #[test]
    fn test_utxo_bytes_prefix() {
        let bytes = utxo(1, 2, 3, 4).to_bytes(ChainKind::Exchange).unwrap();
        assert_eq!(&bytes[..2], &[0, 0]);
        assert_eq!(&bytes[34..38], &[0, 0, 0, 2]);
        assert!(Utxo::from_bytes(&bytes[..bytes.len() - 1], ChainKind::Exchange).is_err());
    }

    #[test]
    fn test_filter_keeps_order() {
        let s = set(&[utxo(1, 0, 5, 1), utxo(2, 0, 50, 1), utxo(3, 0, 500, 1)]);
        let big = s.filter(|u| u.amount() >= 50);
        assert_eq!(big.len(), 2);
        assert_eq!(big.get_utxo_ids()[0].tx_id, Id::new([2; 32]));
        assert_eq!(s.get_asset_ids().len(), 1);
    }
}
