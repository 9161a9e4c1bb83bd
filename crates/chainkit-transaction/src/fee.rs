//! Fee strategies.
//!
//! A chain prices each transaction kind with either a fixed amount or a
//! size-based rule. Size-based fees depend on the signed size, which is
//! estimated from the unsigned bytes plus the credentials the signer slots
//! will need.

use std::collections::BTreeMap;

use chainkit_primitives::ec::signature::SIGNATURE_LEN;
use serde::{Deserialize, Serialize};

use crate::tx::{TxKind, UnsignedTx};
use crate::TransactionError;

/// Bytes a credential adds before its signatures: type id and count.
pub const CREDENTIAL_OVERHEAD: usize = 8;

/// Bytes of the credential count following the unsigned transaction.
pub const CREDENTIAL_LIST_OVERHEAD: usize = 4;

/// Prices one transaction.
pub trait FeeStrategy {
    /// Fee owed by `tx`, in the chain's fee asset.
    fn fee(&self, tx: &UnsignedTx) -> Result<u64, TransactionError>;
}

/// A flat fee.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedFee(pub u64);

impl FeeStrategy for FixedFee {
    fn fee(&self, _tx: &UnsignedTx) -> Result<u64, TransactionError> {
        Ok(self.0)
    }
}

/// `base + per_byte * estimated signed size`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeBasedFee {
    pub base: u64,
    pub per_byte: u64,
}

impl FeeStrategy for SizeBasedFee {
    fn fee(&self, tx: &UnsignedTx) -> Result<u64, TransactionError> {
        let size = estimated_signed_size(tx)? as u64;
        self.per_byte
            .checked_mul(size)
            .and_then(|v| v.checked_add(self.base))
            .ok_or_else(|| TransactionError::FeeError(format!("fee for {size} bytes overflows")))
    }
}

/// Size of `tx` once every signer slot carries its credential.
pub fn estimated_signed_size(tx: &UnsignedTx) -> Result<usize, TransactionError> {
    let unsigned = tx.to_bytes()?.len();
    let credentials: usize = tx
        .signer_slots()
        .iter()
        .map(|slot| CREDENTIAL_OVERHEAD + slot.sig_indices.len() * SIGNATURE_LEN)
        .sum();
    Ok(unsigned + CREDENTIAL_LIST_OVERHEAD + credentials)
}

/// A fee rule as written in network settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeeRule {
    Fixed { amount: u64 },
    SizeBased { base: u64, per_byte: u64 },
}

impl FeeStrategy for FeeRule {
    fn fee(&self, tx: &UnsignedTx) -> Result<u64, TransactionError> {
        match *self {
            FeeRule::Fixed { amount } => FixedFee(amount).fee(tx),
            FeeRule::SizeBased { base, per_byte } => SizeBasedFee { base, per_byte }.fee(tx),
        }
    }
}

impl FeeRule {
    /// Whether the fee depends on the transaction's contents.
    pub fn is_size_based(&self) -> bool {
        matches!(self, FeeRule::SizeBased { .. })
    }
}

/// Default rule plus per-kind overrides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub default: FeeRule,
    #[serde(default)]
    pub overrides: BTreeMap<TxKind, FeeRule>,
}

impl FeeSchedule {
    pub fn fixed(amount: u64) -> Self {
        FeeSchedule {
            default: FeeRule::Fixed { amount },
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, kind: TxKind, rule: FeeRule) -> Self {
        self.overrides.insert(kind, rule);
        self
    }

    /// The rule pricing `kind`.
    pub fn rule(&self, kind: TxKind) -> FeeRule {
        self.overrides.get(&kind).copied().unwrap_or(self.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Codec;
    use crate::input::{Input, TransferableInput};
    use crate::tx::{BaseTx, TxBody};
    use chainkit_primitives::Id;

    fn tx_with_inputs(n: u8) -> UnsignedTx {
        let inputs = (0..n)
            .map(|i| TransferableInput::new(Id::new([i + 1; 32]), 0, Id::EMPTY, Input::transfer(10, vec![0, 1])))
            .collect();
        let codec = Codec::exchange();
        let base = BaseTx::new(1, Id::EMPTY, vec![], inputs, vec![], codec).unwrap();
        UnsignedTx::new(codec, TxBody::Base(base)).unwrap()
    }

    #[test]
    fn test_fixed_fee_ignores_size() {
        assert_eq!(FixedFee(1_000_000).fee(&tx_with_inputs(0)).unwrap(), 1_000_000);
        assert_eq!(FixedFee(1_000_000).fee(&tx_with_inputs(3)).unwrap(), 1_000_000);
    }

    #[test]
    fn test_size_estimate_counts_credentials() {
        let tx = tx_with_inputs(2);
        let unsigned = tx.to_bytes().unwrap().len();
        let expected = unsigned + 4 + 2 * (8 + 2 * 65);
        assert_eq!(estimated_signed_size(&tx).unwrap(), expected);
        let fee = SizeBasedFee { base: 100, per_byte: 2 };
        assert_eq!(fee.fee(&tx).unwrap(), 100 + 2 * expected as u64);
    }

    #[test]
    fn test_schedule_overrides() {
        let schedule = FeeSchedule::fixed(10).with_override(TxKind::CreateAsset, FeeRule::Fixed { amount: 50 });
        assert_eq!(schedule.rule(TxKind::Base), FeeRule::Fixed { amount: 10 });
        assert_eq!(schedule.rule(TxKind::CreateAsset), FeeRule::Fixed { amount: 50 });
    }

    #[test]
    fn test_fee_rule_json_shape() {
        let rule: FeeRule = serde_json::from_str(r#"{"type":"size_based","base":5,"per_byte":1}"#).unwrap();
        assert_eq!(rule, FeeRule::SizeBased { base: 5, per_byte: 1 });
        assert!(rule.is_size_based());
        let json = serde_json::to_string(&FeeRule::Fixed { amount: 3 }).unwrap();
        assert_eq!(json, r#"{"type":"fixed","amount":3}"#);
    }
}
