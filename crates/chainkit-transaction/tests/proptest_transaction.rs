use proptest::prelude::*;

use chainkit_primitives::{Address, Id};
use chainkit_transaction::builder::{ChainContext, ExchangeBuilder, SpendContext};
use chainkit_transaction::codec::{ChainKind, Codec};
use chainkit_transaction::fee::FeeSchedule;
use chainkit_transaction::output::{Output, TransferableOutput};
use chainkit_transaction::owners::OutputOwners;
use chainkit_transaction::tx::{BaseTx, TxBody, UnsignedTx};
use chainkit_transaction::utxo::{MergeRule, Utxo, UtxoSet};
use chainkit_transaction::TransactionError;

const ASSET: Id = Id::new([0xaa; 32]);
const ME: Address = Address::new([1; 20]);
const YOU: Address = Address::new([2; 20]);

fn chain(fee: u64) -> ChainContext {
    ChainContext {
        network_id: 5,
        blockchain_id: Id::new([0xbb; 32]),
        fee_asset_id: ASSET,
        fees: FeeSchedule::fixed(fee),
        codec: Codec::exchange(),
    }
}

fn utxo_set(amounts: &[u64]) -> UtxoSet {
    amounts
        .iter()
        .enumerate()
        .map(|(i, &amount)| {
            let mut tx = [0u8; 32];
            tx[..8].copy_from_slice(&(i as u64).to_be_bytes());
            Utxo::new(Id::new(tx), 0, ASSET, Output::transfer(amount, OutputOwners::single(ME)))
        })
        .collect()
}

fn pay(amount: u64) -> TransferableOutput {
    TransferableOutput::new(ASSET, Output::transfer(amount, OutputOwners::single(YOU)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn selection_covers_target_and_fee(
        amounts in prop::collection::vec(1u64..1_000_000, 1..8),
        target in 1u64..3_000_000,
        fee in 0u64..1_000,
    ) {
        let builder = ExchangeBuilder::new(chain(fee));
        let utxos = utxo_set(&amounts);
        let ctx = SpendContext::new(vec![ME], vec![ME]);
        let available: u64 = amounts.iter().sum();

        match builder.build_base_tx(&utxos, vec![pay(target)], &ctx) {
            Ok(tx) => {
                let consumed = tx.consumed().unwrap()[&ASSET];
                prop_assert!(consumed >= target + fee);
                prop_assert_eq!(tx.burned(&ASSET).unwrap(), fee);
                let change: u64 = tx
                    .outputs()
                    .iter()
                    .filter(|o| o.output.owners().addresses() == [ME])
                    .map(|o| o.amount())
                    .sum();
                prop_assert_eq!(change, consumed - target - fee);
            }
            Err(TransactionError::InsufficientFunds { needed, .. }) => {
                prop_assert!(available < target + fee);
                prop_assert_eq!(needed, target + fee);
            }
            Err(e) => prop_assert!(false, "unexpected error: {e}"),
        }
    }

    #[test]
    fn built_tx_round_trips(
        amounts in prop::collection::vec(10_000u64..1_000_000, 1..6),
        target in 1u64..10_000,
    ) {
        let builder = ExchangeBuilder::new(chain(10));
        let tx = builder
            .build_base_tx(&utxo_set(&amounts), vec![pay(target)], &SpendContext::new(vec![ME], vec![ME]))
            .unwrap();
        let bytes = tx.to_bytes().unwrap();
        let decoded = UnsignedTx::from_bytes(&bytes, ChainKind::Exchange).unwrap();
        prop_assert_eq!(decoded.to_bytes().unwrap(), bytes);
        prop_assert_eq!(decoded, tx);
    }

    #[test]
    fn output_order_does_not_change_encoding(
        amounts in prop::collection::vec(1u64..1_000_000, 1..8).prop_shuffle(),
    ) {
        let encode = |amounts: &[u64]| {
            let base = BaseTx {
                network_id: 5,
                blockchain_id: Id::EMPTY,
                outputs: amounts.iter().map(|&a| pay(a)).collect(),
                inputs: vec![],
                memo: vec![],
            };
            UnsignedTx::new(Codec::exchange(), TxBody::Base(base)).unwrap().to_bytes().unwrap()
        };
        let mut sorted = amounts.clone();
        sorted.sort_unstable();
        prop_assert_eq!(encode(&amounts), encode(&sorted));
    }

    #[test]
    fn merge_with_self_is_idempotent(amounts in prop::collection::vec(1u64..1_000, 0..8)) {
        let set = utxo_set(&amounts);
        prop_assert_eq!(set.merge_by_rule(&set, MergeRule::Union), set.clone());
        prop_assert_eq!(set.merge_by_rule(&set, MergeRule::Intersection), set.clone());
        prop_assert!(set.merge_by_rule(&set, MergeRule::SymDifference).is_empty());
    }
}
