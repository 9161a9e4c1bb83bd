//! Contract-chain atomic builders.

use std::collections::BTreeMap;

use chainkit_primitives::ids::{AssetId, BlockchainId};
use chainkit_primitives::Address;

use crate::builder::{add_target, selection, ChainContext, SpendContext};
use crate::codec::ChainKind;
use crate::output::{Output, TransferableOutput};
use crate::owners::OutputOwners;
use crate::settings::NetworkSettings;
use crate::tx::{ContractExportTx, ContractImportTx, EvmInput, EvmOutput, TxBody, TxKind, UnsignedTx};
use crate::utxo::UtxoSet;
use crate::TransactionError;

/// Builds contract-chain import and export transactions.
#[derive(Clone, Debug)]
pub struct ContractBuilder {
    chain: ChainContext,
}

impl ContractBuilder {
    pub fn new(chain: ChainContext) -> Self {
        ContractBuilder { chain }
    }

    pub fn from_settings(settings: &NetworkSettings) -> Result<Self, TransactionError> {
        Ok(ContractBuilder::new(ChainContext::from_settings(settings, ChainKind::Contract)?))
    }

    pub fn chain(&self) -> &ChainContext {
        &self.chain
    }

    /// Import every spendable atomic UTXO into the account `to`.
    ///
    /// The fee is deducted from the imported fee-asset funds.
    pub fn build_import_tx(
        &self,
        atomic_utxos: &UtxoSet,
        source_chain: BlockchainId,
        to: Address,
        ctx: &SpendContext,
    ) -> Result<UnsignedTx, TransactionError> {
        let chain = &self.chain;
        let mut imported = Vec::new();
        for utxo in atomic_utxos.iter() {
            if let Some(input) = selection::spendable_input(utxo, ctx)? {
                imported.push(input);
            }
        }
        if imported.is_empty() {
            return Err(TransactionError::InvalidTransaction(format!(
                "no spendable UTXOs to import from {source_chain}"
            )));
        }
        let mut totals = BTreeMap::new();
        for input in &imported {
            add_target(&mut totals, input.asset_id, input.amount())?;
        }

        chain.settle_fee(TxKind::Import, |fee| {
            let available = totals.get(&chain.fee_asset_id).copied().unwrap_or(0);
            if available < fee {
                return Err(TransactionError::InsufficientFunds {
                    asset_id: chain.fee_asset_id,
                    needed: fee,
                    available,
                });
            }
            let outs = totals
                .iter()
                .map(|(asset_id, &amount)| EvmOutput {
                    address: to,
                    amount: if *asset_id == chain.fee_asset_id { amount - fee } else { amount },
                    asset_id: *asset_id,
                })
                .filter(|o| o.amount > 0)
                .collect();
            chain.finish(TxBody::ContractImport(ContractImportTx::new(
                chain.network_id,
                chain.blockchain_id,
                source_chain,
                imported.clone(),
                outs,
            )?))
        })
    }

    /// Export `amount` of `asset_id` from the account `from` to `to` on
    /// `destination_chain`, with the fee debited from the same account.
    ///
    /// # Arguments
    /// * `from` - Account address; its key signs the export.
    /// * `nonce` - The account's current nonce.
    pub fn build_export_tx(
        &self,
        destination_chain: BlockchainId,
        from: Address,
        asset_id: AssetId,
        amount: u64,
        nonce: u64,
        to: &OutputOwners,
    ) -> Result<UnsignedTx, TransactionError> {
        if amount == 0 {
            return Err(TransactionError::InvalidTransaction("nothing to export".into()));
        }
        let chain = &self.chain;
        let exported = vec![TransferableOutput::new(asset_id, Output::transfer(amount, to.clone()))];
        chain.settle_fee(TxKind::Export, |fee| {
            let mut debits = BTreeMap::from([(asset_id, amount)]);
            add_target(&mut debits, chain.fee_asset_id, fee)?;
            let inputs = debits
                .into_iter()
                .filter(|(_, v)| *v > 0)
                .map(|(asset_id, amount)| EvmInput {
                    address: from,
                    amount,
                    asset_id,
                    nonce,
                })
                .collect();
            chain.finish(TxBody::ContractExport(ContractExportTx::new(
                chain.network_id,
                chain.blockchain_id,
                destination_chain,
                inputs,
                exported.clone(),
                chain.codec,
            )))
        })
    }
}
