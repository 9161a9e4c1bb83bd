//! Exchange-chain builders: transfers, atomic moves, asset creation,
//! minting and NFTs.

use std::collections::BTreeMap;

use chainkit_primitives::ids::{AssetId, BlockchainId};

use crate::builder::{build_base, build_export, build_import, ChainContext, SpendContext};
use crate::codec::ChainKind;
use crate::operation::{
    NftMintOperation, NftTransferOperation, Operation, SecpMintOperation, TransferableOperation,
};
use crate::output::{NftMintOutput, NftTransferOutput, Output, SecpMintOutput, SecpTransferOutput, TransferableOutput};
use crate::owners::{resolve_signers, OutputOwners, SignerResolution};
use crate::settings::NetworkSettings;
use crate::tx::exchange::NFT_FX_INDEX;
use crate::tx::{CreateAssetTx, InitialState, OperationTx, TxBody, TxKind, UnsignedTx};
use crate::utxo::{Utxo, UtxoId, UtxoSet};
use crate::TransactionError;

/// Builds exchange-chain transactions.
#[derive(Clone, Debug)]
pub struct ExchangeBuilder {
    chain: ChainContext,
}

impl ExchangeBuilder {
    pub fn new(chain: ChainContext) -> Self {
        ExchangeBuilder { chain }
    }

    pub fn from_settings(settings: &NetworkSettings) -> Result<Self, TransactionError> {
        Ok(ExchangeBuilder::new(ChainContext::from_settings(settings, ChainKind::Exchange)?))
    }

    pub fn chain(&self) -> &ChainContext {
        &self.chain
    }

    /// Send `outputs` (any mix of assets), funded from `utxos`.
    ///
    /// # Arguments
    /// * `utxos` - UTXOs available for funding.
    /// * `outputs` - Destination outputs; amounts must be non-zero.
    /// * `ctx` - Spending addresses and change owners.
    ///
    /// # Returns
    /// A base transaction whose outputs are `outputs` plus change.
    pub fn build_base_tx(
        &self,
        utxos: &UtxoSet,
        outputs: Vec<TransferableOutput>,
        ctx: &SpendContext,
    ) -> Result<UnsignedTx, TransactionError> {
        build_base(&self.chain, utxos, outputs, ctx)
    }

    /// Move `amount` of `asset_id` to `to` on another chain.
    pub fn build_export_tx(
        &self,
        utxos: &UtxoSet,
        destination_chain: BlockchainId,
        asset_id: AssetId,
        amount: u64,
        to: &OutputOwners,
        ctx: &SpendContext,
    ) -> Result<UnsignedTx, TransactionError> {
        build_export(&self.chain, utxos, destination_chain, asset_id, amount, to, ctx)
    }

    /// Claim UTXOs exported to this chain from `source_chain`.
    pub fn build_import_tx(
        &self,
        atomic_utxos: &UtxoSet,
        source_chain: BlockchainId,
        to: &OutputOwners,
        local_utxos: &UtxoSet,
        ctx: &SpendContext,
    ) -> Result<UnsignedTx, TransactionError> {
        build_import(&self.chain, atomic_utxos, source_chain, to, local_utxos, ctx)
    }

    /// Create an asset from caller-supplied initial states.
    pub fn build_create_asset_tx(
        &self,
        utxos: &UtxoSet,
        name: &str,
        symbol: &str,
        denomination: u8,
        initial_states: Vec<InitialState>,
        ctx: &SpendContext,
    ) -> Result<UnsignedTx, TransactionError> {
        let chain = &self.chain;
        chain.settle_fee(TxKind::CreateAsset, |fee| {
            let selection = chain.fund(utxos, &BTreeMap::new(), fee, ctx)?;
            let base = chain.base_tx(Vec::new(), selection, ctx)?;
            let tx = CreateAssetTx::new(
                base,
                name.to_string(),
                symbol.to_string(),
                denomination,
                initial_states.clone(),
            )?;
            chain.finish(TxBody::CreateAsset(tx))
        })
    }

    /// Create an NFT family with one minting group per entry of `minters`.
    ///
    /// Group ids are assigned in order starting at zero.
    pub fn build_create_nft_asset_tx(
        &self,
        utxos: &UtxoSet,
        name: &str,
        symbol: &str,
        minters: Vec<OutputOwners>,
        ctx: &SpendContext,
    ) -> Result<UnsignedTx, TransactionError> {
        if minters.is_empty() {
            return Err(TransactionError::InvalidTransaction("an NFT asset needs at least one minter".into()));
        }
        let outputs = minters
            .into_iter()
            .enumerate()
            .map(|(i, owners)| {
                Output::NftMint(NftMintOutput {
                    group_id: i as u32,
                    owners,
                })
            })
            .collect();
        let state = InitialState::new(NFT_FX_INDEX, outputs, self.chain.codec)?;
        self.build_create_asset_tx(utxos, name, symbol, 0, vec![state], ctx)
    }

    /// Mint `amount` more of the asset controlled by the mint UTXO
    /// `mint_utxo`, paying it to `to` and re-issuing the mint authority.
    pub fn build_secp_mint_tx(
        &self,
        utxos: &UtxoSet,
        mint_utxo: &UtxoId,
        amount: u64,
        to: &OutputOwners,
        ctx: &SpendContext,
    ) -> Result<UnsignedTx, TransactionError> {
        let utxo = utxos.get_utxo(mint_utxo)?;
        let Output::SecpMint(mint) = &utxo.output else {
            return Err(TransactionError::InvalidTransaction(format!("{mint_utxo} is not a mint output")));
        };
        let auth = self.authorize(utxo, ctx)?;
        let op = TransferableOperation::new(
            utxo.asset_id,
            vec![*mint_utxo],
            Operation::SecpMint(SecpMintOperation {
                sig_indices: auth.sig_indices,
                mint_output: SecpMintOutput {
                    owners: mint.owners.clone(),
                },
                transfer_output: SecpTransferOutput {
                    amount,
                    owners: to.clone(),
                },
            }),
        )
        .with_signers(auth.signers);
        self.build_operation_tx(utxos, vec![op], ctx)
    }

    /// Mint one NFT per owner group in `owners` from the minting UTXO
    /// `minter_utxo`.
    pub fn build_nft_mint_tx(
        &self,
        utxos: &UtxoSet,
        minter_utxo: &UtxoId,
        payload: Vec<u8>,
        owners: Vec<OutputOwners>,
        ctx: &SpendContext,
    ) -> Result<UnsignedTx, TransactionError> {
        let utxo = utxos.get_utxo(minter_utxo)?;
        let Output::NftMint(minter) = &utxo.output else {
            return Err(TransactionError::InvalidTransaction(format!(
                "{minter_utxo} is not an NFT mint output"
            )));
        };
        if owners.is_empty() {
            return Err(TransactionError::InvalidTransaction("no NFT owners given".into()));
        }
        let auth = self.authorize(utxo, ctx)?;
        let op = TransferableOperation::new(
            utxo.asset_id,
            vec![*minter_utxo],
            Operation::NftMint(NftMintOperation {
                sig_indices: auth.sig_indices,
                group_id: minter.group_id,
                payload,
                outputs: owners,
            }),
        )
        .with_signers(auth.signers);
        self.build_operation_tx(utxos, vec![op], ctx)
    }

    /// Transfer the NFT held in `nft_utxo` to `to`.
    pub fn build_nft_transfer_tx(
        &self,
        utxos: &UtxoSet,
        nft_utxo: &UtxoId,
        to: &OutputOwners,
        ctx: &SpendContext,
    ) -> Result<UnsignedTx, TransactionError> {
        let utxo = utxos.get_utxo(nft_utxo)?;
        let Output::NftTransfer(nft) = &utxo.output else {
            return Err(TransactionError::InvalidTransaction(format!("{nft_utxo} is not an NFT")));
        };
        let auth = self.authorize(utxo, ctx)?;
        let op = TransferableOperation::new(
            utxo.asset_id,
            vec![*nft_utxo],
            Operation::NftTransfer(NftTransferOperation {
                sig_indices: auth.sig_indices,
                output: NftTransferOutput {
                    group_id: nft.group_id,
                    payload: nft.payload.clone(),
                    owners: to.clone(),
                },
            }),
        )
        .with_signers(auth.signers);
        self.build_operation_tx(utxos, vec![op], ctx)
    }

    fn build_operation_tx(
        &self,
        utxos: &UtxoSet,
        operations: Vec<TransferableOperation>,
        ctx: &SpendContext,
    ) -> Result<UnsignedTx, TransactionError> {
        let chain = &self.chain;
        chain.settle_fee(TxKind::Operation, |fee| {
            let selection = chain.fund(utxos, &BTreeMap::new(), fee, ctx)?;
            let base = chain.base_tx(Vec::new(), selection, ctx)?;
            chain.finish(TxBody::Operation(OperationTx::new(base, operations.clone())))
        })
    }

    fn authorize(&self, utxo: &Utxo, ctx: &SpendContext) -> Result<SignerResolution, TransactionError> {
        let owners = utxo.output.owners();
        if !owners.is_unlocked(ctx.as_of) {
            return Err(TransactionError::Unspendable(utxo.utxo_id()));
        }
        resolve_signers(owners, &ctx.aliases, |a| ctx.from.contains(a))?
            .ok_or(TransactionError::Unspendable(utxo.utxo_id()))
    }
}
