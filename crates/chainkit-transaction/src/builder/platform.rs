//! Platform-chain builders: staking, subnets, chains and atomic moves.
//!
//! The platform chain stakes its fee asset, so validator and delegator
//! stake is selected together with the fee.

use std::collections::BTreeMap;

use chainkit_primitives::ids::{AssetId, BlockchainId, SubnetId};
use chainkit_primitives::Id;
use tracing::debug;

use crate::builder::{build_base, build_export, build_import, ChainContext, SpendContext};
use crate::codec::ChainKind;
use crate::output::{Output, TransferableOutput};
use crate::owners::{resolve_signers, OutputOwners};
use crate::settings::NetworkSettings;
use crate::tx::{
    AddDelegatorTx, AddSubnetValidatorTx, AddValidatorTx, CreateChainTx, CreateSubnetTx, SubnetAuth, TxBody,
    TxKind, UnsignedTx, Validator,
};
use crate::utxo::UtxoSet;
use crate::TransactionError;

/// What a new chain runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainDefinition {
    pub name: String,
    pub vm_id: Id,
    pub fx_ids: Vec<Id>,
    pub genesis: Vec<u8>,
}

/// Builds platform-chain transactions.
#[derive(Clone, Debug)]
pub struct PlatformBuilder {
    chain: ChainContext,
}

impl PlatformBuilder {
    pub fn new(chain: ChainContext) -> Self {
        PlatformBuilder { chain }
    }

    pub fn from_settings(settings: &NetworkSettings) -> Result<Self, TransactionError> {
        Ok(PlatformBuilder::new(ChainContext::from_settings(settings, ChainKind::Platform)?))
    }

    pub fn chain(&self) -> &ChainContext {
        &self.chain
    }

    pub fn build_base_tx(
        &self,
        utxos: &UtxoSet,
        outputs: Vec<TransferableOutput>,
        ctx: &SpendContext,
    ) -> Result<UnsignedTx, TransactionError> {
        build_base(&self.chain, utxos, outputs, ctx)
    }

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

    /// Stake `validator.weight` of the fee asset to validate the primary
    /// network.
    ///
    /// # Arguments
    /// * `utxos` - UTXOs funding stake and fee.
    /// * `validator` - Node, period and weight.
    /// * `rewards_owner` - Who receives validation rewards.
    /// * `shares` - Delegation fee in millionths.
    /// * `ctx` - Spending addresses; stake returns to the change owners.
    pub fn build_add_validator_tx(
        &self,
        utxos: &UtxoSet,
        validator: Validator,
        rewards_owner: &OutputOwners,
        shares: u32,
        ctx: &SpendContext,
    ) -> Result<UnsignedTx, TransactionError> {
        let chain = &self.chain;
        let stake = self.stake_outputs(validator.weight, ctx)?;
        let targets = BTreeMap::from([(chain.fee_asset_id, validator.weight)]);
        chain.settle_fee(TxKind::AddValidator, |fee| {
            let selection = chain.fund(utxos, &targets, fee, ctx)?;
            let base = chain.base_tx(Vec::new(), selection, ctx)?;
            let tx = AddValidatorTx::new(
                base,
                validator,
                stake.clone(),
                rewards_owner.clone(),
                shares,
                chain.codec,
            )?;
            chain.finish(TxBody::AddValidator(tx))
        })
    }

    /// Stake `validator.weight` of the fee asset behind an existing
    /// validator.
    pub fn build_add_delegator_tx(
        &self,
        utxos: &UtxoSet,
        validator: Validator,
        rewards_owner: &OutputOwners,
        ctx: &SpendContext,
    ) -> Result<UnsignedTx, TransactionError> {
        let chain = &self.chain;
        let stake = self.stake_outputs(validator.weight, ctx)?;
        let targets = BTreeMap::from([(chain.fee_asset_id, validator.weight)]);
        chain.settle_fee(TxKind::AddDelegator, |fee| {
            let selection = chain.fund(utxos, &targets, fee, ctx)?;
            let base = chain.base_tx(Vec::new(), selection, ctx)?;
            let tx = AddDelegatorTx::new(base, validator, stake.clone(), rewards_owner.clone(), chain.codec)?;
            chain.finish(TxBody::AddDelegator(tx))
        })
    }

    /// Add `validator` to `subnet_id`, authorized by the subnet owners.
    pub fn build_add_subnet_validator_tx(
        &self,
        utxos: &UtxoSet,
        validator: Validator,
        subnet_id: SubnetId,
        subnet_owner: &OutputOwners,
        ctx: &SpendContext,
    ) -> Result<UnsignedTx, TransactionError> {
        let chain = &self.chain;
        let subnet_auth = self.subnet_auth(subnet_id, subnet_owner, ctx)?;
        chain.settle_fee(TxKind::AddSubnetValidator, |fee| {
            let selection = chain.fund(utxos, &BTreeMap::new(), fee, ctx)?;
            let base = chain.base_tx(Vec::new(), selection, ctx)?;
            chain.finish(TxBody::AddSubnetValidator(AddSubnetValidatorTx {
                base,
                validator,
                subnet_id,
                subnet_auth: subnet_auth.clone(),
            }))
        })
    }

    /// Create a subnet owned by `owner`.
    pub fn build_create_subnet_tx(
        &self,
        utxos: &UtxoSet,
        owner: &OutputOwners,
        ctx: &SpendContext,
    ) -> Result<UnsignedTx, TransactionError> {
        let chain = &self.chain;
        chain.settle_fee(TxKind::CreateSubnet, |fee| {
            let selection = chain.fund(utxos, &BTreeMap::new(), fee, ctx)?;
            let base = chain.base_tx(Vec::new(), selection, ctx)?;
            chain.finish(TxBody::CreateSubnet(CreateSubnetTx {
                base,
                owner: owner.clone(),
            }))
        })
    }

    /// Create a chain in `subnet_id`, authorized by the subnet owners.
    pub fn build_create_chain_tx(
        &self,
        utxos: &UtxoSet,
        subnet_id: SubnetId,
        subnet_owner: &OutputOwners,
        definition: &ChainDefinition,
        ctx: &SpendContext,
    ) -> Result<UnsignedTx, TransactionError> {
        let chain = &self.chain;
        let subnet_auth = self.subnet_auth(subnet_id, subnet_owner, ctx)?;
        chain.settle_fee(TxKind::CreateChain, |fee| {
            let selection = chain.fund(utxos, &BTreeMap::new(), fee, ctx)?;
            let base = chain.base_tx(Vec::new(), selection, ctx)?;
            let tx = CreateChainTx::new(
                base,
                subnet_id,
                definition.name.clone(),
                definition.vm_id,
                definition.fx_ids.clone(),
                definition.genesis.clone(),
                subnet_auth.clone(),
            )?;
            chain.finish(TxBody::CreateChain(tx))
        })
    }

    fn stake_outputs(&self, weight: u64, ctx: &SpendContext) -> Result<Vec<TransferableOutput>, TransactionError> {
        Ok(vec![TransferableOutput::new(
            self.chain.fee_asset_id,
            Output::transfer(weight, ctx.change_owner()?),
        )])
    }

    fn subnet_auth(
        &self,
        subnet_id: SubnetId,
        subnet_owner: &OutputOwners,
        ctx: &SpendContext,
    ) -> Result<SubnetAuth, TransactionError> {
        let resolution = resolve_signers(subnet_owner, &ctx.aliases, |a| ctx.from.contains(a))?
            .ok_or(TransactionError::SubnetUnauthorized(subnet_id))?;
        debug!(subnet = %subnet_id, indices = ?resolution.sig_indices, "resolved subnet auth");
        Ok(SubnetAuth::new(resolution.sig_indices)?.with_signers(resolution.signers))
    }
}
