//! Transaction builders.
//!
//! Builders are pure: they take a `UtxoSet` and an intent and return an
//! `UnsignedTx` whose inputs already carry signature indices and signer
//! addresses. Nothing is returned on failure; a builder either produces a
//! fully funded transaction or an error.
//!
//! Fees are settled by rebuilding: the transaction is built paying a
//! candidate fee, priced with the chain's rule for that transaction kind,
//! and rebuilt with the priced fee until the fee paid covers the fee owed.

pub mod contract;
pub mod exchange;
pub mod platform;
pub mod selection;

use std::collections::BTreeMap;

use chainkit_primitives::ids::{AssetId, BlockchainId};
use chainkit_primitives::Address;
use tracing::debug;

use crate::codec::{ChainKind, Codec};
use crate::fee::{FeeRule, FeeSchedule, FeeStrategy};
use crate::output::{Output, TransferableOutput};
use crate::owners::{AliasMap, OutputOwners};
use crate::settings::NetworkSettings;
use crate::tx::{BaseTx, ExportTx, ImportTx, TxBody, TxKind, UnsignedTx};
use crate::utxo::UtxoSet;
use crate::TransactionError;

pub use contract::ContractBuilder;
pub use exchange::ExchangeBuilder;
pub use platform::{ChainDefinition, PlatformBuilder};
pub use selection::{select_inputs, InputSelectionPolicy, Selection};

/// Upper bound on rebuild rounds while settling a size-based fee.
pub const MAX_FEE_ROUNDS: usize = 16;

/// Who is spending, where change goes, and selection options.
#[derive(Clone, Debug, Default)]
pub struct SpendContext {
    /// Addresses whose keys are available to sign.
    pub from: Vec<Address>,
    /// Owners of change outputs (1-of-n, no locktime).
    pub change_addresses: Vec<Address>,
    /// Current time; outputs locked past it are skipped.
    pub as_of: u64,
    pub memo: Vec<u8>,
    pub policy: InputSelectionPolicy,
    /// Multisig aliases that may appear as owners.
    pub aliases: AliasMap,
}

impl SpendContext {
    pub fn new(from: Vec<Address>, change_addresses: Vec<Address>) -> Self {
        SpendContext {
            from,
            change_addresses,
            ..Default::default()
        }
    }

    pub fn with_as_of(mut self, as_of: u64) -> Self {
        self.as_of = as_of;
        self
    }

    pub fn with_memo(mut self, memo: Vec<u8>) -> Self {
        self.memo = memo;
        self
    }

    pub fn with_policy(mut self, policy: InputSelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_aliases(mut self, aliases: AliasMap) -> Self {
        self.aliases = aliases;
        self
    }

    /// The owner group change outputs are paid to.
    pub fn change_owner(&self) -> Result<OutputOwners, TransactionError> {
        if self.change_addresses.is_empty() {
            return Err(TransactionError::InvalidTransaction("no change address given".into()));
        }
        let mut addresses = self.change_addresses.clone();
        addresses.sort();
        addresses.dedup();
        OutputOwners::new(addresses, 1, 0)
    }
}

/// The per-chain constants a builder stamps into every transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainContext {
    pub network_id: u32,
    pub blockchain_id: BlockchainId,
    pub fee_asset_id: AssetId,
    pub fees: FeeSchedule,
    pub codec: Codec,
}

impl ChainContext {
    pub fn from_settings(settings: &NetworkSettings, kind: ChainKind) -> Result<Self, TransactionError> {
        let chain = settings.chain(kind);
        Ok(ChainContext {
            network_id: settings.network_id,
            blockchain_id: chain.blockchain_id,
            fee_asset_id: chain.fee_asset_id,
            fees: chain.fees.clone(),
            codec: settings.codec(kind)?,
        })
    }

    pub(crate) fn base_tx(
        &self,
        outputs: Vec<TransferableOutput>,
        selection: Selection,
        ctx: &SpendContext,
    ) -> Result<BaseTx, TransactionError> {
        let mut outputs = outputs;
        outputs.extend(selection.change);
        BaseTx::new(
            self.network_id,
            self.blockchain_id,
            outputs,
            selection.inputs,
            ctx.memo.clone(),
            self.codec,
        )
    }

    /// Select inputs covering `targets` plus `fee` of the fee asset.
    pub(crate) fn fund(
        &self,
        utxos: &UtxoSet,
        targets: &BTreeMap<AssetId, u64>,
        fee: u64,
        ctx: &SpendContext,
    ) -> Result<Selection, TransactionError> {
        let mut targets = targets.clone();
        add_target(&mut targets, self.fee_asset_id, fee)?;
        select_inputs(utxos, &targets, ctx, self.codec)
    }

    pub(crate) fn finish(&self, body: TxBody) -> Result<UnsignedTx, TransactionError> {
        UnsignedTx::new(self.codec, body)
    }

    /// Build and rebuild until the fee paid covers the rule for `kind`.
    pub(crate) fn settle_fee<F>(&self, kind: TxKind, attempt: F) -> Result<UnsignedTx, TransactionError>
    where
        F: FnMut(u64) -> Result<UnsignedTx, TransactionError>,
    {
        settle_fee(self.fees.rule(kind), kind, attempt)
    }
}

pub(crate) fn settle_fee<F>(rule: FeeRule, kind: TxKind, mut attempt: F) -> Result<UnsignedTx, TransactionError>
where
    F: FnMut(u64) -> Result<UnsignedTx, TransactionError>,
{
    let mut fee = match rule {
        FeeRule::Fixed { amount } => amount,
        FeeRule::SizeBased { base, .. } => base,
    };
    for round in 0..MAX_FEE_ROUNDS {
        let tx = attempt(fee)?;
        let required = rule.fee(&tx)?;
        debug!(%kind, round, fee, required, "fee round");
        if required <= fee {
            return Ok(tx);
        }
        fee = required;
    }
    Err(TransactionError::FeeError(format!(
        "{kind} fee did not settle after {MAX_FEE_ROUNDS} rounds"
    )))
}

pub(crate) fn add_target(
    targets: &mut BTreeMap<AssetId, u64>,
    asset_id: AssetId,
    amount: u64,
) -> Result<(), TransactionError> {
    let entry = targets.entry(asset_id).or_insert(0);
    *entry = entry
        .checked_add(amount)
        .ok_or_else(|| TransactionError::InvalidTransaction(format!("amount of asset {asset_id} overflows")))?;
    Ok(())
}

pub(crate) fn targets_of(outputs: &[TransferableOutput]) -> Result<BTreeMap<AssetId, u64>, TransactionError> {
    let mut targets = BTreeMap::new();
    for output in outputs {
        add_target(&mut targets, output.asset_id, output.amount())?;
    }
    Ok(targets)
}

/// Send `outputs`, funded from `utxos`.
pub(crate) fn build_base(
    chain: &ChainContext,
    utxos: &UtxoSet,
    outputs: Vec<TransferableOutput>,
    ctx: &SpendContext,
) -> Result<UnsignedTx, TransactionError> {
    if outputs.iter().any(|o| o.amount() == 0) {
        return Err(TransactionError::InvalidTransaction("zero-amount output".into()));
    }
    let targets = targets_of(&outputs)?;
    chain.settle_fee(TxKind::Base, |fee| {
        let selection = chain.fund(utxos, &targets, fee, ctx)?;
        let base = chain.base_tx(outputs.clone(), selection, ctx)?;
        chain.finish(TxBody::Base(base))
    })
}

/// Export `amount` of `asset_id` to `to` on `destination_chain`.
pub(crate) fn build_export(
    chain: &ChainContext,
    utxos: &UtxoSet,
    destination_chain: BlockchainId,
    asset_id: AssetId,
    amount: u64,
    to: &OutputOwners,
    ctx: &SpendContext,
) -> Result<UnsignedTx, TransactionError> {
    if amount == 0 {
        return Err(TransactionError::InvalidTransaction("nothing to export".into()));
    }
    let exported = vec![TransferableOutput::new(asset_id, Output::transfer(amount, to.clone()))];
    let targets = BTreeMap::from([(asset_id, amount)]);
    chain.settle_fee(TxKind::Export, |fee| {
        let selection = chain.fund(utxos, &targets, fee, ctx)?;
        let base = chain.base_tx(Vec::new(), selection, ctx)?;
        chain.finish(TxBody::Export(ExportTx::new(
            base,
            destination_chain,
            exported.clone(),
            chain.codec,
        )))
    })
}

/// Import every UTXO in `atomic` the caller can spend, paying them to `to`.
///
/// The fee comes out of the imported fee-asset funds when they cover it;
/// otherwise it is funded from `local`.
pub(crate) fn build_import(
    chain: &ChainContext,
    atomic: &UtxoSet,
    source_chain: BlockchainId,
    to: &OutputOwners,
    local: &UtxoSet,
    ctx: &SpendContext,
) -> Result<UnsignedTx, TransactionError> {
    let mut imported = Vec::new();
    for utxo in atomic.iter() {
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
    debug!(source = %source_chain, inputs = imported.len(), "importing atomic UTXOs");
    let local = local.filter(|u| !atomic.contains(&u.utxo_id()));

    chain.settle_fee(TxKind::Import, |fee| {
        let mut amounts = totals.clone();
        let from_imported = amounts.get(&chain.fee_asset_id).copied().unwrap_or(0) >= fee;
        let selection = if from_imported {
            if let Some(v) = amounts.get_mut(&chain.fee_asset_id) {
                *v -= fee;
            }
            Selection::default()
        } else {
            chain.fund(&local, &BTreeMap::new(), fee, ctx)?
        };
        let outputs = amounts
            .iter()
            .filter(|(_, &v)| v > 0)
            .map(|(asset, &v)| TransferableOutput::new(*asset, Output::transfer(v, to.clone())))
            .collect();
        let base = chain.base_tx(outputs, selection, ctx)?;
        chain.finish(TxBody::Import(ImportTx::new(base, source_chain, imported.clone())?))
    })
}
