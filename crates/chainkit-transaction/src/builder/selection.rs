//! Greedy coin selection.
//!
//! Candidates are the unlocked SECP transfer UTXOs of each target asset
//! whose owner group the caller's addresses can satisfy (directly or via
//! multisig aliases). Candidates are consumed in policy order until the
//! target is covered; any surplus becomes one change output.

use std::collections::BTreeMap;

use chainkit_primitives::ids::AssetId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builder::SpendContext;
use crate::codec::Codec;
use crate::input::{sort_inputs, Input, TransferableInput};
use crate::output::{sort_outputs, Output, TransferableOutput};
use crate::owners::resolve_signers;
use crate::utxo::{Utxo, UtxoSet};
use crate::TransactionError;

/// Order in which candidate UTXOs are consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InputSelectionPolicy {
    /// The UTXO set's insertion order.
    #[default]
    ByProvidedOrder,
    /// Largest amount first, ties in insertion order.
    ByAmountDescending,
}

/// Inputs and change covering a set of per-asset targets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    /// Inputs in canonical order, each carrying its signers.
    pub inputs: Vec<TransferableInput>,
    /// Change outputs in canonical order; never zero-valued.
    pub change: Vec<TransferableOutput>,
    /// Total consumed per asset.
    pub consumed: BTreeMap<AssetId, u64>,
}

/// A UTXO the caller can spend, with the input that would spend it.
pub(crate) fn spendable_input(
    utxo: &Utxo,
    ctx: &SpendContext,
) -> Result<Option<TransferableInput>, TransactionError> {
    let Output::SecpTransfer(out) = &utxo.output else {
        return Ok(None);
    };
    if !out.owners.is_unlocked(ctx.as_of) {
        return Ok(None);
    }
    let resolution = resolve_signers(&out.owners, &ctx.aliases, |a| ctx.from.contains(a))?;
    Ok(resolution.map(|r| {
        TransferableInput::new(utxo.tx_id, utxo.output_index, utxo.asset_id, Input::transfer(out.amount, r.sig_indices))
            .with_signers(r.signers)
    }))
}

/// Select inputs covering every `(asset, amount)` in `targets`.
///
/// # Arguments
/// * `utxos` - Candidate UTXOs.
/// * `targets` - Amount needed per asset; zero targets are skipped.
/// * `ctx` - Spending addresses, change owners, time and policy.
/// * `codec` - Codec used to order the change outputs.
///
/// # Returns
/// The selection, or `InsufficientFunds` for the first asset that cannot be
/// covered.
pub fn select_inputs(
    utxos: &UtxoSet,
    targets: &BTreeMap<AssetId, u64>,
    ctx: &SpendContext,
    codec: Codec,
) -> Result<Selection, TransactionError> {
    let change_owner = ctx.change_owner()?;
    let mut selection = Selection::default();

    for (asset_id, &target) in targets {
        if target == 0 {
            continue;
        }
        let mut candidates = Vec::new();
        for utxo in utxos.iter().filter(|u| u.asset_id == *asset_id) {
            if let Some(input) = spendable_input(utxo, ctx)? {
                candidates.push(input);
            }
        }
        if ctx.policy == InputSelectionPolicy::ByAmountDescending {
            candidates.sort_by(|a, b| b.amount().cmp(&a.amount()));
        }

        let mut total = 0u64;
        let mut picked = 0usize;
        for input in &candidates {
            if total >= target {
                break;
            }
            total = total.saturating_add(input.amount());
            picked += 1;
        }
        if total < target {
            return Err(TransactionError::InsufficientFunds {
                asset_id: *asset_id,
                needed: target,
                available: total,
            });
        }
        debug!(
            asset = %asset_id,
            target,
            total,
            inputs = picked,
            candidates = candidates.len(),
            "selected inputs"
        );

        selection.inputs.extend(candidates.into_iter().take(picked));
        selection.consumed.insert(*asset_id, total);
        let change = total - target;
        if change > 0 {
            selection
                .change
                .push(TransferableOutput::new(*asset_id, Output::transfer(change, change_owner.clone())));
        }
    }

    sort_inputs(&mut selection.inputs);
    sort_outputs(&mut selection.change, codec);
    Ok(selection)
}
