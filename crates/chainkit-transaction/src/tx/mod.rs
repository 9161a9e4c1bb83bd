//! Unsigned and signed transactions.
//!
//! An `UnsignedTx` pairs a codec with one `TxBody`. Its canonical hash,
//! `sha256(unsigned bytes)`, is what every signer signs. A `Tx` adds one
//! credential per signer slot, in slot order.

pub mod atomic;
pub mod base;
pub mod contract;
pub mod exchange;
pub mod platform;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chainkit_primitives::hash::sha256;
use chainkit_primitives::ids::{AssetId, BlockchainId, TxId};
use chainkit_primitives::util::{BinaryReader, BinaryWriter};
use chainkit_primitives::{Address, Id};
use serde::{Deserialize, Serialize};

use crate::codec::{ChainKind, Codec, TypeTag};
use crate::credential::{Credential, CredentialKind};
use crate::input::TransferableInput;
use crate::operation::Operation;
use crate::output::TransferableOutput;
use crate::utxo::UtxoId;
use crate::TransactionError;

pub use atomic::{ExportTx, ImportTx};
pub use base::{BaseTx, MAX_MEMO_LEN};
pub use contract::{ContractExportTx, ContractImportTx, EvmInput, EvmOutput};
pub use exchange::{CreateAssetTx, InitialState, OperationTx};
pub use platform::{
    AddDelegatorTx, AddSubnetValidatorTx, AddValidatorTx, CreateChainTx, CreateSubnetTx, SubnetAuth, Validator,
};

/// Transaction kinds, used to pick a fee rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    Base,
    CreateAsset,
    Operation,
    Import,
    Export,
    AddValidator,
    AddDelegator,
    AddSubnetValidator,
    CreateSubnet,
    CreateChain,
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxKind::Base => "base",
            TxKind::CreateAsset => "create_asset",
            TxKind::Operation => "operation",
            TxKind::Import => "import",
            TxKind::Export => "export",
            TxKind::AddValidator => "add_validator",
            TxKind::AddDelegator => "add_delegator",
            TxKind::AddSubnetValidator => "add_subnet_validator",
            TxKind::CreateSubnet => "create_subnet",
            TxKind::CreateChain => "create_chain",
        };
        f.write_str(name)
    }
}

/// Every transaction body across the three chains.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxBody {
    Base(BaseTx),
    CreateAsset(CreateAssetTx),
    Operation(OperationTx),
    Import(ImportTx),
    Export(ExportTx),
    AddValidator(AddValidatorTx),
    AddDelegator(AddDelegatorTx),
    AddSubnetValidator(AddSubnetValidatorTx),
    CreateSubnet(CreateSubnetTx),
    CreateChain(CreateChainTx),
    ContractImport(ContractImportTx),
    ContractExport(ContractExportTx),
}

impl TxBody {
    pub fn tag(&self) -> TypeTag {
        match self {
            TxBody::Base(_) => TypeTag::BaseTx,
            TxBody::CreateAsset(_) => TypeTag::CreateAssetTx,
            TxBody::Operation(_) => TypeTag::OperationTx,
            TxBody::Import(_) | TxBody::ContractImport(_) => TypeTag::ImportTx,
            TxBody::Export(_) | TxBody::ContractExport(_) => TypeTag::ExportTx,
            TxBody::AddValidator(_) => TypeTag::AddValidatorTx,
            TxBody::AddDelegator(_) => TypeTag::AddDelegatorTx,
            TxBody::AddSubnetValidator(_) => TypeTag::AddSubnetValidatorTx,
            TxBody::CreateSubnet(_) => TypeTag::CreateSubnetTx,
            TxBody::CreateChain(_) => TypeTag::CreateChainTx,
        }
    }

    pub fn kind(&self) -> TxKind {
        match self {
            TxBody::Base(_) => TxKind::Base,
            TxBody::CreateAsset(_) => TxKind::CreateAsset,
            TxBody::Operation(_) => TxKind::Operation,
            TxBody::Import(_) | TxBody::ContractImport(_) => TxKind::Import,
            TxBody::Export(_) | TxBody::ContractExport(_) => TxKind::Export,
            TxBody::AddValidator(_) => TxKind::AddValidator,
            TxBody::AddDelegator(_) => TxKind::AddDelegator,
            TxBody::AddSubnetValidator(_) => TxKind::AddSubnetValidator,
            TxBody::CreateSubnet(_) => TxKind::CreateSubnet,
            TxBody::CreateChain(_) => TxKind::CreateChain,
        }
    }

    /// Whether this body can live on `chain`.
    pub fn fits(&self, chain: ChainKind) -> bool {
        match self {
            TxBody::ContractImport(_) | TxBody::ContractExport(_) => chain == ChainKind::Contract,
            TxBody::Base(_) | TxBody::Import(_) | TxBody::Export(_) => chain != ChainKind::Contract,
            TxBody::CreateAsset(_) | TxBody::Operation(_) => chain == ChainKind::Exchange,
            _ => chain == ChainKind::Platform,
        }
    }

    /// The shared base body, absent for contract-chain transactions.
    pub fn base(&self) -> Option<&BaseTx> {
        match self {
            TxBody::Base(tx) => Some(tx),
            TxBody::CreateAsset(tx) => Some(&tx.base),
            TxBody::Operation(tx) => Some(&tx.base),
            TxBody::Import(tx) => Some(&tx.base),
            TxBody::Export(tx) => Some(&tx.base),
            TxBody::AddValidator(tx) => Some(&tx.base),
            TxBody::AddDelegator(tx) => Some(&tx.base),
            TxBody::AddSubnetValidator(tx) => Some(&tx.base),
            TxBody::CreateSubnet(tx) => Some(&tx.base),
            TxBody::CreateChain(tx) => Some(&tx.base),
            TxBody::ContractImport(_) | TxBody::ContractExport(_) => None,
        }
    }

    fn read_from(reader: &mut BinaryReader, codec: Codec, tag: TypeTag) -> Result<Self, TransactionError> {
        let contract = codec.chain() == ChainKind::Contract;
        let body = match tag {
            TypeTag::BaseTx => TxBody::Base(BaseTx::read_from(reader, codec)?),
            TypeTag::CreateAssetTx => TxBody::CreateAsset(CreateAssetTx::read_from(reader, codec)?),
            TypeTag::OperationTx => TxBody::Operation(OperationTx::read_from(reader, codec)?),
            TypeTag::ImportTx if contract => TxBody::ContractImport(ContractImportTx::read_from(reader, codec)?),
            TypeTag::ExportTx if contract => TxBody::ContractExport(ContractExportTx::read_from(reader, codec)?),
            TypeTag::ImportTx => TxBody::Import(ImportTx::read_from(reader, codec)?),
            TypeTag::ExportTx => TxBody::Export(ExportTx::read_from(reader, codec)?),
            TypeTag::AddValidatorTx => TxBody::AddValidator(AddValidatorTx::read_from(reader, codec)?),
            TypeTag::AddDelegatorTx => TxBody::AddDelegator(AddDelegatorTx::read_from(reader, codec)?),
            TypeTag::AddSubnetValidatorTx => {
                TxBody::AddSubnetValidator(AddSubnetValidatorTx::read_from(reader, codec)?)
            }
            TypeTag::CreateSubnetTx => TxBody::CreateSubnet(CreateSubnetTx::read_from(reader, codec)?),
            TypeTag::CreateChainTx => TxBody::CreateChain(CreateChainTx::read_from(reader, codec)?),
            other => {
                return Err(TransactionError::SerializationError(format!(
                    "{:?} is not a transaction",
                    other
                )))
            }
        };
        Ok(body)
    }

    fn write_to(&self, writer: &mut BinaryWriter, codec: Codec) -> Result<(), TransactionError> {
        match self {
            TxBody::Base(tx) => tx.write_to(writer, codec),
            TxBody::CreateAsset(tx) => tx.write_to(writer, codec),
            TxBody::Operation(tx) => tx.write_to(writer, codec),
            TxBody::Import(tx) => tx.write_to(writer, codec),
            TxBody::Export(tx) => tx.write_to(writer, codec),
            TxBody::AddValidator(tx) => tx.write_to(writer, codec),
            TxBody::AddDelegator(tx) => tx.write_to(writer, codec),
            TxBody::AddSubnetValidator(tx) => tx.write_to(writer, codec),
            TxBody::CreateSubnet(tx) => tx.write_to(writer, codec),
            TxBody::CreateChain(tx) => tx.write_to(writer, codec),
            TxBody::ContractImport(tx) => tx.write_to(writer, codec),
            TxBody::ContractExport(tx) => tx.write_to(writer, codec),
        }
    }
}

/// What a signer slot authorizes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotOrigin {
    /// Spending one UTXO.
    Input(UtxoId),
    /// An operation consuming these UTXOs.
    Operation(Vec<UtxoId>),
    /// Acting on a subnet as its owner.
    SubnetAuth,
    /// Debiting a contract-chain account.
    Account(Address),
}

/// One credential's worth of signing work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignerSlot {
    pub kind: CredentialKind,
    pub origin: SlotOrigin,
    pub sig_indices: Vec<u32>,
    /// Known signing addresses, one per index; empty for decoded transactions.
    pub signers: Vec<Address>,
}

impl SignerSlot {
    fn for_input(input: &TransferableInput) -> Self {
        SignerSlot {
            kind: CredentialKind::Secp,
            origin: SlotOrigin::Input(input.utxo_id()),
            sig_indices: input.sig_indices().to_vec(),
            signers: input.signers().to_vec(),
        }
    }
}

/// A transaction body bound to the codec it is encoded with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedTx {
    codec: Codec,
    body: TxBody,
}

impl UnsignedTx {
    /// Bind `body` to `codec`.
    ///
    /// # Returns
    /// The transaction, `TypeNotSupported` when the body does not exist
    /// on the codec's chain, or `DuplicateInput` when a UTXO is consumed
    /// more than once across inputs, imported inputs and operations.
    pub fn new(codec: Codec, body: TxBody) -> Result<Self, TransactionError> {
        if !body.fits(codec.chain()) || !codec.supports(body.tag()) {
            return Err(TransactionError::TypeNotSupported {
                chain: codec.chain(),
                tag: body.tag(),
            });
        }
        let tx = UnsignedTx { codec, body };
        let mut seen = BTreeSet::new();
        for id in tx.spent_utxo_ids() {
            if !seen.insert(id) {
                return Err(TransactionError::DuplicateInput(id));
            }
        }
        Ok(tx)
    }

    /// Every UTXO this transaction consumes, in credential order.
    pub fn spent_utxo_ids(&self) -> Vec<UtxoId> {
        let mut ids: Vec<UtxoId> = self.inputs().iter().map(|i| i.utxo_id()).collect();
        if let TxBody::Operation(tx) = &self.body {
            for op in &tx.operations {
                ids.extend(op.utxo_ids.iter().copied());
            }
        }
        ids
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn body(&self) -> &TxBody {
        &self.body
    }

    pub fn into_body(self) -> TxBody {
        self.body
    }

    pub fn kind(&self) -> TxKind {
        self.body.kind()
    }

    pub fn network_id(&self) -> u32 {
        match &self.body {
            TxBody::ContractImport(tx) => tx.network_id,
            TxBody::ContractExport(tx) => tx.network_id,
            other => other.base().map(|b| b.network_id).unwrap_or_default(),
        }
    }

    pub fn blockchain_id(&self) -> BlockchainId {
        match &self.body {
            TxBody::ContractImport(tx) => tx.blockchain_id,
            TxBody::ContractExport(tx) => tx.blockchain_id,
            other => other.base().map(|b| b.blockchain_id).unwrap_or(Id::EMPTY),
        }
    }

    pub fn read_from(reader: &mut BinaryReader, chain: ChainKind) -> Result<Self, TransactionError> {
        let version = reader.read_u16()?;
        let codec = Codec::new(chain, version)?;
        let tag = codec.read_tag(reader)?;
        let body = TxBody::read_from(reader, codec, tag)?;
        UnsignedTx::new(codec, body)
    }

    pub fn write_to(&self, writer: &mut BinaryWriter) -> Result<(), TransactionError> {
        writer.write_u16(self.codec.version());
        self.codec.write_tag(writer, self.body.tag())?;
        self.body.write_to(writer, self.codec)
    }

    /// Canonical encoding: `codec_version u16 | type_id | body`.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        let mut w = BinaryWriter::new();
        self.write_to(&mut w)?;
        Ok(w.into_bytes())
    }

    /// Decode an unsigned transaction for `chain`, rejecting trailing bytes.
    pub fn from_bytes(bytes: &[u8], chain: ChainKind) -> Result<Self, TransactionError> {
        let mut reader = BinaryReader::new(bytes);
        let tx = UnsignedTx::read_from(&mut reader, chain)?;
        ensure_consumed(&reader)?;
        Ok(tx)
    }

    /// The canonical hash every signer signs.
    pub fn hash(&self) -> Result<[u8; 32], TransactionError> {
        Ok(sha256(&self.to_bytes()?))
    }

    /// UTXO-spending inputs in credential order.
    pub fn inputs(&self) -> Vec<&TransferableInput> {
        let mut inputs: Vec<&TransferableInput> = Vec::new();
        if let Some(base) = self.body.base() {
            inputs.extend(base.inputs.iter());
        }
        match &self.body {
            TxBody::Import(tx) => inputs.extend(tx.imported_inputs.iter()),
            TxBody::ContractImport(tx) => inputs.extend(tx.imported_inputs.iter()),
            _ => {}
        }
        inputs
    }

    /// Every output this transaction creates that carries a fungible
    /// amount: base outputs, exported outputs and stake.
    pub fn outputs(&self) -> Vec<&TransferableOutput> {
        let mut outputs: Vec<&TransferableOutput> = Vec::new();
        if let Some(base) = self.body.base() {
            outputs.extend(base.outputs.iter());
        }
        match &self.body {
            TxBody::Export(tx) => outputs.extend(tx.exported_outputs.iter()),
            TxBody::ContractExport(tx) => outputs.extend(tx.exported_outputs.iter()),
            TxBody::AddValidator(tx) => outputs.extend(tx.stake.iter()),
            TxBody::AddDelegator(tx) => outputs.extend(tx.stake.iter()),
            _ => {}
        }
        outputs
    }

    /// Signer slots in the order credentials must appear: base inputs,
    /// imported inputs, operations, then subnet authorization. A
    /// contract-chain export has one slot per account input.
    pub fn signer_slots(&self) -> Vec<SignerSlot> {
        let mut slots: Vec<SignerSlot> = self.inputs().into_iter().map(SignerSlot::for_input).collect();
        match &self.body {
            TxBody::Operation(tx) => {
                for op in &tx.operations {
                    let kind = match op.operation {
                        Operation::SecpMint(_) => CredentialKind::Secp,
                        _ => CredentialKind::Nft,
                    };
                    slots.push(SignerSlot {
                        kind,
                        origin: SlotOrigin::Operation(op.utxo_ids.clone()),
                        sig_indices: op.operation.sig_indices().to_vec(),
                        signers: op.signers().to_vec(),
                    });
                }
            }
            TxBody::AddSubnetValidator(tx) => slots.push(subnet_slot(&tx.subnet_auth)),
            TxBody::CreateChain(tx) => slots.push(subnet_slot(&tx.subnet_auth)),
            TxBody::ContractExport(tx) => {
                for input in &tx.inputs {
                    slots.push(SignerSlot {
                        kind: CredentialKind::Secp,
                        origin: SlotOrigin::Account(input.address),
                        sig_indices: vec![0],
                        signers: vec![input.address],
                    });
                }
            }
            _ => {}
        }
        slots
    }

    /// Amount consumed per asset.
    pub fn consumed(&self) -> Result<BTreeMap<AssetId, u64>, TransactionError> {
        let mut totals = BTreeMap::new();
        for input in self.inputs() {
            add_amount(&mut totals, input.asset_id, input.amount())?;
        }
        if let TxBody::ContractExport(tx) = &self.body {
            for input in &tx.inputs {
                add_amount(&mut totals, input.asset_id, input.amount)?;
            }
        }
        Ok(totals)
    }

    /// Amount produced per asset.
    pub fn produced(&self) -> Result<BTreeMap<AssetId, u64>, TransactionError> {
        let mut totals = BTreeMap::new();
        for output in self.outputs() {
            add_amount(&mut totals, output.asset_id, output.amount())?;
        }
        if let TxBody::ContractImport(tx) = &self.body {
            for out in &tx.outs {
                add_amount(&mut totals, out.asset_id, out.amount)?;
            }
        }
        Ok(totals)
    }

    /// Amount of `asset_id` consumed but not produced, i.e. the fee paid.
    pub fn burned(&self, asset_id: &AssetId) -> Result<u64, TransactionError> {
        let consumed = self.consumed()?.get(asset_id).copied().unwrap_or(0);
        let produced = self.produced()?.get(asset_id).copied().unwrap_or(0);
        consumed.checked_sub(produced).ok_or_else(|| {
            TransactionError::InvalidTransaction(format!(
                "asset {asset_id} produces {produced} but consumes only {consumed}"
            ))
        })
    }
}

fn subnet_slot(auth: &SubnetAuth) -> SignerSlot {
    SignerSlot {
        kind: CredentialKind::Secp,
        origin: SlotOrigin::SubnetAuth,
        sig_indices: auth.sig_indices.clone(),
        signers: auth.signers().to_vec(),
    }
}

fn add_amount(totals: &mut BTreeMap<AssetId, u64>, asset_id: AssetId, amount: u64) -> Result<(), TransactionError> {
    let entry = totals.entry(asset_id).or_insert(0);
    *entry = entry
        .checked_add(amount)
        .ok_or_else(|| TransactionError::InvalidTransaction(format!("amount of asset {asset_id} overflows")))?;
    Ok(())
}

fn ensure_consumed(reader: &BinaryReader) -> Result<(), TransactionError> {
    if reader.remaining() != 0 {
        return Err(TransactionError::SerializationError(format!(
            "{} trailing bytes",
            reader.remaining()
        )));
    }
    Ok(())
}

/// A signed transaction, ready to submit.
///
/// # Wire format
///
/// | Field       | Size                       |
/// |-------------|----------------------------|
/// | unsigned    | variable                   |
/// | count       | 4 bytes                    |
/// | credentials | variable                   |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tx {
    unsigned: UnsignedTx,
    credentials: Vec<Credential>,
}

impl Tx {
    /// Attach credentials, checking one per signer slot with one signature
    /// per signature index.
    pub fn new(unsigned: UnsignedTx, credentials: Vec<Credential>) -> Result<Self, TransactionError> {
        let slots = unsigned.signer_slots();
        if slots.len() != credentials.len() {
            return Err(TransactionError::CredentialMismatch(format!(
                "{} credentials for {} signer slots",
                credentials.len(),
                slots.len()
            )));
        }
        for (i, (slot, cred)) in slots.iter().zip(&credentials).enumerate() {
            if slot.sig_indices.len() != cred.signatures.len() {
                return Err(TransactionError::CredentialMismatch(format!(
                    "credential {i} has {} signatures for {} indices",
                    cred.signatures.len(),
                    slot.sig_indices.len()
                )));
            }
            if slot.kind != cred.kind {
                return Err(TransactionError::CredentialMismatch(format!(
                    "credential {i} is {:?}, slot needs {:?}",
                    cred.kind, slot.kind
                )));
            }
        }
        Ok(Tx { unsigned, credentials })
    }

    pub fn unsigned(&self) -> &UnsignedTx {
        &self.unsigned
    }

    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        let mut w = BinaryWriter::new();
        self.unsigned.write_to(&mut w)?;
        w.write_len(self.credentials.len())?;
        for cred in &self.credentials {
            cred.write_to(&mut w, self.unsigned.codec())?;
        }
        Ok(w.into_bytes())
    }

    pub fn from_bytes(bytes: &[u8], chain: ChainKind) -> Result<Self, TransactionError> {
        let mut reader = BinaryReader::new(bytes);
        let unsigned = UnsignedTx::read_from(&mut reader, chain)?;
        let n = reader.read_len()?;
        let mut credentials = Vec::with_capacity(n);
        for _ in 0..n {
            credentials.push(Credential::read_from(&mut reader, unsigned.codec())?);
        }
        ensure_consumed(&reader)?;
        Tx::new(unsigned, credentials)
    }

    /// Transaction id: sha256 of the signed bytes.
    pub fn id(&self) -> Result<TxId, TransactionError> {
        Ok(Id::new(sha256(&self.to_bytes()?)))
    }

    /// Hex encoding of the signed bytes, as submitted over RPC.
    pub fn to_hex(&self) -> Result<String, TransactionError> {
        Ok(format!("0x{}", hex::encode(self.to_bytes()?)))
    }

    pub fn from_hex(s: &str, chain: ChainKind) -> Result<Self, TransactionError> {
        let body = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(body).map_err(|e| TransactionError::SerializationError(e.to_string()))?;
        Tx::from_bytes(&bytes, chain)
    }
}
