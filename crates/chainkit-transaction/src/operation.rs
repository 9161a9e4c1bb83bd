//! Exchange-chain operations: minting and NFT transfers.
//!
//! An operation consumes one or more UTXOs of a single asset (a mint
//! authority or an NFT) and produces new outputs. Like inputs, each
//! operation carries signature indices into the consumed output's owners.

use chainkit_primitives::ids::AssetId;
use chainkit_primitives::util::{BinaryReader, BinaryWriter};
use chainkit_primitives::Address;

use crate::codec::{Codec, TypeTag};
use crate::input::{read_sig_indices, write_sig_indices};
use crate::output::{NftTransferOutput, SecpMintOutput, SecpTransferOutput, MAX_NFT_PAYLOAD_LEN};
use crate::owners::OutputOwners;
use crate::utxo::UtxoId;
use crate::TransactionError;

/// Mint more of a fungible asset, re-issuing the mint authority.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecpMintOperation {
    pub sig_indices: Vec<u32>,
    pub mint_output: SecpMintOutput,
    pub transfer_output: SecpTransferOutput,
}

/// Mint NFTs of one group to one or more owner groups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NftMintOperation {
    pub sig_indices: Vec<u32>,
    pub group_id: u32,
    pub payload: Vec<u8>,
    pub outputs: Vec<OutputOwners>,
}

/// Move an NFT to new owners.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NftTransferOperation {
    pub sig_indices: Vec<u32>,
    pub output: NftTransferOutput,
}

/// Every operation variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    SecpMint(SecpMintOperation),
    NftMint(NftMintOperation),
    NftTransfer(NftTransferOperation),
}

impl Operation {
    pub fn tag(&self) -> TypeTag {
        match self {
            Operation::SecpMint(_) => TypeTag::SecpMintOperation,
            Operation::NftMint(_) => TypeTag::NftMintOperation,
            Operation::NftTransfer(_) => TypeTag::NftTransferOperation,
        }
    }

    pub fn sig_indices(&self) -> &[u32] {
        match self {
            Operation::SecpMint(op) => &op.sig_indices,
            Operation::NftMint(op) => &op.sig_indices,
            Operation::NftTransfer(op) => &op.sig_indices,
        }
    }

    pub fn read_typed(reader: &mut BinaryReader, codec: Codec) -> Result<Self, TransactionError> {
        match codec.read_tag(reader)? {
            TypeTag::SecpMintOperation => {
                let sig_indices = read_sig_indices(reader)?;
                codec.read_expected(reader, &[TypeTag::SecpMintOutput])?;
                let mint_output = SecpMintOutput {
                    owners: OutputOwners::read_from(reader)?,
                };
                codec.read_expected(reader, &[TypeTag::SecpTransferOutput])?;
                let amount = reader.read_u64()?;
                let owners = OutputOwners::read_from(reader)?;
                Ok(Operation::SecpMint(SecpMintOperation {
                    sig_indices,
                    mint_output,
                    transfer_output: SecpTransferOutput { amount, owners },
                }))
            }
            TypeTag::NftMintOperation => {
                let sig_indices = read_sig_indices(reader)?;
                let group_id = reader.read_u32()?;
                let payload = reader.read_prefixed_bytes()?.to_vec();
                if payload.len() > MAX_NFT_PAYLOAD_LEN {
                    return Err(TransactionError::SerializationError(format!(
                        "nft payload of {} bytes exceeds {}",
                        payload.len(),
                        MAX_NFT_PAYLOAD_LEN
                    )));
                }
                let n = reader.read_len()?;
                let mut outputs = Vec::with_capacity(n);
                for _ in 0..n {
                    outputs.push(OutputOwners::read_from(reader)?);
                }
                Ok(Operation::NftMint(NftMintOperation {
                    sig_indices,
                    group_id,
                    payload,
                    outputs,
                }))
            }
            TypeTag::NftTransferOperation => {
                let sig_indices = read_sig_indices(reader)?;
                let output = NftTransferOutput::read_from(reader)?;
                Ok(Operation::NftTransfer(NftTransferOperation {
                    sig_indices,
                    output,
                }))
            }
            other => Err(TransactionError::SerializationError(format!(
                "{:?} is not an operation",
                other
            ))),
        }
    }

    pub fn write_typed(&self, writer: &mut BinaryWriter, codec: Codec) -> Result<(), TransactionError> {
        codec.write_tag(writer, self.tag())?;
        match self {
            Operation::SecpMint(op) => {
                write_sig_indices(writer, &op.sig_indices)?;
                codec.write_tag(writer, TypeTag::SecpMintOutput)?;
                op.mint_output.owners.write_to(writer)?;
                codec.write_tag(writer, TypeTag::SecpTransferOutput)?;
                writer.write_u64(op.transfer_output.amount);
                op.transfer_output.owners.write_to(writer)
            }
            Operation::NftMint(op) => {
                if op.payload.len() > MAX_NFT_PAYLOAD_LEN {
                    return Err(TransactionError::InvalidTransaction(format!(
                        "nft payload of {} bytes exceeds {}",
                        op.payload.len(),
                        MAX_NFT_PAYLOAD_LEN
                    )));
                }
                write_sig_indices(writer, &op.sig_indices)?;
                writer.write_u32(op.group_id);
                writer.write_prefixed_bytes(&op.payload)?;
                writer.write_len(op.outputs.len())?;
                for owners in &op.outputs {
                    owners.write_to(writer)?;
                }
                Ok(())
            }
            Operation::NftTransfer(op) => {
                write_sig_indices(writer, &op.sig_indices)?;
                op.output.write_to(writer)
            }
        }
    }
}

/// An operation with the asset and UTXOs it consumes.
///
/// # Wire format
///
/// | Field     | Size                        |
/// |-----------|-----------------------------|
/// | asset_id  | 32 bytes                    |
/// | count     | 4 bytes                     |
/// | utxo ids  | 36 bytes each (tx_id, idx)  |
/// | type_id   | 4 bytes                     |
/// | operation | variable                    |
#[derive(Clone, Debug)]
pub struct TransferableOperation {
    pub asset_id: AssetId,
    pub utxo_ids: Vec<UtxoId>,
    pub operation: Operation,
    signers: Vec<Address>,
}

impl TransferableOperation {
    /// Create an operation; the consumed UTXO ids are sorted.
    pub fn new(asset_id: AssetId, utxo_ids: Vec<UtxoId>, operation: Operation) -> Self {
        let mut utxo_ids = utxo_ids;
        utxo_ids.sort();
        TransferableOperation {
            asset_id,
            utxo_ids,
            operation,
            signers: Vec::new(),
        }
    }

    pub fn with_signers(mut self, signers: Vec<Address>) -> Self {
        self.signers = signers;
        self
    }

    pub fn signers(&self) -> &[Address] {
        &self.signers
    }

    pub fn read_from(reader: &mut BinaryReader, codec: Codec) -> Result<Self, TransactionError> {
        let asset_id = reader.read_id()?;
        let n = reader.read_len()?;
        let mut utxo_ids = Vec::with_capacity(n);
        for _ in 0..n {
            let tx_id = reader.read_id()?;
            let index = reader.read_u32()?;
            utxo_ids.push(UtxoId::new(tx_id, index));
        }
        let operation = Operation::read_typed(reader, codec)?;
        Ok(TransferableOperation {
            asset_id,
            utxo_ids,
            operation,
            signers: Vec::new(),
        })
    }

    pub fn write_to(&self, writer: &mut BinaryWriter, codec: Codec) -> Result<(), TransactionError> {
        writer.write_id(&self.asset_id);
        writer.write_len(self.utxo_ids.len())?;
        for id in &self.utxo_ids {
            writer.write_id(&id.tx_id);
            writer.write_u32(id.output_index);
        }
        self.operation.write_typed(writer, codec)
    }
}

impl PartialEq for TransferableOperation {
    fn eq(&self, other: &Self) -> bool {
        self.asset_id == other.asset_id
            && self.utxo_ids == other.utxo_ids
            && self.operation == other.operation
    }
}

impl Eq for TransferableOperation {}
