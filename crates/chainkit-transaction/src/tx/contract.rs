//! Contract-chain atomic transactions.
//!
//! The contract chain keeps account balances rather than UTXOs, so only
//! the atomic side is modelled here: importing UTXOs into account balances
//! and exporting balances back out as UTXOs.

use std::cmp::Ordering;

use chainkit_primitives::ids::{AssetId, BlockchainId};
use chainkit_primitives::util::{BinaryReader, BinaryWriter};
use chainkit_primitives::Address;

use crate::codec::Codec;
use crate::input::{check_sorted_unique_inputs, read_input_list, sort_inputs, write_input_list, TransferableInput};
use crate::output::{read_output_list, sort_outputs, write_output_list, TransferableOutput};
use crate::TransactionError;

/// Credit to an account: `address (20) | amount u64 | asset_id (32)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvmOutput {
    pub address: Address,
    pub amount: u64,
    pub asset_id: AssetId,
}

impl EvmOutput {
    fn read_from(reader: &mut BinaryReader) -> Result<Self, TransactionError> {
        Ok(EvmOutput {
            address: reader.read_address()?,
            amount: reader.read_u64()?,
            asset_id: reader.read_id()?,
        })
    }

    fn write_to(&self, writer: &mut BinaryWriter) {
        writer.write_address(&self.address);
        writer.write_u64(self.amount);
        writer.write_id(&self.asset_id);
    }
}

/// Debit from an account:
/// `address (20) | amount u64 | asset_id (32) | nonce u64`.
///
/// The account is signed for by the key whose address is `address`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvmInput {
    pub address: Address,
    pub amount: u64,
    pub asset_id: AssetId,
    pub nonce: u64,
}

impl EvmInput {
    fn read_from(reader: &mut BinaryReader) -> Result<Self, TransactionError> {
        Ok(EvmInput {
            address: reader.read_address()?,
            amount: reader.read_u64()?,
            asset_id: reader.read_id()?,
            nonce: reader.read_u64()?,
        })
    }

    fn write_to(&self, writer: &mut BinaryWriter) {
        writer.write_address(&self.address);
        writer.write_u64(self.amount);
        writer.write_id(&self.asset_id);
        writer.write_u64(self.nonce);
    }
}

fn compare_evm(a: (&Address, &AssetId), b: (&Address, &AssetId)) -> Ordering {
    a.0.cmp(b.0).then_with(|| a.1.cmp(b.1))
}

/// Import UTXOs from `source_chain` into account balances.
///
/// Wire format:
/// `network_id u32 | blockchain_id | source_chain | imported inputs | u32 n | n × EvmOutput`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractImportTx {
    pub network_id: u32,
    pub blockchain_id: BlockchainId,
    pub source_chain: BlockchainId,
    pub imported_inputs: Vec<TransferableInput>,
    pub outs: Vec<EvmOutput>,
}

impl ContractImportTx {
    pub fn new(
        network_id: u32,
        blockchain_id: BlockchainId,
        source_chain: BlockchainId,
        imported_inputs: Vec<TransferableInput>,
        outs: Vec<EvmOutput>,
    ) -> Result<Self, TransactionError> {
        let mut imported_inputs = imported_inputs;
        let mut outs = outs;
        sort_inputs(&mut imported_inputs);
        check_sorted_unique_inputs(&imported_inputs)?;
        outs.sort_by(|a, b| compare_evm((&a.address, &a.asset_id), (&b.address, &b.asset_id)));
        Ok(ContractImportTx {
            network_id,
            blockchain_id,
            source_chain,
            imported_inputs,
            outs,
        })
    }

    pub fn read_from(reader: &mut BinaryReader, codec: Codec) -> Result<Self, TransactionError> {
        let network_id = reader.read_u32()?;
        let blockchain_id = reader.read_id()?;
        let source_chain = reader.read_id()?;
        let imported_inputs = read_input_list(reader, codec)?;
        let n = reader.read_len()?;
        let mut outs = Vec::with_capacity(n);
        for _ in 0..n {
            outs.push(EvmOutput::read_from(reader)?);
        }
        Ok(ContractImportTx {
            network_id,
            blockchain_id,
            source_chain,
            imported_inputs,
            outs,
        })
    }

    pub fn write_to(&self, writer: &mut BinaryWriter, codec: Codec) -> Result<(), TransactionError> {
        writer.write_u32(self.network_id);
        writer.write_id(&self.blockchain_id);
        writer.write_id(&self.source_chain);
        write_input_list(writer, &self.imported_inputs, codec)?;
        let mut outs: Vec<&EvmOutput> = self.outs.iter().collect();
        outs.sort_by(|a, b| compare_evm((&a.address, &a.asset_id), (&b.address, &b.asset_id)));
        writer.write_len(outs.len())?;
        for out in outs {
            out.write_to(writer);
        }
        Ok(())
    }
}

/// Export account balances to `destination_chain` as UTXOs.
///
/// Wire format:
/// `network_id u32 | blockchain_id | destination_chain | u32 n | n × EvmInput | exported outputs`.
///
/// Inputs are written in stored order; each one has its own credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractExportTx {
    pub network_id: u32,
    pub blockchain_id: BlockchainId,
    pub destination_chain: BlockchainId,
    pub inputs: Vec<EvmInput>,
    pub exported_outputs: Vec<TransferableOutput>,
}

impl ContractExportTx {
    pub fn new(
        network_id: u32,
        blockchain_id: BlockchainId,
        destination_chain: BlockchainId,
        inputs: Vec<EvmInput>,
        exported_outputs: Vec<TransferableOutput>,
        codec: Codec,
    ) -> Self {
        let mut inputs = inputs;
        let mut exported_outputs = exported_outputs;
        inputs.sort_by(|a, b| compare_evm((&a.address, &a.asset_id), (&b.address, &b.asset_id)));
        sort_outputs(&mut exported_outputs, codec);
        ContractExportTx {
            network_id,
            blockchain_id,
            destination_chain,
            inputs,
            exported_outputs,
        }
    }

    pub fn read_from(reader: &mut BinaryReader, codec: Codec) -> Result<Self, TransactionError> {
        let network_id = reader.read_u32()?;
        let blockchain_id = reader.read_id()?;
        let destination_chain = reader.read_id()?;
        let n = reader.read_len()?;
        let mut inputs = Vec::with_capacity(n);
        for _ in 0..n {
            inputs.push(EvmInput::read_from(reader)?);
        }
        let exported_outputs = read_output_list(reader, codec)?;
        Ok(ContractExportTx {
            network_id,
            blockchain_id,
            destination_chain,
            inputs,
            exported_outputs,
        })
    }

    pub fn write_to(&self, writer: &mut BinaryWriter, codec: Codec) -> Result<(), TransactionError> {
        writer.write_u32(self.network_id);
        writer.write_id(&self.blockchain_id);
        writer.write_id(&self.destination_chain);
        writer.write_len(self.inputs.len())?;
        for input in &self.inputs {
            input.write_to(writer);
        }
        write_output_list(writer, &self.exported_outputs, codec)
    }
}
