//! Cross-chain import and export bodies shared by the exchange and
//! platform chains.

use chainkit_primitives::ids::BlockchainId;
use chainkit_primitives::util::{BinaryReader, BinaryWriter};

use crate::codec::Codec;
use crate::input::{check_sorted_unique_inputs, read_input_list, sort_inputs, write_input_list, TransferableInput};
use crate::output::{read_output_list, sort_outputs, write_output_list, TransferableOutput};
use crate::tx::base::BaseTx;
use crate::TransactionError;

/// Consume UTXOs exported to this chain from `source_chain`.
///
/// Wire format: `base | source_chain (32) | imported inputs`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportTx {
    pub base: BaseTx,
    pub source_chain: BlockchainId,
    pub imported_inputs: Vec<TransferableInput>,
}

impl ImportTx {
    /// Sort the imported inputs and reject any UTXO imported twice.
    pub fn new(
        base: BaseTx,
        source_chain: BlockchainId,
        imported_inputs: Vec<TransferableInput>,
    ) -> Result<Self, TransactionError> {
        let mut imported_inputs = imported_inputs;
        sort_inputs(&mut imported_inputs);
        check_sorted_unique_inputs(&imported_inputs)?;
        Ok(ImportTx {
            base,
            source_chain,
            imported_inputs,
        })
    }

    pub fn read_from(reader: &mut BinaryReader, codec: Codec) -> Result<Self, TransactionError> {
        let base = BaseTx::read_from(reader, codec)?;
        let source_chain = reader.read_id()?;
        let imported_inputs = read_input_list(reader, codec)?;
        Ok(ImportTx {
            base,
            source_chain,
            imported_inputs,
        })
    }

    pub fn write_to(&self, writer: &mut BinaryWriter, codec: Codec) -> Result<(), TransactionError> {
        self.base.write_to(writer, codec)?;
        writer.write_id(&self.source_chain);
        write_input_list(writer, &self.imported_inputs, codec)
    }
}

/// Move outputs into the shared memory of `destination_chain`.
///
/// Wire format: `base | destination_chain (32) | exported outputs`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportTx {
    pub base: BaseTx,
    pub destination_chain: BlockchainId,
    pub exported_outputs: Vec<TransferableOutput>,
}

impl ExportTx {
    pub fn new(
        base: BaseTx,
        destination_chain: BlockchainId,
        exported_outputs: Vec<TransferableOutput>,
        codec: Codec,
    ) -> Self {
        let mut exported_outputs = exported_outputs;
        sort_outputs(&mut exported_outputs, codec);
        ExportTx {
            base,
            destination_chain,
            exported_outputs,
        }
    }

    pub fn read_from(reader: &mut BinaryReader, codec: Codec) -> Result<Self, TransactionError> {
        let base = BaseTx::read_from(reader, codec)?;
        let destination_chain = reader.read_id()?;
        let exported_outputs = read_output_list(reader, codec)?;
        Ok(ExportTx {
            base,
            destination_chain,
            exported_outputs,
        })
    }

    pub fn write_to(&self, writer: &mut BinaryWriter, codec: Codec) -> Result<(), TransactionError> {
        self.base.write_to(writer, codec)?;
        writer.write_id(&self.destination_chain);
        write_output_list(writer, &self.exported_outputs, codec)
    }
}
