//! Exchange-chain bodies: asset creation and operations.

use chainkit_primitives::util::{BinaryReader, BinaryWriter};

use crate::codec::Codec;
use crate::operation::TransferableOperation;
use crate::output::Output;
use crate::tx::base::BaseTx;
use crate::TransactionError;

/// Maximum asset name length.
pub const MAX_NAME_LEN: usize = 128;

/// Maximum asset symbol length.
pub const MAX_SYMBOL_LEN: usize = 4;

/// Maximum number of decimal places an asset may declare.
pub const MAX_DENOMINATION: u8 = 32;

/// Feature-extension index of the secp256k1 fx.
pub const SECP_FX_INDEX: u32 = 0;

/// Feature-extension index of the NFT fx.
pub const NFT_FX_INDEX: u32 = 1;

/// Outputs created at genesis of an asset under one feature extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitialState {
    pub fx_index: u32,
    pub outputs: Vec<Output>,
}

impl InitialState {
    /// Create a state with its outputs in canonical (encoded byte) order.
    pub fn new(fx_index: u32, outputs: Vec<Output>, codec: Codec) -> Result<Self, TransactionError> {
        let mut keyed = outputs
            .into_iter()
            .map(|o| encoded_output(&o, codec).map(|bytes| (bytes, o)))
            .collect::<Result<Vec<_>, _>>()?;
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(InitialState {
            fx_index,
            outputs: keyed.into_iter().map(|(_, o)| o).collect(),
        })
    }

    fn read_from(reader: &mut BinaryReader, codec: Codec) -> Result<Self, TransactionError> {
        let fx_index = reader.read_u32()?;
        let n = reader.read_len()?;
        let mut outputs = Vec::with_capacity(n);
        for _ in 0..n {
            outputs.push(Output::read_typed(reader, codec)?);
        }
        Ok(InitialState { fx_index, outputs })
    }

    fn write_to(&self, writer: &mut BinaryWriter, codec: Codec) -> Result<(), TransactionError> {
        writer.write_u32(self.fx_index);
        let mut encoded = self
            .outputs
            .iter()
            .map(|o| encoded_output(o, codec))
            .collect::<Result<Vec<_>, _>>()?;
        encoded.sort();
        writer.write_len(encoded.len())?;
        for bytes in &encoded {
            writer.write_bytes(bytes);
        }
        Ok(())
    }
}

fn encoded_output(output: &Output, codec: Codec) -> Result<Vec<u8>, TransactionError> {
    let mut w = BinaryWriter::new();
    output.write_typed(&mut w, codec)?;
    Ok(w.into_bytes())
}

/// Create a new asset.
///
/// # Wire format
///
/// | Field          | Size                        |
/// |----------------|-----------------------------|
/// | base           | variable                    |
/// | name           | 2-byte length + UTF-8       |
/// | symbol         | 2-byte length + UTF-8       |
/// | denomination   | 1 byte                      |
/// | initial_states | 4-byte count + states       |
///
/// States are written ordered by feature-extension index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateAssetTx {
    pub base: BaseTx,
    pub name: String,
    pub symbol: String,
    pub denomination: u8,
    pub initial_states: Vec<InitialState>,
}

impl CreateAssetTx {
    pub fn new(
        base: BaseTx,
        name: String,
        symbol: String,
        denomination: u8,
        initial_states: Vec<InitialState>,
    ) -> Result<Self, TransactionError> {
        let mut initial_states = initial_states;
        initial_states.sort_by_key(|s| s.fx_index);
        let tx = CreateAssetTx {
            base,
            name,
            symbol,
            denomination,
            initial_states,
        };
        tx.validate()?;
        Ok(tx)
    }

    fn validate(&self) -> Result<(), TransactionError> {
        if self.name.is_empty() || self.name.len() > MAX_NAME_LEN {
            return Err(TransactionError::InvalidTransaction(format!(
                "asset name must be 1..={MAX_NAME_LEN} bytes"
            )));
        }
        if self.symbol.is_empty() || self.symbol.len() > MAX_SYMBOL_LEN {
            return Err(TransactionError::InvalidTransaction(format!(
                "asset symbol must be 1..={MAX_SYMBOL_LEN} bytes"
            )));
        }
        if self.denomination > MAX_DENOMINATION {
            return Err(TransactionError::InvalidTransaction(format!(
                "denomination {} exceeds {MAX_DENOMINATION}",
                self.denomination
            )));
        }
        if self.initial_states.is_empty() {
            return Err(TransactionError::InvalidTransaction(
                "asset needs at least one initial state".into(),
            ));
        }
        Ok(())
    }

    pub fn read_from(reader: &mut BinaryReader, codec: Codec) -> Result<Self, TransactionError> {
        let base = BaseTx::read_from(reader, codec)?;
        let name = reader.read_short_string()?;
        let symbol = reader.read_short_string()?;
        let denomination = reader.read_u8()?;
        let n = reader.read_len()?;
        let mut initial_states = Vec::with_capacity(n);
        for _ in 0..n {
            initial_states.push(InitialState::read_from(reader, codec)?);
        }
        let tx = CreateAssetTx {
            base,
            name,
            symbol,
            denomination,
            initial_states,
        };
        tx.validate()?;
        Ok(tx)
    }

    pub fn write_to(&self, writer: &mut BinaryWriter, codec: Codec) -> Result<(), TransactionError> {
        self.validate()?;
        self.base.write_to(writer, codec)?;
        writer.write_short_string(&self.name)?;
        writer.write_short_string(&self.symbol)?;
        writer.write_u8(self.denomination);
        let mut states: Vec<&InitialState> = self.initial_states.iter().collect();
        states.sort_by_key(|s| s.fx_index);
        writer.write_len(states.len())?;
        for state in states {
            state.write_to(writer, codec)?;
        }
        Ok(())
    }
}

/// Apply mint and NFT operations.
///
/// Wire format: `base | u32 n | n × operation`. Operations are written in
/// stored order because their credentials follow the base inputs' by
/// position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationTx {
    pub base: BaseTx,
    pub operations: Vec<TransferableOperation>,
}

impl OperationTx {
    /// Create the body with operations ordered by asset then consumed UTXOs.
    pub fn new(base: BaseTx, operations: Vec<TransferableOperation>) -> Self {
        let mut operations = operations;
        operations.sort_by(|a, b| a.asset_id.cmp(&b.asset_id).then_with(|| a.utxo_ids.cmp(&b.utxo_ids)));
        OperationTx { base, operations }
    }

    pub fn read_from(reader: &mut BinaryReader, codec: Codec) -> Result<Self, TransactionError> {
        let base = BaseTx::read_from(reader, codec)?;
        let n = reader.read_len()?;
        let mut operations = Vec::with_capacity(n);
        for _ in 0..n {
            operations.push(TransferableOperation::read_from(reader, codec)?);
        }
        Ok(OperationTx { base, operations })
    }

    pub fn write_to(&self, writer: &mut BinaryWriter, codec: Codec) -> Result<(), TransactionError> {
        self.base.write_to(writer, codec)?;
        writer.write_len(self.operations.len())?;
        for op in &self.operations {
            op.write_to(writer, codec)?;
        }
        Ok(())
    }
}
