//! Inputs consuming previously created outputs.
//!
//! A `TransferableInput` references a UTXO by `(tx_id, output_index)` and
//! carries the signature indices that say which owners of the referenced
//! output sign for it. Builders also attach the signing addresses as
//! non-serialized metadata so a keychain can produce the matching
//! credential without the UTXO set at hand.

use std::cmp::Ordering;

use chainkit_primitives::ids::{AssetId, TxId};
use chainkit_primitives::util::{BinaryReader, BinaryWriter};
use chainkit_primitives::Address;

use crate::codec::{Codec, TypeTag};
use crate::output::LockIds;
use crate::utxo::UtxoId;
use crate::TransactionError;

/// Check that signature indices are strictly increasing.
pub fn validate_sig_indices(indices: &[u32]) -> Result<(), TransactionError> {
    if let Some(w) = indices.windows(2).find(|w| w[0] >= w[1]) {
        return Err(TransactionError::InvalidSignatureIndices(format!(
            "indices must be strictly increasing, found {} then {}",
            w[0], w[1]
        )));
    }
    Ok(())
}

pub(crate) fn read_sig_indices(reader: &mut BinaryReader) -> Result<Vec<u32>, TransactionError> {
    let n = reader.read_len()?;
    let mut indices = Vec::with_capacity(n);
    for _ in 0..n {
        indices.push(reader.read_u32()?);
    }
    validate_sig_indices(&indices)?;
    Ok(indices)
}

pub(crate) fn write_sig_indices(
    writer: &mut BinaryWriter,
    indices: &[u32],
) -> Result<(), TransactionError> {
    validate_sig_indices(indices)?;
    writer.write_len(indices.len())?;
    for i in indices {
        writer.write_u32(*i);
    }
    Ok(())
}

/// SECP256k1 transfer input.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SecpTransferInput {
    pub amount: u64,
    pub sig_indices: Vec<u32>,
}

/// A platform input spending a locked output.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LockedInput {
    pub lock_ids: LockIds,
    pub inner: Box<Input>,
}

/// Every input variant.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Input {
    SecpTransfer(SecpTransferInput),
    Locked(LockedInput),
}

impl Input {
    pub fn transfer(amount: u64, sig_indices: Vec<u32>) -> Self {
        Input::SecpTransfer(SecpTransferInput {
            amount,
            sig_indices,
        })
    }

    pub fn tag(&self) -> TypeTag {
        match self {
            Input::SecpTransfer(_) => TypeTag::SecpTransferInput,
            Input::Locked(_) => TypeTag::LockedInput,
        }
    }

    pub fn amount(&self) -> u64 {
        match self {
            Input::SecpTransfer(i) => i.amount,
            Input::Locked(i) => i.inner.amount(),
        }
    }

    pub fn sig_indices(&self) -> &[u32] {
        match self {
            Input::SecpTransfer(i) => &i.sig_indices,
            Input::Locked(i) => i.inner.sig_indices(),
        }
    }

    pub fn read_typed(reader: &mut BinaryReader, codec: Codec) -> Result<Self, TransactionError> {
        match codec.read_tag(reader)? {
            TypeTag::SecpTransferInput => {
                let amount = reader.read_u64()?;
                let sig_indices = read_sig_indices(reader)?;
                Ok(Input::transfer(amount, sig_indices))
            }
            TypeTag::LockedInput => {
                let lock_ids = LockIds::read_from(reader)?;
                let inner = Input::read_typed(reader, codec)?;
                if matches!(inner, Input::Locked(_)) {
                    return Err(TransactionError::SerializationError(
                        "locked input cannot wrap a locked input".to_string(),
                    ));
                }
                Ok(Input::Locked(LockedInput {
                    lock_ids,
                    inner: Box::new(inner),
                }))
            }
            other => Err(TransactionError::SerializationError(format!(
                "{:?} is not an input",
                other
            ))),
        }
    }

    pub fn write_typed(&self, writer: &mut BinaryWriter, codec: Codec) -> Result<(), TransactionError> {
        codec.write_tag(writer, self.tag())?;
        match self {
            Input::SecpTransfer(i) => {
                writer.write_u64(i.amount);
                write_sig_indices(writer, &i.sig_indices)
            }
            Input::Locked(i) => {
                i.lock_ids.write_to(writer);
                i.inner.write_typed(writer, codec)
            }
        }
    }
}

/// An input paired with the UTXO it spends and the asset it carries.
///
/// # Wire format
///
/// | Field        | Size     |
/// |--------------|----------|
/// | tx_id        | 32 bytes |
/// | output_index | 4 bytes  |
/// | asset_id     | 32 bytes |
/// | type_id      | 4 bytes  |
/// | input        | variable |
#[derive(Clone, Debug)]
pub struct TransferableInput {
    pub tx_id: TxId,
    pub output_index: u32,
    pub asset_id: AssetId,
    pub input: Input,

    /// Addresses that sign for this input, one per signature index.
    /// Not serialized; empty for decoded transactions.
    signers: Vec<Address>,
}

impl TransferableInput {
    pub fn new(tx_id: TxId, output_index: u32, asset_id: AssetId, input: Input) -> Self {
        TransferableInput {
            tx_id,
            output_index,
            asset_id,
            input,
            signers: Vec::new(),
        }
    }

    /// Attach the signing addresses, one per signature index.
    pub fn with_signers(mut self, signers: Vec<Address>) -> Self {
        self.signers = signers;
        self
    }

    pub fn set_signers(&mut self, signers: Vec<Address>) {
        self.signers = signers;
    }

    pub fn signers(&self) -> &[Address] {
        &self.signers
    }

    pub fn utxo_id(&self) -> UtxoId {
        UtxoId::new(self.tx_id, self.output_index)
    }

    pub fn amount(&self) -> u64 {
        self.input.amount()
    }

    pub fn sig_indices(&self) -> &[u32] {
        self.input.sig_indices()
    }

    pub fn read_from(reader: &mut BinaryReader, codec: Codec) -> Result<Self, TransactionError> {
        let tx_id = reader.read_id()?;
        let output_index = reader.read_u32()?;
        let asset_id = reader.read_id()?;
        let input = Input::read_typed(reader, codec)?;
        Ok(TransferableInput::new(tx_id, output_index, asset_id, input))
    }

    pub fn write_to(&self, writer: &mut BinaryWriter, codec: Codec) -> Result<(), TransactionError> {
        writer.write_id(&self.tx_id);
        writer.write_u32(self.output_index);
        writer.write_id(&self.asset_id);
        self.input.write_typed(writer, codec)
    }
}

impl PartialEq for TransferableInput {
    fn eq(&self, other: &Self) -> bool {
        self.tx_id == other.tx_id
            && self.output_index == other.output_index
            && self.asset_id == other.asset_id
            && self.input == other.input
    }
}

impl Eq for TransferableInput {}

/// Canonical input order: by spent UTXO.
pub fn compare_inputs(a: &TransferableInput, b: &TransferableInput) -> Ordering {
    a.utxo_id().cmp(&b.utxo_id())
}

/// Sort inputs into canonical order.
pub fn sort_inputs(inputs: &mut [TransferableInput]) {
    inputs.sort_by(compare_inputs);
}

/// Check that `inputs` are in canonical order with no UTXO spent twice.
pub fn check_sorted_unique_inputs(inputs: &[TransferableInput]) -> Result<(), TransactionError> {
    for w in inputs.windows(2) {
        match compare_inputs(&w[0], &w[1]) {
            Ordering::Less => {}
            Ordering::Equal => return Err(TransactionError::DuplicateInput(w[0].utxo_id())),
            Ordering::Greater => {
                return Err(TransactionError::UnsortedInputs(format!(
                    "{} before {}",
                    w[0].utxo_id(),
                    w[1].utxo_id()
                )))
            }
        }
    }
    Ok(())
}

/// Write a length-prefixed input list in stored order.
pub(crate) fn write_input_list(
    writer: &mut BinaryWriter,
    inputs: &[TransferableInput],
    codec: Codec,
) -> Result<(), TransactionError> {
    writer.write_len(inputs.len())?;
    for input in inputs {
        input.write_to(writer, codec)?;
    }
    Ok(())
}

/// Read a length-prefixed input list, rejecting non-canonical order and
/// repeated UTXOs.
pub(crate) fn read_input_list(
    reader: &mut BinaryReader,
    codec: Codec,
) -> Result<Vec<TransferableInput>, TransactionError> {
    let n = reader.read_len()?;
    let mut inputs = Vec::with_capacity(n);
    for _ in 0..n {
        inputs.push(TransferableInput::read_from(reader, codec)?);
    }
    check_sorted_unique_inputs(&inputs)?;
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainkit_primitives::Id;

    fn input(tx: u8, idx: u32) -> TransferableInput {
        TransferableInput::new(Id::new([tx; 32]), idx, Id::new([9; 32]), Input::transfer(10, vec![0]))
    }

    #[test]
    fn test_input_layout_and_round_trip() {
        let codec = Codec::exchange();
        let inp = TransferableInput::new(
            Id::new([1; 32]),
            3,
            Id::new([2; 32]),
            Input::transfer(1000, vec![0, 2]),
        );
        let mut w = BinaryWriter::new();
        inp.write_to(&mut w, codec).unwrap();
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 32 + 4 + 32 + 4 + 8 + 4 + 8);
        assert_eq!(&bytes[68..72], &[0, 0, 0, 5]);
        let back = TransferableInput::read_from(&mut BinaryReader::new(&bytes), codec).unwrap();
        assert_eq!(back, inp);
        assert_eq!(back.sig_indices(), &[0, 2]);
    }

    #[test]
    fn test_signers_do_not_affect_equality_or_bytes() {
        let codec = Codec::exchange();
        let plain = input(1, 0);
        let signed = input(1, 0).with_signers(vec![Address::new([4; 20])]);
        assert_eq!(plain, signed);
        let mut a = BinaryWriter::new();
        plain.write_to(&mut a, codec).unwrap();
        let mut b = BinaryWriter::new();
        signed.write_to(&mut b, codec).unwrap();
        assert_eq!(a.into_bytes(), b.into_bytes());
    }

    #[test]
    fn test_sig_indices_must_increase() {
        let codec = Codec::exchange();
        let bad = TransferableInput::new(Id::EMPTY, 0, Id::EMPTY, Input::transfer(1, vec![2, 1]));
        let mut w = BinaryWriter::new();
        assert!(matches!(
            bad.write_to(&mut w, codec),
            Err(TransactionError::InvalidSignatureIndices(_))
        ));
        assert!(validate_sig_indices(&[1, 1]).is_err());
        assert!(validate_sig_indices(&[]).is_ok());
    }

    #[test]
    fn test_locked_input_round_trip() {
        let codec = Codec::platform();
        let inp = TransferableInput::new(
            Id::new([1; 32]),
            0,
            Id::new([2; 32]),
            Input::Locked(LockedInput {
                lock_ids: LockIds {
                    deposit_tx_id: Id::EMPTY,
                    bond_tx_id: Id::new([5; 32]),
                },
                inner: Box::new(Input::transfer(77, vec![0])),
            }),
        );
        let mut w = BinaryWriter::new();
        inp.write_to(&mut w, codec).unwrap();
        let bytes = w.into_bytes();
        let back = TransferableInput::read_from(&mut BinaryReader::new(&bytes), codec).unwrap();
        assert_eq!(back, inp);
        assert_eq!(back.amount(), 77);
    }

    #[test]
    fn test_check_sorted_unique_inputs() {
        assert!(check_sorted_unique_inputs(&[]).is_ok());
        assert!(check_sorted_unique_inputs(&[input(1, 0), input(1, 1), input(2, 0)]).is_ok());
        assert!(matches!(
            check_sorted_unique_inputs(&[input(1, 0), input(1, 0)]),
            Err(TransactionError::DuplicateInput(id)) if id == UtxoId::new(Id::new([1; 32]), 0)
        ));
        assert!(matches!(
            check_sorted_unique_inputs(&[input(2, 0), input(1, 0)]),
            Err(TransactionError::UnsortedInputs(_))
        ));
    }

    #[test]
    fn test_read_input_list_rejects_repeated_utxo() {
        let codec = Codec::exchange();
        let mut w = BinaryWriter::new();
        write_input_list(&mut w, &[input(1, 0), input(1, 0)], codec).unwrap();
        let bytes = w.into_bytes();
        assert!(matches!(
            read_input_list(&mut BinaryReader::new(&bytes), codec),
            Err(TransactionError::DuplicateInput(_))
        ));
    }

    #[test]
    fn test_sort_inputs() {
        let mut inputs = vec![input(2, 0), input(1, 5), input(1, 1)];
        sort_inputs(&mut inputs);
        let ids: Vec<UtxoId> = inputs.iter().map(|i| i.utxo_id()).collect();
        assert_eq!(
            ids,
            vec![
                UtxoId::new(Id::new([1; 32]), 1),
                UtxoId::new(Id::new([1; 32]), 5),
                UtxoId::new(Id::new([2; 32]), 0),
            ]
        );
    }
}
