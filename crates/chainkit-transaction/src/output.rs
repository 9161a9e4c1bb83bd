//! Outputs and transferable outputs.
//!
//! `Output` is the closed set of output variants. Each variant body is
//! written without its type id; the type id is written by whoever embeds
//! the output (`TransferableOutput`, UTXOs, initial states), using the
//! codec of the chain the output lives on.

use std::cmp::Ordering;

use chainkit_primitives::ids::{AssetId, TxId};
use chainkit_primitives::util::{BinaryReader, BinaryWriter};
use chainkit_primitives::Address;

use crate::codec::{Codec, TypeTag};
use crate::owners::OutputOwners;
use crate::TransactionError;

/// Maximum NFT payload length in bytes.
pub const MAX_NFT_PAYLOAD_LEN: usize = 1024;

/// SECP256k1 transfer output: an amount owned by an owner group.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SecpTransferOutput {
    pub amount: u64,
    pub owners: OutputOwners,
}

/// Authority to mint more of a fungible asset.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SecpMintOutput {
    pub owners: OutputOwners,
}

/// Authority to mint NFTs within one group.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NftMintOutput {
    pub group_id: u32,
    pub owners: OutputOwners,
}

/// An NFT with its payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NftTransferOutput {
    pub group_id: u32,
    pub payload: Vec<u8>,
    pub owners: OutputOwners,
}

/// Deposit and bond transaction ids a locked output is tied to.
///
/// An empty id means the output is not locked in that respect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockIds {
    pub deposit_tx_id: TxId,
    pub bond_tx_id: TxId,
}

impl LockIds {
    pub fn is_deposited(&self) -> bool {
        !self.deposit_tx_id.is_empty()
    }

    pub fn is_bonded(&self) -> bool {
        !self.bond_tx_id.is_empty()
    }

    pub(crate) fn read_from(reader: &mut BinaryReader) -> Result<Self, TransactionError> {
        Ok(LockIds {
            deposit_tx_id: reader.read_id()?,
            bond_tx_id: reader.read_id()?,
        })
    }

    pub(crate) fn write_to(&self, writer: &mut BinaryWriter) {
        writer.write_id(&self.deposit_tx_id);
        writer.write_id(&self.bond_tx_id);
    }
}

/// A platform output wrapped with deposit/bond lock ids.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LockedOutput {
    pub lock_ids: LockIds,
    pub inner: Box<Output>,
}

/// Every output variant.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Output {
    SecpTransfer(SecpTransferOutput),
    SecpMint(SecpMintOutput),
    NftMint(NftMintOutput),
    NftTransfer(NftTransferOutput),
    /// Owner-only output used for reward and subnet owners.
    SecpOwner(OutputOwners),
    Locked(LockedOutput),
}

impl Output {
    /// Shorthand for a SECP transfer output.
    pub fn transfer(amount: u64, owners: OutputOwners) -> Self {
        Output::SecpTransfer(SecpTransferOutput { amount, owners })
    }

    pub fn tag(&self) -> TypeTag {
        match self {
            Output::SecpTransfer(_) => TypeTag::SecpTransferOutput,
            Output::SecpMint(_) => TypeTag::SecpMintOutput,
            Output::NftMint(_) => TypeTag::NftMintOutput,
            Output::NftTransfer(_) => TypeTag::NftTransferOutput,
            Output::SecpOwner(_) => TypeTag::SecpOwnerOutput,
            Output::Locked(_) => TypeTag::LockedOutput,
        }
    }

    /// The owner group controlling this output.
    pub fn owners(&self) -> &OutputOwners {
        match self {
            Output::SecpTransfer(o) => &o.owners,
            Output::SecpMint(o) => &o.owners,
            Output::NftMint(o) => &o.owners,
            Output::NftTransfer(o) => &o.owners,
            Output::SecpOwner(o) => o,
            Output::Locked(o) => o.inner.owners(),
        }
    }

    /// Fungible amount carried, zero for non-transfer outputs.
    pub fn amount(&self) -> u64 {
        match self {
            Output::SecpTransfer(o) => o.amount,
            Output::Locked(o) => o.inner.amount(),
            _ => 0,
        }
    }

    /// Lock ids when this is a locked output.
    pub fn lock_ids(&self) -> Option<&LockIds> {
        match self {
            Output::Locked(o) => Some(&o.lock_ids),
            _ => None,
        }
    }

    /// Read a type id followed by the matching output body.
    pub fn read_typed(reader: &mut BinaryReader, codec: Codec) -> Result<Self, TransactionError> {
        let tag = codec.read_tag(reader)?;
        Self::read_body(reader, codec, tag)
    }

    /// Read the body of an output whose type id has already been consumed.
    pub fn read_body(
        reader: &mut BinaryReader,
        codec: Codec,
        tag: TypeTag,
    ) -> Result<Self, TransactionError> {
        match tag {
            TypeTag::SecpTransferOutput => {
                let amount = reader.read_u64()?;
                let owners = OutputOwners::read_from(reader)?;
                Ok(Output::SecpTransfer(SecpTransferOutput { amount, owners }))
            }
            TypeTag::SecpMintOutput => Ok(Output::SecpMint(SecpMintOutput {
                owners: OutputOwners::read_from(reader)?,
            })),
            TypeTag::NftMintOutput => {
                let group_id = reader.read_u32()?;
                let owners = OutputOwners::read_from(reader)?;
                Ok(Output::NftMint(NftMintOutput { group_id, owners }))
            }
            TypeTag::NftTransferOutput => Ok(Output::NftTransfer(
                NftTransferOutput::read_from(reader)?,
            )),
            TypeTag::SecpOwnerOutput => Ok(Output::SecpOwner(OutputOwners::read_from(reader)?)),
            TypeTag::LockedOutput => {
                let lock_ids = LockIds::read_from(reader)?;
                let inner_tag = codec.read_tag(reader)?;
                if inner_tag == TypeTag::LockedOutput {
                    return Err(TransactionError::SerializationError(
                        "locked output cannot wrap a locked output".to_string(),
                    ));
                }
                let inner = Self::read_body(reader, codec, inner_tag)?;
                Ok(Output::Locked(LockedOutput {
                    lock_ids,
                    inner: Box::new(inner),
                }))
            }
            other => Err(TransactionError::SerializationError(format!(
                "{:?} is not an output",
                other
            ))),
        }
    }

    /// Write the type id followed by the output body.
    pub fn write_typed(&self, writer: &mut BinaryWriter, codec: Codec) -> Result<(), TransactionError> {
        codec.write_tag(writer, self.tag())?;
        self.write_body(writer, codec)
    }

    /// Write the output body without its type id.
    pub fn write_body(&self, writer: &mut BinaryWriter, codec: Codec) -> Result<(), TransactionError> {
        match self {
            Output::SecpTransfer(o) => {
                writer.write_u64(o.amount);
                o.owners.write_to(writer)
            }
            Output::SecpMint(o) => o.owners.write_to(writer),
            Output::NftMint(o) => {
                writer.write_u32(o.group_id);
                o.owners.write_to(writer)
            }
            Output::NftTransfer(o) => o.write_to(writer),
            Output::SecpOwner(o) => o.write_to(writer),
            Output::Locked(o) => {
                o.lock_ids.write_to(writer);
                o.inner.write_typed(writer, codec)
            }
        }
    }
}

impl NftTransferOutput {
    pub(crate) fn read_from(reader: &mut BinaryReader) -> Result<Self, TransactionError> {
        let group_id = reader.read_u32()?;
        let payload = reader.read_prefixed_bytes()?.to_vec();
        if payload.len() > MAX_NFT_PAYLOAD_LEN {
            return Err(TransactionError::SerializationError(format!(
                "nft payload of {} bytes exceeds {}",
                payload.len(),
                MAX_NFT_PAYLOAD_LEN
            )));
        }
        let owners = OutputOwners::read_from(reader)?;
        Ok(NftTransferOutput {
            group_id,
            payload,
            owners,
        })
    }

    pub(crate) fn write_to(&self, writer: &mut BinaryWriter) -> Result<(), TransactionError> {
        if self.payload.len() > MAX_NFT_PAYLOAD_LEN {
            return Err(TransactionError::InvalidTransaction(format!(
                "nft payload of {} bytes exceeds {}",
                self.payload.len(),
                MAX_NFT_PAYLOAD_LEN
            )));
        }
        writer.write_u32(self.group_id);
        writer.write_prefixed_bytes(&self.payload)?;
        self.owners.write_to(writer)
    }
}

/// An output paired with the asset it carries.
///
/// # Wire format
///
/// | Field    | Size     |
/// |----------|----------|
/// | asset_id | 32 bytes |
/// | type_id  | 4 bytes  |
/// | output   | variable |
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TransferableOutput {
    pub asset_id: AssetId,
    pub output: Output,
}

impl TransferableOutput {
    pub fn new(asset_id: AssetId, output: Output) -> Self {
        TransferableOutput { asset_id, output }
    }

    pub fn amount(&self) -> u64 {
        self.output.amount()
    }

    pub fn read_from(reader: &mut BinaryReader, codec: Codec) -> Result<Self, TransactionError> {
        let asset_id = reader.read_id()?;
        let output = Output::read_typed(reader, codec)?;
        Ok(TransferableOutput { asset_id, output })
    }

    pub fn write_to(&self, writer: &mut BinaryWriter, codec: Codec) -> Result<(), TransactionError> {
        writer.write_id(&self.asset_id);
        self.output.write_typed(writer, codec)
    }

    fn encoded(&self, codec: Codec) -> Vec<u8> {
        let mut w = BinaryWriter::new();
        // Comparison only needs a total order; an unencodable output sorts
        // by the bytes written before the failure.
        let _ = self.write_to(&mut w, codec);
        w.into_bytes()
    }
}

/// Canonical output order: asset, type id, amount, owner addresses,
/// locktime, threshold, then the full encoding.
pub fn compare_outputs(a: &TransferableOutput, b: &TransferableOutput, codec: Codec) -> Ordering {
    let type_id = |o: &TransferableOutput| codec.type_id(o.output.tag()).unwrap_or(u32::MAX);
    let addresses = |o: &TransferableOutput| -> Vec<Address> { o.output.owners().addresses().to_vec() };
    a.asset_id
        .cmp(&b.asset_id)
        .then_with(|| type_id(a).cmp(&type_id(b)))
        .then_with(|| a.amount().cmp(&b.amount()))
        .then_with(|| addresses(a).cmp(&addresses(b)))
        .then_with(|| a.output.owners().locktime().cmp(&b.output.owners().locktime()))
        .then_with(|| a.output.owners().threshold().cmp(&b.output.owners().threshold()))
        .then_with(|| a.encoded(codec).cmp(&b.encoded(codec)))
}

/// Sort outputs into canonical order.
pub fn sort_outputs(outputs: &mut [TransferableOutput], codec: Codec) {
    outputs.sort_by(|a, b| compare_outputs(a, b, codec));
}

/// Whether `outputs` is already in canonical order.
pub fn is_sorted_outputs(outputs: &[TransferableOutput], codec: Codec) -> bool {
    outputs
        .windows(2)
        .all(|w| compare_outputs(&w[0], &w[1], codec) != Ordering::Greater)
}

/// Write a length-prefixed output list in canonical order.
pub(crate) fn write_output_list(
    writer: &mut BinaryWriter,
    outputs: &[TransferableOutput],
    codec: Codec,
) -> Result<(), TransactionError> {
    let mut sorted = outputs.to_vec();
    sort_outputs(&mut sorted, codec);
    writer.write_len(sorted.len())?;
    for output in &sorted {
        output.write_to(writer, codec)?;
    }
    Ok(())
}

pub(crate) fn read_output_list(
    reader: &mut BinaryReader,
    codec: Codec,
) -> Result<Vec<TransferableOutput>, TransactionError> {
    let n = reader.read_len()?;
    let mut outputs = Vec::with_capacity(n);
    for _ in 0..n {
        outputs.push(TransferableOutput::read_from(reader, codec)?);
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainkit_primitives::Id;

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    fn xfer(asset: u8, amount: u64, owner: u8) -> TransferableOutput {
        TransferableOutput::new(
            Id::new([asset; 32]),
            Output::transfer(amount, OutputOwners::single(addr(owner))),
        )
    }

    #[test]
    fn test_transfer_output_layout() {
        let codec = Codec::exchange();
        let out = xfer(1, 0x10, 2);
        let mut w = BinaryWriter::new();
        out.write_to(&mut w, codec).unwrap();
        let bytes = w.into_bytes();
        // asset | type 7 | amount | locktime | threshold | n | addr
        assert_eq!(bytes.len(), 32 + 4 + 8 + 8 + 4 + 4 + 20);
        assert_eq!(&bytes[32..36], &[0, 0, 0, 7]);
        assert_eq!(&bytes[36..44], &[0, 0, 0, 0, 0, 0, 0, 0x10]);
        let back = TransferableOutput::read_from(&mut BinaryReader::new(&bytes), codec).unwrap();
        assert_eq!(back, out);
    }

    #[test]
    fn test_all_variants_round_trip() {
        let codec = Codec::exchange();
        let owners = OutputOwners::new(vec![addr(1), addr(2)], 2, 99).unwrap();
        let variants = vec![
            Output::transfer(5, owners.clone()),
            Output::SecpMint(SecpMintOutput { owners: owners.clone() }),
            Output::NftMint(NftMintOutput { group_id: 3, owners: owners.clone() }),
            Output::NftTransfer(NftTransferOutput {
                group_id: 4,
                payload: b"nft".to_vec(),
                owners: owners.clone(),
            }),
        ];
        for output in variants {
            let mut w = BinaryWriter::new();
            output.write_typed(&mut w, codec).unwrap();
            let bytes = w.into_bytes();
            let back = Output::read_typed(&mut BinaryReader::new(&bytes), codec).unwrap();
            assert_eq!(back, output);
        }
    }

    #[test]
    fn test_locked_output_round_trip() {
        let codec = Codec::platform();
        let output = Output::Locked(LockedOutput {
            lock_ids: LockIds {
                deposit_tx_id: Id::new([7; 32]),
                bond_tx_id: Id::EMPTY,
            },
            inner: Box::new(Output::transfer(50, OutputOwners::single(addr(1)))),
        });
        let mut w = BinaryWriter::new();
        output.write_typed(&mut w, codec).unwrap();
        let bytes = w.into_bytes();
        assert_eq!(&bytes[..4], &[0x20, 0, 0, 2]);
        let back = Output::read_typed(&mut BinaryReader::new(&bytes), codec).unwrap();
        assert_eq!(back, output);
        assert_eq!(back.amount(), 50);
        assert!(back.lock_ids().unwrap().is_deposited());
        assert!(!back.lock_ids().unwrap().is_bonded());
    }

    #[test]
    fn test_nft_output_rejected_on_platform() {
        let output = Output::NftMint(NftMintOutput {
            group_id: 0,
            owners: OutputOwners::single(addr(1)),
        });
        let mut w = BinaryWriter::new();
        assert!(output.write_typed(&mut w, Codec::platform()).is_err());
    }

    #[test]
    fn test_canonical_order() {
        let codec = Codec::exchange();
        let mut outputs = vec![xfer(2, 1, 1), xfer(1, 9, 1), xfer(1, 3, 5), xfer(1, 3, 4)];
        sort_outputs(&mut outputs, codec);
        assert_eq!(outputs[0], xfer(1, 3, 4));
        assert_eq!(outputs[1], xfer(1, 3, 5));
        assert_eq!(outputs[2], xfer(1, 9, 1));
        assert_eq!(outputs[3], xfer(2, 1, 1));
        assert!(is_sorted_outputs(&outputs, codec));
    }

    #[test]
    fn test_output_list_is_written_sorted() {
        let codec = Codec::exchange();
        let outputs = vec![xfer(1, 9, 1), xfer(1, 3, 1)];
        let mut a = BinaryWriter::new();
        write_output_list(&mut a, &outputs, codec).unwrap();
        let mut reversed = outputs.clone();
        reversed.reverse();
        let mut b = BinaryWriter::new();
        write_output_list(&mut b, &reversed, codec).unwrap();
        assert_eq!(a.into_bytes(), b.into_bytes());
    }
}
