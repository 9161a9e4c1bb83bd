//! Type-id registry and codec versioning.
//!
//! Every wire primitive that can appear in more than one shape is preceded
//! by a 4-byte type id. The id space is per chain and per codec version;
//! a `Codec` pins both and maps between ids and the closed set of
//! `TypeTag`s this crate knows how to encode.

use chainkit_primitives::util::{BinaryReader, BinaryWriter};
use serde::{Deserialize, Serialize};

use crate::TransactionError;

/// Codec version 0.
pub const CODEC_V0: u16 = 0;

/// Codec version 1 (exchange chain only).
pub const CODEC_V1: u16 = 1;

/// Offset added to every exchange-chain type id under codec version 1.
const EXCHANGE_V1_OFFSET: u32 = 0x0001_0000;

/// The three chains of the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainKind {
    /// Asset exchange chain (`X`).
    Exchange,
    /// Platform chain (`P`): staking, subnets and chain creation.
    Platform,
    /// Contract chain (`C`): only atomic import/export is handled here.
    Contract,
}

/// Every concrete primitive with a type id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeTag {
    BaseTx,
    CreateAssetTx,
    OperationTx,
    ImportTx,
    ExportTx,
    AddValidatorTx,
    AddSubnetValidatorTx,
    AddDelegatorTx,
    CreateChainTx,
    CreateSubnetTx,
    SecpTransferInput,
    SecpMintOutput,
    SecpTransferOutput,
    SecpMintOperation,
    SecpCredential,
    NftMintOutput,
    NftTransferOutput,
    NftMintOperation,
    NftTransferOperation,
    NftCredential,
    SubnetAuth,
    SecpOwnerOutput,
    LockedInput,
    LockedOutput,
}

const EXCHANGE_REGISTRY: &[(TypeTag, u32)] = &[
    (TypeTag::BaseTx, 0),
    (TypeTag::CreateAssetTx, 1),
    (TypeTag::OperationTx, 2),
    (TypeTag::ImportTx, 3),
    (TypeTag::ExportTx, 4),
    (TypeTag::SecpTransferInput, 5),
    (TypeTag::SecpMintOutput, 6),
    (TypeTag::SecpTransferOutput, 7),
    (TypeTag::SecpMintOperation, 8),
    (TypeTag::SecpCredential, 9),
    (TypeTag::NftMintOutput, 10),
    (TypeTag::NftTransferOutput, 11),
    (TypeTag::NftMintOperation, 12),
    (TypeTag::NftTransferOperation, 13),
    (TypeTag::NftCredential, 14),
];

const PLATFORM_REGISTRY: &[(TypeTag, u32)] = &[
    (TypeTag::SecpTransferInput, 5),
    (TypeTag::SecpTransferOutput, 7),
    (TypeTag::SecpCredential, 9),
    (TypeTag::SubnetAuth, 10),
    (TypeTag::SecpOwnerOutput, 11),
    (TypeTag::AddValidatorTx, 12),
    (TypeTag::AddSubnetValidatorTx, 13),
    (TypeTag::AddDelegatorTx, 14),
    (TypeTag::CreateChainTx, 15),
    (TypeTag::CreateSubnetTx, 16),
    (TypeTag::ImportTx, 17),
    (TypeTag::ExportTx, 18),
    (TypeTag::BaseTx, 34),
    (TypeTag::LockedInput, 0x2000_0001),
    (TypeTag::LockedOutput, 0x2000_0002),
];

const CONTRACT_REGISTRY: &[(TypeTag, u32)] = &[
    (TypeTag::ImportTx, 0),
    (TypeTag::ExportTx, 1),
    (TypeTag::SecpTransferInput, 5),
    (TypeTag::SecpTransferOutput, 7),
    (TypeTag::SecpCredential, 9),
];

/// A (chain, codec version) pair selecting one type-id table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Codec {
    chain: ChainKind,
    version: u16,
}

impl Codec {
    /// Create a codec, rejecting versions the chain does not define.
    pub fn new(chain: ChainKind, version: u16) -> Result<Self, TransactionError> {
        let supported = match chain {
            ChainKind::Exchange => version == CODEC_V0 || version == CODEC_V1,
            ChainKind::Platform | ChainKind::Contract => version == CODEC_V0,
        };
        if !supported {
            return Err(TransactionError::UnsupportedCodecVersion { chain, version });
        }
        Ok(Codec { chain, version })
    }

    /// Exchange chain, codec 0.
    pub fn exchange() -> Self {
        Codec { chain: ChainKind::Exchange, version: CODEC_V0 }
    }

    /// Platform chain, codec 0.
    pub fn platform() -> Self {
        Codec { chain: ChainKind::Platform, version: CODEC_V0 }
    }

    /// Contract chain, codec 0.
    pub fn contract() -> Self {
        Codec { chain: ChainKind::Contract, version: CODEC_V0 }
    }

    pub fn chain(&self) -> ChainKind {
        self.chain
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    fn registry(&self) -> &'static [(TypeTag, u32)] {
        match self.chain {
            ChainKind::Exchange => EXCHANGE_REGISTRY,
            ChainKind::Platform => PLATFORM_REGISTRY,
            ChainKind::Contract => CONTRACT_REGISTRY,
        }
    }

    fn offset(&self) -> u32 {
        if self.chain == ChainKind::Exchange && self.version == CODEC_V1 {
            EXCHANGE_V1_OFFSET
        } else {
            0
        }
    }

    /// Whether `tag` exists on this chain.
    pub fn supports(&self, tag: TypeTag) -> bool {
        self.registry().iter().any(|(t, _)| *t == tag)
    }

    /// Look up the numeric id of `tag`.
    ///
    /// # Returns
    /// The type id, or `TypeNotSupported` if the chain has no such primitive.
    pub fn type_id(&self, tag: TypeTag) -> Result<u32, TransactionError> {
        self.registry()
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, id)| id + self.offset())
            .ok_or(TransactionError::TypeNotSupported { chain: self.chain, tag })
    }

    /// Resolve a numeric id back to its tag.
    ///
    /// # Returns
    /// The tag, or `UnknownTypeId` for an id absent from this table.
    pub fn tag(&self, type_id: u32) -> Result<TypeTag, TransactionError> {
        let unknown = TransactionError::UnknownTypeId {
            chain: self.chain,
            version: self.version,
            type_id,
        };
        let raw = match type_id.checked_sub(self.offset()) {
            Some(raw) => raw,
            None => return Err(unknown),
        };
        self.registry()
            .iter()
            .find(|(_, id)| *id == raw)
            .map(|(t, _)| *t)
            .ok_or(unknown)
    }

    /// Read a type id and resolve it.
    pub fn read_tag(&self, reader: &mut BinaryReader) -> Result<TypeTag, TransactionError> {
        let id = reader.read_u32()?;
        self.tag(id)
    }

    /// Read a type id and require it to be one of `expected`.
    pub fn read_expected(
        &self,
        reader: &mut BinaryReader,
        expected: &[TypeTag],
    ) -> Result<TypeTag, TransactionError> {
        let tag = self.read_tag(reader)?;
        if !expected.contains(&tag) {
            return Err(TransactionError::SerializationError(format!(
                "unexpected {:?}, want one of {:?}",
                tag, expected
            )));
        }
        Ok(tag)
    }

    /// Write the id of `tag`.
    pub fn write_tag(&self, writer: &mut BinaryWriter, tag: TypeTag) -> Result<(), TransactionError> {
        writer.write_u32(self.type_id(tag)?);
        Ok(())
    }
}
