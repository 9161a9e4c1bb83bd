//! Credentials: the signatures attached to one input, operation or
//! subnet authorization.

use chainkit_primitives::ec::signature::{Signature, SIGNATURE_LEN};
use chainkit_primitives::util::{BinaryReader, BinaryWriter};

use crate::codec::{Codec, TypeTag};
use crate::TransactionError;

/// Which credential type id a slot uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    Secp,
    Nft,
}

impl CredentialKind {
    pub fn tag(&self) -> TypeTag {
        match self {
            CredentialKind::Secp => TypeTag::SecpCredential,
            CredentialKind::Nft => TypeTag::NftCredential,
        }
    }
}

/// Signatures for one slot, in signature-index order.
///
/// # Wire format
///
/// | Field      | Size           |
/// |------------|----------------|
/// | type_id    | 4 bytes        |
/// | count      | 4 bytes        |
/// | signatures | 65 bytes each  |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    pub kind: CredentialKind,
    pub signatures: Vec<Signature>,
}

impl Credential {
    pub fn new(kind: CredentialKind, signatures: Vec<Signature>) -> Self {
        Credential { kind, signatures }
    }

    /// Encoded size of a credential holding `signatures` signatures.
    pub fn encoded_len(signatures: usize) -> usize {
        4 + 4 + signatures * SIGNATURE_LEN
    }

    pub fn read_from(reader: &mut BinaryReader, codec: Codec) -> Result<Self, TransactionError> {
        let kind = match codec.read_expected(reader, &[TypeTag::SecpCredential, TypeTag::NftCredential])? {
            TypeTag::NftCredential => CredentialKind::Nft,
            _ => CredentialKind::Secp,
        };
        let n = reader.read_len()?;
        let mut signatures = Vec::with_capacity(n);
        for _ in 0..n {
            signatures.push(Signature::from_bytes(reader.read_bytes(SIGNATURE_LEN)?)?);
        }
        Ok(Credential { kind, signatures })
    }

    pub fn write_to(&self, writer: &mut BinaryWriter, codec: Codec) -> Result<(), TransactionError> {
        codec.write_tag(writer, self.kind.tag())?;
        writer.write_len(self.signatures.len())?;
        for sig in &self.signatures {
            writer.write_bytes(&sig.to_bytes());
        }
        Ok(())
    }
}
