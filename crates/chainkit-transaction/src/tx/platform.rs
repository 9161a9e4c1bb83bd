//! Platform-chain bodies: staking, subnets and chain creation.
//!
//! Transactions acting on an existing subnet (adding a validator to it,
//! creating a chain in it) carry a `SubnetAuth`: signature indices into
//! the subnet owner group, signed with its own credential after the fund
//! inputs' credentials.

use chainkit_primitives::ids::SubnetId;
use chainkit_primitives::util::{BinaryReader, BinaryWriter};
use chainkit_primitives::{Address, Id, NodeId};

use crate::codec::{Codec, TypeTag};
use crate::input::{read_sig_indices, validate_sig_indices, write_sig_indices};
use crate::output::{read_output_list, sort_outputs, write_output_list, TransferableOutput};
use crate::owners::OutputOwners;
use crate::tx::base::BaseTx;
use crate::TransactionError;

/// Delegation shares are expressed in millionths.
pub const PERCENT_DENOMINATOR: u32 = 1_000_000;

/// Maximum length of a chain name.
pub const MAX_CHAIN_NAME_LEN: usize = 128;

/// Subnet id of the primary network.
pub const PRIMARY_NETWORK_ID: SubnetId = Id::EMPTY;

/// Maximum size of a chain genesis blob.
pub const MAX_GENESIS_LEN: usize = 1024 * 1024;

/// A node's staking period and weight.
///
/// # Wire format
///
/// | Field      | Size     |
/// |------------|----------|
/// | node_id    | 20 bytes |
/// | start_time | 8 bytes  |
/// | end_time   | 8 bytes  |
/// | weight     | 8 bytes  |
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Validator {
    pub node_id: NodeId,
    pub start_time: u64,
    pub end_time: u64,
    pub weight: u64,
}

impl Validator {
    fn validate(&self) -> Result<(), TransactionError> {
        if self.end_time <= self.start_time {
            return Err(TransactionError::InvalidTransaction(format!(
                "validation period must end after it starts ({} <= {})",
                self.end_time, self.start_time
            )));
        }
        if self.weight == 0 {
            return Err(TransactionError::InvalidTransaction("validator weight is zero".into()));
        }
        Ok(())
    }

    fn read_from(reader: &mut BinaryReader) -> Result<Self, TransactionError> {
        Ok(Validator {
            node_id: reader.read_node_id()?,
            start_time: reader.read_u64()?,
            end_time: reader.read_u64()?,
            weight: reader.read_u64()?,
        })
    }

    fn write_to(&self, writer: &mut BinaryWriter) {
        writer.write_node_id(&self.node_id);
        writer.write_u64(self.start_time);
        writer.write_u64(self.end_time);
        writer.write_u64(self.weight);
    }
}

/// Signature indices into a subnet's owner group.
#[derive(Clone, Debug, Default)]
pub struct SubnetAuth {
    pub sig_indices: Vec<u32>,
    signers: Vec<Address>,
}

impl SubnetAuth {
    pub fn new(sig_indices: Vec<u32>) -> Result<Self, TransactionError> {
        validate_sig_indices(&sig_indices)?;
        Ok(SubnetAuth {
            sig_indices,
            signers: Vec::new(),
        })
    }

    pub fn with_signers(mut self, signers: Vec<Address>) -> Self {
        self.signers = signers;
        self
    }

    pub fn signers(&self) -> &[Address] {
        &self.signers
    }

    fn read_from(reader: &mut BinaryReader, codec: Codec) -> Result<Self, TransactionError> {
        codec.read_expected(reader, &[TypeTag::SubnetAuth])?;
        SubnetAuth::new(read_sig_indices(reader)?)
    }

    fn write_to(&self, writer: &mut BinaryWriter, codec: Codec) -> Result<(), TransactionError> {
        codec.write_tag(writer, TypeTag::SubnetAuth)?;
        write_sig_indices(writer, &self.sig_indices)
    }
}

impl PartialEq for SubnetAuth {
    fn eq(&self, other: &Self) -> bool {
        self.sig_indices == other.sig_indices
    }
}

impl Eq for SubnetAuth {}

fn read_owner(reader: &mut BinaryReader, codec: Codec) -> Result<OutputOwners, TransactionError> {
    codec.read_expected(reader, &[TypeTag::SecpOwnerOutput])?;
    OutputOwners::read_from(reader)
}

fn write_owner(writer: &mut BinaryWriter, owner: &OutputOwners, codec: Codec) -> Result<(), TransactionError> {
    codec.write_tag(writer, TypeTag::SecpOwnerOutput)?;
    owner.write_to(writer)
}

/// Register a primary-network validator.
///
/// Wire format: `base | validator | stake outputs | rewards owner | shares u32`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddValidatorTx {
    pub base: BaseTx,
    pub validator: Validator,
    pub stake: Vec<TransferableOutput>,
    pub rewards_owner: OutputOwners,
    /// Delegation fee in millionths.
    pub shares: u32,
}

impl AddValidatorTx {
    pub fn new(
        base: BaseTx,
        validator: Validator,
        stake: Vec<TransferableOutput>,
        rewards_owner: OutputOwners,
        shares: u32,
        codec: Codec,
    ) -> Result<Self, TransactionError> {
        let mut stake = stake;
        sort_outputs(&mut stake, codec);
        let tx = AddValidatorTx {
            base,
            validator,
            stake,
            rewards_owner,
            shares,
        };
        tx.validate()?;
        Ok(tx)
    }

    fn validate(&self) -> Result<(), TransactionError> {
        self.validator.validate()?;
        check_stake(&self.stake, self.validator.weight)?;
        if self.shares > PERCENT_DENOMINATOR {
            return Err(TransactionError::InvalidTransaction(format!(
                "delegation shares {} exceed {PERCENT_DENOMINATOR}",
                self.shares
            )));
        }
        Ok(())
    }

    pub fn read_from(reader: &mut BinaryReader, codec: Codec) -> Result<Self, TransactionError> {
        let tx = AddValidatorTx {
            base: BaseTx::read_from(reader, codec)?,
            validator: Validator::read_from(reader)?,
            stake: read_output_list(reader, codec)?,
            rewards_owner: read_owner(reader, codec)?,
            shares: reader.read_u32()?,
        };
        tx.validate()?;
        Ok(tx)
    }

    pub fn write_to(&self, writer: &mut BinaryWriter, codec: Codec) -> Result<(), TransactionError> {
        self.validate()?;
        self.base.write_to(writer, codec)?;
        self.validator.write_to(writer);
        write_output_list(writer, &self.stake, codec)?;
        write_owner(writer, &self.rewards_owner, codec)?;
        writer.write_u32(self.shares);
        Ok(())
    }
}

/// Delegate stake to an existing validator.
///
/// Wire format: `base | validator | stake outputs | rewards owner`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddDelegatorTx {
    pub base: BaseTx,
    pub validator: Validator,
    pub stake: Vec<TransferableOutput>,
    pub rewards_owner: OutputOwners,
}

impl AddDelegatorTx {
    pub fn new(
        base: BaseTx,
        validator: Validator,
        stake: Vec<TransferableOutput>,
        rewards_owner: OutputOwners,
        codec: Codec,
    ) -> Result<Self, TransactionError> {
        let mut stake = stake;
        sort_outputs(&mut stake, codec);
        let tx = AddDelegatorTx {
            base,
            validator,
            stake,
            rewards_owner,
        };
        tx.validator.validate()?;
        check_stake(&tx.stake, tx.validator.weight)?;
        Ok(tx)
    }

    pub fn read_from(reader: &mut BinaryReader, codec: Codec) -> Result<Self, TransactionError> {
        let tx = AddDelegatorTx {
            base: BaseTx::read_from(reader, codec)?,
            validator: Validator::read_from(reader)?,
            stake: read_output_list(reader, codec)?,
            rewards_owner: read_owner(reader, codec)?,
        };
        tx.validator.validate()?;
        check_stake(&tx.stake, tx.validator.weight)?;
        Ok(tx)
    }

    pub fn write_to(&self, writer: &mut BinaryWriter, codec: Codec) -> Result<(), TransactionError> {
        self.base.write_to(writer, codec)?;
        self.validator.write_to(writer);
        write_output_list(writer, &self.stake, codec)?;
        write_owner(writer, &self.rewards_owner, codec)
    }
}

fn check_stake(stake: &[TransferableOutput], weight: u64) -> Result<(), TransactionError> {
    let total = stake
        .iter()
        .try_fold(0u64, |acc, o| acc.checked_add(o.amount()))
        .ok_or_else(|| TransactionError::InvalidTransaction("stake amount overflows".into()))?;
    if total != weight {
        return Err(TransactionError::InvalidTransaction(format!(
            "stake of {total} does not match validator weight {weight}"
        )));
    }
    Ok(())
}

/// Add a validator to a subnet.
///
/// Wire format: `base | validator | subnet_id | subnet auth`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddSubnetValidatorTx {
    pub base: BaseTx,
    pub validator: Validator,
    pub subnet_id: SubnetId,
    pub subnet_auth: SubnetAuth,
}

impl AddSubnetValidatorTx {
    pub fn read_from(reader: &mut BinaryReader, codec: Codec) -> Result<Self, TransactionError> {
        let tx = AddSubnetValidatorTx {
            base: BaseTx::read_from(reader, codec)?,
            validator: Validator::read_from(reader)?,
            subnet_id: reader.read_id()?,
            subnet_auth: SubnetAuth::read_from(reader, codec)?,
        };
        tx.validator.validate()?;
        Ok(tx)
    }

    pub fn write_to(&self, writer: &mut BinaryWriter, codec: Codec) -> Result<(), TransactionError> {
        self.validator.validate()?;
        self.base.write_to(writer, codec)?;
        self.validator.write_to(writer);
        writer.write_id(&self.subnet_id);
        self.subnet_auth.write_to(writer, codec)
    }
}

/// Create a subnet controlled by `owner`.
///
/// Wire format: `base | owner`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateSubnetTx {
    pub base: BaseTx,
    pub owner: OutputOwners,
}

impl CreateSubnetTx {
    pub fn read_from(reader: &mut BinaryReader, codec: Codec) -> Result<Self, TransactionError> {
        Ok(CreateSubnetTx {
            base: BaseTx::read_from(reader, codec)?,
            owner: read_owner(reader, codec)?,
        })
    }

    pub fn write_to(&self, writer: &mut BinaryWriter, codec: Codec) -> Result<(), TransactionError> {
        self.base.write_to(writer, codec)?;
        write_owner(writer, &self.owner, codec)
    }
}

/// Create a blockchain inside a subnet.
///
/// Wire format:
/// `base | subnet_id | chain_name (u16 string) | vm_id | u32 n | n × fx_id | u32 len | genesis | subnet auth`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateChainTx {
    pub base: BaseTx,
    pub subnet_id: SubnetId,
    pub chain_name: String,
    pub vm_id: Id,
    pub fx_ids: Vec<Id>,
    pub genesis: Vec<u8>,
    pub subnet_auth: SubnetAuth,
}

impl CreateChainTx {
    /// Create the body with feature-extension ids sorted.
    pub fn new(
        base: BaseTx,
        subnet_id: SubnetId,
        chain_name: String,
        vm_id: Id,
        fx_ids: Vec<Id>,
        genesis: Vec<u8>,
        subnet_auth: SubnetAuth,
    ) -> Result<Self, TransactionError> {
        let mut fx_ids = fx_ids;
        fx_ids.sort();
        let tx = CreateChainTx {
            base,
            subnet_id,
            chain_name,
            vm_id,
            fx_ids,
            genesis,
            subnet_auth,
        };
        tx.validate()?;
        Ok(tx)
    }

    fn validate(&self) -> Result<(), TransactionError> {
        if self.chain_name.is_empty() || self.chain_name.len() > MAX_CHAIN_NAME_LEN {
            return Err(TransactionError::InvalidTransaction(format!(
                "chain name must be 1..={MAX_CHAIN_NAME_LEN} bytes"
            )));
        }
        if !self
            .chain_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ')
        {
            return Err(TransactionError::InvalidTransaction(format!(
                "chain name {:?} has illegal characters",
                self.chain_name
            )));
        }
        if self.genesis.len() > MAX_GENESIS_LEN {
            return Err(TransactionError::InvalidTransaction(format!(
                "genesis of {} bytes exceeds {MAX_GENESIS_LEN}",
                self.genesis.len()
            )));
        }
        if self.fx_ids.windows(2).any(|w| w[0] >= w[1]) {
            return Err(TransactionError::InvalidTransaction(
                "fx ids must be sorted and unique".into(),
            ));
        }
        Ok(())
    }

    pub fn read_from(reader: &mut BinaryReader, codec: Codec) -> Result<Self, TransactionError> {
        let base = BaseTx::read_from(reader, codec)?;
        let subnet_id = reader.read_id()?;
        let chain_name = reader.read_short_string()?;
        let vm_id = reader.read_id()?;
        let n = reader.read_len()?;
        let mut fx_ids = Vec::with_capacity(n);
        for _ in 0..n {
            fx_ids.push(reader.read_id()?);
        }
        let genesis = reader.read_prefixed_bytes()?.to_vec();
        let subnet_auth = SubnetAuth::read_from(reader, codec)?;
        let tx = CreateChainTx {
            base,
            subnet_id,
            chain_name,
            vm_id,
            fx_ids,
            genesis,
            subnet_auth,
        };
        tx.validate()?;
        Ok(tx)
    }

    pub fn write_to(&self, writer: &mut BinaryWriter, codec: Codec) -> Result<(), TransactionError> {
        self.validate()?;
        self.base.write_to(writer, codec)?;
        writer.write_id(&self.subnet_id);
        writer.write_short_string(&self.chain_name)?;
        writer.write_id(&self.vm_id);
        writer.write_len(self.fx_ids.len())?;
        for id in &self.fx_ids {
            writer.write_id(id);
        }
        writer.write_prefixed_bytes(&self.genesis)?;
        self.subnet_auth.write_to(writer, codec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Output;

    fn base() -> BaseTx {
        BaseTx::new(1, Id::EMPTY, vec![], vec![], vec![], Codec::platform()).unwrap()
    }

    fn validator(weight: u64) -> Validator {
        Validator {
            node_id: NodeId::new([7; 20]),
            start_time: 100,
            end_time: 200,
            weight,
        }
    }

    fn round_trip<T, R, W>(value: &T, read: R, write: W) -> T
    where
        R: Fn(&mut BinaryReader, Codec) -> Result<T, TransactionError>,
        W: Fn(&T, &mut BinaryWriter, Codec) -> Result<(), TransactionError>,
    {
        let codec = Codec::platform();
        let mut w = BinaryWriter::new();
        write(value, &mut w, codec).unwrap();
        let bytes = w.into_bytes();
        let mut r = BinaryReader::new(&bytes);
        let back = read(&mut r, codec).unwrap();
        assert_eq!(r.remaining(), 0);
        back
    }

    #[test]
    fn test_add_validator_round_trip() {
        let owner = OutputOwners::single(Address::new([1; 20]));
        let tx = AddValidatorTx::new(
            base(),
            validator(2000),
            vec![TransferableOutput::new(Id::new([3; 32]), Output::transfer(2000, owner.clone()))],
            owner,
            20_000,
            Codec::platform(),
        )
        .unwrap();
        let back = round_trip(&tx, AddValidatorTx::read_from, AddValidatorTx::write_to);
        assert_eq!(back, tx);
    }

    #[test]
    fn test_add_validator_checks() {
        let owner = OutputOwners::single(Address::new([1; 20]));
        let stake = vec![TransferableOutput::new(Id::new([3; 32]), Output::transfer(2000, owner.clone()))];
        let codec = Codec::platform();
        assert!(AddValidatorTx::new(base(), validator(1999), stake.clone(), owner.clone(), 0, codec).is_err());
        assert!(
            AddValidatorTx::new(base(), validator(2000), stake.clone(), owner.clone(), PERCENT_DENOMINATOR + 1, codec)
                .is_err()
        );
        let mut backwards = validator(2000);
        backwards.end_time = backwards.start_time;
        assert!(AddValidatorTx::new(base(), backwards, stake, owner, 0, codec).is_err());
    }

    #[test]
    fn test_subnet_txs_round_trip() {
        let subnet = AddSubnetValidatorTx {
            base: base(),
            validator: validator(1),
            subnet_id: Id::new([5; 32]),
            subnet_auth: SubnetAuth::new(vec![0, 2]).unwrap(),
        };
        assert_eq!(
            round_trip(&subnet, AddSubnetValidatorTx::read_from, AddSubnetValidatorTx::write_to),
            subnet
        );

        let create = CreateSubnetTx {
            base: base(),
            owner: OutputOwners::new(vec![Address::new([1; 20]), Address::new([2; 20])], 1, 0).unwrap(),
        };
        assert_eq!(round_trip(&create, CreateSubnetTx::read_from, CreateSubnetTx::write_to), create);

        let chain = CreateChainTx::new(
            base(),
            Id::new([5; 32]),
            "my chain".into(),
            Id::new([6; 32]),
            vec![Id::new([9; 32]), Id::new([8; 32])],
            b"{}".to_vec(),
            SubnetAuth::new(vec![1]).unwrap(),
        )
        .unwrap();
        assert_eq!(chain.fx_ids[0], Id::new([8; 32]));
        assert_eq!(round_trip(&chain, CreateChainTx::read_from, CreateChainTx::write_to), chain);
    }

    #[test]
    fn test_chain_name_rules() {
        let make = |name: &str| {
            CreateChainTx::new(
                base(),
                Id::EMPTY,
                name.into(),
                Id::EMPTY,
                vec![],
                vec![],
                SubnetAuth::default(),
            )
        };
        assert!(make("").is_err());
        assert!(make("bad-name").is_err());
        assert!(make(&"a".repeat(MAX_CHAIN_NAME_LEN + 1)).is_err());
        assert!(make("Good Name 1").is_ok());
    }

    #[test]
    fn test_subnet_auth_rejects_unsorted() {
        assert!(SubnetAuth::new(vec![2, 1]).is_err());
    }
}
