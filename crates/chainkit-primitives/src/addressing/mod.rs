//! Human-facing address format: `<chain-alias>-<bech32(hrp, address)>`.
//!
//! The human-readable part (`hrp`) and the chain alias are network
//! configuration, never constants. Formatting and parsing are pure.

use ::bech32::{FromBase32, ToBase32, Variant};

use crate::ids::Address;
use crate::PrimitivesError;

/// Separator between the chain alias and the bech32 body.
pub const ALIAS_SEPARATOR: char = '-';

/// A parsed `<alias>-<bech32>` address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedAddress {
    /// Chain alias, e.g. `X`, `P` or `C`.
    pub chain_alias: String,
    /// Network human-readable part.
    pub hrp: String,
    /// Decoded 20-byte address.
    pub address: Address,
}

/// Encode raw bytes as bech32 under `hrp`.
pub fn encode_bech32(hrp: &str, data: &[u8]) -> Result<String, PrimitivesError> {
    ::bech32::encode(hrp, data.to_base32(), Variant::Bech32)
        .map_err(|e| PrimitivesError::InvalidBech32(e.to_string()))
}

/// Decode a bech32 string into its hrp and raw bytes.
pub fn decode_bech32(s: &str) -> Result<(String, Vec<u8>), PrimitivesError> {
    let (hrp, data, variant) =
        ::bech32::decode(s).map_err(|e| PrimitivesError::InvalidBech32(e.to_string()))?;
    if variant != Variant::Bech32 {
        return Err(PrimitivesError::InvalidBech32(
            "expected bech32, found bech32m".to_string(),
        ));
    }
    let bytes = Vec::<u8>::from_base32(&data)
        .map_err(|e| PrimitivesError::InvalidBech32(e.to_string()))?;
    Ok((hrp, bytes))
}

/// Format `address` as `<chain_alias>-<bech32(hrp, address)>`.
pub fn format_address(
    chain_alias: &str,
    hrp: &str,
    address: &Address,
) -> Result<String, PrimitivesError> {
    if chain_alias.is_empty() || chain_alias.contains(ALIAS_SEPARATOR) {
        return Err(PrimitivesError::InvalidAddress(format!(
            "invalid chain alias {chain_alias:?}"
        )));
    }
    let body = encode_bech32(hrp, address.as_bytes())?;
    Ok(format!("{chain_alias}{ALIAS_SEPARATOR}{body}"))
}

/// Parse an `<alias>-<bech32>` address.
///
/// The split happens at the first separator; the bech32 body must decode to
/// exactly 20 bytes.
pub fn parse_address(s: &str) -> Result<ParsedAddress, PrimitivesError> {
    let (alias, body) = s.split_once(ALIAS_SEPARATOR).ok_or_else(|| {
        PrimitivesError::InvalidAddress(format!("missing chain alias in {s:?}"))
    })?;
    if alias.is_empty() {
        return Err(PrimitivesError::InvalidAddress(format!(
            "empty chain alias in {s:?}"
        )));
    }
    let (hrp, bytes) = decode_bech32(body)?;
    let address = Address::from_slice(&bytes)?;
    Ok(ParsedAddress {
        chain_alias: alias.to_string(),
        hrp,
        address,
    })
}

/// Parse an address and require a specific chain alias and hrp.
pub fn parse_address_for(
    s: &str,
    chain_alias: &str,
    hrp: &str,
) -> Result<Address, PrimitivesError> {
    let parsed = parse_address(s)?;
    if parsed.chain_alias != chain_alias {
        return Err(PrimitivesError::InvalidAddress(format!(
            "expected chain alias {chain_alias}, found {}",
            parsed.chain_alias
        )));
    }
    if parsed.hrp != hrp {
        return Err(PrimitivesError::InvalidAddress(format!(
            "expected hrp {hrp}, found {}",
            parsed.hrp
        )));
    }
    Ok(parsed.address)
}
