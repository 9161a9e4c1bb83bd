//! Per-network constants: network id, address prefix, and for each chain
//! its alias, blockchain id, fee asset, fee schedule and codec version.
//!
//! Settings load from JSON or TOML. Ids are cb58 strings:
//!
//! ```toml
//! network_id = 1
//! hrp = "camino"
//!
//! [exchange]
//! alias = "X"
//! blockchain_id = "..."
//! fee_asset_id = "..."
//! codec_version = 0
//! fees = { default = { type = "fixed", amount = 1000000 } }
//! ```

use std::path::Path;

use chainkit_primitives::hash::sha256;
use chainkit_primitives::ids::{AssetId, BlockchainId};
use chainkit_primitives::Id;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::{ChainKind, Codec, CODEC_V0};
use crate::fee::{FeeRule, FeeSchedule};
use crate::tx::TxKind;
use crate::TransactionError;

/// Network id of the local development profile.
pub const LOCAL_NETWORK_ID: u32 = 12345;

/// Address prefix of the local development profile.
pub const LOCAL_HRP: &str = "local";

/// Constants for one chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSettings {
    /// Chain letter used in formatted addresses (`X`, `P`, `C`).
    pub alias: String,
    pub blockchain_id: BlockchainId,
    pub fee_asset_id: AssetId,
    pub fees: FeeSchedule,
    #[serde(default)]
    pub codec_version: u16,
}

impl ChainSettings {
    pub fn fee_rule(&self, kind: TxKind) -> FeeRule {
        self.fees.rule(kind)
    }
}

/// Constants for one network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSettings {
    pub network_id: u32,
    /// Human-readable bech32 prefix.
    pub hrp: String,
    pub exchange: ChainSettings,
    pub platform: ChainSettings,
    pub contract: ChainSettings,
}

impl NetworkSettings {
    /// Built-in profile for a local development network.
    pub fn local() -> Self {
        let asset = Id::new(sha256(b"local/asset"));
        let chain = |name: &[u8], alias: &str, fees: FeeSchedule| ChainSettings {
            alias: alias.to_string(),
            blockchain_id: Id::new(sha256(name)),
            fee_asset_id: asset,
            fees,
            codec_version: CODEC_V0,
        };
        NetworkSettings {
            network_id: LOCAL_NETWORK_ID,
            hrp: LOCAL_HRP.to_string(),
            exchange: chain(
                b"local/exchange",
                "X",
                FeeSchedule::fixed(1_000_000).with_override(TxKind::CreateAsset, FeeRule::Fixed { amount: 10_000_000 }),
            ),
            platform: chain(
                b"local/platform",
                "P",
                FeeSchedule::fixed(1_000_000)
                    .with_override(TxKind::AddValidator, FeeRule::Fixed { amount: 0 })
                    .with_override(TxKind::AddDelegator, FeeRule::Fixed { amount: 0 })
                    .with_override(TxKind::CreateSubnet, FeeRule::Fixed { amount: 100_000_000 })
                    .with_override(TxKind::CreateChain, FeeRule::Fixed { amount: 100_000_000 }),
            ),
            contract: chain(
                b"local/contract",
                "C",
                FeeSchedule {
                    default: FeeRule::SizeBased { base: 0, per_byte: 1_000 },
                    overrides: Default::default(),
                },
            ),
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, TransactionError> {
        let settings: NetworkSettings = serde_json::from_str(s)
            .map_err(|e| TransactionError::Config(format!("failed to parse JSON settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, TransactionError> {
        let settings: NetworkSettings = toml::from_str(s)
            .map_err(|e| TransactionError::Config(format!("failed to parse TOML settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from a `.json` or `.toml` file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, TransactionError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| TransactionError::Config(format!("failed to read {}: {e}", path.display())))?;
        debug!(path = %path.display(), "loading network settings");
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            Some("toml") => Self::from_toml_str(&contents),
            _ => Err(TransactionError::Config(format!(
                "unsupported settings file {}",
                path.display()
            ))),
        }
    }

    pub fn to_json_string(&self) -> Result<String, TransactionError> {
        serde_json::to_string_pretty(self).map_err(|e| TransactionError::Config(e.to_string()))
    }

    pub fn chain(&self, kind: ChainKind) -> &ChainSettings {
        match kind {
            ChainKind::Exchange => &self.exchange,
            ChainKind::Platform => &self.platform,
            ChainKind::Contract => &self.contract,
        }
    }

    /// The codec configured for `kind`.
    pub fn codec(&self, kind: ChainKind) -> Result<Codec, TransactionError> {
        Codec::new(kind, self.chain(kind).codec_version)
    }

    pub fn validate(&self) -> Result<(), TransactionError> {
        if self.hrp.is_empty() {
            return Err(TransactionError::Config("hrp is empty".into()));
        }
        let mut aliases = Vec::new();
        for kind in [ChainKind::Exchange, ChainKind::Platform, ChainKind::Contract] {
            let chain = self.chain(kind);
            if chain.alias.is_empty() || chain.alias.contains('-') {
                return Err(TransactionError::Config(format!(
                    "invalid alias {:?} for {kind:?} chain",
                    chain.alias
                )));
            }
            if aliases.contains(&chain.alias) {
                return Err(TransactionError::Config(format!("duplicate chain alias {}", chain.alias)));
            }
            aliases.push(chain.alias.clone());
            self.codec(kind)?;
        }
        Ok(())
    }
}
