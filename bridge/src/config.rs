//! Bridge configuration.

use serde::{Deserialize, Serialize};
use tessera_primitives::{CoinError, CoinInfo, GasProfile};

/// Invalid or unparsable bridge configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid coin: {0}")]
    Coin(#[from] CoinError),
}

/// Configuration for a native action bridge.
///
/// Controls the storage gas tables charged while a native action runs and the
/// ledger coin that backs VM balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Gas table for persistent key-value storage.
    pub kv_gas: GasProfile,

    /// Gas table for transient storage.
    pub transient_gas: GasProfile,

    /// Denomination and precision of the VM coin.
    pub coin: CoinInfo,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            kv_gas: GasProfile::kv(),
            transient_gas: GasProfile::transient(),
            coin: CoinInfo::default(),
        }
    }
}

impl BridgeConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.coin.validate()?;
        Ok(())
    }
}
