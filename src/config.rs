use crate::domain::catalog::Catalog;
use crate::domain::session::UserId;
use crate::error::Result;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Runtime settings for the shop.
///
/// Every field has a default, so a config file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    /// The single identity allowed to run operator actions.
    pub operator_id: UserId,
    pub max_quantity: u32,
    /// Minimum spacing between rate-limited buyer actions.
    pub cooldown_secs: u64,
    pub oracle_timeout_ms: u64,
    pub asset: String,
    /// Shown to buyers who settle by manual wallet transfer.
    pub wallet_address: String,
    pub catalog: Catalog,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            operator_id: 0,
            max_quantity: 50,
            cooldown_secs: 3,
            oracle_timeout_ms: 10_000,
            asset: "USDT".to_string(),
            wallet_address: "TBFwX63PXBiBiMP5JarQWuNMPRawS8gyHj".to_string(),
            catalog: Catalog::default(),
        }
    }
}

impl ShopConfig {
    /// Reads a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }
}
