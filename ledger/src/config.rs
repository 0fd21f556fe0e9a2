//! Ledger seed configuration

use serde::{Deserialize, Serialize};

/// Values the ledger starts from after construction or reset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// First application id handed out
    pub initial_app_id: u64,
    /// First asset id handed out
    pub initial_asset_id: u64,
    pub min_txn_fee: u64,
    pub min_balance: u64,
    /// Balance given to lazily created accounts
    pub default_account_balance: u64,
    pub genesis_timestamp: u64,
    pub round: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            initial_app_id: 1001,
            initial_asset_id: 1001,
            min_txn_fee: 1000,
            min_balance: 100_000,
            default_account_balance: 0,
            genesis_timestamp: 0,
            round: 1,
        }
    }
}
