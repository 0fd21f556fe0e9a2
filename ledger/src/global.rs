//! Protocol globals

use crate::config::LedgerConfig;
use avm_emu_arc4::Address;
use serde::{Deserialize, Serialize};

/// Values returned by the `global` opcode family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalData {
    pub min_txn_fee: u64,
    pub min_balance: u64,
    pub max_txn_life: u64,
    pub zero_address: Address,
    pub round: u64,
    pub latest_timestamp: u64,
    pub genesis_hash: [u8; 32],
    /// Application that issued the currently running inner call, 0 at top level
    pub caller_application_id: u64,
    pub asset_create_min_balance: u64,
    pub asset_opt_in_min_balance: u64,
}

impl GlobalData {
    pub fn from_config(config: &LedgerConfig) -> Self {
        Self {
            min_txn_fee: config.min_txn_fee,
            min_balance: config.min_balance,
            max_txn_life: 1000,
            zero_address: Address::ZERO,
            round: config.round,
            latest_timestamp: config.genesis_timestamp,
            genesis_hash: [0u8; 32],
            caller_application_id: 0,
            asset_create_min_balance: config.min_balance,
            asset_opt_in_min_balance: config.min_balance,
        }
    }
}
