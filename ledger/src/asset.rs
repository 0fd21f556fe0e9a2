//! Asset records

use avm_emu_arc4::Address;
use serde::{Deserialize, Serialize};

/// Parameters an asset is created with
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssetParams {
    pub total: u64,
    pub decimals: u32,
    pub default_frozen: bool,
    pub unit_name: Vec<u8>,
    pub name: Vec<u8>,
    pub url: Vec<u8>,
    pub metadata_hash: [u8; 32],
    pub manager: Address,
    pub reserve: Address,
    pub freeze: Address,
    pub clawback: Address,
}

/// Asset record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetData {
    pub id: u64,
    pub creator: Address,
    pub params: AssetParams,
}

impl AssetData {
    pub fn new(id: u64, creator: Address, params: AssetParams) -> Self {
        Self { id, creator, params }
    }
}
