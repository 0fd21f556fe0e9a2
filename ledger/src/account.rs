//! Account records

use avm_emu_arc4::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Balance of one asset held by an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssetHolding {
    pub balance: u64,
    pub frozen: bool,
}

/// Account record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountData {
    pub address: Address,
    /// Balance in microAlgos
    pub balance: u64,
    pub min_balance: u64,
    pub auth_address: Address,
    pub total_apps_created: u64,
    pub total_apps_opted_in: u64,
    pub total_assets_created: u64,
    pub total_assets: u64,
    pub total_boxes: u64,
    pub total_box_bytes: u64,
    pub total_num_uint: u64,
    pub total_num_byte_slice: u64,
    pub total_extra_app_pages: u64,
    pub(crate) holdings: BTreeMap<u64, AssetHolding>,
    pub(crate) opted_apps: BTreeSet<u64>,
}

impl AccountData {
    pub fn new(address: Address, balance: u64, min_balance: u64) -> Self {
        Self {
            address,
            balance,
            min_balance,
            auth_address: Address::ZERO,
            total_apps_created: 0,
            total_apps_opted_in: 0,
            total_assets_created: 0,
            total_assets: 0,
            total_boxes: 0,
            total_box_bytes: 0,
            total_num_uint: 0,
            total_num_byte_slice: 0,
            total_extra_app_pages: 0,
            holdings: BTreeMap::new(),
            opted_apps: BTreeSet::new(),
        }
    }

    pub fn is_opted_in(&self, app_id: u64) -> bool {
        self.opted_apps.contains(&app_id)
    }

    pub fn holding(&self, asset_id: u64) -> Option<&AssetHolding> {
        self.holdings.get(&asset_id)
    }

    pub fn opted_apps(&self) -> impl Iterator<Item = u64> + '_ {
        self.opted_apps.iter().copied()
    }

    pub fn assets(&self) -> impl Iterator<Item = (u64, &AssetHolding)> + '_ {
        self.holdings.iter().map(|(id, h)| (*id, h))
    }
}
