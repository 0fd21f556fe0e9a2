//! The ledger: accounts, applications, assets and blocks
//!
//! Records are owned exclusively by [`Ledger`]. Accounts are created lazily
//! on first reference; applications and assets get sequential ids seeded
//! from [`LedgerConfig`]. Nothing is removed until [`Ledger::reset`].

use crate::account::{AccountData, AssetHolding};
use crate::application::{ApplicationData, ApplicationParams};
use crate::asset::{AssetData, AssetParams};
use crate::block::BlockData;
use crate::boxes::BoxStore;
use crate::config::LedgerConfig;
use crate::errors::{LedgerError, LedgerResult};
use crate::global::GlobalData;
use crate::state::StateSlot;
use crate::value::StackValue;
use avm_emu_arc4::Address;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Authoritative chain state for one emulator instance
#[derive(Debug, Clone)]
pub struct Ledger {
    config: LedgerConfig,
    accounts: BTreeMap<Address, AccountData>,
    applications: BTreeMap<u64, ApplicationData>,
    assets: BTreeMap<u64, AssetData>,
    blocks: BTreeMap<u64, BlockData>,
    app_by_address: HashMap<Address, u64>,
    global: GlobalData,
    next_app_id: u64,
    next_asset_id: u64,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            global: GlobalData::from_config(&config),
            next_app_id: config.initial_app_id,
            next_asset_id: config.initial_asset_id,
            config,
            accounts: BTreeMap::new(),
            applications: BTreeMap::new(),
            assets: BTreeMap::new(),
            blocks: BTreeMap::new(),
            app_by_address: HashMap::new(),
        }
    }

    /// Drop every record and restart id allocation
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn global(&self) -> &GlobalData {
        &self.global
    }

    pub fn global_mut(&mut self) -> &mut GlobalData {
        &mut self.global
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    pub fn account(&self, address: &Address) -> LedgerResult<&AccountData> {
        self.accounts
            .get(address)
            .ok_or(LedgerError::UnknownAccount(*address))
    }

    pub fn account_mut(&mut self, address: &Address) -> LedgerResult<&mut AccountData> {
        self.accounts
            .get_mut(address)
            .ok_or(LedgerError::UnknownAccount(*address))
    }

    /// Account record, creating it with the default balance if missing
    pub fn ensure_account(&mut self, address: &Address) -> &mut AccountData {
        let balance = self.config.default_account_balance;
        let min_balance = self.config.min_balance;
        self.accounts.entry(*address).or_insert_with(|| {
            debug!(%address, "Account created");
            AccountData::new(*address, balance, min_balance)
        })
    }

    pub fn has_account(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    // ------------------------------------------------------------------
    // Applications
    // ------------------------------------------------------------------

    /// Register a new application and return its id
    pub fn create_application(&mut self, creator: &Address, params: ApplicationParams) -> u64 {
        let id = self.next_app_id;
        self.next_app_id += 1;

        let creator_account = self.ensure_account(creator);
        creator_account.total_apps_created += 1;
        creator_account.total_extra_app_pages += params.extra_program_pages;

        let app = ApplicationData::new(id, *creator, params);
        self.app_by_address.insert(app.address, id);
        self.ensure_account(&app.address);
        self.applications.insert(id, app);

        debug!(app_id = id, %creator, "Application created");
        id
    }

    pub fn application(&self, app_id: u64) -> LedgerResult<&ApplicationData> {
        self.applications
            .get(&app_id)
            .ok_or(LedgerError::UnknownApplication(app_id))
    }

    pub fn application_mut(&mut self, app_id: u64) -> LedgerResult<&mut ApplicationData> {
        self.applications
            .get_mut(&app_id)
            .ok_or(LedgerError::UnknownApplication(app_id))
    }

    pub fn has_application(&self, app_id: u64) -> bool {
        self.applications.contains_key(&app_id)
    }

    /// Reverse lookup from an application's escrow address
    pub fn application_by_address(&self, address: &Address) -> Option<u64> {
        self.app_by_address.get(address).copied()
    }

    pub fn boxes(&self, app_id: u64) -> LedgerResult<&BoxStore> {
        Ok(&self.application(app_id)?.boxes)
    }

    pub fn boxes_mut(&mut self, app_id: u64) -> LedgerResult<&mut BoxStore> {
        Ok(&mut self.application_mut(app_id)?.boxes)
    }

    pub fn append_app_log(&mut self, app_id: u64, log: Vec<u8>) -> LedgerResult<()> {
        self.application_mut(app_id)?.logs.push(log);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Global state
    // ------------------------------------------------------------------

    /// Value of a global key and whether it exists. Missing keys read as
    /// uint64 zero.
    pub fn global_state(&self, app_id: u64, key: &[u8]) -> LedgerResult<(StackValue, bool)> {
        let app = self.application(app_id)?;
        Ok(slot_value(app.global_slot(key)))
    }

    /// Create, overwrite (`Some`) or delete (`None`) a global key
    pub fn set_global_state(&mut self, app_id: u64, key: &[u8], value: Option<StackValue>) -> LedgerResult<()> {
        let app = self.application_mut(app_id)?;
        write_slot(&mut app.global_state, key, value);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Local state
    // ------------------------------------------------------------------

    pub fn local_state(&self, app_id: u64, account: &Address, key: &[u8]) -> LedgerResult<(StackValue, bool)> {
        let app = self.application(app_id)?;
        if !app.local_state.contains_key(account) {
            return Err(LedgerError::NotOptedIn {
                app_id,
                account: *account,
            });
        }
        Ok(slot_value(app.local_slot(account, key)))
    }

    pub fn set_local_state(
        &mut self,
        app_id: u64,
        account: &Address,
        key: &[u8],
        value: Option<StackValue>,
    ) -> LedgerResult<()> {
        let slots = self.application_mut(app_id)?.local_slots_mut(account)?;
        write_slot(slots, key, value);
        Ok(())
    }

    /// Opt an account in to an application; no-op if already opted in
    pub fn opt_in_application(&mut self, app_id: u64, account: &Address) -> LedgerResult<()> {
        let app = self.application_mut(app_id)?;
        if app.local_state.contains_key(account) {
            return Ok(());
        }
        app.local_state.insert(*account, BTreeMap::new());

        let data = self.ensure_account(account);
        data.opted_apps.insert(app_id);
        data.total_apps_opted_in += 1;
        debug!(app_id, %account, "Opted in to application");
        Ok(())
    }

    /// Opt out, dropping the account's local state
    pub fn close_out_application(&mut self, app_id: u64, account: &Address) -> LedgerResult<()> {
        let app = self.application_mut(app_id)?;
        if app.local_state.remove(account).is_none() {
            return Err(LedgerError::NotOptedIn {
                app_id,
                account: *account,
            });
        }
        let data = self.account_mut(account)?;
        data.opted_apps.remove(&app_id);
        data.total_apps_opted_in = data.total_apps_opted_in.saturating_sub(1);
        Ok(())
    }

    pub fn is_opted_in(&self, app_id: u64, account: &Address) -> LedgerResult<bool> {
        Ok(self.application(app_id)?.local_state.contains_key(account))
    }

    // ------------------------------------------------------------------
    // Assets
    // ------------------------------------------------------------------

    /// Register a new asset; the creator holds the full supply
    pub fn create_asset(&mut self, creator: &Address, params: AssetParams) -> u64 {
        let id = self.next_asset_id;
        self.next_asset_id += 1;

        let total = params.total;
        let frozen = params.default_frozen;
        self.assets.insert(id, AssetData::new(id, *creator, params));

        let account = self.ensure_account(creator);
        account.total_assets_created += 1;
        account.total_assets += 1;
        account.holdings.insert(id, AssetHolding { balance: total, frozen });

        debug!(asset_id = id, %creator, "Asset created");
        id
    }

    pub fn asset(&self, asset_id: u64) -> LedgerResult<&AssetData> {
        self.assets.get(&asset_id).ok_or(LedgerError::UnknownAsset(asset_id))
    }

    pub fn asset_mut(&mut self, asset_id: u64) -> LedgerResult<&mut AssetData> {
        self.assets
            .get_mut(&asset_id)
            .ok_or(LedgerError::UnknownAsset(asset_id))
    }

    /// Opt an account in to an asset with a zero balance
    pub fn opt_in_asset(&mut self, asset_id: u64, account: &Address) -> LedgerResult<()> {
        let frozen = self.asset(asset_id)?.params.default_frozen;
        let data = self.ensure_account(account);
        if !data.holdings.contains_key(&asset_id) {
            data.holdings.insert(asset_id, AssetHolding { balance: 0, frozen });
            data.total_assets += 1;
        }
        Ok(())
    }

    pub fn asset_holding(&self, asset_id: u64, account: &Address) -> LedgerResult<AssetHolding> {
        self.asset(asset_id)?;
        self.account(account)?
            .holding(asset_id)
            .copied()
            .ok_or(LedgerError::NotOptedInAsset {
                asset_id,
                account: *account,
            })
    }

    pub fn set_asset_holding(&mut self, asset_id: u64, account: &Address, holding: AssetHolding) -> LedgerResult<()> {
        self.asset(asset_id)?;
        let data = self.account_mut(account)?;
        match data.holdings.get_mut(&asset_id) {
            Some(existing) => {
                *existing = holding;
                Ok(())
            }
            None => Err(LedgerError::NotOptedInAsset {
                asset_id,
                account: *account,
            }),
        }
    }

    // ------------------------------------------------------------------
    // Blocks
    // ------------------------------------------------------------------

    pub fn set_block(&mut self, round: u64, seed: u64, timestamp: u64) {
        self.blocks.insert(round, BlockData { seed, timestamp });
    }

    pub fn block(&self, round: u64) -> LedgerResult<&BlockData> {
        self.blocks.get(&round).ok_or(LedgerError::UnknownBlock(round))
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

fn slot_value(slot: Option<&StateSlot>) -> (StackValue, bool) {
    match slot.and_then(StateSlot::maybe) {
        Some(value) => (value.clone(), true),
        None => (StackValue::Uint64(0), false),
    }
}

fn write_slot(slots: &mut BTreeMap<Vec<u8>, StateSlot>, key: &[u8], value: Option<StackValue>) {
    match value {
        Some(value) => slots
            .entry(key.to_vec())
            .or_insert_with(|| StateSlot::new(key))
            .set(value),
        None => {
            if let Some(slot) = slots.get_mut(key) {
                slot.delete();
                if !slot.has_value() {
                    slots.remove(key);
                }
            }
        }
    }
}
