//! Application records

use crate::boxes::BoxStore;
use crate::errors::{LedgerError, LedgerResult};
use crate::state::StateSlot;
use avm_emu_arc4::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of uint64 and byte-slice keys an application may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StateSchema {
    pub num_uint: u64,
    pub num_bytes: u64,
}

/// Parameters an application is created with
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplicationParams {
    pub approval_program: Vec<u8>,
    pub clear_state_program: Vec<u8>,
    pub global_schema: StateSchema,
    pub local_schema: StateSchema,
    pub extra_program_pages: u64,
}

/// Per-application bundle of programs, state, boxes and logs
#[derive(Debug, Clone)]
pub struct ApplicationData {
    pub id: u64,
    pub address: Address,
    pub creator: Address,
    pub params: ApplicationParams,
    pub(crate) global_state: BTreeMap<Vec<u8>, StateSlot>,
    pub(crate) local_state: BTreeMap<Address, BTreeMap<Vec<u8>, StateSlot>>,
    pub boxes: BoxStore,
    /// Logs emitted by every call to this application, oldest first
    pub logs: Vec<Vec<u8>>,
    /// Set while the creating call is executing
    pub is_creating: bool,
}

impl ApplicationData {
    pub fn new(id: u64, creator: Address, params: ApplicationParams) -> Self {
        Self {
            id,
            address: Address::for_application(id),
            creator,
            params,
            global_state: BTreeMap::new(),
            local_state: BTreeMap::new(),
            boxes: BoxStore::new(),
            logs: Vec::new(),
            is_creating: false,
        }
    }

    pub fn global_slot(&self, key: &[u8]) -> Option<&StateSlot> {
        self.global_state.get(key)
    }

    pub fn global_keys(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.global_state.keys().map(Vec::as_slice)
    }

    pub fn local_slot(&self, account: &Address, key: &[u8]) -> Option<&StateSlot> {
        self.local_state.get(account).and_then(|slots| slots.get(key))
    }

    pub(crate) fn local_slots_mut(&mut self, account: &Address) -> LedgerResult<&mut BTreeMap<Vec<u8>, StateSlot>> {
        let app_id = self.id;
        self.local_state.get_mut(account).ok_or(LedgerError::NotOptedIn {
            app_id,
            account: *account,
        })
    }
}
