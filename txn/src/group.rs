//! Transaction groups
//!
//! A [`TransactionGroup`] is an ordered, bounded sequence of transactions
//! with one active transaction, per-transaction scratch space, the inner
//! transaction groups submitted so far and at most one inner group under
//! composition.

use crate::errors::{TxnError, TxnResult};
use crate::itxn::{ItxnField, ItxnParams};
use crate::transaction::{ApplicationCallFields, OnCompletion, Transaction};
use avm_emu_arc4::constants::{MAX_GROUP_SIZE, SCRATCH_SLOTS};
use avm_emu_ledger::StackValue;

/// Deferred application call: the call plus any transaction arguments that
/// precede it in the group
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredAppCall {
    txns: Vec<Transaction>,
}

impl DeferredAppCall {
    /// `txns` must end with the application call
    pub fn new(txns: Vec<Transaction>) -> TxnResult<Self> {
        match txns.last() {
            Some(last) if last.is_app_call() => Ok(Self { txns }),
            _ => Err(TxnError::internal(
                "deferred call must end with an application call transaction",
            )),
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.txns
    }

    pub fn app_call(&self) -> &Transaction {
        // non-empty, checked on construction
        &self.txns[self.txns.len() - 1]
    }
}

/// Element accepted when forming a group
#[derive(Debug, Clone, PartialEq)]
pub enum GroupItem {
    Txn(Transaction),
    Deferred(DeferredAppCall),
}

impl From<Transaction> for GroupItem {
    fn from(txn: Transaction) -> Self {
        GroupItem::Txn(txn)
    }
}

impl From<DeferredAppCall> for GroupItem {
    fn from(call: DeferredAppCall) -> Self {
        GroupItem::Deferred(call)
    }
}

/// 256 stack values, all uint64 zero initially
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchSpace(Vec<StackValue>);

impl Default for ScratchSpace {
    fn default() -> Self {
        Self(vec![StackValue::Uint64(0); SCRATCH_SLOTS])
    }
}

impl ScratchSpace {
    pub fn load(&self, slot: usize) -> TxnResult<&StackValue> {
        self.0.get(slot).ok_or(TxnError::ScratchSlot(slot))
    }

    pub fn store(&mut self, slot: usize, value: StackValue) -> TxnResult<()> {
        let entry = self.0.get_mut(slot).ok_or(TxnError::ScratchSlot(slot))?;
        *entry = value;
        Ok(())
    }
}

/// An ordered group of at most 16 transactions
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionGroup {
    txns: Vec<Transaction>,
    active_index: usize,
    scratch: Vec<ScratchSpace>,
    itxn_groups: Vec<Vec<Transaction>>,
    compose: Option<Vec<ItxnParams>>,
}

impl TransactionGroup {
    /// Flatten `items`, assign group positions and pick the active
    /// transaction (the last one unless `active_index` is given).
    pub fn new(items: Vec<GroupItem>, active_index: Option<usize>) -> TxnResult<Self> {
        let mut txns = Vec::with_capacity(items.len());
        for item in items {
            match item {
                GroupItem::Txn(txn) => txns.push(txn),
                GroupItem::Deferred(call) => txns.extend(call.txns),
            }
        }
        if txns.len() > MAX_GROUP_SIZE {
            return Err(TxnError::GroupTooLarge(txns.len()));
        }

        let active_index = match active_index {
            Some(i) if i >= txns.len() => {
                return Err(TxnError::internal(format!(
                    "active index {} out of range for group of {}",
                    i,
                    txns.len()
                )))
            }
            Some(i) => i,
            None => txns.len().saturating_sub(1),
        };

        for (i, txn) in txns.iter_mut().enumerate() {
            txn.header.group_index = i;
        }

        Ok(Self {
            scratch: vec![ScratchSpace::default(); txns.len()],
            txns,
            active_index,
            itxn_groups: Vec::new(),
            compose: None,
        })
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.txns
    }

    pub(crate) fn transactions_mut(&mut self) -> &mut [Transaction] {
        &mut self.txns
    }

    pub fn len(&self) -> usize {
        self.txns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txns.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn set_active_index(&mut self, index: usize) -> TxnResult<()> {
        if index >= self.txns.len() {
            return Err(TxnError::internal(format!(
                "active index {} out of range for group of {}",
                index,
                self.txns.len()
            )));
        }
        self.active_index = index;
        Ok(())
    }

    pub fn txn(&self, index: usize) -> TxnResult<&Transaction> {
        self.txns
            .get(index)
            .ok_or_else(|| TxnError::internal(format!("no transaction at group index {}", index)))
    }

    pub fn active_txn(&self) -> TxnResult<&Transaction> {
        self.txn(self.active_index)
    }

    pub fn active_txn_mut(&mut self) -> TxnResult<&mut Transaction> {
        let index = self.active_index;
        self.txns
            .get_mut(index)
            .ok_or_else(|| TxnError::internal("transaction group is empty"))
    }

    /// Application call fields of the active transaction
    pub fn active_app_call(&self) -> TxnResult<&ApplicationCallFields> {
        self.active_txn()?.app_call_fields()
    }

    pub fn active_app_id(&self) -> TxnResult<u64> {
        Ok(self.active_app_call()?.app_id)
    }

    /// Append a log to the active transaction, which must be an app call
    pub fn append_log(&mut self, log: &[u8]) -> TxnResult<()> {
        let txn = self.active_txn_mut()?;
        if !txn.is_app_call() {
            return Err(TxnError::internal(
                "logs can only be added to application call transactions",
            ));
        }
        txn.app_call_fields_mut()?.append_log(log)
    }

    // ------------------------------------------------------------------
    // Scratch space
    // ------------------------------------------------------------------

    pub fn load_scratch(&self, txn_index: usize, slot: usize) -> TxnResult<&StackValue> {
        self.scratch_space(txn_index)?.load(slot)
    }

    pub fn load_scratch_uint64(&self, txn_index: usize, slot: usize) -> TxnResult<u64> {
        Ok(self.load_scratch(txn_index, slot)?.as_uint64()?)
    }

    pub fn load_scratch_bytes(&self, txn_index: usize, slot: usize) -> TxnResult<Vec<u8>> {
        Ok(self.load_scratch(txn_index, slot)?.as_bytes()?.to_vec())
    }

    /// Store into the active transaction's scratch space
    pub fn store_scratch(&mut self, slot: usize, value: StackValue) -> TxnResult<()> {
        let index = self.active_index;
        self.scratch
            .get_mut(index)
            .ok_or_else(|| TxnError::internal("transaction group is empty"))?
            .store(slot, value)
    }

    fn scratch_space(&self, txn_index: usize) -> TxnResult<&ScratchSpace> {
        self.scratch
            .get(txn_index)
            .ok_or_else(|| TxnError::internal(format!("no transaction at group index {}", txn_index)))
    }

    // ------------------------------------------------------------------
    // Inner transaction composition
    // ------------------------------------------------------------------

    /// `itxn_begin`: open the compose buffer with one payment field set
    pub fn begin_itxn_group(&mut self) -> TxnResult<()> {
        if self.compose.is_some() {
            return Err(TxnError::internal(
                "itxn begin: an inner transaction group is already being composed",
            ));
        }
        let call = self.active_txn()?.app_call_fields().map_err(|_| {
            TxnError::internal("itxn begin: inner transactions can only be issued by application calls")
        })?;
        if call.on_completion == OnCompletion::ClearState {
            return Err(TxnError::internal(
                "itxn begin: inner transactions are not allowed in clear state programs",
            ));
        }
        self.compose = Some(vec![ItxnParams::default()]);
        Ok(())
    }

    /// `itxn_next`: start another field set in the open buffer
    pub fn next_itxn(&mut self) -> TxnResult<()> {
        match self.compose.as_mut() {
            Some(buffer) => {
                buffer.push(ItxnParams::default());
                Ok(())
            }
            None => Err(TxnError::internal("itxn next without itxn begin")),
        }
    }

    /// `itxn_field`: set a field on the most recent field set
    pub fn set_itxn_field(&mut self, field: ItxnField) -> TxnResult<()> {
        self.compose
            .as_mut()
            .and_then(|buffer| buffer.last_mut())
            .ok_or_else(|| TxnError::internal("itxn field without itxn begin"))?
            .set(field)
    }

    /// Replace the most recent field set wholesale
    pub(crate) fn replace_composing(&mut self, params: ItxnParams) -> TxnResult<()> {
        let last = self
            .compose
            .as_mut()
            .and_then(|buffer| buffer.last_mut())
            .ok_or_else(|| TxnError::internal("itxn field without itxn begin"))?;
        *last = params;
        Ok(())
    }

    pub fn is_composing(&self) -> bool {
        self.compose.is_some()
    }

    pub fn composing(&self) -> Option<&[ItxnParams]> {
        self.compose.as_deref()
    }

    /// Take the compose buffer for submission, enforcing the group bound
    pub(crate) fn take_compose_buffer(&mut self) -> TxnResult<Vec<ItxnParams>> {
        let buffer = self
            .compose
            .take()
            .ok_or_else(|| TxnError::internal("itxn submit without itxn begin"))?;
        if buffer.len() > MAX_GROUP_SIZE {
            return Err(TxnError::GroupTooLarge(buffer.len()));
        }
        Ok(buffer)
    }

    pub(crate) fn push_itxn_group(&mut self, group: Vec<Transaction>) -> TxnResult<()> {
        if let Ok(call) = self.active_txn_mut()?.app_call_fields_mut() {
            call.inner_txns.extend(group.iter().cloned());
        }
        self.itxn_groups.push(group);
        Ok(())
    }

    /// Submitted inner transaction groups, oldest first
    pub fn itxn_groups(&self) -> &[Vec<Transaction>] {
        &self.itxn_groups
    }

    pub fn itxn_group(&self, index: usize) -> TxnResult<&[Transaction]> {
        self.itxn_groups
            .get(index)
            .map(Vec::as_slice)
            .ok_or_else(|| TxnError::internal(format!("no inner transaction group at index {}", index)))
    }

    pub fn last_itxn_group(&self) -> TxnResult<&[Transaction]> {
        self.itxn_groups
            .last()
            .map(Vec::as_slice)
            .ok_or_else(|| TxnError::internal("no inner transaction group has been submitted"))
    }
}
