//! Transaction context
//!
//! Owns the currently open transaction group, the finalized groups and the
//! inner application call observers. At most one group is open at a time.

use crate::errors::{TxnError, TxnResult};
use crate::group::{GroupItem, TransactionGroup};
use crate::itxn::{apply_effects, ItxnParams};
use crate::observer::{AppCallObserver, ObserverRegistry};
use crate::transaction::{OnCompletion, Transaction};
use avm_emu_arc4::constants::{MAX_GROUP_SIZE, SELECTOR_SIZE};
use avm_emu_arc4::{Address, ResourceEncoding};
use avm_emu_ledger::Ledger;
use sha2::{Digest, Sha512_256};
use tracing::debug;

/// Group state of an emulation session
#[derive(Debug, Default)]
pub struct TransactionContext {
    current: Option<TransactionGroup>,
    history: Vec<TransactionGroup>,
    resource_encoding: ResourceEncoding,
    observers: ObserverRegistry,
    txn_counter: u64,
}

impl TransactionContext {
    pub fn new(resource_encoding: ResourceEncoding) -> Self {
        Self {
            resource_encoding,
            ..Default::default()
        }
    }

    /// Drop all groups and observers, keeping the resource encoding
    pub fn reset(&mut self) {
        *self = Self::new(self.resource_encoding);
    }

    pub fn resource_encoding(&self) -> ResourceEncoding {
        self.resource_encoding
    }

    /// Open a new group from `items`; fails if one is already open
    pub fn create_group(&mut self, items: Vec<GroupItem>, active_index: Option<usize>) -> TxnResult<&mut TransactionGroup> {
        if self.current.is_some() {
            return Err(TxnError::internal(
                "a transaction group is already active, finalize it before creating another",
            ));
        }

        let mut group = TransactionGroup::new(items, active_index)?;
        for txn in group.transactions_mut() {
            txn.header.txn_id = self.next_txn_id(&txn.header.sender, txn.header.group_index);
        }
        debug!(size = group.len(), active = group.active_index(), "Transaction group opened");
        Ok(self.current.insert(group))
    }

    /// Close the open group and move it to the history
    pub fn finalize_group(&mut self) -> TxnResult<()> {
        let group = self
            .current
            .take()
            .ok_or_else(|| TxnError::internal("no active transaction group to finalize"))?;
        debug!(size = group.len(), itxn_groups = group.itxn_groups().len(), "Transaction group finalized");
        self.history.push(group);
        Ok(())
    }

    /// True when a group with at least one transaction is open
    pub fn has_active_group(&self) -> bool {
        self.current.as_ref().is_some_and(|g| !g.is_empty())
    }

    pub fn active_group(&self) -> TxnResult<&TransactionGroup> {
        self.current.as_ref().ok_or_else(no_active_group)
    }

    pub fn active_group_mut(&mut self) -> TxnResult<&mut TransactionGroup> {
        self.current.as_mut().ok_or_else(no_active_group)
    }

    /// Most recently finalized group
    pub fn last_group(&self) -> TxnResult<&TransactionGroup> {
        self.history
            .last()
            .ok_or_else(|| TxnError::internal("no transaction group has been finalized"))
    }

    /// Finalized groups, oldest first
    pub fn history(&self) -> &[TransactionGroup] {
        &self.history
    }

    pub fn observers(&self) -> &ObserverRegistry {
        &self.observers
    }

    pub fn observers_mut(&mut self) -> &mut ObserverRegistry {
        &mut self.observers
    }

    /// Observe inner calls with `selector` and any of `on_completions`
    pub fn register_observer(
        &mut self,
        selector: [u8; SELECTOR_SIZE],
        on_completions: Vec<OnCompletion>,
        callback: AppCallObserver,
    ) {
        self.observers.register(selector, on_completions, callback);
    }

    /// Submit the group under composition in the active transaction.
    ///
    /// Senders default to the address of the issuing application. Nested
    /// inner transactions carried by an application call field set are
    /// flattened ahead of that call. Ledger effects are applied in order on
    /// a staged copy that replaces `ledger` only when the whole group
    /// succeeds; observers see each application call before the group
    /// becomes visible to the issuing contract.
    pub fn submit_itxn_group(&mut self, ledger: &mut Ledger) -> TxnResult<&[Transaction]> {
        let group = self.current.as_mut().ok_or_else(no_active_group)?;
        let app_id = group.active_app_id()?;
        let app_address = ledger.application(app_id)?.address;
        let buffer = group.take_compose_buffer()?;

        let mut staged = ledger.clone();
        let mut submitted = Vec::with_capacity(buffer.len());
        for mut params in buffer {
            for mut nested in params.take_nested() {
                nested.header.group_index = submitted.len();
                submitted.push(nested);
            }

            let position = submitted.len();
            let sender = params.sender.unwrap_or(app_address);
            self.txn_counter += 1;
            let id = txn_id(&sender, position, self.txn_counter);
            let mut txn = params.into_transaction(app_address, position, id);

            apply_effects(&mut txn, &mut staged)?;
            if txn.is_app_call() {
                let ran = self.observers.notify(&mut txn)?;
                if ran > 0 {
                    debug!(observers = ran, position, "Inner application call observed");
                }
            }
            submitted.push(txn);
        }

        if submitted.len() > MAX_GROUP_SIZE {
            return Err(TxnError::GroupTooLarge(submitted.len()));
        }
        *ledger = staged;

        debug!(app_id, size = submitted.len(), "Inner transaction group submitted");
        group.push_itxn_group(submitted)?;
        group.last_itxn_group()
    }

    /// Begin, fill and submit a single inner transaction
    pub fn submit_itxn(&mut self, ledger: &mut Ledger, params: ItxnParams) -> TxnResult<Transaction> {
        let group = self.active_group_mut()?;
        group.begin_itxn_group()?;
        // the buffer always holds one default field set after begin
        group.replace_composing(params)?;
        let submitted = self.submit_itxn_group(ledger)?;
        // nested transactions are flattened ahead of the submitted one
        submitted
            .last()
            .cloned()
            .ok_or_else(|| TxnError::internal("inner transaction group is empty"))
    }

    fn next_txn_id(&mut self, sender: &Address, position: usize) -> [u8; 32] {
        self.txn_counter += 1;
        txn_id(sender, position, self.txn_counter)
    }
}

fn no_active_group() -> TxnError {
    TxnError::internal("no active transaction group")
}

/// Deterministic id over sender, group position and a session counter
fn txn_id(sender: &Address, position: usize, counter: u64) -> [u8; 32] {
    let mut hasher = Sha512_256::new();
    hasher.update(b"TX");
    hasher.update(sender.as_bytes());
    hasher.update((position as u64).to_be_bytes());
    hasher.update(counter.to_be_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::itxn::{asset_config, ItxnField};
    use crate::transaction::{ApplicationCallFields, TransactionType, TxnBody};
    use avm_emu_arc4::method_selector;
    use avm_emu_ledger::{ApplicationParams, AssetParams};

    fn setup() -> (Ledger, TransactionContext, u64) {
        let mut ledger = Ledger::default();
        let app_id = ledger.create_application(&Address::new([9u8; 32]), ApplicationParams::default());
        let mut ctx = TransactionContext::default();
        let call = Transaction::app_call(
            Address::new([1u8; 32]),
            ApplicationCallFields::new(app_id, OnCompletion::NoOp),
        );
        ctx.create_group(vec![call.into()], None).unwrap();
        (ledger, ctx, app_id)
    }

    #[test]
    fn test_single_open_group() {
        let (_, mut ctx, _) = setup();
        assert!(ctx.has_active_group());
        let err = ctx.create_group(vec![], None).unwrap_err();
        assert_eq!(err.kind(), avm_emu_arc4::ErrorKind::Internal);

        ctx.finalize_group().unwrap();
        assert!(!ctx.has_active_group());
        assert!(ctx.active_group().is_err());
        assert_eq!(ctx.history().len(), 1);
        assert!(ctx.finalize_group().is_err());
    }

    #[test]
    fn test_txn_ids_distinct() {
        let mut ctx = TransactionContext::default();
        let a = Transaction::payment(Address::ZERO, Address::ZERO, 1);
        let group = ctx.create_group(vec![a.clone().into(), a.into()], None).unwrap();
        let ids: Vec<_> = group.transactions().iter().map(|t| t.header.txn_id).collect();
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_submit_payment_defaults_sender_to_app() {
        let (mut ledger, mut ctx, app_id) = setup();
        let group = ctx.active_group_mut().unwrap();
        group.begin_itxn_group().unwrap();
        group.set_itxn_field(ItxnField::Receiver(Address::new([2u8; 32]))).unwrap();
        group.set_itxn_field(ItxnField::Amount(1000)).unwrap();

        let submitted = ctx.submit_itxn_group(&mut ledger).unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].sender(), Address::for_application(app_id));

        let group = ctx.active_group().unwrap();
        assert!(!group.is_composing());
        assert_eq!(group.active_app_call().unwrap().inner_txns.len(), 1);
        assert!(ctx.active_group_mut().unwrap().next_itxn().is_err());
    }

    #[test]
    fn test_submit_creates_asset() {
        let (mut ledger, mut ctx, _) = setup();
        let params = AssetParams {
            total: 100,
            unit_name: b"TOK".to_vec(),
            ..Default::default()
        };
        let txn = ctx.submit_itxn(&mut ledger, asset_config(params)).unwrap();
        let created = match &txn.body {
            TxnBody::AssetConfig(cfg) => cfg.created_asset_id,
            _ => panic!("expected acfg"),
        };
        assert_eq!(ledger.asset(created).unwrap().params.total, 100);
    }

    #[test]
    fn test_submit_without_begin_fails() {
        let (mut ledger, mut ctx, _) = setup();
        assert!(ctx.submit_itxn_group(&mut ledger).is_err());
    }

    #[test]
    fn test_oversized_itxn_group() {
        let (mut ledger, mut ctx, _) = setup();
        let group = ctx.active_group_mut().unwrap();
        group.begin_itxn_group().unwrap();
        for _ in 0..16 {
            group.next_itxn().unwrap();
        }
        let err = ctx.submit_itxn_group(&mut ledger).unwrap_err();
        assert!(matches!(err, TxnError::GroupTooLarge(17)));
    }

    #[test]
    fn test_observer_sees_inner_call() {
        let (mut ledger, mut ctx, _) = setup();
        let callee = ledger.create_application(&Address::ZERO, ApplicationParams::default());
        let selector = method_selector("ping()void");
        ctx.register_observer(
            selector,
            vec![OnCompletion::NoOp],
            Box::new(|txn| txn.app_call_fields_mut()?.append_log(b"pong")),
        );

        let params = ItxnParams::app_call(callee, OnCompletion::NoOp, vec![selector.to_vec()]);
        let txn = ctx.submit_itxn(&mut ledger, params).unwrap();
        assert_eq!(txn.txn_type(), TransactionType::ApplicationCall);
        assert_eq!(txn.app_call_fields().unwrap().logs(), vec![b"pong".to_vec()]);
    }

    #[test]
    fn test_inner_call_to_missing_app_fails() {
        let (mut ledger, mut ctx, _) = setup();
        let params = ItxnParams::app_call(4242, OnCompletion::NoOp, vec![]);
        assert!(ctx.submit_itxn(&mut ledger, params).is_err());
    }

    fn app_call_with_nested(ledger: &mut Ledger, nested: Vec<Transaction>) -> ItxnParams {
        let callee = ledger.create_application(&Address::ZERO, ApplicationParams::default());
        let mut call = ApplicationCallFields::new(callee, OnCompletion::NoOp);
        call.inner_txns = nested;
        ItxnParams::with_body(TxnBody::ApplicationCall(call))
    }

    #[test]
    fn test_nested_itxns_flattened_ahead_of_call() {
        let (mut ledger, mut ctx, _) = setup();
        let nested = Transaction::payment(Address::new([5u8; 32]), Address::new([6u8; 32]), 7);
        let params = app_call_with_nested(&mut ledger, vec![nested]);

        let group = ctx.active_group_mut().unwrap();
        group.begin_itxn_group().unwrap();
        group.replace_composing(params).unwrap();
        let submitted = ctx.submit_itxn_group(&mut ledger).unwrap();

        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[0].txn_type(), TransactionType::Payment);
        assert_eq!(submitted[0].group_index(), 0);
        assert_eq!(submitted[1].txn_type(), TransactionType::ApplicationCall);
        assert_eq!(submitted[1].group_index(), 1);
        assert!(submitted[1].app_call_fields().unwrap().inner_txns.is_empty());
    }

    #[test]
    fn test_flattened_group_bound() {
        let (mut ledger, mut ctx, _) = setup();
        let nested = Transaction::payment(Address::ZERO, Address::ZERO, 1);
        let params = app_call_with_nested(&mut ledger, vec![nested]);

        let group = ctx.active_group_mut().unwrap();
        group.begin_itxn_group().unwrap();
        group.replace_composing(params).unwrap();
        for _ in 0..15 {
            group.next_itxn().unwrap();
        }
        let err = ctx.submit_itxn_group(&mut ledger).unwrap_err();
        assert!(matches!(err, TxnError::GroupTooLarge(17)));
    }

    #[test]
    fn test_failed_submit_leaves_ledger_untouched() {
        let (mut ledger, mut ctx, _) = setup();
        let group = ctx.active_group_mut().unwrap();
        group.begin_itxn_group().unwrap();
        group
            .replace_composing(asset_config(AssetParams {
                total: 10,
                ..Default::default()
            }))
            .unwrap();
        group.next_itxn().unwrap();
        group
            .replace_composing(ItxnParams::app_call(4242, OnCompletion::NoOp, vec![]))
            .unwrap();

        assert!(ctx.submit_itxn_group(&mut ledger).is_err());
        assert!(ledger.asset(1001).is_err());
        assert!(ctx.active_group().unwrap().itxn_groups().is_empty());
    }
}
