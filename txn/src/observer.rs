//! Observers of inner application calls
//!
//! Test code registers a callback for a method selector and a set of
//! allowed on-completion actions. Whenever a matching inner application
//! call is submitted the callback runs synchronously and may rewrite the
//! transaction's outcome (created app, return value, logs) before the
//! issuing contract sees it.

use crate::errors::TxnResult;
use crate::transaction::{OnCompletion, Transaction};
use avm_emu_arc4::constants::SELECTOR_SIZE;
use std::fmt;

/// Callback invoked with the submitted inner transaction
pub type AppCallObserver = Box<dyn FnMut(&mut Transaction) -> TxnResult<()>>;

struct ObserverEntry {
    selector: [u8; SELECTOR_SIZE],
    on_completions: Vec<OnCompletion>,
    callback: AppCallObserver,
}

/// Registry of inner application call observers
#[derive(Default)]
pub struct ObserverRegistry {
    entries: Vec<ObserverEntry>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for calls with `selector` and any of `on_completions`
    pub fn register(
        &mut self,
        selector: [u8; SELECTOR_SIZE],
        on_completions: Vec<OnCompletion>,
        callback: AppCallObserver,
    ) {
        self.entries.push(ObserverEntry {
            selector,
            on_completions,
            callback,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Run every matching observer in registration order; returns how many ran
    pub fn notify(&mut self, txn: &mut Transaction) -> TxnResult<usize> {
        let (selector, on_completion) = match (txn.selector(), txn.app_call_fields()) {
            (Some(selector), Ok(fields)) => (selector, fields.on_completion),
            _ => return Ok(0),
        };

        let mut ran = 0;
        for entry in self
            .entries
            .iter_mut()
            .filter(|e| e.selector == selector && e.on_completions.contains(&on_completion))
        {
            (entry.callback)(txn)?;
            ran += 1;
        }
        Ok(ran)
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::ApplicationCallFields;
    use avm_emu_arc4::{method_selector, Address};

    fn call_with(selector: [u8; 4], oc: OnCompletion) -> Transaction {
        let mut fields = ApplicationCallFields::new(1001, oc);
        fields.args.push(selector.to_vec());
        Transaction::app_call(Address::ZERO, fields)
    }

    #[test]
    fn test_matching_observer_runs() {
        let selector = method_selector("ping()uint64");
        let mut registry = ObserverRegistry::new();
        registry.register(
            selector,
            vec![OnCompletion::NoOp],
            Box::new(|txn| {
                txn.app_call_fields_mut()?.append_log(b"observed")?;
                Ok(())
            }),
        );

        let mut txn = call_with(selector, OnCompletion::NoOp);
        assert_eq!(registry.notify(&mut txn).unwrap(), 1);
        assert_eq!(txn.app_call_fields().unwrap().logs(), vec![b"observed".to_vec()]);

        let mut other_oc = call_with(selector, OnCompletion::OptIn);
        assert_eq!(registry.notify(&mut other_oc).unwrap(), 0);

        let mut other_method = call_with(method_selector("pong()void"), OnCompletion::NoOp);
        assert_eq!(registry.notify(&mut other_method).unwrap(), 0);
    }
}
