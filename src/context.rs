//! Test execution context
//!
//! [`TestExecutionContext`] is the explicit context object every harness
//! operation takes by reference. It owns the ledger and the transaction
//! context; its lifecycle is a plain `new`/`reset` pair.
//!
//! ```text
//! create_scope(items) ──► Scope ──execute(body)──► body(&mut ctx)
//!                           │
//!                           └── Drop: finalize group (even on error)
//!
//! ensure_scope(items) ──► reuses the open group, Drop does nothing
//! ```

use crate::config::EmulatorConfig;
use crate::error::EmulatorResult;
use avm_emu_arc4::{Address, Arc4Error, Arc4Value, EncodedValue, Encoder};
use avm_emu_ledger::{
    decode_logs, ApplicationParams, AssetParams, Ledger, LogKind, LogValue, StackValue,
};
use avm_emu_txn::{
    check_routing_conditions, decode_method_args, encode_method_args, ApplicationCallFields,
    AppCallObserver, DeferredAppCall, GroupItem, ItxnField, ItxnParams, MethodMetadata, OnCompletion,
    Transaction, TransactionContext, TransactionGroup,
};
use std::ops::{Deref, DerefMut};
use tracing::{debug, warn};

/// Ledger, transaction state and settings of one test
#[derive(Debug)]
pub struct TestExecutionContext {
    config: EmulatorConfig,
    ledger: Ledger,
    txn: TransactionContext,
    default_sender: Address,
}

impl TestExecutionContext {
    pub fn new() -> Self {
        Self::with_config(EmulatorConfig::default())
    }

    pub fn with_config(config: EmulatorConfig) -> Self {
        Self {
            ledger: Ledger::new(config.ledger.clone()),
            txn: TransactionContext::new(config.resources.encoding),
            default_sender: default_sender(),
            config,
        }
    }

    /// Return to the freshly constructed state
    pub fn reset(&mut self) {
        self.ledger = Ledger::new(self.config.ledger.clone());
        self.txn.reset();
        debug!("Test execution context reset");
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    pub fn txn(&self) -> &TransactionContext {
        &self.txn
    }

    pub fn txn_mut(&mut self) -> &mut TransactionContext {
        &mut self.txn
    }

    pub fn default_sender(&self) -> Address {
        self.default_sender
    }

    pub fn set_default_sender(&mut self, sender: Address) {
        self.default_sender = sender;
    }

    // ------------------------------------------------------------------
    // Ledger setup
    // ------------------------------------------------------------------

    /// Register an application created by the default sender
    pub fn create_application(&mut self, params: ApplicationParams) -> u64 {
        let creator = self.default_sender;
        self.ledger.create_application(&creator, params)
    }

    /// Register an asset created by the default sender
    pub fn create_asset(&mut self, params: AssetParams) -> u64 {
        let creator = self.default_sender;
        self.ledger.create_asset(&creator, params)
    }

    /// Application call from the default sender, using the configured
    /// resource encoding
    pub fn app_call(&self, app_id: u64, on_completion: OnCompletion) -> Transaction {
        let mut fields = ApplicationCallFields::new(app_id, on_completion);
        fields.resource_encoding = self.txn.resource_encoding();
        Transaction::app_call(self.default_sender, fields)
    }

    // ------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------

    /// Open a new group; the returned guard finalizes it when dropped
    pub fn create_scope(&mut self, items: Vec<GroupItem>, active_index: Option<usize>) -> EmulatorResult<Scope<'_>> {
        self.txn.create_group(items, active_index)?;
        Ok(Scope { ctx: self, owned: true })
    }

    /// Reuse the open group if it has transactions, else open a new one
    pub fn ensure_scope(&mut self, items: Vec<GroupItem>, active_index: Option<usize>) -> EmulatorResult<Scope<'_>> {
        if self.txn.has_active_group() {
            return Ok(Scope { ctx: self, owned: false });
        }
        if self.txn.active_group().is_ok() {
            // an empty group is open; nothing can run in it
            self.txn.finalize_group()?;
        }
        self.create_scope(items, active_index)
    }

    pub fn active_group(&self) -> EmulatorResult<&TransactionGroup> {
        Ok(self.txn.active_group()?)
    }

    pub fn active_group_mut(&mut self) -> EmulatorResult<&mut TransactionGroup> {
        Ok(self.txn.active_group_mut()?)
    }

    pub fn last_group(&self) -> EmulatorResult<&TransactionGroup> {
        Ok(self.txn.last_group()?)
    }

    // ------------------------------------------------------------------
    // Method calls
    // ------------------------------------------------------------------

    /// Build the transactions of `call`: its transaction arguments followed
    /// by the application call carrying the encoded arguments
    pub fn defer_app_call(&self, call: &MethodCall) -> EmulatorResult<DeferredAppCall> {
        let mut txn = self.app_call(call.app_id, call.on_completion);
        if let Some(sender) = call.sender {
            txn.header.sender = sender;
        }
        encode_method_args(&mut txn, &call.method, &call.args)?;

        let mut txns = call.txn_args.clone();
        txns.push(txn);
        Ok(DeferredAppCall::new(txns)?)
    }

    /// Call an ABI method.
    ///
    /// Without an open group, a new group is formed from the call and its
    /// transaction arguments, routing is checked and the body runs against
    /// the decoded arguments. Inside an open group the body runs directly
    /// in that group, so a method can call another one without nesting.
    pub fn call_method<F>(&mut self, call: MethodCall, body: F) -> EmulatorResult<Option<EncodedValue>>
    where
        F: FnOnce(&mut TestExecutionContext, Vec<Arc4Value>) -> EmulatorResult<Option<Arc4Value>>,
    {
        if self.txn.has_active_group() {
            debug!(method = %call.method.name, "Method call reuses the open group");
            let returned = body(self, call.args)?;
            return encode_return(&call.method, returned, None);
        }

        let deferred = self.defer_app_call(&call)?;
        if call.create {
            self.ledger.application_mut(call.app_id)?.is_creating = true;
        }
        let result = self
            .create_scope(vec![deferred.into()], None)?
            .execute(|ctx| ctx.run_active_method(&call.method, body));

        if call.create && result.is_err() {
            self.ledger.application_mut(call.app_id)?.is_creating = false;
        }
        result
    }

    /// Run `body` as `method` against the active application call of the
    /// open group: check routing, decode the arguments, record the return
    /// value as the ABI return log.
    pub fn run_active_method<F>(&mut self, method: &MethodMetadata, body: F) -> EmulatorResult<Option<EncodedValue>>
    where
        F: FnOnce(&mut TestExecutionContext, Vec<Arc4Value>) -> EmulatorResult<Option<Arc4Value>>,
    {
        let group = self.txn.active_group()?;
        let app_id = group.active_app_id()?;
        check_routing_conditions(&self.ledger, group, app_id, method)?;
        let args = decode_method_args(group.active_txn()?, method)?;

        debug!(method = %method.name, app_id, "Running method");
        let returned = body(self, args)?;

        let txn = self.txn.active_group_mut()?.active_txn_mut()?;
        let encoded = encode_return(method, returned, Some(&mut *txn))?;
        if let Some(value) = &encoded {
            txn.app_call_fields_mut()?.set_return_value(value.clone())?;
            self.ledger.append_app_log(app_id, value.to_return_log())?;
        }

        let app = self.ledger.application_mut(app_id)?;
        if app.is_creating {
            app.is_creating = false;
            debug!(app_id, "Application creation completed");
        }
        Ok(encoded)
    }

    // ------------------------------------------------------------------
    // Logs and scratch space
    // ------------------------------------------------------------------

    /// `log`: append to the active application call and the app's log
    pub fn log(&mut self, bytes: &[u8]) -> EmulatorResult<()> {
        let group = self.txn.active_group_mut()?;
        let app_id = group.active_app_id()?;
        group.append_log(bytes)?;
        self.ledger.append_app_log(app_id, bytes.to_vec())?;
        Ok(())
    }

    /// Decode the accumulated logs of `app_id`
    pub fn export_logs(&self, app_id: u64, kinds: &[LogKind]) -> EmulatorResult<Vec<LogValue>> {
        let logs = &self.ledger.application(app_id)?.logs;
        Ok(decode_logs(logs, kinds)?)
    }

    pub fn store_scratch(&mut self, slot: usize, value: impl Into<StackValue>) -> EmulatorResult<()> {
        Ok(self.txn.active_group_mut()?.store_scratch(slot, value.into())?)
    }

    pub fn load_scratch(&self, txn_index: usize, slot: usize) -> EmulatorResult<StackValue> {
        Ok(self.txn.active_group()?.load_scratch(txn_index, slot)?.clone())
    }

    // ------------------------------------------------------------------
    // Inner transactions
    // ------------------------------------------------------------------

    pub fn itxn_begin(&mut self) -> EmulatorResult<()> {
        debug!("itxn begin");
        Ok(self.txn.active_group_mut()?.begin_itxn_group()?)
    }

    pub fn itxn_next(&mut self) -> EmulatorResult<()> {
        debug!("itxn next");
        Ok(self.txn.active_group_mut()?.next_itxn()?)
    }

    pub fn itxn_field(&mut self, field: ItxnField) -> EmulatorResult<()> {
        Ok(self.txn.active_group_mut()?.set_itxn_field(field)?)
    }

    /// Submit the composed group; returns the submitted transactions
    pub fn itxn_submit(&mut self) -> EmulatorResult<Vec<Transaction>> {
        Ok(self.txn.submit_itxn_group(&mut self.ledger)?.to_vec())
    }

    /// Submit a single inner transaction
    pub fn submit_itxn(&mut self, params: ItxnParams) -> EmulatorResult<Transaction> {
        Ok(self.txn.submit_itxn(&mut self.ledger, params)?)
    }

    /// Observe inner calls of `method` with any of `on_completions`
    pub fn register_observer(
        &mut self,
        method: &MethodMetadata,
        on_completions: Vec<OnCompletion>,
        callback: AppCallObserver,
    ) {
        self.txn.register_observer(method.selector(), on_completions, callback);
    }
}

impl Default for TestExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable non-zero default sender
fn default_sender() -> Address {
    let mut bytes = [0u8; 32];
    bytes[31] = 1;
    Address::new(bytes)
}

/// Check `returned` against the declared return type and encode it,
/// resolving references through `txn` when given
fn encode_return(
    method: &MethodMetadata,
    returned: Option<Arc4Value>,
    txn: Option<&mut Transaction>,
) -> EmulatorResult<Option<EncodedValue>> {
    match (&method.returns, returned) {
        (None, None) => Ok(None),
        (Some(ty), Some(value)) => {
            let encoded = match txn {
                Some(txn) => EncodedValue::encode_with(&mut Encoder::with_resolver(txn), value, ty.clone())?,
                None => EncodedValue::encode(value, ty.clone())?,
            };
            Ok(Some(encoded))
        }
        (Some(ty), None) => Err(Arc4Error::TypeMismatch {
            expected: ty.to_string(),
            got: "void".to_string(),
        }
        .into()),
        (None, Some(value)) => Err(Arc4Error::TypeMismatch {
            expected: "void".to_string(),
            got: value.kind_name().to_string(),
        }
        .into()),
    }
}

/// Guard over an open transaction group
pub struct Scope<'c> {
    ctx: &'c mut TestExecutionContext,
    owned: bool,
}

impl Scope<'_> {
    /// Run `body`; the group is finalized afterwards if this scope opened it
    pub fn execute<T, F>(mut self, body: F) -> EmulatorResult<T>
    where
        F: FnOnce(&mut TestExecutionContext) -> EmulatorResult<T>,
    {
        body(&mut *self.ctx)
    }

    /// False when the scope reuses an already open group
    pub fn is_owned(&self) -> bool {
        self.owned
    }
}

impl Deref for Scope<'_> {
    type Target = TestExecutionContext;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl DerefMut for Scope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        if self.owned {
            if let Err(e) = self.ctx.txn.finalize_group() {
                warn!(error = %e, "Failed to finalize transaction group");
            }
        }
    }
}

/// ABI method call description
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub app_id: u64,
    pub method: MethodMetadata,
    pub args: Vec<Arc4Value>,
    pub on_completion: OnCompletion,
    /// Defaults to the context's default sender
    pub sender: Option<Address>,
    /// Marks the application as being created for the duration of the call
    pub create: bool,
    /// Transaction arguments, placed before the call in the group
    pub txn_args: Vec<Transaction>,
}

impl MethodCall {
    pub fn new(app_id: u64, method: MethodMetadata) -> Self {
        Self {
            app_id,
            method,
            args: Vec::new(),
            on_completion: OnCompletion::NoOp,
            sender: None,
            create: false,
            txn_args: Vec::new(),
        }
    }

    pub fn args(mut self, args: Vec<Arc4Value>) -> Self {
        self.args = args;
        self
    }

    pub fn arg(mut self, arg: impl Into<Arc4Value>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn on_completion(mut self, on_completion: OnCompletion) -> Self {
        self.on_completion = on_completion;
        self
    }

    pub fn sender(mut self, sender: Address) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn create(mut self) -> Self {
        self.create = true;
        self
    }

    pub fn txn_arg(mut self, txn: Transaction) -> Self {
        self.txn_args.push(txn);
        self
    }
}
