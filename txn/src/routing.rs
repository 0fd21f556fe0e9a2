//! ABI method metadata and routing checks
//!
//! Method metadata is registered explicitly under a stable string key
//! (`module::Name`). Contracts that extend others are assembled once with
//! [`MetadataRegistry::compose`], merging base method lists in declared
//! order; later definitions override earlier ones by method name.

use crate::errors::{TxnError, TxnResult};
use crate::group::TransactionGroup;
use crate::transaction::{OnCompletion, Transaction, TransactionType};
use avm_emu_arc4::constants::{MAX_APP_ARGS, SELECTOR_SIZE};
use avm_emu_arc4::{
    method_selector, Arc4Error, Arc4Value, DecodePrefix, Decoder, Encoder, MethodSignature, TypeDescriptor,
};
use avm_emu_ledger::Ledger;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Value arguments passed individually before the rest are packed into a
/// trailing tuple
const MAX_INDIVIDUAL_ARGS: usize = MAX_APP_ARGS - 2;

/// Whether a method may, must or must not run during application creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreateRequirement {
    Allow,
    Require,
    #[default]
    Disallow,
}

/// Declared type of one method argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgType {
    /// ARC4-encoded value carried in the application arguments
    Value(TypeDescriptor),
    /// Transaction placed in the group before the call; `None` is any type
    Txn(Option<TransactionType>),
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgType::Value(ty) => write!(f, "{}", ty),
            ArgType::Txn(Some(t)) => write!(f, "{}", t),
            ArgType::Txn(None) => write!(f, "txn"),
        }
    }
}

impl FromStr for ArgType {
    type Err = TxnError;

    fn from_str(s: &str) -> TxnResult<Self> {
        match s {
            "txn" => Ok(ArgType::Txn(None)),
            "pay" | "keyreg" | "acfg" | "axfer" | "afrz" | "appl" => Ok(ArgType::Txn(Some(s.parse()?))),
            other => Ok(ArgType::Value(other.parse()?)),
        }
    }
}

/// Routing metadata of one ABI method
#[derive(Debug, Clone)]
pub struct MethodMetadata {
    pub name: String,
    pub args: Vec<ArgType>,
    /// `None` for void methods
    pub returns: Option<TypeDescriptor>,
    pub allowed_on_completions: Vec<OnCompletion>,
    pub create: CreateRequirement,
    pub readonly: bool,
    selector: OnceCell<[u8; SELECTOR_SIZE]>,
}

impl MethodMetadata {
    /// NoOp-only method that cannot be used for creation
    pub fn new(name: &str, args: Vec<ArgType>, returns: Option<TypeDescriptor>) -> Self {
        Self {
            name: name.to_string(),
            args,
            returns,
            allowed_on_completions: vec![OnCompletion::NoOp],
            create: CreateRequirement::Disallow,
            readonly: false,
            selector: OnceCell::new(),
        }
    }

    /// Build from a canonical signature such as `greet(string)string`
    pub fn from_signature(signature: &str) -> TxnResult<Self> {
        let sig: MethodSignature = signature.parse()?;
        let args = sig
            .args
            .iter()
            .map(|a| a.parse())
            .collect::<TxnResult<Vec<ArgType>>>()?;
        let returns = if sig.is_void() {
            None
        } else {
            Some(sig.returns.parse()?)
        };
        Ok(Self::new(&sig.name, args, returns))
    }

    pub fn with_on_completions(mut self, allowed: Vec<OnCompletion>) -> Self {
        self.allowed_on_completions = allowed;
        self
    }

    pub fn with_create(mut self, create: CreateRequirement) -> Self {
        self.create = create;
        self
    }

    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    pub fn signature(&self) -> MethodSignature {
        MethodSignature {
            name: self.name.clone(),
            args: self.args.iter().map(ArgType::to_string).collect(),
            returns: self
                .returns
                .as_ref()
                .map(TypeDescriptor::to_string)
                .unwrap_or_else(|| "void".to_string()),
        }
    }

    /// Selector, computed on first use
    pub fn selector(&self) -> [u8; SELECTOR_SIZE] {
        *self
            .selector
            .get_or_init(|| method_selector(&self.signature().to_string()))
    }

    /// Types of the arguments carried in application args
    pub fn value_arg_types(&self) -> Vec<&TypeDescriptor> {
        self.args
            .iter()
            .filter_map(|a| match a {
                ArgType::Value(ty) => Some(ty),
                ArgType::Txn(_) => None,
            })
            .collect()
    }

    /// Declared types of the transaction arguments, in order
    pub fn txn_arg_types(&self) -> Vec<Option<TransactionType>> {
        self.args
            .iter()
            .filter_map(|a| match a {
                ArgType::Txn(t) => Some(*t),
                ArgType::Value(_) => None,
            })
            .collect()
    }
}

impl PartialEq for MethodMetadata {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.args == other.args
            && self.returns == other.returns
            && self.allowed_on_completions == other.allowed_on_completions
            && self.create == other.create
            && self.readonly == other.readonly
    }
}

/// Routing metadata of a contract
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractMetadata {
    pub name: String,
    pub methods: Vec<MethodMetadata>,
}

impl ContractMetadata {
    pub fn new(name: &str, methods: Vec<MethodMetadata>) -> Self {
        Self {
            name: name.to_string(),
            methods,
        }
    }

    pub fn method(&self, name: &str) -> Option<&MethodMetadata> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn method_by_selector(&self, selector: &[u8]) -> Option<&MethodMetadata> {
        self.methods.iter().find(|m| m.selector()[..] == *selector)
    }

    /// Add or replace (by name) a method
    pub fn upsert(&mut self, method: MethodMetadata) {
        match self.methods.iter_mut().find(|m| m.name == method.name) {
            Some(existing) => *existing = method,
            None => self.methods.push(method),
        }
    }

    /// Parse an ARC-4 contract description
    pub fn from_arc4_json(json: &str) -> TxnResult<Self> {
        let contract: Arc4Contract = serde_json::from_str(json)
            .map_err(|e| TxnError::internal(format!("invalid ARC-4 contract description: {}", e)))?;
        contract.into_metadata()
    }
}

#[derive(Deserialize)]
struct Arc4Contract {
    name: String,
    #[serde(default)]
    methods: Vec<Arc4Method>,
}

#[derive(Deserialize)]
struct Arc4Method {
    name: String,
    #[serde(default)]
    args: Vec<Arc4Arg>,
    returns: Arc4Returns,
    #[serde(default)]
    readonly: bool,
    #[serde(default)]
    actions: Option<Arc4Actions>,
}

#[derive(Deserialize)]
struct Arc4Arg {
    #[serde(rename = "type")]
    ty: String,
}

#[derive(Deserialize)]
struct Arc4Returns {
    #[serde(rename = "type")]
    ty: String,
}

#[derive(Deserialize, Default)]
struct Arc4Actions {
    #[serde(default)]
    create: Vec<String>,
    #[serde(default)]
    call: Vec<String>,
}

impl Arc4Contract {
    fn into_metadata(self) -> TxnResult<ContractMetadata> {
        let mut methods = Vec::with_capacity(self.methods.len());
        for m in self.methods {
            let args = m
                .args
                .iter()
                .map(|a| a.ty.parse())
                .collect::<TxnResult<Vec<ArgType>>>()?;
            let returns = match m.returns.ty.as_str() {
                "void" => None,
                ty => Some(ty.parse()?),
            };
            let mut method = MethodMetadata::new(&m.name, args, returns).readonly(m.readonly);

            if let Some(actions) = m.actions {
                let create = parse_on_completions(&actions.create)?;
                let call = parse_on_completions(&actions.call)?;
                method.create = match (create.is_empty(), call.is_empty()) {
                    (false, true) => CreateRequirement::Require,
                    (false, false) => CreateRequirement::Allow,
                    _ => CreateRequirement::Disallow,
                };
                let mut allowed = call;
                for oc in create {
                    if !allowed.contains(&oc) {
                        allowed.push(oc);
                    }
                }
                method.allowed_on_completions = allowed;
            }
            methods.push(method);
        }
        Ok(ContractMetadata::new(&self.name, methods))
    }
}

fn parse_on_completions(names: &[String]) -> TxnResult<Vec<OnCompletion>> {
    names.iter().map(|n| n.parse()).collect()
}

/// Contract metadata keyed by a stable string (`module::Name`)
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    contracts: HashMap<String, ContractMetadata>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: &str, metadata: ContractMetadata) {
        self.contracts.insert(key.to_string(), metadata);
    }

    pub fn get(&self, key: &str) -> TxnResult<&ContractMetadata> {
        self.contracts
            .get(key)
            .ok_or_else(|| TxnError::internal(format!("no contract metadata registered for '{}'", key)))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.contracts.contains_key(key)
    }

    /// Register `own` under `key` merged on top of the already registered
    /// `bases`, applied in order.
    pub fn compose(&mut self, key: &str, bases: &[&str], own: ContractMetadata) -> TxnResult<&ContractMetadata> {
        let mut merged = ContractMetadata::new(&own.name, Vec::new());
        for base in bases {
            for method in &self.get(base)?.methods {
                merged.upsert(method.clone());
            }
        }
        for method in own.methods {
            merged.upsert(method);
        }
        debug!(key, methods = merged.methods.len(), "Contract metadata composed");
        self.contracts.insert(key.to_string(), merged);
        self.get(key)
    }
}

/// Check the creation phase and on-completion action of the active
/// transaction against `method` before its body runs.
pub fn check_routing_conditions(
    ledger: &Ledger,
    group: &TransactionGroup,
    app_id: u64,
    method: &MethodMetadata,
) -> TxnResult<()> {
    let is_creating = ledger.application(app_id)?.is_creating;
    match method.create {
        CreateRequirement::Disallow if is_creating => {
            warn!(method = %method.name, app_id, "Routing rejected call during creation");
            return Err(TxnError::assertion(format!(
                "method {} can not be called during application creation",
                method.name
            )));
        }
        CreateRequirement::Require if !is_creating => {
            warn!(method = %method.name, app_id, "Routing rejected non-creation call");
            return Err(TxnError::assertion(format!(
                "method {} can only be called during application creation",
                method.name
            )));
        }
        _ => {}
    }

    let on_completion = group.active_app_call()?.on_completion;
    if !method.allowed_on_completions.contains(&on_completion) {
        warn!(method = %method.name, %on_completion, "Routing rejected on-completion");
        return Err(TxnError::assertion(format!(
            "on completion action {} is not allowed for method {}",
            on_completion, method.name
        )));
    }
    Ok(())
}

/// Encode `args` into the application arguments of `txn` as
/// `[selector, arg1, arg2, ...]`.
///
/// At most 15 arguments follow the selector. With more value arguments than
/// that, arguments from the 15th on are packed into one trailing tuple.
pub fn encode_method_args(txn: &mut Transaction, method: &MethodMetadata, args: &[Arc4Value]) -> TxnResult<()> {
    let types = method.value_arg_types();
    if types.len() != args.len() {
        return Err(Arc4Error::ArityMismatch {
            expected: types.len(),
            got: args.len(),
        }
        .into());
    }

    let mut app_args = vec![method.selector().to_vec()];
    {
        let mut encoder = Encoder::with_resolver(&mut *txn);
        let packed = args.len() >= MAX_APP_ARGS;
        let individual = if packed { MAX_INDIVIDUAL_ARGS } else { args.len() };

        for (value, ty) in args.iter().zip(&types).take(individual) {
            app_args.push(encoder.encode(value, ty)?);
        }
        if packed {
            let ty = TypeDescriptor::Tuple(types[individual..].iter().map(|t| (*t).clone()).collect());
            let value = Arc4Value::Tuple(args[individual..].to_vec());
            app_args.push(encoder.encode(&value, &ty)?);
        }
    }

    txn.app_call_fields_mut()?.args = app_args;
    Ok(())
}

/// Inverse of [`encode_method_args`]; the selector must match `method`
pub fn decode_method_args(txn: &Transaction, method: &MethodMetadata) -> TxnResult<Vec<Arc4Value>> {
    let app_args = &txn.app_call_fields()?.args;
    let selector = method.selector();
    if app_args.first().map(Vec::as_slice) != Some(&selector[..]) {
        return Err(TxnError::assertion(format!(
            "application call does not carry the selector of method {}",
            method.name
        )));
    }

    let types = method.value_arg_types();
    let packed = types.len() >= MAX_APP_ARGS;
    let individual = if packed { MAX_INDIVIDUAL_ARGS } else { types.len() };
    let expected = individual + usize::from(packed);
    if app_args.len() - 1 != expected {
        return Err(Arc4Error::ArityMismatch {
            expected,
            got: app_args.len() - 1,
        }
        .into());
    }

    let decoder = Decoder::with_resolver(txn);
    let mut values = Vec::with_capacity(types.len());
    for (raw, ty) in app_args[1..].iter().zip(&types).take(individual) {
        values.push(decoder.decode(raw, ty, DecodePrefix::None)?);
    }
    if packed {
        let ty = TypeDescriptor::Tuple(types[individual..].iter().map(|t| (*t).clone()).collect());
        match decoder.decode(&app_args[expected], &ty, DecodePrefix::None)? {
            Arc4Value::Tuple(rest) => values.extend(rest),
            other => return Err(Arc4Error::TypeMismatch {
                expected: ty.to_string(),
                got: other.kind_name().to_string(),
            }
            .into()),
        }
    }
    Ok(values)
}

/// Transactions passed as arguments: the ones immediately preceding the
/// active application call, checked against their declared types
pub fn txn_args<'g>(group: &'g TransactionGroup, method: &MethodMetadata) -> TxnResult<Vec<&'g Transaction>> {
    let declared = method.txn_arg_types();
    let active = group.active_index();
    if declared.len() > active {
        return Err(TxnError::internal(format!(
            "method {} expects {} transaction arguments, group has {} before the call",
            method.name,
            declared.len(),
            active
        )));
    }

    let start = active - declared.len();
    let mut txns = Vec::with_capacity(declared.len());
    for (offset, expected) in declared.iter().enumerate() {
        let txn = group.txn(start + offset)?;
        if let Some(expected) = expected {
            if txn.txn_type() != *expected {
                return Err(TxnError::WrongTransactionType {
                    expected: expected.to_string(),
                    got: txn.txn_type().to_string(),
                });
            }
        }
        txns.push(txn);
    }
    Ok(txns)
}
