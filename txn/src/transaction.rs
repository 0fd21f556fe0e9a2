//! Transaction model
//!
//! A [`Transaction`] is a common [`TxnHeader`] plus a [`TxnBody`] tagged by
//! transaction type. Application calls additionally collect the logs they
//! emit and an optional ARC4 return value.

use crate::errors::{TxnError, TxnResult};
use avm_emu_arc4::constants::{MAX_LOG_CALLS, MAX_LOG_SIZE};
use avm_emu_arc4::{
    return_log, Address, Arc4Error, Arc4Result, EncodedValue, ResourceEncoding, ResourceResolver,
};
use avm_emu_ledger::{AssetParams, StateSchema};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest index a 1-byte reference can carry
const MAX_REFERENCE_INDEX: usize = u8::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Payment,
    KeyRegistration,
    AssetConfig,
    AssetTransfer,
    AssetFreeze,
    ApplicationCall,
}

impl TransactionType {
    /// Short wire name (`pay`, `appl`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Payment => "pay",
            TransactionType::KeyRegistration => "keyreg",
            TransactionType::AssetConfig => "acfg",
            TransactionType::AssetTransfer => "axfer",
            TransactionType::AssetFreeze => "afrz",
            TransactionType::ApplicationCall => "appl",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = TxnError;

    fn from_str(s: &str) -> TxnResult<Self> {
        match s {
            "pay" => Ok(TransactionType::Payment),
            "keyreg" => Ok(TransactionType::KeyRegistration),
            "acfg" => Ok(TransactionType::AssetConfig),
            "axfer" => Ok(TransactionType::AssetTransfer),
            "afrz" => Ok(TransactionType::AssetFreeze),
            "appl" => Ok(TransactionType::ApplicationCall),
            other => Err(TxnError::internal(format!("unknown transaction type '{}'", other))),
        }
    }
}

/// Action taken after an application call, with AVM numeric values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OnCompletion {
    #[default]
    NoOp = 0,
    OptIn = 1,
    CloseOut = 2,
    ClearState = 3,
    UpdateApplication = 4,
    DeleteApplication = 5,
}

impl OnCompletion {
    pub const ALL: [OnCompletion; 6] = [
        OnCompletion::NoOp,
        OnCompletion::OptIn,
        OnCompletion::CloseOut,
        OnCompletion::ClearState,
        OnCompletion::UpdateApplication,
        OnCompletion::DeleteApplication,
    ];

    pub fn from_u64(value: u64) -> Option<Self> {
        Self::ALL.get(usize::try_from(value).ok()?).copied()
    }

    pub fn as_u64(self) -> u64 {
        self as u64
    }

    /// Name used in ARC-4/ARC-32 contract descriptions
    pub fn name(&self) -> &'static str {
        match self {
            OnCompletion::NoOp => "NoOp",
            OnCompletion::OptIn => "OptIn",
            OnCompletion::CloseOut => "CloseOut",
            OnCompletion::ClearState => "ClearState",
            OnCompletion::UpdateApplication => "UpdateApplication",
            OnCompletion::DeleteApplication => "DeleteApplication",
        }
    }
}

impl fmt::Display for OnCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OnCompletion {
    type Err = TxnError;

    fn from_str(s: &str) -> TxnResult<Self> {
        Self::ALL
            .iter()
            .find(|oc| oc.name() == s)
            .copied()
            .ok_or_else(|| TxnError::internal(format!("unknown on-completion '{}'", s)))
    }
}

/// Fields shared by every transaction type
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TxnHeader {
    pub sender: Address,
    pub fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    pub note: Vec<u8>,
    pub lease: [u8; 32],
    pub rekey_to: Address,
    /// Position in the enclosing group, assigned once when the group is formed
    pub group_index: usize,
    pub txn_id: [u8; 32],
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaymentFields {
    pub receiver: Address,
    pub amount: u64,
    pub close_remainder_to: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyRegistrationFields {
    pub vote_pk: Vec<u8>,
    pub selection_pk: Vec<u8>,
    pub state_proof_pk: Vec<u8>,
    pub vote_first: u64,
    pub vote_last: u64,
    pub vote_key_dilution: u64,
    pub non_participation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssetConfigFields {
    /// Asset being reconfigured; 0 creates a new asset
    pub config_asset: u64,
    pub params: AssetParams,
    /// Set once a creating transaction has been applied
    pub created_asset_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssetTransferFields {
    pub xfer_asset: u64,
    pub asset_amount: u64,
    /// Clawback source; zero for regular transfers
    pub asset_sender: Address,
    pub asset_receiver: Address,
    pub asset_close_to: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssetFreezeFields {
    pub freeze_asset: u64,
    pub freeze_account: Address,
    pub frozen: bool,
}

/// Application call fields and execution results
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApplicationCallFields {
    /// Called application; 0 creates one
    pub app_id: u64,
    pub on_completion: OnCompletion,
    pub args: Vec<Vec<u8>>,
    pub accounts: Vec<Address>,
    pub assets: Vec<u64>,
    pub apps: Vec<u64>,
    pub approval_program: Vec<u8>,
    pub clear_state_program: Vec<u8>,
    pub global_schema: StateSchema,
    pub local_schema: StateSchema,
    pub extra_program_pages: u64,
    /// How ARC4 reference arguments are laid out for this call
    pub resource_encoding: ResourceEncoding,
    pub created_app_id: u64,
    /// Inner transactions issued while this call executed, flattened
    pub inner_txns: Vec<Transaction>,
    logs: Vec<Vec<u8>>,
    return_value: Option<EncodedValue>,
}

impl ApplicationCallFields {
    pub fn new(app_id: u64, on_completion: OnCompletion) -> Self {
        Self {
            app_id,
            on_completion,
            ..Default::default()
        }
    }

    /// Every log including the return-value log, which is always last
    pub fn logs(&self) -> Vec<Vec<u8>> {
        let mut logs = self.logs.clone();
        if let Some(value) = &self.return_value {
            logs.push(value.to_return_log());
        }
        logs
    }

    pub fn last_log(&self) -> Option<Vec<u8>> {
        match &self.return_value {
            Some(value) => Some(value.to_return_log()),
            None => self.logs.last().cloned(),
        }
    }

    pub fn num_logs(&self) -> usize {
        self.logs.len() + usize::from(self.return_value.is_some())
    }

    /// Append a log entry. Non-return logs must precede the return value.
    pub fn append_log(&mut self, log: &[u8]) -> TxnResult<()> {
        if self.return_value.is_some() {
            return Err(TxnError::internal(
                "cannot add logs after a return value has been set",
            ));
        }
        self.check_log_limits(self.logs.len() + 1, self.log_bytes() + log.len())?;
        self.logs.push(log.to_vec());
        Ok(())
    }

    /// Set the ABI return value, replacing any previous one
    pub fn set_return_value(&mut self, value: EncodedValue) -> TxnResult<()> {
        let size = return_log(value.bytes()).len();
        self.check_log_limits(self.logs.len() + 1, self.log_bytes() + size)?;
        self.return_value = Some(value);
        Ok(())
    }

    pub fn return_value(&self) -> Option<&EncodedValue> {
        self.return_value.as_ref()
    }

    /// Replace logs wholesale, as an observer does when faking a callee
    pub fn set_logs(&mut self, logs: Vec<Vec<u8>>) -> TxnResult<()> {
        let bytes = logs.iter().map(Vec::len).sum();
        self.check_log_limits(logs.len(), bytes)?;
        self.logs = logs;
        self.return_value = None;
        Ok(())
    }

    fn log_bytes(&self) -> usize {
        self.logs.iter().map(Vec::len).sum()
    }

    fn check_log_limits(&self, count: usize, bytes: usize) -> TxnResult<()> {
        if count > MAX_LOG_CALLS {
            return Err(TxnError::TooManyLogs);
        }
        if bytes > MAX_LOG_SIZE {
            return Err(TxnError::LogsTooLarge(bytes));
        }
        Ok(())
    }
}

/// Type-specific fields
#[derive(Debug, Clone, PartialEq)]
pub enum TxnBody {
    Payment(PaymentFields),
    KeyRegistration(KeyRegistrationFields),
    AssetConfig(AssetConfigFields),
    AssetTransfer(AssetTransferFields),
    AssetFreeze(AssetFreezeFields),
    ApplicationCall(ApplicationCallFields),
}

impl TxnBody {
    /// Empty body of the given type
    pub fn empty(txn_type: TransactionType) -> Self {
        match txn_type {
            TransactionType::Payment => TxnBody::Payment(Default::default()),
            TransactionType::KeyRegistration => TxnBody::KeyRegistration(Default::default()),
            TransactionType::AssetConfig => TxnBody::AssetConfig(Default::default()),
            TransactionType::AssetTransfer => TxnBody::AssetTransfer(Default::default()),
            TransactionType::AssetFreeze => TxnBody::AssetFreeze(Default::default()),
            TransactionType::ApplicationCall => TxnBody::ApplicationCall(Default::default()),
        }
    }

    pub fn txn_type(&self) -> TransactionType {
        match self {
            TxnBody::Payment(_) => TransactionType::Payment,
            TxnBody::KeyRegistration(_) => TransactionType::KeyRegistration,
            TxnBody::AssetConfig(_) => TransactionType::AssetConfig,
            TxnBody::AssetTransfer(_) => TransactionType::AssetTransfer,
            TxnBody::AssetFreeze(_) => TransactionType::AssetFreeze,
            TxnBody::ApplicationCall(_) => TransactionType::ApplicationCall,
        }
    }
}

/// A top-level or inner transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub header: TxnHeader,
    pub body: TxnBody,
}

impl Transaction {
    pub fn new(sender: Address, body: TxnBody) -> Self {
        Self {
            header: TxnHeader {
                sender,
                ..Default::default()
            },
            body,
        }
    }

    pub fn payment(sender: Address, receiver: Address, amount: u64) -> Self {
        Self::new(
            sender,
            TxnBody::Payment(PaymentFields {
                receiver,
                amount,
                ..Default::default()
            }),
        )
    }

    pub fn app_call(sender: Address, fields: ApplicationCallFields) -> Self {
        Self::new(sender, TxnBody::ApplicationCall(fields))
    }

    pub fn txn_type(&self) -> TransactionType {
        self.body.txn_type()
    }

    pub fn sender(&self) -> Address {
        self.header.sender
    }

    pub fn group_index(&self) -> usize {
        self.header.group_index
    }

    pub fn is_app_call(&self) -> bool {
        matches!(self.body, TxnBody::ApplicationCall(_))
    }

    pub fn app_call_fields(&self) -> TxnResult<&ApplicationCallFields> {
        match &self.body {
            TxnBody::ApplicationCall(fields) => Ok(fields),
            other => Err(not_app_call(other.txn_type())),
        }
    }

    pub fn app_call_fields_mut(&mut self) -> TxnResult<&mut ApplicationCallFields> {
        match &mut self.body {
            TxnBody::ApplicationCall(fields) => Ok(fields),
            other => Err(not_app_call(other.txn_type())),
        }
    }

    /// ARC4 selector of an application call, if it carries one
    pub fn selector(&self) -> Option<[u8; 4]> {
        let first = self.app_call_fields().ok()?.args.first()?;
        first.as_slice().try_into().ok()
    }

    fn reference_index(position: usize) -> Arc4Result<u8> {
        u8::try_from(position).map_err(|_| {
            Arc4Error::UnresolvedReference(format!(
                "reference index {} exceeds {}",
                position, MAX_REFERENCE_INDEX
            ))
        })
    }

    fn refs_mut(&mut self) -> Arc4Result<&mut ApplicationCallFields> {
        match &mut self.body {
            TxnBody::ApplicationCall(fields) => Ok(fields),
            other => Err(Arc4Error::UnresolvedReference(format!(
                "{} transactions carry no resource references",
                other.txn_type()
            ))),
        }
    }

    fn refs(&self) -> Arc4Result<&ApplicationCallFields> {
        match &self.body {
            TxnBody::ApplicationCall(fields) => Ok(fields),
            other => Err(Arc4Error::UnresolvedReference(format!(
                "{} transactions carry no resource references",
                other.txn_type()
            ))),
        }
    }
}

fn not_app_call(got: TransactionType) -> TxnError {
    TxnError::WrongTransactionType {
        expected: TransactionType::ApplicationCall.to_string(),
        got: got.to_string(),
    }
}

/// Index layout: account 0 is the sender and `accounts[i]` is `i + 1`;
/// application 0 is the called app and `apps[i]` is `i + 1`; assets are
/// 0-based. Unknown resources are appended to the reference arrays.
impl ResourceResolver for Transaction {
    fn encoding(&self) -> ResourceEncoding {
        match &self.body {
            TxnBody::ApplicationCall(fields) => fields.resource_encoding,
            _ => ResourceEncoding::Value,
        }
    }

    fn account_index(&mut self, address: &Address) -> Arc4Result<u8> {
        if *address == self.header.sender {
            return Ok(0);
        }
        let refs = self.refs_mut()?;
        let position = match refs.accounts.iter().position(|a| a == address) {
            Some(i) => i,
            None => {
                refs.accounts.push(*address);
                refs.accounts.len() - 1
            }
        };
        Self::reference_index(position + 1)
    }

    fn asset_index(&mut self, asset_id: u64) -> Arc4Result<u8> {
        let refs = self.refs_mut()?;
        let position = match refs.assets.iter().position(|a| *a == asset_id) {
            Some(i) => i,
            None => {
                refs.assets.push(asset_id);
                refs.assets.len() - 1
            }
        };
        Self::reference_index(position)
    }

    fn application_index(&mut self, app_id: u64) -> Arc4Result<u8> {
        let refs = self.refs_mut()?;
        if app_id == refs.app_id {
            return Ok(0);
        }
        let position = match refs.apps.iter().position(|a| *a == app_id) {
            Some(i) => i,
            None => {
                refs.apps.push(app_id);
                refs.apps.len() - 1
            }
        };
        Self::reference_index(position + 1)
    }

    fn account_at(&self, index: u8) -> Arc4Result<Address> {
        if index == 0 {
            return Ok(self.header.sender);
        }
        self.refs()?
            .accounts
            .get(index as usize - 1)
            .copied()
            .ok_or_else(|| Arc4Error::UnresolvedReference(format!("account index {}", index)))
    }

    fn asset_at(&self, index: u8) -> Arc4Result<u64> {
        self.refs()?
            .assets
            .get(index as usize)
            .copied()
            .ok_or_else(|| Arc4Error::UnresolvedReference(format!("asset index {}", index)))
    }

    fn application_at(&self, index: u8) -> Arc4Result<u64> {
        let refs = self.refs()?;
        if index == 0 {
            return Ok(refs.app_id);
        }
        refs.apps
            .get(index as usize - 1)
            .copied()
            .ok_or_else(|| Arc4Error::UnresolvedReference(format!("application index {}", index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avm_emu_arc4::{Arc4Value, DecodePrefix, Decoder, Encoder, TypeDescriptor};

    fn sender() -> Address {
        Address::new([1u8; 32])
    }

    fn call() -> Transaction {
        Transaction::app_call(sender(), ApplicationCallFields::new(1001, OnCompletion::NoOp))
    }

    #[test]
    fn test_on_completion_values() {
        assert_eq!(OnCompletion::DeleteApplication.as_u64(), 5);
        assert_eq!(OnCompletion::from_u64(1), Some(OnCompletion::OptIn));
        assert_eq!(OnCompletion::from_u64(6), None);
        assert_eq!("CloseOut".parse::<OnCompletion>().unwrap(), OnCompletion::CloseOut);
    }

    #[test]
    fn test_log_after_return_fails() {
        let mut fields = ApplicationCallFields::default();
        fields.append_log(b"before").unwrap();
        let ret = EncodedValue::encode(Arc4Value::from(1u64), TypeDescriptor::uint64()).unwrap();
        fields.set_return_value(ret).unwrap();

        let err = fields.append_log(b"after").unwrap_err();
        assert_eq!(err.to_string(), "cannot add logs after a return value has been set");

        // a second set overwrites
        let ret2 = EncodedValue::encode(Arc4Value::from(2u64), TypeDescriptor::uint64()).unwrap();
        fields.set_return_value(ret2.clone()).unwrap();
        assert_eq!(fields.num_logs(), 2);
        assert_eq!(fields.last_log().unwrap(), ret2.to_return_log());
    }

    #[test]
    fn test_log_limits() {
        let mut fields = ApplicationCallFields::default();
        for _ in 0..MAX_LOG_CALLS {
            fields.append_log(b"x").unwrap();
        }
        assert_eq!(fields.append_log(b"x"), Err(TxnError::TooManyLogs));

        let mut fields = ApplicationCallFields::default();
        fields.append_log(&[0u8; 1000]).unwrap();
        assert!(matches!(fields.append_log(&[0u8; 25]), Err(TxnError::LogsTooLarge(1025))));
    }

    #[test]
    fn test_account_references_index_mode() {
        let mut txn = call();
        let bob = Address::new([2u8; 32]);

        let encoded = Encoder::with_resolver(&mut txn)
            .encode(&Arc4Value::Account(bob), &TypeDescriptor::Account)
            .unwrap();
        assert_eq!(encoded, vec![1]);
        assert_eq!(txn.app_call_fields().unwrap().accounts, vec![bob]);

        let sender_ref = Encoder::with_resolver(&mut txn)
            .encode(&Arc4Value::Account(sender()), &TypeDescriptor::Account)
            .unwrap();
        assert_eq!(sender_ref, vec![0]);

        let decoded = Decoder::with_resolver(&txn)
            .decode(&[1], &TypeDescriptor::Account, DecodePrefix::None)
            .unwrap();
        assert_eq!(decoded, Arc4Value::Account(bob));
    }

    #[test]
    fn test_app_and_asset_references() {
        let mut txn = call();
        let mut enc = Encoder::with_resolver(&mut txn);
        assert_eq!(enc.encode(&Arc4Value::Application(1001), &TypeDescriptor::Application).unwrap(), vec![0]);
        assert_eq!(enc.encode(&Arc4Value::Application(7), &TypeDescriptor::Application).unwrap(), vec![1]);
        assert_eq!(enc.encode(&Arc4Value::Asset(55), &TypeDescriptor::Asset).unwrap(), vec![0]);
        drop(enc);
        assert_eq!(txn.application_at(1).unwrap(), 7);
        assert_eq!(txn.asset_at(0).unwrap(), 55);
        assert!(txn.asset_at(1).is_err());
    }

    #[test]
    fn test_value_mode_references() {
        let mut fields = ApplicationCallFields::new(1001, OnCompletion::NoOp);
        fields.resource_encoding = ResourceEncoding::Value;
        let mut txn = Transaction::app_call(sender(), fields);
        let encoded = Encoder::with_resolver(&mut txn)
            .encode(&Arc4Value::Asset(55), &TypeDescriptor::Asset)
            .unwrap();
        assert_eq!(encoded, 55u64.to_be_bytes().to_vec());
        assert!(txn.app_call_fields().unwrap().assets.is_empty());
    }

    #[test]
    fn test_wrong_type_access() {
        let pay = Transaction::payment(sender(), Address::ZERO, 5);
        assert!(matches!(
            pay.app_call_fields(),
            Err(TxnError::WrongTransactionType { .. })
        ));
        assert_eq!(pay.selector(), None);
    }
}
