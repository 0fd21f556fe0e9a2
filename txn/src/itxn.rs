//! Inner transaction field sets and their ledger effects
//!
//! An [`ItxnParams`] is the field set being composed between `itxn_begin`
//! and `itxn_submit`. Fields are applied one at a time with
//! [`ItxnParams::set`], mirroring `itxn_field`. Setting the type switches the
//! body to an empty one of that type.

use crate::errors::{TxnError, TxnResult};
use crate::transaction::{
    ApplicationCallFields, OnCompletion, PaymentFields, Transaction, TransactionType, TxnBody, TxnHeader,
};
use avm_emu_arc4::Address;
use avm_emu_ledger::{ApplicationParams, AssetParams, Ledger};
use tracing::debug;

/// One `itxn_field` assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItxnField {
    Type(TransactionType),
    Sender(Address),
    Fee(u64),
    Note(Vec<u8>),
    RekeyTo(Address),
    // pay
    Receiver(Address),
    Amount(u64),
    CloseRemainderTo(Address),
    // keyreg
    VotePk(Vec<u8>),
    SelectionPk(Vec<u8>),
    VoteFirst(u64),
    VoteLast(u64),
    VoteKeyDilution(u64),
    Nonparticipation(bool),
    // acfg
    ConfigAsset(u64),
    ConfigAssetTotal(u64),
    ConfigAssetDecimals(u32),
    ConfigAssetDefaultFrozen(bool),
    ConfigAssetUnitName(Vec<u8>),
    ConfigAssetName(Vec<u8>),
    ConfigAssetUrl(Vec<u8>),
    ConfigAssetMetadataHash([u8; 32]),
    ConfigAssetManager(Address),
    ConfigAssetReserve(Address),
    ConfigAssetFreeze(Address),
    ConfigAssetClawback(Address),
    // axfer
    XferAsset(u64),
    AssetAmount(u64),
    AssetSender(Address),
    AssetReceiver(Address),
    AssetCloseTo(Address),
    // afrz
    FreezeAsset(u64),
    FreezeAssetAccount(Address),
    FreezeAssetFrozen(bool),
    // appl
    ApplicationId(u64),
    OnCompletion(OnCompletion),
    /// Appends one application argument
    ApplicationArgs(Vec<u8>),
    /// Appends one account reference
    Accounts(Address),
    /// Appends one asset reference
    Assets(u64),
    /// Appends one application reference
    Applications(u64),
    ApprovalProgram(Vec<u8>),
    ClearStateProgram(Vec<u8>),
    GlobalNumUint(u64),
    GlobalNumByteSlice(u64),
    LocalNumUint(u64),
    LocalNumByteSlice(u64),
    ExtraProgramPages(u64),
}

impl ItxnField {
    pub fn name(&self) -> &'static str {
        match self {
            ItxnField::Type(_) => "TypeEnum",
            ItxnField::Sender(_) => "Sender",
            ItxnField::Fee(_) => "Fee",
            ItxnField::Note(_) => "Note",
            ItxnField::RekeyTo(_) => "RekeyTo",
            ItxnField::Receiver(_) => "Receiver",
            ItxnField::Amount(_) => "Amount",
            ItxnField::CloseRemainderTo(_) => "CloseRemainderTo",
            ItxnField::VotePk(_) => "VotePK",
            ItxnField::SelectionPk(_) => "SelectionPK",
            ItxnField::VoteFirst(_) => "VoteFirst",
            ItxnField::VoteLast(_) => "VoteLast",
            ItxnField::VoteKeyDilution(_) => "VoteKeyDilution",
            ItxnField::Nonparticipation(_) => "Nonparticipation",
            ItxnField::ConfigAsset(_) => "ConfigAsset",
            ItxnField::ConfigAssetTotal(_) => "ConfigAssetTotal",
            ItxnField::ConfigAssetDecimals(_) => "ConfigAssetDecimals",
            ItxnField::ConfigAssetDefaultFrozen(_) => "ConfigAssetDefaultFrozen",
            ItxnField::ConfigAssetUnitName(_) => "ConfigAssetUnitName",
            ItxnField::ConfigAssetName(_) => "ConfigAssetName",
            ItxnField::ConfigAssetUrl(_) => "ConfigAssetURL",
            ItxnField::ConfigAssetMetadataHash(_) => "ConfigAssetMetadataHash",
            ItxnField::ConfigAssetManager(_) => "ConfigAssetManager",
            ItxnField::ConfigAssetReserve(_) => "ConfigAssetReserve",
            ItxnField::ConfigAssetFreeze(_) => "ConfigAssetFreeze",
            ItxnField::ConfigAssetClawback(_) => "ConfigAssetClawback",
            ItxnField::XferAsset(_) => "XferAsset",
            ItxnField::AssetAmount(_) => "AssetAmount",
            ItxnField::AssetSender(_) => "AssetSender",
            ItxnField::AssetReceiver(_) => "AssetReceiver",
            ItxnField::AssetCloseTo(_) => "AssetCloseTo",
            ItxnField::FreezeAsset(_) => "FreezeAsset",
            ItxnField::FreezeAssetAccount(_) => "FreezeAssetAccount",
            ItxnField::FreezeAssetFrozen(_) => "FreezeAssetFrozen",
            ItxnField::ApplicationId(_) => "ApplicationID",
            ItxnField::OnCompletion(_) => "OnCompletion",
            ItxnField::ApplicationArgs(_) => "ApplicationArgs",
            ItxnField::Accounts(_) => "Accounts",
            ItxnField::Assets(_) => "Assets",
            ItxnField::Applications(_) => "Applications",
            ItxnField::ApprovalProgram(_) => "ApprovalProgram",
            ItxnField::ClearStateProgram(_) => "ClearStateProgram",
            ItxnField::GlobalNumUint(_) => "GlobalNumUint",
            ItxnField::GlobalNumByteSlice(_) => "GlobalNumByteSlice",
            ItxnField::LocalNumUint(_) => "LocalNumUint",
            ItxnField::LocalNumByteSlice(_) => "LocalNumByteSlice",
            ItxnField::ExtraProgramPages(_) => "ExtraProgramPages",
        }
    }
}

/// Field set of one inner transaction under composition
#[derive(Debug, Clone, PartialEq)]
pub struct ItxnParams {
    /// Defaults to the calling application's address
    pub sender: Option<Address>,
    pub fee: u64,
    pub note: Vec<u8>,
    pub rekey_to: Address,
    pub body: TxnBody,
}

impl ItxnParams {
    pub fn new(txn_type: TransactionType) -> Self {
        Self::with_body(TxnBody::empty(txn_type))
    }

    pub fn with_body(body: TxnBody) -> Self {
        Self {
            sender: None,
            fee: 0,
            note: Vec::new(),
            rekey_to: Address::ZERO,
            body,
        }
    }

    pub fn payment(receiver: Address, amount: u64) -> Self {
        Self::with_body(TxnBody::Payment(PaymentFields {
            receiver,
            amount,
            ..Default::default()
        }))
    }

    pub fn app_call(app_id: u64, on_completion: OnCompletion, args: Vec<Vec<u8>>) -> Self {
        let mut fields = ApplicationCallFields::new(app_id, on_completion);
        fields.args = args;
        Self::with_body(TxnBody::ApplicationCall(fields))
    }

    pub fn txn_type(&self) -> TransactionType {
        self.body.txn_type()
    }

    /// Apply one field assignment
    pub fn set(&mut self, field: ItxnField) -> TxnResult<()> {
        let txn_type = self.txn_type();
        let invalid = |field: &ItxnField| TxnError::InvalidField {
            field: field.name().to_string(),
            txn_type: txn_type.to_string(),
        };

        let field = match field {
            ItxnField::Type(t) => {
                if t != txn_type {
                    self.body = TxnBody::empty(t);
                }
                return Ok(());
            }
            ItxnField::Sender(a) => {
                self.sender = Some(a);
                return Ok(());
            }
            ItxnField::Fee(v) => {
                self.fee = v;
                return Ok(());
            }
            ItxnField::Note(v) => {
                self.note = v;
                return Ok(());
            }
            ItxnField::RekeyTo(a) => {
                self.rekey_to = a;
                return Ok(());
            }
            other => other,
        };

        match (&mut self.body, field) {
            (TxnBody::Payment(p), ItxnField::Receiver(a)) => p.receiver = a,
            (TxnBody::Payment(p), ItxnField::Amount(v)) => p.amount = v,
            (TxnBody::Payment(p), ItxnField::CloseRemainderTo(a)) => p.close_remainder_to = a,

            (TxnBody::KeyRegistration(k), ItxnField::VotePk(v)) => k.vote_pk = v,
            (TxnBody::KeyRegistration(k), ItxnField::SelectionPk(v)) => k.selection_pk = v,
            (TxnBody::KeyRegistration(k), ItxnField::VoteFirst(v)) => k.vote_first = v,
            (TxnBody::KeyRegistration(k), ItxnField::VoteLast(v)) => k.vote_last = v,
            (TxnBody::KeyRegistration(k), ItxnField::VoteKeyDilution(v)) => k.vote_key_dilution = v,
            (TxnBody::KeyRegistration(k), ItxnField::Nonparticipation(v)) => k.non_participation = v,

            (TxnBody::AssetConfig(c), ItxnField::ConfigAsset(v)) => c.config_asset = v,
            (TxnBody::AssetConfig(c), ItxnField::ConfigAssetTotal(v)) => c.params.total = v,
            (TxnBody::AssetConfig(c), ItxnField::ConfigAssetDecimals(v)) => c.params.decimals = v,
            (TxnBody::AssetConfig(c), ItxnField::ConfigAssetDefaultFrozen(v)) => c.params.default_frozen = v,
            (TxnBody::AssetConfig(c), ItxnField::ConfigAssetUnitName(v)) => c.params.unit_name = v,
            (TxnBody::AssetConfig(c), ItxnField::ConfigAssetName(v)) => c.params.name = v,
            (TxnBody::AssetConfig(c), ItxnField::ConfigAssetUrl(v)) => c.params.url = v,
            (TxnBody::AssetConfig(c), ItxnField::ConfigAssetMetadataHash(v)) => c.params.metadata_hash = v,
            (TxnBody::AssetConfig(c), ItxnField::ConfigAssetManager(a)) => c.params.manager = a,
            (TxnBody::AssetConfig(c), ItxnField::ConfigAssetReserve(a)) => c.params.reserve = a,
            (TxnBody::AssetConfig(c), ItxnField::ConfigAssetFreeze(a)) => c.params.freeze = a,
            (TxnBody::AssetConfig(c), ItxnField::ConfigAssetClawback(a)) => c.params.clawback = a,

            (TxnBody::AssetTransfer(x), ItxnField::XferAsset(v)) => x.xfer_asset = v,
            (TxnBody::AssetTransfer(x), ItxnField::AssetAmount(v)) => x.asset_amount = v,
            (TxnBody::AssetTransfer(x), ItxnField::AssetSender(a)) => x.asset_sender = a,
            (TxnBody::AssetTransfer(x), ItxnField::AssetReceiver(a)) => x.asset_receiver = a,
            (TxnBody::AssetTransfer(x), ItxnField::AssetCloseTo(a)) => x.asset_close_to = a,

            (TxnBody::AssetFreeze(f), ItxnField::FreezeAsset(v)) => f.freeze_asset = v,
            (TxnBody::AssetFreeze(f), ItxnField::FreezeAssetAccount(a)) => f.freeze_account = a,
            (TxnBody::AssetFreeze(f), ItxnField::FreezeAssetFrozen(v)) => f.frozen = v,

            (TxnBody::ApplicationCall(a), ItxnField::ApplicationId(v)) => a.app_id = v,
            (TxnBody::ApplicationCall(a), ItxnField::OnCompletion(v)) => a.on_completion = v,
            (TxnBody::ApplicationCall(a), ItxnField::ApplicationArgs(v)) => a.args.push(v),
            (TxnBody::ApplicationCall(a), ItxnField::Accounts(v)) => a.accounts.push(v),
            (TxnBody::ApplicationCall(a), ItxnField::Assets(v)) => a.assets.push(v),
            (TxnBody::ApplicationCall(a), ItxnField::Applications(v)) => a.apps.push(v),
            (TxnBody::ApplicationCall(a), ItxnField::ApprovalProgram(v)) => a.approval_program = v,
            (TxnBody::ApplicationCall(a), ItxnField::ClearStateProgram(v)) => a.clear_state_program = v,
            (TxnBody::ApplicationCall(a), ItxnField::GlobalNumUint(v)) => a.global_schema.num_uint = v,
            (TxnBody::ApplicationCall(a), ItxnField::GlobalNumByteSlice(v)) => a.global_schema.num_bytes = v,
            (TxnBody::ApplicationCall(a), ItxnField::LocalNumUint(v)) => a.local_schema.num_uint = v,
            (TxnBody::ApplicationCall(a), ItxnField::LocalNumByteSlice(v)) => a.local_schema.num_bytes = v,
            (TxnBody::ApplicationCall(a), ItxnField::ExtraProgramPages(v)) => a.extra_program_pages = v,

            (_, other) => return Err(invalid(&other)),
        }
        Ok(())
    }

    /// Inner transactions left on an application call field set by a prior
    /// C2C call. They are removed so the submitted group holds them once.
    pub(crate) fn take_nested(&mut self) -> Vec<Transaction> {
        match &mut self.body {
            TxnBody::ApplicationCall(call) => std::mem::take(&mut call.inner_txns),
            _ => Vec::new(),
        }
    }

    /// Turn the field set into a transaction at `group_index`
    pub(crate) fn into_transaction(self, default_sender: Address, group_index: usize, txn_id: [u8; 32]) -> Transaction {
        Transaction {
            header: TxnHeader {
                sender: self.sender.unwrap_or(default_sender),
                fee: self.fee,
                note: self.note,
                rekey_to: self.rekey_to,
                group_index,
                txn_id,
                ..Default::default()
            },
            body: self.body,
        }
    }
}

impl Default for ItxnParams {
    fn default() -> Self {
        Self::new(TransactionType::Payment)
    }
}

/// Apply the ledger side effects of a submitted inner transaction:
/// asset creation, application creation and opt-ins.
pub(crate) fn apply_effects(txn: &mut Transaction, ledger: &mut Ledger) -> TxnResult<()> {
    let sender = txn.header.sender;
    match &mut txn.body {
        TxnBody::AssetConfig(cfg) if cfg.config_asset == 0 => {
            let id = ledger.create_asset(&sender, cfg.params.clone());
            cfg.created_asset_id = id;
            debug!(asset_id = id, "Inner transaction created asset");
        }
        TxnBody::AssetConfig(cfg) => {
            ledger.asset_mut(cfg.config_asset)?.params = cfg.params.clone();
        }
        TxnBody::AssetTransfer(xfer) if xfer.asset_amount == 0 && xfer.asset_receiver == sender => {
            ledger.opt_in_asset(xfer.xfer_asset, &sender)?;
        }
        TxnBody::ApplicationCall(call) if call.app_id == 0 => {
            let params = ApplicationParams {
                approval_program: call.approval_program.clone(),
                clear_state_program: call.clear_state_program.clone(),
                global_schema: call.global_schema,
                local_schema: call.local_schema,
                extra_program_pages: call.extra_program_pages,
            };
            let id = ledger.create_application(&sender, params);
            call.created_app_id = id;
            debug!(app_id = id, "Inner transaction created application");
        }
        TxnBody::ApplicationCall(call) => match call.on_completion {
            OnCompletion::OptIn => ledger.opt_in_application(call.app_id, &sender)?,
            OnCompletion::CloseOut | OnCompletion::ClearState => {
                if ledger.is_opted_in(call.app_id, &sender)? {
                    ledger.close_out_application(call.app_id, &sender)?;
                }
            }
            _ => {
                ledger.application(call.app_id)?;
            }
        },
        _ => {}
    }
    Ok(())
}

/// Creation parameters for an asset config field set
pub fn asset_config(params: AssetParams) -> ItxnParams {
    ItxnParams::with_body(TxnBody::AssetConfig(crate::transaction::AssetConfigFields {
        params,
        ..Default::default()
    }))
}
