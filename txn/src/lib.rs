//! # avm-emu-txn
//!
//! Transaction model of the emulator: transactions and their type-specific
//! fields, bounded transaction groups with scratch space, inner transaction
//! composition and submission, and ABI method routing.
//!
//! ```text
//! TransactionContext
//!   ├── current: TransactionGroup ── active txn ── ApplicationCallFields
//!   │                               ├── scratch[256] per txn
//!   │                               ├── compose buffer (itxn begin/next/field)
//!   │                               └── submitted inner groups
//!   ├── history: [TransactionGroup]
//!   └── observers: selector + on-completion → callback
//! ```

pub mod context;
pub mod errors;
pub mod group;
pub mod itxn;
pub mod observer;
pub mod routing;
pub mod transaction;

pub use context::TransactionContext;
pub use errors::{TxnError, TxnResult};
pub use group::{DeferredAppCall, GroupItem, ScratchSpace, TransactionGroup};
pub use itxn::{asset_config, ItxnField, ItxnParams};
pub use observer::{AppCallObserver, ObserverRegistry};
pub use routing::{
    check_routing_conditions, decode_method_args, encode_method_args, txn_args, ArgType, ContractMetadata,
    CreateRequirement, MetadataRegistry, MethodMetadata,
};
pub use transaction::{
    ApplicationCallFields, AssetConfigFields, AssetFreezeFields, AssetTransferFields, KeyRegistrationFields,
    OnCompletion, PaymentFields, Transaction, TransactionType, TxnBody, TxnHeader,
};
