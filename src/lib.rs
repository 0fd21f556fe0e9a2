//! AVM-EMU: in-process emulator for unit-testing ARC4 smart contracts
//!
//! The root crate re-exports the member crates and provides the test
//! harness: an explicit [`TestExecutionContext`] owning the ledger and the
//! transaction context, scope guards over transaction groups and ABI method
//! calls.
//!
//! ## Crate Organization
//!
//! - `avm-emu-arc4`: type descriptors, ARC4 codec, selectors
//! - `avm-emu-ledger`: accounts, applications, assets, state slots, boxes
//! - `avm-emu-txn`: transactions, groups, inner transactions, routing
//!
//! ```text
//!          ┌──────────────────────────────┐
//!          │     TestExecutionContext     │
//!          ├──────────────┬───────────────┤
//!          │    Ledger    │ TxnContext    │
//!          │  (state,     │ (groups,      │
//!          │   boxes)     │  itxns)       │
//!          └──────┬───────┴───────┬───────┘
//!                 └──── ARC4 ─────┘
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod logging;

pub use avm_emu_arc4 as arc4;
pub use avm_emu_ledger as ledger;
pub use avm_emu_txn as txn;

pub use config::{ConfigError, EmulatorConfig, LoggingSettings, ResourceSettings};
pub use context::{MethodCall, Scope, TestExecutionContext};
pub use error::{EmulatorError, EmulatorResult};

/// Emulator version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commonly used types
pub mod prelude {
    pub use crate::arc4::{Address, Arc4Value, EncodedValue, ErrorKind, TypeDescriptor};
    pub use crate::ledger::{ApplicationParams, AssetParams, BoxMap, LogKind, LogValue, StackValue, TypedBox};
    pub use crate::txn::{
        ArgType, CreateRequirement, ItxnField, ItxnParams, MethodMetadata, OnCompletion, Transaction,
        TransactionType,
    };
    pub use crate::{EmulatorConfig, EmulatorError, EmulatorResult, MethodCall, TestExecutionContext};
}
