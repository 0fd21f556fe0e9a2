//! Ledger and state storage for the AVM emulator
//!
//! Single source of truth for chain state during a test run: accounts,
//! applications (with their global/local state and boxes), assets, blocks
//! and protocol globals.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                       Ledger                        │
//! ├─────────────────────────────────────────────────────┤
//! │  AccountData      (balances, holdings, opt-ins)     │
//! │  ApplicationData  (programs, StateSlots, BoxStore)  │
//! │  AssetData        (params, creator)                 │
//! │  BlockData / GlobalData                             │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Lookups of records that were never created fail with an internal error:
//! they indicate a misconfigured test, not an AVM rejection.

pub mod account;
pub mod application;
pub mod asset;
pub mod block;
pub mod boxes;
pub mod config;
pub mod errors;
pub mod global;
pub mod ledger;
pub mod logs;
pub mod state;
pub mod value;

pub use account::{AccountData, AssetHolding};
pub use application::{ApplicationData, ApplicationParams, StateSchema};
pub use asset::{AssetData, AssetParams};
pub use block::BlockData;
pub use boxes::{BoxMap, BoxStore, TypedBox};
pub use config::LedgerConfig;
pub use errors::{LedgerError, LedgerResult};
pub use global::GlobalData;
pub use ledger::Ledger;
pub use logs::{decode_logs, LogKind, LogValue};
pub use state::StateSlot;
pub use value::StackValue;
