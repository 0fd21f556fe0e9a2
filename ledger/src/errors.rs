//! Ledger errors

use avm_emu_arc4::constants::MAX_BOX_SIZE;
use avm_emu_arc4::{Address, Arc4Error, ErrorKind};
use thiserror::Error;

/// Ledger result type
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Account was never registered with the ledger
    #[error("Unknown account {0}, ensure it has been created in the test context")]
    UnknownAccount(Address),

    #[error("Unknown application {0}, ensure it has been created in the test context")]
    UnknownApplication(u64),

    #[error("Unknown asset {0}, ensure it has been created in the test context")]
    UnknownAsset(u64),

    #[error("Unknown block for round {0}")]
    UnknownBlock(u64),

    /// Read of a state key that holds no value
    #[error("value is not set for key {0}")]
    StateNotSet(String),

    #[error("account {account} is not opted in to application {app_id}")]
    NotOptedIn { app_id: u64, account: Address },

    #[error("account {account} is not opted in to asset {asset_id}")]
    NotOptedInAsset { asset_id: u64, account: Address },

    /// Stack value read with the wrong expected type
    #[error("expected {expected} value, got {got}")]
    StackTypeMismatch { expected: &'static str, got: &'static str },

    #[error("Box has not been created: {0}")]
    BoxNotCreated(String),

    #[error("Box size cannot be less than {min}")]
    BoxSizeTooSmall { min: usize },

    #[error("Box size {size} exceeds maximum of {}", MAX_BOX_SIZE)]
    BoxTooLarge { size: usize },

    /// Dynamic value type and no explicit size
    #[error("Box size must be specified for dynamically sized type {0}")]
    BoxSizeRequired(String),

    #[error("box {key} already exists with size {existing}, requested {requested}")]
    BoxSizeMismatch {
        key: String,
        existing: usize,
        requested: usize,
    },

    #[error("attempt to box_put wrong size")]
    BoxWrongSize,

    #[error("byte range {start}..{end} out of bounds for box of size {size}")]
    BoxOutOfBounds { start: usize, end: usize, size: usize },

    /// Codec error
    #[error(transparent)]
    Codec(#[from] Arc4Error),
}

impl LedgerError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::UnknownAccount(_)
            | LedgerError::UnknownApplication(_)
            | LedgerError::UnknownAsset(_)
            | LedgerError::UnknownBlock(_) => ErrorKind::Internal,
            LedgerError::StackTypeMismatch { .. } | LedgerError::BoxSizeRequired(_) => ErrorKind::Coding,
            LedgerError::StateNotSet(_)
            | LedgerError::NotOptedIn { .. }
            | LedgerError::NotOptedInAsset { .. }
            | LedgerError::BoxNotCreated(_)
            | LedgerError::BoxSizeTooSmall { .. }
            | LedgerError::BoxTooLarge { .. }
            | LedgerError::BoxSizeMismatch { .. }
            | LedgerError::BoxWrongSize
            | LedgerError::BoxOutOfBounds { .. } => ErrorKind::Protocol,
            LedgerError::Codec(e) => e.kind(),
        }
    }
}
