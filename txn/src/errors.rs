//! Transaction engine errors

use avm_emu_arc4::constants::{MAX_GROUP_SIZE, MAX_LOG_CALLS, MAX_LOG_SIZE, SCRATCH_SLOTS};
use avm_emu_arc4::{Arc4Error, ErrorKind};
use avm_emu_ledger::LedgerError;
use thiserror::Error;

/// Transaction engine result type
pub type TxnResult<T> = Result<T, TxnError>;

/// Transaction engine errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxnError {
    /// Emulator bookkeeping violated (no active group, itxn discipline)
    #[error("{0}")]
    Internal(String),

    /// Routing or business rule check failed
    #[error("{0}")]
    Assertion(String),

    #[error("transaction group can have at most {} transactions, got {0}", MAX_GROUP_SIZE)]
    GroupTooLarge(usize),

    #[error("too many log calls in program, up to {} is allowed", MAX_LOG_CALLS)]
    TooManyLogs,

    #[error("program logs too large, {0} bytes > {} bytes limit", MAX_LOG_SIZE)]
    LogsTooLarge(usize),

    #[error("invalid scratch slot {0}, must be below {}", SCRATCH_SLOTS)]
    ScratchSlot(usize),

    #[error("{field} is not a valid field for {txn_type} transactions")]
    InvalidField { field: String, txn_type: String },

    #[error("expected {expected} transaction, got {got}")]
    WrongTransactionType { expected: String, got: String },

    #[error("resource reference index {0} exceeds 255")]
    TooManyReferences(usize),

    #[error(transparent)]
    Codec(#[from] Arc4Error),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl TxnError {
    pub(crate) fn internal(msg: impl Into<String>) -> Self {
        TxnError::Internal(msg.into())
    }

    pub(crate) fn assertion(msg: impl Into<String>) -> Self {
        TxnError::Assertion(msg.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TxnError::Internal(_) => ErrorKind::Internal,
            TxnError::Assertion(_) => ErrorKind::Assertion,
            TxnError::GroupTooLarge(_)
            | TxnError::TooManyLogs
            | TxnError::LogsTooLarge(_)
            | TxnError::ScratchSlot(_)
            | TxnError::InvalidField { .. }
            | TxnError::TooManyReferences(_) => ErrorKind::Protocol,
            TxnError::WrongTransactionType { .. } => ErrorKind::Coding,
            TxnError::Codec(e) => e.kind(),
            TxnError::Ledger(e) => e.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            TxnError::GroupTooLarge(17).to_string(),
            "transaction group can have at most 16 transactions, got 17"
        );
        assert_eq!(
            TxnError::TooManyLogs.to_string(),
            "too many log calls in program, up to 32 is allowed"
        );
    }

    #[test]
    fn test_kind_passthrough() {
        let err = TxnError::from(LedgerError::UnknownApplication(1));
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(TxnError::assertion("nope").kind(), ErrorKind::Assertion);
    }
}
