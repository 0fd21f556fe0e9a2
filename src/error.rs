//! Emulator errors
//!
//! Wraps the errors of the member crates so harness code can use `?`
//! throughout; [`EmulatorError::kind`] keeps the four-way classification.

use crate::config::ConfigError;
use avm_emu_arc4::{Arc4Error, ErrorKind};
use avm_emu_ledger::LedgerError;
use avm_emu_txn::TxnError;
use thiserror::Error;

/// Result type for harness operations
pub type EmulatorResult<T> = Result<T, EmulatorError>;

/// Errors raised by the test execution harness
#[derive(Debug, Error)]
pub enum EmulatorError {
    #[error(transparent)]
    Codec(#[from] Arc4Error),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Txn(#[from] TxnError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EmulatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EmulatorError::Codec(e) => e.kind(),
            EmulatorError::Ledger(e) => e.kind(),
            EmulatorError::Txn(e) => e.kind(),
            EmulatorError::Config(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_passes_through() {
        let err: EmulatorError = Arc4Error::Overflow { max: "255".into() }.into();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(err.to_string(), "expected value <= 255");

        let err: EmulatorError = LedgerError::UnknownApplication(7).into();
        assert_eq!(err.kind(), ErrorKind::Internal);

        let err: EmulatorError = TxnError::Assertion("nope".into()).into();
        assert_eq!(err.kind(), ErrorKind::Assertion);
    }
}
