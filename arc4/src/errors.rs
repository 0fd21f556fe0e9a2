//! Error types for ARC4 encoding and decoding

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Codec result type
pub type Arc4Result<T> = Result<T, Arc4Error>;

/// Broad classification shared by every error in the emulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Caller supplied a value inconsistent with its declared type
    Coding,
    /// Condition the real AVM would reject
    Protocol,
    /// Emulator bookkeeping inconsistency, usually a test setup mistake
    Internal,
    /// Explicit routing or business-rule check failed
    Assertion,
}

/// Errors that can occur while encoding or decoding ARC4 values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Arc4Error {
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("arity mismatch: expected {expected} values, got {got}")]
    ArityMismatch { expected: usize, got: usize },

    #[error("expected value <= {max}")]
    Overflow { max: String },

    #[error("byte length {len} exceeds maximum of {max}")]
    MaxLengthExceeded { len: usize, max: usize },

    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("ABI return prefix not found")]
    ReturnPrefixNotFound,

    #[error("malformed {ty} encoding: {reason}")]
    Malformed { ty: String, reason: String },

    #[error("invalid type descriptor: {0}")]
    InvalidType(String),

    #[error("invalid method signature: {0}")]
    InvalidSignature(String),

    #[error("unresolved resource reference: {0}")]
    UnresolvedReference(String),
}

impl Arc4Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Arc4Error::TypeMismatch { .. }
            | Arc4Error::ArityMismatch { .. }
            | Arc4Error::InvalidType(_)
            | Arc4Error::InvalidSignature(_) => ErrorKind::Coding,
            Arc4Error::Overflow { .. }
            | Arc4Error::MaxLengthExceeded { .. }
            | Arc4Error::IndexOutOfBounds { .. }
            | Arc4Error::ReturnPrefixNotFound
            | Arc4Error::Malformed { .. } => ErrorKind::Protocol,
            Arc4Error::UnresolvedReference(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn mismatch(expected: impl ToString, got: impl ToString) -> Self {
        Arc4Error::TypeMismatch {
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }

    pub(crate) fn malformed(ty: impl ToString, reason: impl Into<String>) -> Self {
        Arc4Error::Malformed {
            ty: ty.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_message() {
        let err = Arc4Error::Overflow { max: "255".to_string() };
        assert_eq!(err.to_string(), "expected value <= 255");
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Arc4Error::mismatch("bool", "string").kind(), ErrorKind::Coding);
        assert_eq!(Arc4Error::ReturnPrefixNotFound.kind(), ErrorKind::Protocol);
        assert_eq!(
            Arc4Error::UnresolvedReference("account 3".into()).kind(),
            ErrorKind::Internal
        );
    }
}
