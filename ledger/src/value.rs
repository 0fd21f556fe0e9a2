//! AVM stack values

use crate::errors::{LedgerError, LedgerResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value as the AVM sees it: uint64 or a byte string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StackValue {
    Uint64(u64),
    Bytes(Vec<u8>),
}

impl StackValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            StackValue::Uint64(_) => "uint64",
            StackValue::Bytes(_) => "bytes",
        }
    }

    pub fn is_uint64(&self) -> bool {
        matches!(self, StackValue::Uint64(_))
    }

    pub fn as_uint64(&self) -> LedgerResult<u64> {
        match self {
            StackValue::Uint64(v) => Ok(*v),
            other => Err(LedgerError::StackTypeMismatch {
                expected: "uint64",
                got: other.type_name(),
            }),
        }
    }

    pub fn as_bytes(&self) -> LedgerResult<&[u8]> {
        match self {
            StackValue::Bytes(b) => Ok(b),
            other => Err(LedgerError::StackTypeMismatch {
                expected: "bytes",
                got: other.type_name(),
            }),
        }
    }

    /// Zero value of the same type
    pub fn zero_like(&self) -> StackValue {
        match self {
            StackValue::Uint64(_) => StackValue::Uint64(0),
            StackValue::Bytes(_) => StackValue::Bytes(Vec::new()),
        }
    }
}

impl Default for StackValue {
    fn default() -> Self {
        StackValue::Uint64(0)
    }
}

impl From<u64> for StackValue {
    fn from(v: u64) -> Self {
        StackValue::Uint64(v)
    }
}

impl From<Vec<u8>> for StackValue {
    fn from(v: Vec<u8>) -> Self {
        StackValue::Bytes(v)
    }
}

impl From<&[u8]> for StackValue {
    fn from(v: &[u8]) -> Self {
        StackValue::Bytes(v.to_vec())
    }
}

impl From<&str> for StackValue {
    fn from(v: &str) -> Self {
        StackValue::Bytes(v.as_bytes().to_vec())
    }
}

impl fmt::Display for StackValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackValue::Uint64(v) => write!(f, "{}", v),
            StackValue::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_type_fails() {
        let v = StackValue::from(5u64);
        assert_eq!(v.as_uint64().unwrap(), 5);
        assert!(matches!(
            v.as_bytes(),
            Err(LedgerError::StackTypeMismatch { expected: "bytes", got: "uint64" })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(StackValue::from("ab").to_string(), "0x6162");
        assert_eq!(StackValue::from(3u64).to_string(), "3");
    }
}
