//! Global and local state slots

use crate::errors::{LedgerError, LedgerResult};
use crate::value::StackValue;
use avm_emu_arc4::{EncodedValue, TypeDescriptor};
use serde::{Deserialize, Serialize};

/// One key of global or local application state.
///
/// A slot remembers the type of the last value written so that deleting a
/// numeric slot leaves it at zero rather than unset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StateSlot {
    key: Vec<u8>,
    value: Option<StackValue>,
}

impl StateSlot {
    pub fn new(key: &[u8]) -> Self {
        Self {
            key: key.to_vec(),
            value: None,
        }
    }

    pub fn with_value(key: &[u8], value: StackValue) -> Self {
        Self {
            key: key.to_vec(),
            value: Some(value),
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// Current value; fails if the slot is unset
    pub fn value(&self) -> LedgerResult<&StackValue> {
        self.value
            .as_ref()
            .ok_or_else(|| LedgerError::StateNotSet(display_key(&self.key)))
    }

    pub fn maybe(&self) -> Option<&StackValue> {
        self.value.as_ref()
    }

    pub fn set(&mut self, value: StackValue) {
        self.value = Some(value);
    }

    /// Numeric slots reset to zero, byte slots become unset
    pub fn delete(&mut self) {
        self.value = match self.value.take() {
            Some(StackValue::Uint64(_)) => Some(StackValue::Uint64(0)),
            _ => None,
        };
    }

    /// Decode the stored bytes as an ARC4 value of type `ty`
    pub fn typed(&self, ty: &TypeDescriptor) -> LedgerResult<EncodedValue> {
        let bytes = self.value()?.as_bytes()?;
        Ok(EncodedValue::from_bytes(bytes, ty.clone())?)
    }

    pub fn set_typed(&mut self, value: &EncodedValue) {
        self.value = Some(StackValue::Bytes(value.bytes().to_vec()));
    }
}

/// Printable form of a state key: utf-8 when possible, hex otherwise
pub(crate) fn display_key(key: &[u8]) -> String {
    match std::str::from_utf8(key) {
        Ok(s) if s.chars().all(|c| !c.is_control()) => s.to_string(),
        _ => format!("0x{}", hex::encode(key)),
    }
}
