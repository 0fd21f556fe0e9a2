//! Application box storage
//!
//! [`BoxStore`] holds the raw bytes of every box of one application plus a
//! cache of decoded values. Raw writes always drop the cached value for the
//! key; typed writes through [`TypedBox`] repopulate it.
//!
//! Box length is fixed at creation. `replace` and `splice` keep the existing
//! length; only `resize` (or deleting and recreating) changes it.

use crate::errors::{LedgerError, LedgerResult};
use crate::state::display_key;
use avm_emu_arc4::constants::MAX_BOX_SIZE;
use avm_emu_arc4::{Arc4Error, Arc4Value, EncodedValue, Encoder, TypeDescriptor};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Raw boxes of one application
#[derive(Debug, Clone, Default)]
pub struct BoxStore {
    boxes: BTreeMap<Vec<u8>, Vec<u8>>,
    cache: HashMap<Vec<u8>, EncodedValue>,
}

impl BoxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a zero-filled box.
    ///
    /// Returns `false` if a box of the same size already exists; an existing
    /// box of a different size is an error.
    pub fn create(&mut self, key: &[u8], size: usize) -> LedgerResult<bool> {
        check_size(size)?;
        if let Some(existing) = self.boxes.get(key) {
            if existing.len() != size {
                return Err(LedgerError::BoxSizeMismatch {
                    key: display_key(key),
                    existing: existing.len(),
                    requested: size,
                });
            }
            return Ok(false);
        }
        debug!(key = %display_key(key), size, "Box created");
        self.boxes.insert(key.to_vec(), vec![0u8; size]);
        self.cache.remove(key);
        Ok(true)
    }

    pub fn exists(&self, key: &[u8]) -> bool {
        self.boxes.contains_key(key)
    }

    pub fn length(&self, key: &[u8]) -> LedgerResult<usize> {
        Ok(self.get(key)?.len())
    }

    pub fn get(&self, key: &[u8]) -> LedgerResult<&[u8]> {
        self.boxes
            .get(key)
            .map(Vec::as_slice)
            .ok_or_else(|| LedgerError::BoxNotCreated(display_key(key)))
    }

    pub fn maybe(&self, key: &[u8]) -> Option<&[u8]> {
        self.boxes.get(key).map(Vec::as_slice)
    }

    /// Write a whole box. Creates the box when missing; an existing box
    /// must have exactly `bytes.len()` bytes.
    pub fn put(&mut self, key: &[u8], bytes: &[u8]) -> LedgerResult<()> {
        check_size(bytes.len())?;
        match self.boxes.get_mut(key) {
            Some(existing) if existing.len() != bytes.len() => return Err(LedgerError::BoxWrongSize),
            Some(existing) => existing.copy_from_slice(bytes),
            None => {
                self.boxes.insert(key.to_vec(), bytes.to_vec());
            }
        }
        self.cache.remove(key);
        Ok(())
    }

    /// Remove a box, returning whether it existed
    pub fn delete(&mut self, key: &[u8]) -> bool {
        self.cache.remove(key);
        self.boxes.remove(key).is_some()
    }

    pub fn extract(&self, key: &[u8], start: usize, length: usize) -> LedgerResult<Vec<u8>> {
        let content = self.get(key)?;
        let end = checked_range(start, length, content.len())?;
        Ok(content[start..end].to_vec())
    }

    /// Overwrite bytes in place starting at `start`
    pub fn replace(&mut self, key: &[u8], start: usize, bytes: &[u8]) -> LedgerResult<()> {
        let content = self.get_mut(key)?;
        let end = checked_range(start, bytes.len(), content.len())?;
        content[start..end].copy_from_slice(bytes);
        self.cache.remove(key);
        Ok(())
    }

    /// Remove `length` bytes at `start` and insert `bytes` there. The result
    /// is truncated or zero-padded back to the original box length.
    pub fn splice(&mut self, key: &[u8], start: usize, length: usize, bytes: &[u8]) -> LedgerResult<()> {
        let content = self.get_mut(key)?;
        let size = content.len();
        let end = checked_range(start, length, size)?;

        content.splice(start..end, bytes.iter().copied());
        content.resize(size, 0);
        self.cache.remove(key);
        Ok(())
    }

    /// Change a box's length, truncating or zero-padding its content
    pub fn resize(&mut self, key: &[u8], size: usize) -> LedgerResult<()> {
        check_size(size)?;
        self.get_mut(key)?.resize(size, 0);
        self.cache.remove(key);
        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.boxes.keys().map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Decoded value of a box, using the cache when the type matches.
    ///
    /// Static types decode only their leading bytes so that a box created
    /// larger than its value type still reads back.
    pub fn decoded(&mut self, key: &[u8], ty: &TypeDescriptor) -> LedgerResult<EncodedValue> {
        if let Some(cached) = self.cache.get(key) {
            if cached.descriptor() == ty {
                return Ok(cached.clone());
            }
        }
        let content = self.get(key)?;
        let bytes = match ty.fixed_byte_length() {
            Some(len) if len <= content.len() => &content[..len],
            _ => content,
        };
        let value = EncodedValue::from_bytes(bytes, ty.clone())?;
        self.cache.insert(key.to_vec(), value.clone());
        Ok(value)
    }

    fn get_mut(&mut self, key: &[u8]) -> LedgerResult<&mut Vec<u8>> {
        self.boxes
            .get_mut(key)
            .ok_or_else(|| LedgerError::BoxNotCreated(display_key(key)))
    }

    fn cache_value(&mut self, key: &[u8], value: EncodedValue) {
        self.cache.insert(key.to_vec(), value);
    }
}

fn check_size(size: usize) -> LedgerResult<()> {
    if size > MAX_BOX_SIZE {
        return Err(LedgerError::BoxTooLarge { size });
    }
    Ok(())
}

fn checked_range(start: usize, length: usize, size: usize) -> LedgerResult<usize> {
    let end = start.saturating_add(length);
    if end > size {
        return Err(LedgerError::BoxOutOfBounds { start, end, size });
    }
    Ok(end)
}

/// A box holding one ARC4-typed value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedBox {
    key: Vec<u8>,
    descriptor: TypeDescriptor,
}

impl TypedBox {
    pub fn new(key: &[u8], descriptor: TypeDescriptor) -> Self {
        Self {
            key: key.to_vec(),
            descriptor,
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Create the box, sized from the value type unless `size` is given.
    ///
    /// An explicit size may not be smaller than the type's encoded length.
    /// Dynamic types require an explicit size.
    pub fn create(&self, store: &mut BoxStore, size: Option<usize>) -> LedgerResult<bool> {
        let size = match (self.descriptor.fixed_byte_length(), size) {
            (None, None) => return Err(LedgerError::BoxSizeRequired(self.descriptor.to_string())),
            (Some(min), Some(size)) if size < min => return Err(LedgerError::BoxSizeTooSmall { min }),
            (Some(min), None) => min,
            (_, Some(size)) => size,
        };
        store.create(&self.key, size)
    }

    pub fn exists(&self, store: &BoxStore) -> bool {
        store.exists(&self.key)
    }

    pub fn length(&self, store: &BoxStore) -> LedgerResult<usize> {
        store.length(&self.key)
    }

    pub fn value(&self, store: &mut BoxStore) -> LedgerResult<EncodedValue> {
        store.decoded(&self.key, &self.descriptor)
    }

    pub fn maybe(&self, store: &mut BoxStore) -> LedgerResult<Option<EncodedValue>> {
        if !store.exists(&self.key) {
            return Ok(None);
        }
        self.value(store).map(Some)
    }

    /// Store `value`.
    ///
    /// Static types are written in place at the start of an existing box and
    /// must fit in it. Dynamic types replace the box content and length.
    pub fn set(&self, store: &mut BoxStore, value: &EncodedValue) -> LedgerResult<()> {
        if value.descriptor() != &self.descriptor {
            return Err(Arc4Error::TypeMismatch {
                expected: self.descriptor.to_string(),
                got: value.descriptor().to_string(),
            }
            .into());
        }
        let bytes = value.bytes();
        match store.maybe(&self.key).map(<[u8]>::len) {
            Some(size) if !self.descriptor.is_dynamic() => {
                if bytes.len() > size {
                    return Err(LedgerError::BoxWrongSize);
                }
                store.replace(&self.key, 0, bytes)?;
            }
            Some(size) if size != bytes.len() => {
                store.resize(&self.key, bytes.len())?;
                store.put(&self.key, bytes)?;
            }
            _ => store.put(&self.key, bytes)?,
        }
        store.cache_value(&self.key, value.clone());
        Ok(())
    }

    /// Encode a native value as the box type and store it
    pub fn set_native(&self, store: &mut BoxStore, value: Arc4Value) -> LedgerResult<()> {
        let encoded = EncodedValue::encode_with(
            &mut Encoder::new().max_len(MAX_BOX_SIZE),
            value,
            self.descriptor.clone(),
        )?;
        self.set(store, &encoded)
    }

    pub fn delete(&self, store: &mut BoxStore) -> bool {
        store.delete(&self.key)
    }
}

/// Family of typed boxes sharing a key prefix: key = prefix || encoded key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxMap {
    prefix: Vec<u8>,
    key_type: TypeDescriptor,
    value_type: TypeDescriptor,
}

impl BoxMap {
    pub fn new(prefix: &[u8], key_type: TypeDescriptor, value_type: TypeDescriptor) -> Self {
        Self {
            prefix: prefix.to_vec(),
            key_type,
            value_type,
        }
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// Full box key for a map key
    pub fn box_key(&self, key: &Arc4Value) -> LedgerResult<Vec<u8>> {
        let encoded = avm_emu_arc4::encode(key, &self.key_type)?;
        let mut full = self.prefix.clone();
        full.extend_from_slice(&encoded);
        Ok(full)
    }

    /// The typed box backing `key`
    pub fn entry(&self, key: &Arc4Value) -> LedgerResult<TypedBox> {
        Ok(TypedBox::new(&self.box_key(key)?, self.value_type.clone()))
    }

    pub fn get(&self, store: &mut BoxStore, key: &Arc4Value) -> LedgerResult<EncodedValue> {
        self.entry(key)?.value(store)
    }

    pub fn maybe(&self, store: &mut BoxStore, key: &Arc4Value) -> LedgerResult<Option<EncodedValue>> {
        self.entry(key)?.maybe(store)
    }

    pub fn set(&self, store: &mut BoxStore, key: &Arc4Value, value: Arc4Value) -> LedgerResult<()> {
        self.entry(key)?.set_native(store, value)
    }

    pub fn contains(&self, store: &BoxStore, key: &Arc4Value) -> LedgerResult<bool> {
        Ok(store.exists(&self.box_key(key)?))
    }

    pub fn delete(&self, store: &mut BoxStore, key: &Arc4Value) -> LedgerResult<bool> {
        Ok(store.delete(&self.box_key(key)?))
    }

    pub fn length(&self, store: &BoxStore, key: &Arc4Value) -> LedgerResult<usize> {
        store.length(&self.box_key(key)?)
    }
}
