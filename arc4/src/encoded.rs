//! Typed wrapper pairing encoded bytes with their descriptor

use crate::codec::{self, DecodePrefix, Decoder, Encoder};
use crate::errors::{Arc4Error, Arc4Result};
use crate::types::TypeDescriptor;
use crate::value::Arc4Value;
use std::fmt;

/// An ARC4 value together with its wire encoding.
///
/// The byte buffer and the native projection are always kept in sync;
/// every mutation re-encodes. Two encoded values are equal only when their
/// descriptors match structurally and their bytes match exactly.
#[derive(Clone)]
pub struct EncodedValue {
    descriptor: TypeDescriptor,
    bytes: Vec<u8>,
    native: Arc4Value,
}

impl EncodedValue {
    /// Encode a native value. References use their value form.
    pub fn encode(value: Arc4Value, descriptor: TypeDescriptor) -> Arc4Result<Self> {
        let bytes = codec::encode(&value, &descriptor)?;
        let native = codec::canonical(&value, &descriptor)?;
        Ok(Self {
            descriptor,
            bytes,
            native,
        })
    }

    /// Encode with a caller-supplied encoder (resolver, length cap)
    pub fn encode_with(
        encoder: &mut Encoder<'_>,
        value: Arc4Value,
        descriptor: TypeDescriptor,
    ) -> Arc4Result<Self> {
        let bytes = encoder.encode(&value, &descriptor)?;
        let native = codec::canonical(&value, &descriptor)?;
        Ok(Self {
            descriptor,
            bytes,
            native,
        })
    }

    /// Decode `bytes`, optionally stripping the ABI return marker
    pub fn decode(bytes: &[u8], descriptor: TypeDescriptor, prefix: DecodePrefix) -> Arc4Result<Self> {
        Self::decode_with(&Decoder::new(), bytes, descriptor, prefix)
    }

    pub fn decode_with(
        decoder: &Decoder<'_>,
        bytes: &[u8],
        descriptor: TypeDescriptor,
        prefix: DecodePrefix,
    ) -> Arc4Result<Self> {
        let native = decoder.decode(bytes, &descriptor, prefix)?;
        let body = match prefix {
            DecodePrefix::None => bytes,
            DecodePrefix::Log => codec::strip_return_prefix(bytes)?,
        };
        Ok(Self {
            descriptor,
            bytes: body.to_vec(),
            native,
        })
    }

    /// Shorthand for [`decode`](Self::decode) without a prefix
    pub fn from_bytes(bytes: &[u8], descriptor: TypeDescriptor) -> Arc4Result<Self> {
        Self::decode(bytes, descriptor, DecodePrefix::None)
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn native(&self) -> &Arc4Value {
        &self.native
    }

    pub fn into_native(self) -> Arc4Value {
        self.native
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Compare against another encoded value of the same type.
    ///
    /// Comparing values of different types is a coding error rather than
    /// `false`.
    pub fn equals(&self, other: &EncodedValue) -> Arc4Result<bool> {
        if !self.descriptor.same_shape(&other.descriptor) {
            return Err(Arc4Error::mismatch(&self.descriptor, &other.descriptor));
        }
        Ok(self.bytes == other.bytes)
    }

    /// Bytes as logged for an ABI return value
    pub fn to_return_log(&self) -> Vec<u8> {
        codec::return_log(&self.bytes)
    }

    /// Number of elements of an array, tuple or struct
    pub fn len(&self) -> Arc4Result<usize> {
        match (&self.descriptor, &self.native) {
            (TypeDescriptor::Tuple(types), _) => Ok(types.len()),
            (TypeDescriptor::Struct { fields, .. }, _) => Ok(fields.len()),
            (TypeDescriptor::StaticArray(_, len), _) | (TypeDescriptor::StaticBytes(len), _) => Ok(*len),
            (_, Arc4Value::Bytes(b)) => Ok(b.len()),
            _ => Ok(self.native.as_list()?.len()),
        }
    }

    pub fn is_empty(&self) -> Arc4Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Bounds-checked element access
    pub fn item(&self, index: usize) -> Arc4Result<EncodedValue> {
        let len = self.len()?;
        if index >= len {
            return Err(Arc4Error::IndexOutOfBounds { index, len });
        }
        let ty = self.item_type(index)?;
        let value = match &self.native {
            Arc4Value::Bytes(b) => b.get(index).map(|byte| Arc4Value::from(*byte)),
            other => other.as_list()?.get(index).map(|v| (*v).clone()),
        };
        let value = value.ok_or(Arc4Error::IndexOutOfBounds { index, len })?;
        EncodedValue::encode(value, ty)
    }

    /// Bounds-checked element replacement; re-encodes the container
    pub fn replace_item(&mut self, index: usize, value: Arc4Value) -> Arc4Result<()> {
        let len = self.len()?;
        if index >= len {
            return Err(Arc4Error::IndexOutOfBounds { index, len });
        }
        let out_of_bounds = Arc4Error::IndexOutOfBounds { index, len };
        let mut native = self.native.clone();
        match &mut native {
            Arc4Value::Bytes(b) => {
                let byte = u8::try_from(value.as_u64()?).map_err(|_| Arc4Error::Overflow {
                    max: u8::MAX.to_string(),
                })?;
                *b.get_mut(index).ok_or(out_of_bounds)? = byte;
            }
            Arc4Value::List(items) | Arc4Value::Tuple(items) => *items.get_mut(index).ok_or(out_of_bounds)? = value,
            Arc4Value::Struct(fields) => fields.get_mut(index).ok_or(out_of_bounds)?.1 = value,
            other => return Err(Arc4Error::mismatch("array", other.kind_name())),
        }
        self.reencode(native)
    }

    /// Append to a dynamic array
    pub fn push(&mut self, value: Arc4Value) -> Arc4Result<()> {
        let mut native = self.native.clone();
        match (&self.descriptor, &mut native) {
            (TypeDescriptor::DynamicArray(_), Arc4Value::List(items)) => items.push(value),
            (TypeDescriptor::DynamicBytes, Arc4Value::Bytes(b)) => {
                let byte = u8::try_from(value.as_u64()?).map_err(|_| Arc4Error::Overflow {
                    max: u8::MAX.to_string(),
                })?;
                b.push(byte);
            }
            (ty, _) => return Err(Arc4Error::mismatch("dynamic array", ty)),
        }
        self.reencode(native)
    }

    /// Named struct field
    pub fn field(&self, name: &str) -> Arc4Result<EncodedValue> {
        let TypeDescriptor::Struct { fields, .. } = &self.descriptor else {
            return Err(Arc4Error::mismatch("struct", &self.descriptor));
        };
        let ty = fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.clone())
            .ok_or_else(|| Arc4Error::mismatch(format!("field '{}'", name), "missing field"))?;
        EncodedValue::encode(self.native.field(name)?.clone(), ty)
    }

    fn item_type(&self, index: usize) -> Arc4Result<TypeDescriptor> {
        let out_of_bounds = || Arc4Error::IndexOutOfBounds {
            index,
            len: self.len().unwrap_or(0),
        };
        match &self.descriptor {
            TypeDescriptor::Tuple(types) => types.get(index).cloned().ok_or_else(out_of_bounds),
            TypeDescriptor::Struct { fields, .. } => {
                fields.get(index).map(|(_, t)| t.clone()).ok_or_else(out_of_bounds)
            }
            other => other
                .element_type()
                .cloned()
                .ok_or_else(|| Arc4Error::mismatch("array", other)),
        }
    }

    fn reencode(&mut self, native: Arc4Value) -> Arc4Result<()> {
        self.bytes = codec::encode(&native, &self.descriptor)?;
        self.native = codec::canonical(&native, &self.descriptor)?;
        Ok(())
    }
}

impl PartialEq for EncodedValue {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor.same_shape(&other.descriptor) && self.bytes == other.bytes
    }
}

impl Eq for EncodedValue {}

impl fmt::Debug for EncodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedValue")
            .field("type", &self.descriptor.to_string())
            .field("bytes", &hex::encode(&self.bytes))
            .finish()
    }
}
