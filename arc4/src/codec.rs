//! ARC4 head/tail binary codec
//!
//! # Layout
//!
//! - Fixed-width scalars (`uint<N>`, `byte`, `address`) are big-endian and
//!   zero-padded to their width.
//! - Sequences (tuple/struct fields, array elements) are written as a head
//!   followed by a tail. Static elements live in the head; dynamic elements
//!   leave a 2-byte offset in the head pointing at their bytes in the tail.
//! - Consecutive booleans in a sequence are packed 8 per byte, MSB first.
//! - Dynamic arrays, `string` and `byte[]` carry a 2-byte length prefix.
//! - References (`account`, `asset`, `application`) are either a 1-byte
//!   index into the active application call's foreign arrays or the raw
//!   value, depending on the [`ResourceEncoding`] of the resolver in use.

use crate::address::Address;
use crate::constants::{ABI_RETURN_PREFIX, ADDRESS_SIZE, MAX_BOX_SIZE, MAX_BYTES_SIZE};
use crate::errors::{Arc4Error, Arc4Result};
use crate::types::TypeDescriptor;
use crate::value::Arc4Value;
use num_bigint::BigUint;
use num_traits::One;
use serde::{Deserialize, Serialize};

/// Encoded form of `true` as a standalone bool
const BOOL_TRUE: u8 = 0x80;

/// Booleans packed per byte
const BOOLS_PER_BYTE: usize = 8;

/// How resource references are laid out on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceEncoding {
    /// 1-byte index into the active transaction's reference arrays
    #[default]
    Index,
    /// Raw address bytes or big-endian id
    Value,
}

/// Access to the active application call's reference arrays.
///
/// Index lookups may append the resource to the arrays when it is not yet
/// referenced, which is why they take `&mut self`.
pub trait ResourceResolver {
    fn encoding(&self) -> ResourceEncoding;

    fn account_index(&mut self, address: &Address) -> Arc4Result<u8>;
    fn asset_index(&mut self, asset_id: u64) -> Arc4Result<u8>;
    fn application_index(&mut self, app_id: u64) -> Arc4Result<u8>;

    fn account_at(&self, index: u8) -> Arc4Result<Address>;
    fn asset_at(&self, index: u8) -> Arc4Result<u64>;
    fn application_at(&self, index: u8) -> Arc4Result<u64>;
}

/// Whether a buffer carries the ABI return marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePrefix {
    #[default]
    None,
    /// Logged return value, prefixed with `0x151f7c75`
    Log,
}

/// Encode a value without a resolver (references use their value form)
pub fn encode(value: &Arc4Value, ty: &TypeDescriptor) -> Arc4Result<Vec<u8>> {
    Encoder::new().encode(value, ty)
}

/// Decode a value without a resolver (references use their value form)
pub fn decode(bytes: &[u8], ty: &TypeDescriptor, prefix: DecodePrefix) -> Arc4Result<Arc4Value> {
    Decoder::new().decode(bytes, ty, prefix)
}

/// Prefix encoded bytes with the ABI return marker
pub fn return_log(encoded: &[u8]) -> Vec<u8> {
    let mut log = Vec::with_capacity(ABI_RETURN_PREFIX.len() + encoded.len());
    log.extend_from_slice(&ABI_RETURN_PREFIX);
    log.extend_from_slice(encoded);
    log
}

/// Strip the ABI return marker, failing if it is missing
pub fn strip_return_prefix(bytes: &[u8]) -> Arc4Result<&[u8]> {
    match bytes.strip_prefix(&ABI_RETURN_PREFIX[..]) {
        Some(rest) => Ok(rest),
        None => Err(Arc4Error::ReturnPrefixNotFound),
    }
}

/// ARC4 encoder
pub struct Encoder<'r> {
    resolver: Option<&'r mut dyn ResourceResolver>,
    max_len: usize,
}

impl<'r> Encoder<'r> {
    /// Encoder capped at the AVM byte-string maximum
    pub fn new() -> Self {
        Self {
            resolver: None,
            max_len: MAX_BYTES_SIZE,
        }
    }

    /// Encoder that lays out references through `resolver`
    pub fn with_resolver(resolver: &'r mut dyn ResourceResolver) -> Self {
        Self {
            resolver: Some(resolver),
            max_len: MAX_BYTES_SIZE,
        }
    }

    /// Override the maximum total encoded length
    pub fn max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Encode `value` as `ty`
    pub fn encode(&mut self, value: &Arc4Value, ty: &TypeDescriptor) -> Arc4Result<Vec<u8>> {
        let bytes = self.encode_value(value, ty)?;
        if bytes.len() > self.max_len {
            return Err(Arc4Error::MaxLengthExceeded {
                len: bytes.len(),
                max: self.max_len,
            });
        }
        Ok(bytes)
    }

    fn encode_value(&mut self, value: &Arc4Value, ty: &TypeDescriptor) -> Arc4Result<Vec<u8>> {
        match ty {
            TypeDescriptor::Bool => Ok(vec![if value.as_bool()? { BOOL_TRUE } else { 0 }]),
            TypeDescriptor::Uint(bits) | TypeDescriptor::UFixed { bits, .. } => {
                encode_uint(value.as_biguint()?, *bits)
            }
            TypeDescriptor::Byte => encode_uint(value.as_biguint()?, 8),
            TypeDescriptor::Address => match value {
                Arc4Value::Address(a) | Arc4Value::Account(a) => Ok(a.as_bytes().to_vec()),
                Arc4Value::Bytes(b) if b.len() == ADDRESS_SIZE => Ok(b.clone()),
                other => Err(Arc4Error::mismatch(ty, other.kind_name())),
            },
            TypeDescriptor::Str => encode_length_prefixed(value.as_str()?.as_bytes()),
            TypeDescriptor::DynamicBytes => encode_length_prefixed(&byte_content(value)?),
            TypeDescriptor::StaticBytes(len) => {
                let content = byte_content(value)?;
                if content.len() != *len {
                    return Err(Arc4Error::ArityMismatch {
                        expected: *len,
                        got: content.len(),
                    });
                }
                Ok(content)
            }
            TypeDescriptor::StaticArray(element, len) => {
                let items = array_items(value)?;
                if items.len() != *len {
                    return Err(Arc4Error::ArityMismatch {
                        expected: *len,
                        got: items.len(),
                    });
                }
                let types = vec![element.as_ref(); *len];
                self.encode_sequence(&items, &types)
            }
            TypeDescriptor::DynamicArray(element) => {
                let items = array_items(value)?;
                let types = vec![element.as_ref(); items.len()];
                let body = self.encode_sequence(&items, &types)?;
                let mut out = length_prefix(items.len())?.to_vec();
                out.extend_from_slice(&body);
                Ok(out)
            }
            TypeDescriptor::Tuple(types) => {
                let items = value.as_list()?;
                if items.len() != types.len() {
                    return Err(Arc4Error::ArityMismatch {
                        expected: types.len(),
                        got: items.len(),
                    });
                }
                let types: Vec<&TypeDescriptor> = types.iter().collect();
                self.encode_sequence(&items, &types)
            }
            TypeDescriptor::Struct { fields, .. } => {
                let items = struct_items(value, fields)?;
                let types: Vec<&TypeDescriptor> = fields.iter().map(|(_, t)| t).collect();
                self.encode_sequence(&items, &types)
            }
            TypeDescriptor::Account | TypeDescriptor::Asset | TypeDescriptor::Application => {
                self.encode_reference(value, ty)
            }
        }
    }

    /// Head/tail layout of a sequence with offsets back-patched once the
    /// head length is known.
    fn encode_sequence(&mut self, values: &[&Arc4Value], types: &[&TypeDescriptor]) -> Arc4Result<Vec<u8>> {
        let mut heads: Vec<Vec<u8>> = Vec::with_capacity(types.len());
        let mut tails: Vec<Option<Vec<u8>>> = Vec::with_capacity(types.len());

        let mut i = 0;
        while i < types.len() {
            if *types[i] == TypeDescriptor::Bool {
                let run = bool_run_length(types, i);
                let mut packed = 0u8;
                for j in 0..run {
                    if values[i + j].as_bool()? {
                        packed |= BOOL_TRUE >> j;
                    }
                }
                heads.push(vec![packed]);
                tails.push(None);
                i += run;
                continue;
            }

            if types[i].is_dynamic() {
                heads.push(vec![0, 0]);
                tails.push(Some(self.encode_value(values[i], types[i])?));
            } else {
                heads.push(self.encode_value(values[i], types[i])?);
                tails.push(None);
            }
            i += 1;
        }

        let head_len: usize = heads.iter().map(Vec::len).sum();
        let mut offset = head_len;
        for (head, tail) in heads.iter_mut().zip(&tails) {
            if let Some(tail) = tail {
                let pointer = u16::try_from(offset).map_err(|_| Arc4Error::MaxLengthExceeded {
                    len: offset,
                    max: u16::MAX as usize,
                })?;
                head.copy_from_slice(&pointer.to_be_bytes());
                offset += tail.len();
            }
        }

        let mut out = Vec::with_capacity(offset);
        for head in heads {
            out.extend_from_slice(&head);
        }
        for tail in tails.into_iter().flatten() {
            out.extend_from_slice(&tail);
        }
        Ok(out)
    }

    fn encode_reference(&mut self, value: &Arc4Value, ty: &TypeDescriptor) -> Arc4Result<Vec<u8>> {
        let resolver = match self.resolver.as_deref_mut() {
            Some(r) if r.encoding() == ResourceEncoding::Index => Some(r),
            _ => None,
        };

        match ty {
            TypeDescriptor::Account => {
                let address = value.as_address()?;
                match resolver {
                    Some(r) => Ok(vec![r.account_index(&address)?]),
                    None => Ok(address.as_bytes().to_vec()),
                }
            }
            TypeDescriptor::Asset => {
                let id = value.as_u64()?;
                match resolver {
                    Some(r) => Ok(vec![r.asset_index(id)?]),
                    None => Ok(id.to_be_bytes().to_vec()),
                }
            }
            TypeDescriptor::Application => {
                let id = value.as_u64()?;
                match resolver {
                    Some(r) => Ok(vec![r.application_index(id)?]),
                    None => Ok(id.to_be_bytes().to_vec()),
                }
            }
            other => Err(Arc4Error::mismatch("reference type", other)),
        }
    }
}

impl Default for Encoder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// ARC4 decoder
pub struct Decoder<'r> {
    resolver: Option<&'r dyn ResourceResolver>,
}

impl<'r> Decoder<'r> {
    pub fn new() -> Self {
        Self { resolver: None }
    }

    /// Decoder that resolves reference indexes through `resolver`
    pub fn with_resolver(resolver: &'r dyn ResourceResolver) -> Self {
        Self {
            resolver: Some(resolver),
        }
    }

    /// Decode `bytes` as `ty`, stripping the ABI return marker first when
    /// `prefix` is [`DecodePrefix::Log`].
    pub fn decode(&self, bytes: &[u8], ty: &TypeDescriptor, prefix: DecodePrefix) -> Arc4Result<Arc4Value> {
        let body = match prefix {
            DecodePrefix::None => bytes,
            DecodePrefix::Log => strip_return_prefix(bytes)?,
        };
        self.decode_value(body, ty)
    }

    fn indexed_refs(&self) -> bool {
        self.resolver
            .map(|r| r.encoding() == ResourceEncoding::Index)
            .unwrap_or(false)
    }

    fn decode_value(&self, bytes: &[u8], ty: &TypeDescriptor) -> Arc4Result<Arc4Value> {
        match ty {
            TypeDescriptor::Bool => {
                expect_len(bytes, 1, ty)?;
                Ok(Arc4Value::Bool(bytes[0] & BOOL_TRUE != 0))
            }
            TypeDescriptor::Uint(bits) | TypeDescriptor::UFixed { bits, .. } => {
                expect_len(bytes, *bits as usize / 8, ty)?;
                Ok(Arc4Value::Uint(BigUint::from_bytes_be(bytes)))
            }
            TypeDescriptor::Byte => {
                expect_len(bytes, 1, ty)?;
                Ok(Arc4Value::Uint(BigUint::from(bytes[0])))
            }
            TypeDescriptor::Address => {
                expect_len(bytes, ADDRESS_SIZE, ty)?;
                Ok(Arc4Value::Address(Address::from_slice(bytes)?))
            }
            TypeDescriptor::Str => {
                let content = length_prefixed(bytes, ty)?;
                let s = String::from_utf8(content.to_vec())
                    .map_err(|_| Arc4Error::malformed(ty, "invalid utf-8"))?;
                Ok(Arc4Value::Str(s))
            }
            TypeDescriptor::DynamicBytes => Ok(Arc4Value::Bytes(length_prefixed(bytes, ty)?.to_vec())),
            TypeDescriptor::StaticBytes(len) => {
                expect_len(bytes, *len, ty)?;
                Ok(Arc4Value::Bytes(bytes.to_vec()))
            }
            TypeDescriptor::StaticArray(element, len) => {
                if *len > MAX_BOX_SIZE * BOOLS_PER_BYTE || min_sequence_length(element, *len) > bytes.len() {
                    return Err(Arc4Error::malformed(ty, "buffer too short"));
                }
                let types = vec![element.as_ref(); *len];
                Ok(Arc4Value::List(self.decode_sequence(bytes, &types, ty)?))
            }
            TypeDescriptor::DynamicArray(element) => {
                if bytes.len() < 2 {
                    return Err(Arc4Error::malformed(ty, "missing length prefix"));
                }
                let count = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
                let types = vec![element.as_ref(); count];
                Ok(Arc4Value::List(self.decode_sequence(&bytes[2..], &types, ty)?))
            }
            TypeDescriptor::Tuple(types) => {
                let types: Vec<&TypeDescriptor> = types.iter().collect();
                Ok(Arc4Value::Tuple(self.decode_sequence(bytes, &types, ty)?))
            }
            TypeDescriptor::Struct { fields, .. } => {
                let types: Vec<&TypeDescriptor> = fields.iter().map(|(_, t)| t).collect();
                let values = self.decode_sequence(bytes, &types, ty)?;
                Ok(Arc4Value::Struct(
                    fields.iter().map(|(n, _)| n.clone()).zip(values).collect(),
                ))
            }
            TypeDescriptor::Account => match self.index_resolver() {
                Some(r) => {
                    expect_len(bytes, 1, ty)?;
                    Ok(Arc4Value::Account(r.account_at(bytes[0])?))
                }
                None => {
                    expect_len(bytes, ADDRESS_SIZE, ty)?;
                    Ok(Arc4Value::Account(Address::from_slice(bytes)?))
                }
            },
            TypeDescriptor::Asset => match self.index_resolver() {
                Some(r) => {
                    expect_len(bytes, 1, ty)?;
                    Ok(Arc4Value::Asset(r.asset_at(bytes[0])?))
                }
                None => Ok(Arc4Value::Asset(read_u64(bytes, ty)?)),
            },
            TypeDescriptor::Application => match self.index_resolver() {
                Some(r) => {
                    expect_len(bytes, 1, ty)?;
                    Ok(Arc4Value::Application(r.application_at(bytes[0])?))
                }
                None => Ok(Arc4Value::Application(read_u64(bytes, ty)?)),
            },
        }
    }

    fn index_resolver(&self) -> Option<&'r dyn ResourceResolver> {
        self.resolver.filter(|r| r.encoding() == ResourceEncoding::Index)
    }

    /// Mirror of [`Encoder::encode_sequence`]: read the head positionally,
    /// then slice dynamic elements once every offset is known. The last
    /// dynamic element runs to the end of the buffer.
    fn decode_sequence(
        &self,
        bytes: &[u8],
        types: &[&TypeDescriptor],
        container: &TypeDescriptor,
    ) -> Arc4Result<Vec<Arc4Value>> {
        let indexed_refs = self.indexed_refs();
        let mut values: Vec<Option<Arc4Value>> = vec![None; types.len()];
        let mut dynamic: Vec<(usize, usize)> = Vec::new();
        let mut pos = 0usize;

        let mut i = 0;
        while i < types.len() {
            let ty = types[i];
            if *ty == TypeDescriptor::Bool {
                let run = bool_run_length(types, i);
                let packed = *bytes
                    .get(pos)
                    .ok_or_else(|| Arc4Error::malformed(container, "buffer too short"))?;
                for j in 0..run {
                    values[i + j] = Some(Arc4Value::Bool(packed & (BOOL_TRUE >> j) != 0));
                }
                pos += 1;
                i += run;
                continue;
            }

            if ty.is_dynamic() {
                let raw = bytes
                    .get(pos..pos + 2)
                    .ok_or_else(|| Arc4Error::malformed(container, "buffer too short"))?;
                dynamic.push((i, u16::from_be_bytes([raw[0], raw[1]]) as usize));
                pos += 2;
            } else {
                let width = ty
                    .static_length(indexed_refs)
                    .ok_or_else(|| Arc4Error::malformed(ty, "expected a static type"))?;
                let raw = bytes
                    .get(pos..pos + width)
                    .ok_or_else(|| Arc4Error::malformed(container, "buffer too short"))?;
                values[i] = Some(self.decode_value(raw, ty)?);
                pos += width;
            }
            i += 1;
        }

        if dynamic.is_empty() && pos != bytes.len() {
            return Err(Arc4Error::malformed(
                container,
                format!("expected {} bytes, got {}", pos, bytes.len()),
            ));
        }

        for (k, &(index, start)) in dynamic.iter().enumerate() {
            let end = dynamic.get(k + 1).map(|&(_, next)| next).unwrap_or(bytes.len());
            let misplaced = (k == 0 && start != pos) || start > end || end > bytes.len();
            if misplaced {
                return Err(Arc4Error::malformed(container, format!("invalid offset {}", start)));
            }
            values[index] = Some(self.decode_value(&bytes[start..end], types[index])?);
        }

        Ok(values.into_iter().flatten().collect())
    }
}

impl Default for Decoder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of consecutive bools starting at `start`, capped at one byte's worth
fn bool_run_length(types: &[&TypeDescriptor], start: usize) -> usize {
    types[start..]
        .iter()
        .take(BOOLS_PER_BYTE)
        .take_while(|t| ***t == TypeDescriptor::Bool)
        .count()
}

/// Smallest possible encoding of `len` elements of `element`
fn min_sequence_length(element: &TypeDescriptor, len: usize) -> usize {
    if *element == TypeDescriptor::Bool {
        len.div_ceil(BOOLS_PER_BYTE)
    } else if element.is_dynamic() {
        len.saturating_mul(2)
    } else {
        element.fixed_byte_length().unwrap_or(0).saturating_mul(len)
    }
}

fn encode_uint(value: &BigUint, bits: u16) -> Arc4Result<Vec<u8>> {
    let max = (BigUint::one() << bits as usize) - 1u32;
    if value > &max {
        return Err(Arc4Error::Overflow { max: max.to_string() });
    }
    let width = bits as usize / 8;
    let raw = value.to_bytes_be();
    let mut out = vec![0u8; width];
    out[width - raw.len()..].copy_from_slice(&raw);
    Ok(out)
}

fn length_prefix(len: usize) -> Arc4Result<[u8; 2]> {
    u16::try_from(len)
        .map(u16::to_be_bytes)
        .map_err(|_| Arc4Error::MaxLengthExceeded {
            len,
            max: u16::MAX as usize,
        })
}

fn encode_length_prefixed(content: &[u8]) -> Arc4Result<Vec<u8>> {
    let mut out = Vec::with_capacity(content.len() + 2);
    out.extend_from_slice(&length_prefix(content.len())?);
    out.extend_from_slice(content);
    Ok(out)
}

fn length_prefixed<'a>(bytes: &'a [u8], ty: &TypeDescriptor) -> Arc4Result<&'a [u8]> {
    if bytes.len() < 2 {
        return Err(Arc4Error::malformed(ty, "missing length prefix"));
    }
    let len = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
    if bytes.len() != len + 2 {
        return Err(Arc4Error::malformed(
            ty,
            format!("length prefix says {} bytes, found {}", len, bytes.len() - 2),
        ));
    }
    Ok(&bytes[2..])
}

fn expect_len(bytes: &[u8], len: usize, ty: &TypeDescriptor) -> Arc4Result<()> {
    if bytes.len() != len {
        return Err(Arc4Error::malformed(
            ty,
            format!("expected {} bytes, got {}", len, bytes.len()),
        ));
    }
    Ok(())
}

fn read_u64(bytes: &[u8], ty: &TypeDescriptor) -> Arc4Result<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| Arc4Error::malformed(ty, format!("expected 8 bytes, got {}", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}

/// Raw content of a `byte[]`/`byte[N]` value given as bytes or a list of bytes
fn byte_content(value: &Arc4Value) -> Arc4Result<Vec<u8>> {
    match value {
        Arc4Value::Bytes(b) => Ok(b.clone()),
        Arc4Value::List(items) => items
            .iter()
            .map(|item| {
                let v = item.as_u64()?;
                u8::try_from(v).map_err(|_| Arc4Error::Overflow { max: u8::MAX.to_string() })
            })
            .collect(),
        other => Err(Arc4Error::mismatch("bytes", other.kind_name())),
    }
}

fn array_items(value: &Arc4Value) -> Arc4Result<Vec<&Arc4Value>> {
    match value {
        Arc4Value::List(items) => Ok(items.iter().collect()),
        other => Err(Arc4Error::mismatch("array", other.kind_name())),
    }
}

/// Struct values in descriptor order; tuples are taken positionally
fn struct_items<'v>(
    value: &'v Arc4Value,
    fields: &[(String, TypeDescriptor)],
) -> Arc4Result<Vec<&'v Arc4Value>> {
    match value {
        Arc4Value::Struct(_) => fields.iter().map(|(name, _)| value.field(name)).collect(),
        Arc4Value::Tuple(items) if items.len() == fields.len() => Ok(items.iter().collect()),
        Arc4Value::Tuple(items) => Err(Arc4Error::ArityMismatch {
            expected: fields.len(),
            got: items.len(),
        }),
        other => Err(Arc4Error::mismatch("struct", other.kind_name())),
    }
}

/// `value` with struct fields in declaration order, recursively.
///
/// Encoding looks struct fields up by name, so natives may list them in any
/// order and carry extra fields. The canonical form keeps exactly the
/// declared fields, which is also what decoding produces.
pub(crate) fn canonical(value: &Arc4Value, ty: &TypeDescriptor) -> Arc4Result<Arc4Value> {
    match (ty, value) {
        (TypeDescriptor::Struct { fields, .. }, Arc4Value::Struct(_)) => {
            let items = struct_items(value, fields)?;
            let fields = fields
                .iter()
                .zip(items)
                .map(|((name, t), item)| Ok((name.clone(), canonical(item, t)?)))
                .collect::<Arc4Result<Vec<_>>>()?;
            Ok(Arc4Value::Struct(fields))
        }
        (TypeDescriptor::Struct { fields, .. }, Arc4Value::Tuple(items)) => Ok(Arc4Value::Tuple(
            fields
                .iter()
                .zip(items)
                .map(|((_, t), item)| canonical(item, t))
                .collect::<Arc4Result<_>>()?,
        )),
        (TypeDescriptor::Tuple(types), Arc4Value::Tuple(items) | Arc4Value::List(items)) => {
            let items = types
                .iter()
                .zip(items)
                .map(|(t, item)| canonical(item, t))
                .collect::<Arc4Result<Vec<_>>>()?;
            Ok(match value {
                Arc4Value::List(_) => Arc4Value::List(items),
                _ => Arc4Value::Tuple(items),
            })
        }
        (TypeDescriptor::StaticArray(element, _) | TypeDescriptor::DynamicArray(element), Arc4Value::List(items)) => {
            Ok(Arc4Value::List(
                items.iter().map(|item| canonical(item, element)).collect::<Arc4Result<_>>()?,
            ))
        }
        _ => Ok(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Arc4Value {
        Arc4Value::List(items.iter().map(|s| Arc4Value::from(*s)).collect())
    }

    #[test]
    fn test_uint_big_endian_padding() {
        let bytes = encode(&Arc4Value::from(1u64), &TypeDescriptor::uint64()).unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0, 0, 0, 0, 1]);

        let bytes = encode(&Arc4Value::from(0x1234u32), &TypeDescriptor::uint32()).unwrap();
        assert_eq!(bytes, vec![0, 0, 0x12, 0x34]);
    }

    #[test]
    fn test_uint_overflow() {
        let err = encode(&Arc4Value::from(256u32), &TypeDescriptor::uint8()).unwrap_err();
        assert_eq!(err.to_string(), "expected value <= 255");

        let err = encode(&Arc4Value::from(256u32), &TypeDescriptor::Byte).unwrap_err();
        assert_eq!(err.to_string(), "expected value <= 255");
    }

    #[test]
    fn test_uint512_max() {
        let max = (BigUint::one() << 512usize) - 1u32;
        let bytes = encode(&Arc4Value::Uint(max.clone()), &TypeDescriptor::uint512()).unwrap();
        assert_eq!(bytes, vec![0xff; 64]);
        let decoded = decode(&bytes, &TypeDescriptor::uint512(), DecodePrefix::None).unwrap();
        assert_eq!(decoded, Arc4Value::Uint(max));
    }

    #[test]
    fn test_bool_packing_nine() {
        let ty = TypeDescriptor::tuple(vec![TypeDescriptor::Bool; 9]);
        let value = Arc4Value::Tuple((0..9).map(|i| Arc4Value::Bool(i % 2 == 0)).collect());
        let bytes = encode(&value, &ty).unwrap();
        assert_eq!(bytes, vec![0b1010_1010, 0b1000_0000]);

        let decoded = decode(&bytes, &ty, DecodePrefix::None).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_bool_run_broken_by_other_type() {
        let ty: TypeDescriptor = "(bool,uint8,bool,bool)".parse().unwrap();
        let value = Arc4Value::Tuple(vec![true.into(), 7u8.into(), false.into(), true.into()]);
        let bytes = encode(&value, &ty).unwrap();
        assert_eq!(bytes, vec![0x80, 7, 0x40]);
        assert_eq!(decode(&bytes, &ty, DecodePrefix::None).unwrap(), value);
    }

    #[test]
    fn test_string_layout() {
        let bytes = encode(&Arc4Value::from("hi"), &TypeDescriptor::Str).unwrap();
        assert_eq!(bytes, vec![0, 2, b'h', b'i']);
    }

    #[test]
    fn test_dynamic_offsets() {
        let ty: TypeDescriptor = "(string[],string[],uint64)".parse().unwrap();
        let value = Arc4Value::Tuple(vec![strings(&["a", "bc"]), strings(&["def"]), 9u64.into()]);
        let bytes = encode(&value, &ty).unwrap();

        let first = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
        let second = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
        // head: two offsets + uint64
        assert_eq!(first, 12);
        assert!(second > first);
        let first_len = second - first;
        let second_len = bytes.len() - second;
        assert_eq!(first_len + second_len, bytes.len() - 12);
        assert_eq!(&bytes[4..12], &9u64.to_be_bytes());

        assert_eq!(decode(&bytes, &ty, DecodePrefix::None).unwrap(), value);
    }

    #[test]
    fn test_dynamic_array_of_strings() {
        let ty = TypeDescriptor::dynamic_array(TypeDescriptor::Str);
        let bytes = encode(&strings(&["a", "b"]), &ty).unwrap();
        // count, offsets relative to element heads, tails
        assert_eq!(bytes, vec![0, 2, 0, 4, 0, 7, 0, 1, b'a', 0, 1, b'b']);
    }

    #[test]
    fn test_static_array_arity() {
        let ty = TypeDescriptor::static_array(TypeDescriptor::uint8(), 3);
        let value = Arc4Value::List(vec![1u8.into(), 2u8.into()]);
        assert!(matches!(
            encode(&value, &ty),
            Err(Arc4Error::ArityMismatch { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn test_struct_encodes_by_field_name() {
        let ty = TypeDescriptor::structure(
            "Pair",
            vec![("a", TypeDescriptor::uint8()), ("b", TypeDescriptor::Str)],
        );
        let value = Arc4Value::structure(vec![("b", "x".into()), ("a", 5u8.into())]);
        let bytes = encode(&value, &ty).unwrap();
        assert_eq!(bytes, vec![5, 0, 3, 0, 1, b'x']);

        let decoded = decode(&bytes, &ty, DecodePrefix::None).unwrap();
        assert_eq!(decoded.field("a").unwrap().as_u64().unwrap(), 5);
        assert_eq!(decoded.field("b").unwrap().as_str().unwrap(), "x");
    }

    #[test]
    fn test_log_prefix() {
        let encoded = encode(&Arc4Value::from(7u64), &TypeDescriptor::uint64()).unwrap();
        let log = return_log(&encoded);
        let decoded = decode(&log, &TypeDescriptor::uint64(), DecodePrefix::Log).unwrap();
        assert_eq!(decoded.as_u64().unwrap(), 7);

        let err = decode(&encoded, &TypeDescriptor::uint64(), DecodePrefix::Log).unwrap_err();
        assert_eq!(err.to_string(), "ABI return prefix not found");
    }

    #[test]
    fn test_short_buffer_rejected() {
        assert!(decode(&[0, 0, 1], &TypeDescriptor::uint32(), DecodePrefix::None).is_err());
        assert!(decode(&[0, 5, b'a'], &TypeDescriptor::Str, DecodePrefix::None).is_err());
        assert!(decode(&[0], &TypeDescriptor::dynamic_array(TypeDescriptor::uint8()), DecodePrefix::None).is_err());
    }

    #[test]
    fn test_max_length() {
        let big = Arc4Value::Bytes(vec![0u8; MAX_BYTES_SIZE]);
        let err = encode(&big, &TypeDescriptor::DynamicBytes).unwrap_err();
        assert!(matches!(err, Arc4Error::MaxLengthExceeded { .. }));

        let ok = Encoder::new()
            .max_len(MAX_BYTES_SIZE * 2)
            .encode(&big, &TypeDescriptor::DynamicBytes)
            .unwrap();
        assert_eq!(ok.len(), MAX_BYTES_SIZE + 2);
    }

    struct FixedRefs {
        accounts: Vec<Address>,
    }

    impl ResourceResolver for FixedRefs {
        fn encoding(&self) -> ResourceEncoding {
            ResourceEncoding::Index
        }
        fn account_index(&mut self, address: &Address) -> Arc4Result<u8> {
            if let Some(i) = self.accounts.iter().position(|a| a == address) {
                return Ok(i as u8);
            }
            self.accounts.push(*address);
            Ok((self.accounts.len() - 1) as u8)
        }
        fn asset_index(&mut self, _asset_id: u64) -> Arc4Result<u8> {
            Ok(0)
        }
        fn application_index(&mut self, _app_id: u64) -> Arc4Result<u8> {
            Ok(0)
        }
        fn account_at(&self, index: u8) -> Arc4Result<Address> {
            self.accounts
                .get(index as usize)
                .copied()
                .ok_or_else(|| Arc4Error::UnresolvedReference(format!("account {}", index)))
        }
        fn asset_at(&self, _index: u8) -> Arc4Result<u64> {
            Ok(0)
        }
        fn application_at(&self, _index: u8) -> Arc4Result<u64> {
            Ok(0)
        }
    }

    #[test]
    fn test_reference_index_and_value_modes() {
        let alice = Address::new([1u8; 32]);
        let bob = Address::new([2u8; 32]);
        let mut refs = FixedRefs { accounts: vec![alice] };

        let bytes = Encoder::with_resolver(&mut refs)
            .encode(&Arc4Value::Account(bob), &TypeDescriptor::Account)
            .unwrap();
        assert_eq!(bytes, vec![1]);

        let decoded = Decoder::with_resolver(&refs)
            .decode(&bytes, &TypeDescriptor::Account, DecodePrefix::None)
            .unwrap();
        assert_eq!(decoded, Arc4Value::Account(bob));

        let raw = encode(&Arc4Value::Account(bob), &TypeDescriptor::Account).unwrap();
        assert_eq!(raw, bob.as_bytes().to_vec());
        let raw = encode(&Arc4Value::Asset(5), &TypeDescriptor::Asset).unwrap();
        assert_eq!(raw, 5u64.to_be_bytes().to_vec());
    }

    #[test]
    fn test_huge_static_array_rejected_before_allocation() {
        let ty = TypeDescriptor::static_array(TypeDescriptor::uint64(), usize::MAX);
        assert!(matches!(
            decode(&[0u8; 16], &ty, DecodePrefix::None),
            Err(Arc4Error::Malformed { .. })
        ));
        assert_eq!(ty.fixed_byte_length(), None);

        let bools = TypeDescriptor::static_array(TypeDescriptor::Bool, usize::MAX);
        assert!(decode(&[0u8; 4], &bools, DecodePrefix::None).is_err());
        assert_eq!(
            TypeDescriptor::static_array(TypeDescriptor::Bool, 9).fixed_byte_length(),
            Some(2)
        );
    }
}
