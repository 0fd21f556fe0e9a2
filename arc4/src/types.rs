//! ARC4 type descriptors
//!
//! A [`TypeDescriptor`] describes the shape of a value well enough for the
//! codec to lay it out on the wire. Descriptors compare structurally, and
//! their `Display` form is the canonical ARC4 type name used in method
//! signatures (`uint64[4]`, `(bool,string)`, `byte[]`, ...).

use crate::constants::{ADDRESS_SIZE, MAX_UFIXED_PRECISION, MAX_UINT_BITS};
use crate::errors::{Arc4Error, Arc4Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static BYTE: TypeDescriptor = TypeDescriptor::Byte;

/// Structural description of an ARC4 value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeDescriptor {
    /// `bool`
    Bool,
    /// `uint<N>`, N in 8..=512 and a multiple of 8
    Uint(u16),
    /// `ufixed<N>x<M>`, stored as a raw `uint<N>`
    UFixed { bits: u16, precision: u8 },
    /// `byte`
    Byte,
    /// `address`
    Address,
    /// `string`
    Str,
    /// `byte[]`
    DynamicBytes,
    /// `byte[N]`
    StaticBytes(usize),
    /// `T[N]`
    StaticArray(Box<TypeDescriptor>, usize),
    /// `T[]`
    DynamicArray(Box<TypeDescriptor>),
    /// `(T1,T2,...)`
    Tuple(Vec<TypeDescriptor>),
    /// Named tuple; encodes exactly like a tuple of its field types
    Struct {
        name: String,
        fields: Vec<(String, TypeDescriptor)>,
    },
    /// `account` reference
    Account,
    /// `asset` reference
    Asset,
    /// `application` reference
    Application,
}

impl TypeDescriptor {
    /// `uint<bits>`, validating the width
    pub fn uint(bits: u16) -> Arc4Result<Self> {
        validate_bits(bits)?;
        Ok(TypeDescriptor::Uint(bits))
    }

    /// `ufixed<bits>x<precision>`, validating both parameters
    pub fn ufixed(bits: u16, precision: u8) -> Arc4Result<Self> {
        validate_bits(bits)?;
        if precision == 0 || precision > MAX_UFIXED_PRECISION {
            return Err(Arc4Error::InvalidType(format!(
                "ufixed precision must be in 1..={}, got {}",
                MAX_UFIXED_PRECISION, precision
            )));
        }
        Ok(TypeDescriptor::UFixed { bits, precision })
    }

    pub fn uint8() -> Self {
        TypeDescriptor::Uint(8)
    }

    pub fn uint16() -> Self {
        TypeDescriptor::Uint(16)
    }

    pub fn uint32() -> Self {
        TypeDescriptor::Uint(32)
    }

    pub fn uint64() -> Self {
        TypeDescriptor::Uint(64)
    }

    pub fn uint128() -> Self {
        TypeDescriptor::Uint(128)
    }

    pub fn uint256() -> Self {
        TypeDescriptor::Uint(256)
    }

    pub fn uint512() -> Self {
        TypeDescriptor::Uint(512)
    }

    pub fn static_array(element: TypeDescriptor, len: usize) -> Self {
        TypeDescriptor::StaticArray(Box::new(element), len)
    }

    pub fn dynamic_array(element: TypeDescriptor) -> Self {
        TypeDescriptor::DynamicArray(Box::new(element))
    }

    pub fn tuple(types: Vec<TypeDescriptor>) -> Self {
        TypeDescriptor::Tuple(types)
    }

    pub fn structure(name: &str, fields: Vec<(&str, TypeDescriptor)>) -> Self {
        TypeDescriptor::Struct {
            name: name.to_string(),
            fields: fields
                .into_iter()
                .map(|(n, t)| (n.to_string(), t))
                .collect(),
        }
    }

    /// Whether values of this type carry dynamic-length content.
    ///
    /// Dynamic elements of a sequence are placed in the tail and referenced
    /// from the head through a 2-byte offset.
    pub fn is_dynamic(&self) -> bool {
        match self {
            TypeDescriptor::Str | TypeDescriptor::DynamicBytes | TypeDescriptor::DynamicArray(_) => true,
            TypeDescriptor::StaticArray(element, _) => element.is_dynamic(),
            TypeDescriptor::Tuple(types) => types.iter().any(TypeDescriptor::is_dynamic),
            TypeDescriptor::Struct { fields, .. } => fields.iter().any(|(_, t)| t.is_dynamic()),
            _ => false,
        }
    }

    /// Structural equality by canonical name.
    ///
    /// `byte[N]` written as bytes or as an array of `byte` is the same type,
    /// and a struct has the shape of its tuple.
    pub fn same_shape(&self, other: &TypeDescriptor) -> bool {
        self == other || self.to_string() == other.to_string()
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::Account | TypeDescriptor::Asset | TypeDescriptor::Application
        )
    }

    /// Encoded byte length for statically sized types, `None` if dynamic.
    ///
    /// References report the width of their value form (32-byte address,
    /// 8-byte id).
    pub fn fixed_byte_length(&self) -> Option<usize> {
        self.static_length(false)
    }

    /// Like [`fixed_byte_length`](Self::fixed_byte_length), with references
    /// laid out as 1-byte indexes when `indexed_refs` is set.
    pub fn static_length(&self, indexed_refs: bool) -> Option<usize> {
        match self {
            TypeDescriptor::Bool | TypeDescriptor::Byte => Some(1),
            TypeDescriptor::Uint(bits) | TypeDescriptor::UFixed { bits, .. } => Some(*bits as usize / 8),
            TypeDescriptor::Address => Some(ADDRESS_SIZE),
            TypeDescriptor::Account => Some(if indexed_refs { 1 } else { ADDRESS_SIZE }),
            TypeDescriptor::Asset | TypeDescriptor::Application => Some(if indexed_refs { 1 } else { 8 }),
            TypeDescriptor::StaticBytes(len) => Some(*len),
            TypeDescriptor::StaticArray(element, len) => match element.as_ref() {
                TypeDescriptor::Bool => Some(len.div_ceil(8)),
                element => element.static_length(indexed_refs)?.checked_mul(*len),
            },
            TypeDescriptor::Tuple(types) => sequence_fixed_length(types.iter(), indexed_refs),
            TypeDescriptor::Struct { fields, .. } => {
                sequence_fixed_length(fields.iter().map(|(_, t)| t), indexed_refs)
            }
            TypeDescriptor::Str | TypeDescriptor::DynamicBytes | TypeDescriptor::DynamicArray(_) => None,
        }
    }

    /// Element type of array-like descriptors
    pub fn element_type(&self) -> Option<&TypeDescriptor> {
        match self {
            TypeDescriptor::StaticArray(element, _) | TypeDescriptor::DynamicArray(element) => Some(element),
            TypeDescriptor::StaticBytes(_) | TypeDescriptor::DynamicBytes => Some(&BYTE),
            _ => None,
        }
    }

    /// Field types of tuples and structs, in declaration order
    pub fn field_types(&self) -> Option<Vec<&TypeDescriptor>> {
        match self {
            TypeDescriptor::Tuple(types) => Some(types.iter().collect()),
            TypeDescriptor::Struct { fields, .. } => Some(fields.iter().map(|(_, t)| t).collect()),
            _ => None,
        }
    }
}

/// Packed length of a run of statically sized types, collapsing consecutive
/// booleans 8 per byte.
fn sequence_fixed_length<'a>(
    types: impl Iterator<Item = &'a TypeDescriptor>,
    indexed_refs: bool,
) -> Option<usize> {
    let mut total = 0usize;
    let mut bool_run = 0usize;
    for ty in types {
        if *ty == TypeDescriptor::Bool {
            if bool_run == 0 {
                total += 1;
            }
            bool_run = (bool_run + 1) % 8;
            continue;
        }
        bool_run = 0;
        total += ty.static_length(indexed_refs)?;
    }
    Some(total)
}

fn validate_bits(bits: u16) -> Arc4Result<()> {
    if bits == 0 || bits > MAX_UINT_BITS || bits % 8 != 0 {
        return Err(Arc4Error::InvalidType(format!(
            "bit width must be a multiple of 8 in 8..={}, got {}",
            MAX_UINT_BITS, bits
        )));
    }
    Ok(())
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Bool => write!(f, "bool"),
            TypeDescriptor::Uint(bits) => write!(f, "uint{}", bits),
            TypeDescriptor::UFixed { bits, precision } => write!(f, "ufixed{}x{}", bits, precision),
            TypeDescriptor::Byte => write!(f, "byte"),
            TypeDescriptor::Address => write!(f, "address"),
            TypeDescriptor::Str => write!(f, "string"),
            TypeDescriptor::DynamicBytes => write!(f, "byte[]"),
            TypeDescriptor::StaticBytes(len) => write!(f, "byte[{}]", len),
            TypeDescriptor::StaticArray(element, len) => write!(f, "{}[{}]", element, len),
            TypeDescriptor::DynamicArray(element) => write!(f, "{}[]", element),
            TypeDescriptor::Tuple(types) => write_tuple(f, types.iter()),
            TypeDescriptor::Struct { fields, .. } => write_tuple(f, fields.iter().map(|(_, t)| t)),
            TypeDescriptor::Account => write!(f, "account"),
            TypeDescriptor::Asset => write!(f, "asset"),
            TypeDescriptor::Application => write!(f, "application"),
        }
    }
}

fn write_tuple<'a>(
    f: &mut fmt::Formatter<'_>,
    types: impl Iterator<Item = &'a TypeDescriptor>,
) -> fmt::Result {
    write!(f, "(")?;
    for (i, ty) in types.enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{}", ty)?;
    }
    write!(f, ")")
}

impl FromStr for TypeDescriptor {
    type Err = Arc4Error;

    /// Parse a canonical ARC4 type string. Structs come back as tuples.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = TypeParser { input: s.as_bytes(), pos: 0 };
        let ty = parser.parse_type()?;
        if parser.pos != parser.input.len() {
            return Err(parser.error("trailing characters"));
        }
        Ok(ty)
    }
}

/// Recursive-descent parser over ARC4 type strings
struct TypeParser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> TypeParser<'a> {
    fn parse_type(&mut self) -> Arc4Result<TypeDescriptor> {
        let mut ty = if self.peek() == Some(b'(') {
            self.parse_tuple()?
        } else {
            self.parse_scalar()?
        };

        while self.peek() == Some(b'[') {
            self.pos += 1;
            let start = self.pos;
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
            let input = self.input;
            let digits = &input[start..self.pos];
            self.expect(b']')?;

            ty = if digits.is_empty() {
                match ty {
                    TypeDescriptor::Byte => TypeDescriptor::DynamicBytes,
                    other => TypeDescriptor::dynamic_array(other),
                }
            } else {
                let len = parse_number(digits).ok_or_else(|| self.error("invalid array length"))?;
                match ty {
                    TypeDescriptor::Byte => TypeDescriptor::StaticBytes(len),
                    other => TypeDescriptor::static_array(other, len),
                }
            };
        }
        Ok(ty)
    }

    fn parse_tuple(&mut self) -> Arc4Result<TypeDescriptor> {
        self.expect(b'(')?;
        let mut types = Vec::new();
        if self.peek() == Some(b')') {
            self.pos += 1;
            return Ok(TypeDescriptor::Tuple(types));
        }
        loop {
            types.push(self.parse_type()?);
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') => {
                    self.pos += 1;
                    return Ok(TypeDescriptor::Tuple(types));
                }
                _ => return Err(self.error("expected ',' or ')'")),
            }
        }
    }

    fn parse_scalar(&mut self) -> Arc4Result<TypeDescriptor> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric()) {
            self.pos += 1;
        }
        let input = self.input;
        let word = std::str::from_utf8(&input[start..self.pos])
            .map_err(|_| self.error("invalid utf-8"))?;

        match word {
            "bool" => Ok(TypeDescriptor::Bool),
            "byte" => Ok(TypeDescriptor::Byte),
            "address" => Ok(TypeDescriptor::Address),
            "string" => Ok(TypeDescriptor::Str),
            "account" => Ok(TypeDescriptor::Account),
            "asset" => Ok(TypeDescriptor::Asset),
            "application" => Ok(TypeDescriptor::Application),
            "" => Err(self.error("expected a type name")),
            _ => {
                if let Some(rest) = word.strip_prefix("ufixed") {
                    let (bits, precision) = rest
                        .split_once('x')
                        .ok_or_else(|| self.error("expected ufixed<N>x<M>"))?;
                    let bits = bits.parse::<u16>().map_err(|_| self.error("invalid ufixed width"))?;
                    let precision = precision
                        .parse::<u8>()
                        .map_err(|_| self.error("invalid ufixed precision"))?;
                    TypeDescriptor::ufixed(bits, precision)
                } else if let Some(rest) = word.strip_prefix("uint") {
                    let bits = rest.parse::<u16>().map_err(|_| self.error("invalid uint width"))?;
                    TypeDescriptor::uint(bits)
                } else {
                    Err(Arc4Error::InvalidType(format!("unknown type '{}'", word)))
                }
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn expect(&mut self, c: u8) -> Arc4Result<()> {
        if self.peek() != Some(c) {
            return Err(self.error(&format!("expected '{}'", c as char)));
        }
        self.pos += 1;
        Ok(())
    }

    fn error(&self, msg: &str) -> Arc4Error {
        Arc4Error::InvalidType(format!(
            "{} at position {} in '{}'",
            msg,
            self.pos,
            String::from_utf8_lossy(self.input)
        ))
    }
}

fn parse_number(digits: &[u8]) -> Option<usize> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names() {
        assert_eq!(TypeDescriptor::uint64().to_string(), "uint64");
        assert_eq!(
            TypeDescriptor::static_array(TypeDescriptor::uint64(), 4).to_string(),
            "uint64[4]"
        );
        assert_eq!(TypeDescriptor::dynamic_array(TypeDescriptor::Str).to_string(), "string[]");
        assert_eq!(TypeDescriptor::DynamicBytes.to_string(), "byte[]");
        let point = TypeDescriptor::structure(
            "Point",
            vec![("x", TypeDescriptor::uint64()), ("y", TypeDescriptor::uint64())],
        );
        assert_eq!(point.to_string(), "(uint64,uint64)");
    }

    #[test]
    fn test_parse_roundtrip() {
        for s in [
            "bool",
            "uint8",
            "uint512",
            "ufixed64x2",
            "address",
            "string",
            "byte[]",
            "byte[32]",
            "uint64[4]",
            "string[]",
            "(uint64,(bool,string[]),byte[])",
            "(uint8,bool)[3][]",
            "()",
            "account",
        ] {
            let ty: TypeDescriptor = s.parse().unwrap();
            assert_eq!(ty.to_string(), s);
        }
    }

    #[test]
    fn test_parse_rejects_bad_widths() {
        assert!("uint7".parse::<TypeDescriptor>().is_err());
        assert!("uint520".parse::<TypeDescriptor>().is_err());
        assert!("ufixed64x0".parse::<TypeDescriptor>().is_err());
        assert!("(uint64".parse::<TypeDescriptor>().is_err());
        assert!("uint64]".parse::<TypeDescriptor>().is_err());
        assert!("float".parse::<TypeDescriptor>().is_err());
    }

    #[test]
    fn test_is_dynamic() {
        assert!(!TypeDescriptor::uint64().is_dynamic());
        assert!(TypeDescriptor::Str.is_dynamic());
        assert!(TypeDescriptor::static_array(TypeDescriptor::Str, 2).is_dynamic());
        assert!(TypeDescriptor::tuple(vec![TypeDescriptor::Bool, TypeDescriptor::DynamicBytes]).is_dynamic());
        assert!(!TypeDescriptor::StaticBytes(32).is_dynamic());
    }

    #[test]
    fn test_fixed_byte_length_packs_bools() {
        let nine_bools = TypeDescriptor::tuple(vec![TypeDescriptor::Bool; 9]);
        assert_eq!(nine_bools.fixed_byte_length(), Some(2));

        let mixed = TypeDescriptor::tuple(vec![
            TypeDescriptor::Bool,
            TypeDescriptor::Bool,
            TypeDescriptor::uint64(),
            TypeDescriptor::Bool,
        ]);
        assert_eq!(mixed.fixed_byte_length(), Some(10));

        let arr = TypeDescriptor::static_array(TypeDescriptor::uint32(), 10);
        assert_eq!(arr.fixed_byte_length(), Some(40));

        assert_eq!(TypeDescriptor::static_array(TypeDescriptor::Bool, 17).fixed_byte_length(), Some(3));
        assert_eq!(TypeDescriptor::Str.fixed_byte_length(), None);
    }
}
