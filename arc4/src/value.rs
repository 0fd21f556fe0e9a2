//! Native projection of ARC4 values

use crate::address::Address;
use crate::errors::{Arc4Error, Arc4Result};
use num_bigint::BigUint;
use num_traits::ToPrimitive;

/// A value in its language-native form, paired with a
/// [`TypeDescriptor`](crate::TypeDescriptor) when encoded.
///
/// `Uint` covers `uint<N>`, `ufixed<N>x<M>` (raw) and `byte`. `List` covers
/// both static and dynamic arrays; `Bytes` covers `byte[]` and `byte[N]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arc4Value {
    Bool(bool),
    Uint(BigUint),
    Address(Address),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Arc4Value>),
    Tuple(Vec<Arc4Value>),
    Struct(Vec<(String, Arc4Value)>),
    Account(Address),
    Asset(u64),
    Application(u64),
}

impl Arc4Value {
    pub fn uint(value: impl Into<BigUint>) -> Self {
        Arc4Value::Uint(value.into())
    }

    pub fn str(value: &str) -> Self {
        Arc4Value::Str(value.to_string())
    }

    pub fn bytes(value: &[u8]) -> Self {
        Arc4Value::Bytes(value.to_vec())
    }

    pub fn structure(fields: Vec<(&str, Arc4Value)>) -> Self {
        Arc4Value::Struct(fields.into_iter().map(|(n, v)| (n.to_string(), v)).collect())
    }

    /// Short name of the variant, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Arc4Value::Bool(_) => "bool",
            Arc4Value::Uint(_) => "uint",
            Arc4Value::Address(_) => "address",
            Arc4Value::Str(_) => "string",
            Arc4Value::Bytes(_) => "bytes",
            Arc4Value::List(_) => "array",
            Arc4Value::Tuple(_) => "tuple",
            Arc4Value::Struct(_) => "struct",
            Arc4Value::Account(_) => "account",
            Arc4Value::Asset(_) => "asset",
            Arc4Value::Application(_) => "application",
        }
    }

    pub fn as_bool(&self) -> Arc4Result<bool> {
        match self {
            Arc4Value::Bool(v) => Ok(*v),
            other => Err(Arc4Error::mismatch("bool", other.kind_name())),
        }
    }

    pub fn as_biguint(&self) -> Arc4Result<&BigUint> {
        match self {
            Arc4Value::Uint(v) => Ok(v),
            other => Err(Arc4Error::mismatch("uint", other.kind_name())),
        }
    }

    /// Interpret as a uint64; fails with an overflow if the value is wider
    pub fn as_u64(&self) -> Arc4Result<u64> {
        self.maybe_u64()?.ok_or_else(|| Arc4Error::Overflow {
            max: u64::MAX.to_string(),
        })
    }

    /// Interpret as a uint64 if it fits.
    ///
    /// Only "does not fit in 64 bits" is reported as `None`; a value that is
    /// not an unsigned integer at all is still an error.
    pub fn maybe_u64(&self) -> Arc4Result<Option<u64>> {
        match self {
            Arc4Value::Uint(v) => Ok(v.to_u64()),
            Arc4Value::Asset(id) | Arc4Value::Application(id) => Ok(Some(*id)),
            other => Err(Arc4Error::mismatch("uint", other.kind_name())),
        }
    }

    pub fn as_str(&self) -> Arc4Result<&str> {
        match self {
            Arc4Value::Str(v) => Ok(v),
            other => Err(Arc4Error::mismatch("string", other.kind_name())),
        }
    }

    pub fn as_bytes(&self) -> Arc4Result<&[u8]> {
        match self {
            Arc4Value::Bytes(v) => Ok(v),
            other => Err(Arc4Error::mismatch("bytes", other.kind_name())),
        }
    }

    pub fn as_address(&self) -> Arc4Result<Address> {
        match self {
            Arc4Value::Address(a) | Arc4Value::Account(a) => Ok(*a),
            other => Err(Arc4Error::mismatch("address", other.kind_name())),
        }
    }

    /// Elements of an array or tuple, or the values of a struct in order
    pub fn as_list(&self) -> Arc4Result<Vec<&Arc4Value>> {
        match self {
            Arc4Value::List(items) | Arc4Value::Tuple(items) => Ok(items.iter().collect()),
            Arc4Value::Struct(fields) => Ok(fields.iter().map(|(_, v)| v).collect()),
            other => Err(Arc4Error::mismatch("array", other.kind_name())),
        }
    }

    /// Struct field by name
    pub fn field(&self, name: &str) -> Arc4Result<&Arc4Value> {
        match self {
            Arc4Value::Struct(fields) => fields
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v)
                .ok_or_else(|| Arc4Error::mismatch(format!("field '{}'", name), "missing field")),
            other => Err(Arc4Error::mismatch("struct", other.kind_name())),
        }
    }
}

impl From<bool> for Arc4Value {
    fn from(v: bool) -> Self {
        Arc4Value::Bool(v)
    }
}

macro_rules! impl_from_uint {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Arc4Value {
                fn from(v: $t) -> Self {
                    Arc4Value::Uint(BigUint::from(v))
                }
            }
        )*
    };
}

impl_from_uint!(u8, u16, u32, u64, u128);

impl From<BigUint> for Arc4Value {
    fn from(v: BigUint) -> Self {
        Arc4Value::Uint(v)
    }
}

impl From<&str> for Arc4Value {
    fn from(v: &str) -> Self {
        Arc4Value::Str(v.to_string())
    }
}

impl From<String> for Arc4Value {
    fn from(v: String) -> Self {
        Arc4Value::Str(v)
    }
}

impl From<Address> for Arc4Value {
    fn from(v: Address) -> Self {
        Arc4Value::Address(v)
    }
}

impl From<Vec<u8>> for Arc4Value {
    fn from(v: Vec<u8>) -> Self {
        Arc4Value::Bytes(v)
    }
}

impl From<Vec<Arc4Value>> for Arc4Value {
    fn from(v: Vec<Arc4Value>) -> Self {
        Arc4Value::List(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maybe_u64_only_absorbs_overflow() {
        assert_eq!(Arc4Value::from(42u64).maybe_u64().unwrap(), Some(42));

        let wide = Arc4Value::uint(BigUint::from(u64::MAX) + 1u32);
        assert_eq!(wide.maybe_u64().unwrap(), None);
        assert!(wide.as_u64().is_err());

        assert!(Arc4Value::from("nope").maybe_u64().is_err());
    }

    #[test]
    fn test_struct_field_lookup() {
        let v = Arc4Value::structure(vec![("x", 1u64.into()), ("y", 2u64.into())]);
        assert_eq!(v.field("y").unwrap().as_u64().unwrap(), 2);
        assert!(v.field("z").is_err());
        assert_eq!(v.as_list().unwrap().len(), 2);
    }

    #[test]
    fn test_accessor_mismatch() {
        let v = Arc4Value::Bool(true);
        assert!(v.as_str().is_err());
        assert!(v.as_bytes().is_err());
        assert!(v.as_bool().unwrap());
    }
}
