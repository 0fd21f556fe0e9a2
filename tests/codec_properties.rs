//! Property-Based Tests for the ARC4 codec
//!
//! Uses proptest to generate random type descriptors with matching values
//! and verify the wire-format properties hold.

use avm_emu::arc4::{decode, encode, method_selector, Address, Arc4Value, DecodePrefix, EncodedValue, TypeDescriptor};
use num_bigint::BigUint;
use proptest::prelude::*;

// =============================================================================
// PROPTEST STRATEGIES
// =============================================================================

fn leaf_type() -> impl Strategy<Value = TypeDescriptor> {
    prop_oneof![
        Just(TypeDescriptor::Bool),
        (1u16..=64).prop_map(|n| TypeDescriptor::Uint(n * 8)),
        Just(TypeDescriptor::Byte),
        Just(TypeDescriptor::Address),
        Just(TypeDescriptor::Str),
        Just(TypeDescriptor::DynamicBytes),
        (0usize..8).prop_map(TypeDescriptor::StaticBytes),
        (1u16..=64, 1u8..=160).prop_map(|(n, precision)| TypeDescriptor::UFixed { bits: n * 8, precision }),
        Just(TypeDescriptor::Account),
        Just(TypeDescriptor::Asset),
        Just(TypeDescriptor::Application),
    ]
}

fn named_fields(types: Vec<TypeDescriptor>) -> Vec<(String, TypeDescriptor)> {
    types.into_iter().enumerate().map(|(i, t)| (format!("f{}", i), t)).collect()
}

/// Nested arrays and tuples over the leaf types
fn any_type() -> impl Strategy<Value = TypeDescriptor> {
    leaf_type().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            (inner.clone(), 0usize..4).prop_map(|(t, n)| TypeDescriptor::StaticArray(Box::new(t), n)),
            inner.clone().prop_map(|t| TypeDescriptor::DynamicArray(Box::new(t))),
            prop::collection::vec(inner.clone(), 1..5).prop_map(TypeDescriptor::Tuple),
            prop::collection::vec(inner, 1..5).prop_map(|types| TypeDescriptor::Struct {
                name: "Record".to_string(),
                fields: named_fields(types),
            }),
        ]
    })
}

/// Values of exactly the shape of `ty`; struct fields come in shuffled order
fn value_for(ty: &TypeDescriptor) -> BoxedStrategy<Arc4Value> {
    match ty {
        TypeDescriptor::Bool => any::<bool>().prop_map(Arc4Value::Bool).boxed(),
        TypeDescriptor::Uint(bits) | TypeDescriptor::UFixed { bits, .. } => prop::collection::vec(any::<u8>(), *bits as usize / 8)
            .prop_map(|b| Arc4Value::Uint(BigUint::from_bytes_be(&b)))
            .boxed(),
        TypeDescriptor::Byte => any::<u8>().prop_map(Arc4Value::from).boxed(),
        TypeDescriptor::Address => prop::array::uniform32(any::<u8>())
            .prop_map(|b| Arc4Value::Address(Address::new(b)))
            .boxed(),
        TypeDescriptor::Str => "[a-zA-Z0-9 ]{0,8}".prop_map(Arc4Value::Str).boxed(),
        TypeDescriptor::DynamicBytes => prop::collection::vec(any::<u8>(), 0..8)
            .prop_map(Arc4Value::Bytes)
            .boxed(),
        TypeDescriptor::StaticBytes(n) => prop::collection::vec(any::<u8>(), *n)
            .prop_map(Arc4Value::Bytes)
            .boxed(),
        TypeDescriptor::StaticArray(element, n) => prop::collection::vec(value_for(element), *n)
            .prop_map(Arc4Value::List)
            .boxed(),
        TypeDescriptor::DynamicArray(element) => prop::collection::vec(value_for(element), 0..4)
            .prop_map(Arc4Value::List)
            .boxed(),
        TypeDescriptor::Tuple(types) => types
            .iter()
            .map(value_for)
            .collect::<Vec<_>>()
            .prop_map(Arc4Value::Tuple)
            .boxed(),
        TypeDescriptor::Struct { fields, .. } => fields
            .iter()
            .map(|(name, t)| {
                let name = name.clone();
                value_for(t).prop_map(move |v| (name.clone(), v)).boxed()
            })
            .collect::<Vec<_>>()
            .prop_shuffle()
            .prop_map(Arc4Value::Struct)
            .boxed(),
        TypeDescriptor::Account => prop::array::uniform32(any::<u8>())
            .prop_map(|b| Arc4Value::Account(Address::new(b)))
            .boxed(),
        TypeDescriptor::Asset => any::<u64>().prop_map(Arc4Value::Asset).boxed(),
        TypeDescriptor::Application => any::<u64>().prop_map(Arc4Value::Application).boxed(),
    }
}

fn typed_value() -> impl Strategy<Value = (TypeDescriptor, Arc4Value)> {
    any_type().prop_flat_map(|ty| {
        let values = value_for(&ty);
        (Just(ty), values)
    })
}

// =============================================================================
// ROUND-TRIP PROPERTIES
// =============================================================================

proptest! {
    /// Property: decode(encode(v, T), T) == v, with struct fields in
    /// declaration order
    #[test]
    fn encode_decode_roundtrip((ty, value) in typed_value()) {
        let bytes = encode(&value, &ty).unwrap();
        let decoded = decode(&bytes, &ty, DecodePrefix::None).unwrap();
        let encoded = EncodedValue::encode(value, ty).unwrap();
        prop_assert_eq!(encoded.bytes(), bytes.as_slice());
        prop_assert_eq!(&decoded, encoded.native());
    }

    /// Property: positional items of a struct are its declared fields
    #[test]
    fn struct_items_match_fields((ty, value) in typed_value()) {
        let encoded = EncodedValue::encode(value, ty.clone()).unwrap();
        if let TypeDescriptor::Struct { fields, .. } = &ty {
            prop_assert_eq!(encoded.len().unwrap(), fields.len());
            for (i, (name, _)) in fields.iter().enumerate() {
                prop_assert_eq!(encoded.item(i).unwrap(), encoded.field(name).unwrap());
            }
        }
    }

    /// Property: static types always encode to their fixed length
    #[test]
    fn static_types_have_fixed_length((ty, value) in typed_value()) {
        let bytes = encode(&value, &ty).unwrap();
        if let Some(len) = ty.fixed_byte_length() {
            prop_assert_eq!(bytes.len(), len);
        } else {
            prop_assert!(ty.is_dynamic());
        }
    }

    /// Property: a logged return value decodes back through the prefix
    #[test]
    fn return_log_roundtrip((ty, value) in typed_value()) {
        let encoded = EncodedValue::encode(value, ty.clone()).unwrap();
        let log = encoded.to_return_log();
        let decoded = EncodedValue::decode(&log, ty, DecodePrefix::Log).unwrap();
        prop_assert_eq!(decoded, encoded);
    }

    /// Property: canonical type names are stable under parsing
    ///
    /// `byte` arrays parse back as the byte-string descriptors, so the
    /// names are compared rather than the descriptors.
    #[test]
    fn type_name_roundtrip(ty in any_type()) {
        let parsed: TypeDescriptor = ty.to_string().parse().unwrap();
        prop_assert_eq!(parsed.to_string(), ty.to_string());
        prop_assert_eq!(parsed.fixed_byte_length(), ty.fixed_byte_length());
    }
}

// =============================================================================
// BOOLEAN PACKING
// =============================================================================

proptest! {
    /// Property: n consecutive bools in a tuple occupy ceil(n / 8) bytes, MSB first
    #[test]
    fn bools_pack_msb_first(bits in prop::collection::vec(any::<bool>(), 1..40)) {
        let ty = TypeDescriptor::Tuple(vec![TypeDescriptor::Bool; bits.len()]);
        let value = Arc4Value::Tuple(bits.iter().copied().map(Arc4Value::Bool).collect());
        let bytes = encode(&value, &ty).unwrap();

        prop_assert_eq!(bytes.len(), (bits.len() + 7) / 8);
        for (i, bit) in bits.iter().enumerate() {
            let set = bytes[i / 8] & (0x80 >> (i % 8)) != 0;
            prop_assert_eq!(set, *bit);
        }
    }

    /// Property: a bool array carries a count prefix followed by packed bits
    #[test]
    fn bool_arrays_are_packed(bits in prop::collection::vec(any::<bool>(), 0..40)) {
        let ty = TypeDescriptor::DynamicArray(Box::new(TypeDescriptor::Bool));
        let value = Arc4Value::List(bits.iter().copied().map(Arc4Value::Bool).collect());
        let bytes = encode(&value, &ty).unwrap();

        prop_assert_eq!(bytes.len(), 2 + (bits.len() + 7) / 8);
        prop_assert_eq!(u16::from_be_bytes([bytes[0], bytes[1]]) as usize, bits.len());
    }
}

// =============================================================================
// DYNAMIC OFFSETS AND OVERFLOW
// =============================================================================

proptest! {
    /// Property: dynamic tails do not overlap and cover the rest of the buffer
    #[test]
    fn dynamic_offsets_partition_tail(
        a in prop::collection::vec("[a-z]{0,6}", 1..4),
        b in prop::collection::vec("[a-z]{0,6}", 1..4),
        n in any::<u64>(),
    ) {
        let strings = TypeDescriptor::DynamicArray(Box::new(TypeDescriptor::Str));
        let ty = TypeDescriptor::Tuple(vec![strings.clone(), strings.clone(), TypeDescriptor::uint64()]);
        let list = |v: &Vec<String>| Arc4Value::List(v.iter().map(|s| Arc4Value::from(s.as_str())).collect());
        let value = Arc4Value::Tuple(vec![list(&a), list(&b), Arc4Value::from(n)]);
        let bytes = encode(&value, &ty).unwrap();

        let first = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
        let second = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
        prop_assert_eq!(first, 12);
        prop_assert!(second > first);

        let first_len = encode(&list(&a), &strings).unwrap().len();
        let second_len = encode(&list(&b), &strings).unwrap().len();
        prop_assert_eq!(second - first, first_len);
        prop_assert_eq!(bytes.len() - second, second_len);
        prop_assert_eq!(first_len + second_len, bytes.len() - 12);
    }

    /// Property: values above 2^N - 1 are rejected for uint<N>
    #[test]
    fn uint_overflow_rejected(bytes in 1u16..=8) {
        let bits = bytes * 8;
        let max = (BigUint::from(1u8) << bits as usize) - 1u8;
        let ty = TypeDescriptor::Uint(bits);

        prop_assert!(encode(&Arc4Value::Uint(max.clone()), &ty).is_ok());
        let err = encode(&Arc4Value::Uint(max.clone() + 1u8), &ty).unwrap_err();
        prop_assert_eq!(err.to_string(), format!("expected value <= {}", max));
    }

    /// Property: selectors are deterministic and depend on the return type
    #[test]
    fn selector_depends_on_signature(name in "[a-z]{1,12}") {
        let with_string = format!("{}(string)string", name);
        let with_void = format!("{}(string)void", name);
        prop_assert_eq!(method_selector(&with_string), method_selector(&with_string));
        prop_assert_ne!(method_selector(&with_string), method_selector(&with_void));
    }
}
