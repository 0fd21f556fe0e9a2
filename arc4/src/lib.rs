//! ARC4 ABI types and binary codec
//!
//! Typed values are laid out on the wire using the ARC4 head/tail format
//! shared by method arguments, return values and persisted contract state.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Encode / Decode Flow                │
//! ├─────────────────────────────────────────────────────┤
//! │  TypeDescriptor  (shape: uint64[4], (bool,string))  │
//! │      ↓                                              │
//! │  Arc4Value       (native projection)                │
//! │      ↓                                              │
//! │  Encoder/Decoder (head/tail, packed bools, offsets) │
//! │      ↓                                              │
//! │  EncodedValue    (descriptor + bytes + native)      │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Resource references (`account`, `asset`, `application`) are the only
//! context-dependent values: they go through a [`ResourceResolver`]
//! supplied by the transaction layer.

pub mod address;
pub mod codec;
pub mod constants;
pub mod encoded;
pub mod errors;
pub mod selector;
pub mod types;
pub mod value;

pub use address::Address;
pub use codec::{
    decode, encode, return_log, strip_return_prefix, DecodePrefix, Decoder, Encoder, ResourceEncoding,
    ResourceResolver,
};
pub use encoded::EncodedValue;
pub use errors::{Arc4Error, Arc4Result, ErrorKind};
pub use selector::{method_selector, MethodSignature};
pub use types::TypeDescriptor;
pub use value::Arc4Value;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::address::Address;
    pub use crate::codec::{DecodePrefix, ResourceEncoding};
    pub use crate::encoded::EncodedValue;
    pub use crate::errors::{Arc4Error, Arc4Result, ErrorKind};
    pub use crate::selector::{method_selector, MethodSignature};
    pub use crate::types::TypeDescriptor;
    pub use crate::value::Arc4Value;
}
