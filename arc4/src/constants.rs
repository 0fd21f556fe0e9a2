//! Protocol size limits and wire markers
//!
//! These values mirror the AVM and must not be made configurable.

/// Maximum length of an AVM byte string
pub const MAX_BYTES_SIZE: usize = 4096;

/// Maximum size of a single box
pub const MAX_BOX_SIZE: usize = 32768;

/// Maximum cumulative log bytes per application call
pub const MAX_LOG_SIZE: usize = 1024;

/// Maximum number of log entries per application call
pub const MAX_LOG_CALLS: usize = 32;

/// Maximum number of transactions in a group (top-level and inner)
pub const MAX_GROUP_SIZE: usize = 16;

/// Maximum number of application arguments, selector included
pub const MAX_APP_ARGS: usize = 16;

/// Number of scratch slots per transaction
pub const SCRATCH_SLOTS: usize = 256;

/// Widest supported unsigned integer
pub const MAX_UINT_BITS: u16 = 512;

/// Widest supported ufixed precision
pub const MAX_UFIXED_PRECISION: u8 = 160;

/// Marker prefixing a logged ABI return value
pub const ABI_RETURN_PREFIX: [u8; 4] = [0x15, 0x1f, 0x7c, 0x75];

/// Size of a method selector in bytes
pub const SELECTOR_SIZE: usize = 4;

/// Size of an account address in bytes
pub const ADDRESS_SIZE: usize = 32;
