//! 32-byte account addresses

use crate::constants::ADDRESS_SIZE;
use crate::errors::{Arc4Error, Arc4Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512_256};
use std::fmt;

/// Domain separator for application account addresses
const APP_ID_PREFIX: &[u8] = b"appID";

/// Account address (raw 32-byte public key)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address([u8; ADDRESS_SIZE]);

impl Address {
    /// The all-zero address
    pub const ZERO: Address = Address([0u8; ADDRESS_SIZE]);

    pub const fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    /// Build an address from a slice, which must be exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Arc4Result<Self> {
        let arr: [u8; ADDRESS_SIZE] = bytes
            .try_into()
            .map_err(|_| Arc4Error::malformed("address", format!("expected 32 bytes, got {}", bytes.len())))?;
        Ok(Self(arr))
    }

    /// Parse a hex-encoded address
    pub fn from_hex(s: &str) -> Arc4Result<Self> {
        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| Arc4Error::malformed("address", e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Escrow address of an application: SHA-512/256("appID" || id)
    pub fn for_application(app_id: u64) -> Self {
        let mut hasher = Sha512_256::new();
        hasher.update(APP_ID_PREFIX);
        hasher.update(app_id.to_be_bytes());
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_SIZE]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; ADDRESS_SIZE]> for Address {
    fn from(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}..)", hex::encode(&self.0[..8]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let addr = Address::new([7u8; 32]);
        let parsed = Address::from_hex(&addr.to_hex()).unwrap();
        assert_eq!(addr, parsed);
    }

    #[test]
    fn test_from_slice_wrong_length() {
        assert!(Address::from_slice(&[1u8; 31]).is_err());
    }

    #[test]
    fn test_application_address_deterministic() {
        let a = Address::for_application(1001);
        let b = Address::for_application(1001);
        let c = Address::for_application(1002);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.is_zero());
    }
}
