//! Per-round block data

use serde::{Deserialize, Serialize};

/// Seed and timestamp of a round, as exposed to `block` lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockData {
    pub seed: u64,
    pub timestamp: u64,
}
