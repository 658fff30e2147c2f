//! Node identity
//!
//! Nodes are addressed by a small integer, displayed as `n<id>`.

use std::str::FromStr;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

/// Address of a node in the network
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display("n{_0}")]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a node id from its index
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Generate the ids `n0..n(count-1)`
    pub fn range(count: u32) -> Vec<Self> {
        (0..count).map(Self).collect()
    }

    /// Get the underlying index
    pub fn index(&self) -> u32 {
        self.0
    }

    /// Short form for logging
    pub fn short_id(&self) -> String {
        self.to_string()
    }
}

impl FromStr for NodeId {
    type Err = IdentityError;

    /// Accepts both `3` and `n3`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().strip_prefix('n').unwrap_or(s.trim());
        digits
            .parse::<u32>()
            .map(Self)
            .map_err(|_| IdentityError::InvalidFormat(s.to_string()))
    }
}
