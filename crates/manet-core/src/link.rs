//! Link capability
//!
//! Anything that moves frames between nodes implements [`LinkModel`]: the
//! range-limited radio and the wormhole tunnel alike. The engine asks each
//! link who hears a sender and how long a frame takes to get there.

use std::time::Duration;

use rand::RngCore;

use crate::identity::NodeId;

/// Outcome of carrying one frame over one link to one receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Carry {
    /// Arrives after `delay`
    Delivered { delay: Duration },
    /// In range but lost on the way
    Lost,
    /// The link does not connect the two nodes
    Unreachable,
}

impl Carry {
    pub fn delay(&self) -> Option<Duration> {
        match self {
            Self::Delivered { delay } => Some(*delay),
            _ => None,
        }
    }
}

/// A medium that carries frames between nodes
pub trait LinkModel {
    /// Name for logging
    fn name(&self) -> &'static str;

    /// Nodes that hear a frame sent by `from` on this link
    fn receivers(&self, from: NodeId) -> Vec<NodeId>;

    /// Whether `to` hears `from` on this link
    fn connects(&self, from: NodeId, to: NodeId) -> bool {
        self.receivers(from).contains(&to)
    }

    /// Carry a frame of `bytes` wire bytes from `from` to `to`
    fn carry(&self, from: NodeId, to: NodeId, bytes: usize, rng: &mut dyn RngCore) -> Carry;
}
