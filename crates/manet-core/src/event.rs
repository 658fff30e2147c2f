//! Network events
//!
//! Everything worth reporting about a run is recorded as a
//! [`NetworkEvent`] stamped with simulated time.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::detect::{DetectionVerdict, RouteKey};
use crate::identity::NodeId;
use crate::packet::{FlowKey, RequestId};
use crate::time::SimTime;

/// Events that occur in the network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NetworkEvent {
    /// An originator sent a route request
    DiscoveryStarted {
        originator: NodeId,
        destination: NodeId,
        request_id: RequestId,
        attempt: u32,
        at: SimTime,
    },

    /// An intermediate node re-broadcast a route request
    RequestForwarded {
        node: NodeId,
        originator: NodeId,
        request_id: RequestId,
        hop_count: u8,
        at: SimTime,
    },

    /// The destination answered a route request
    ReplySent {
        destination: NodeId,
        originator: NodeId,
        request_id: RequestId,
        next_hop: NodeId,
        at: SimTime,
    },

    /// An originator accepted a discovered route
    RouteInstalled {
        node: NodeId,
        destination: NodeId,
        next_hop: NodeId,
        hop_count: u8,
        at: SimTime,
    },

    /// An originator discarded a discovered route
    RouteRejected {
        node: NodeId,
        verdict: DetectionVerdict,
        at: SimTime,
    },

    /// A request/reply round trip completed
    RttMeasured {
        route: RouteKey,
        rtt: Duration,
        hops: u8,
        at: SimTime,
    },

    /// Discovery gave up after exhausting retries
    DiscoveryFailed {
        originator: NodeId,
        destination: NodeId,
        attempts: u32,
        at: SimTime,
    },

    /// A data packet reached its destination
    PacketDelivered {
        flow: FlowKey,
        sequence: u32,
        at: SimTime,
    },

    /// A packet was dropped
    PacketDropped {
        node: NodeId,
        reason: DropReason,
        at: SimTime,
    },

    /// A frame crossed the wormhole tunnel
    TunnelRelayed {
        from: NodeId,
        to: NodeId,
        kind: String,
        at: SimTime,
    },
}

impl NetworkEvent {
    /// Get the timestamp of this event
    pub fn at(&self) -> SimTime {
        match self {
            Self::DiscoveryStarted { at, .. } => *at,
            Self::RequestForwarded { at, .. } => *at,
            Self::ReplySent { at, .. } => *at,
            Self::RouteInstalled { at, .. } => *at,
            Self::RouteRejected { at, .. } => *at,
            Self::RttMeasured { at, .. } => *at,
            Self::DiscoveryFailed { at, .. } => *at,
            Self::PacketDelivered { at, .. } => *at,
            Self::PacketDropped { at, .. } => *at,
            Self::TunnelRelayed { at, .. } => *at,
        }
    }

    /// Create a packet dropped event
    pub fn packet_dropped(node: NodeId, reason: DropReason, at: SimTime) -> Self {
        Self::PacketDropped { node, reason, at }
    }
}

/// Reasons a packet might be dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DropReason {
    /// No valid route at a forwarding node
    NoRoute,
    /// Route discovery gave up
    DiscoveryFailed,
    /// Lost on the wireless channel
    ChannelLoss,
    /// Discovery queue full
    QueueFull,
    /// Could not be encoded for transmission
    Encoding,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoRoute => write!(f, "No route available"),
            Self::DiscoveryFailed => write!(f, "Route discovery failed"),
            Self::ChannelLoss => write!(f, "Lost on channel"),
            Self::QueueFull => write!(f, "Queue full"),
            Self::Encoding => write!(f, "Encoding failed"),
        }
    }
}
