//! Error types for the MANET workspace

use thiserror::Error;

use crate::identity::NodeId;
use crate::packet::RequestId;

/// Errors related to node identity
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid node id format: {0}")]
    InvalidFormat(String),
}

/// Errors raised by the route discovery state machine
///
/// None of these halt a run. `NoRouteFound` is surfaced to the sending
/// application, the others are logged and the offending update is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("No route found to {destination} after {attempts} attempts")]
    NoRouteFound { destination: NodeId, attempts: u32 },

    #[error("Duplicate route request {request_id} from {originator}")]
    DuplicateRequest {
        originator: NodeId,
        request_id: RequestId,
    },

    #[error("Stale sequence number for {destination}: offered {offered}, current {current}")]
    StaleSequenceNumber {
        destination: NodeId,
        offered: u32,
        current: u32,
    },

    #[error("Suspected wormhole on route to {destination} via {next_hop}")]
    SuspectedWormhole {
        destination: NodeId,
        next_hop: NodeId,
    },
}

/// Errors related to packet encoding
#[derive(Debug, Error)]
pub enum PacketError {
    #[error("Encoding failed: {0}")]
    Encoding(#[from] postcard::Error),
}
