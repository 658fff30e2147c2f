//! # MANET Routing
//!
//! On-demand distance-vector routing (AODV-like) with RTT-gated route
//! installation.
//!
//! ## Core Components
//!
//! - [`AodvRouter`]: Per-node discovery state machine, sans-I/O
//! - [`RoutingTable`]: Destination entries under the sequence-number freshness rule
//! - [`RequestCache`]: Duplicate route request suppression
//! - [`PendingDiscovery`]: Send times and queued data of an in-flight discovery
//!
//! ## Discovery Gate
//!
//! When a reply reaches the originator, the round trip since the matching
//! request is fed into the route's RTT estimator and the configured
//! [`Detector`](manet_core::Detector) judges it. A route the detector
//! suspects is never installed: its next hop is marked as a suspect and
//! the discovery is retried through the remaining neighbors.
//!
//! ## Example
//!
//! ```
//! use manet_core::{NodeId, SimTime};
//! use manet_routing::{AodvRouter, RouterAction, RouterConfig};
//!
//! let mut router = AodvRouter::new(NodeId(1), RouterConfig::default());
//! let actions = router.discover(NodeId(4), SimTime::ZERO);
//! assert!(actions.iter().any(|a| matches!(a, RouterAction::Transmit { .. })));
//! assert!(router.is_discovering(NodeId(4)));
//! ```

pub mod discovery;
pub mod error;
pub mod router;
pub mod table;

// Re-export main types
pub use discovery::{PendingDiscovery, RequestCache};
pub use error::{RouterError, RoutingResult};
pub use router::{AodvRouter, RouterAction, RouterConfig, RouterStats, RouterTimer};
pub use table::{RouteEntry, RouteUpdate, RoutingTable};

// Re-export core routing types for convenience
pub use manet_core::{DropReason, RoutingError};
