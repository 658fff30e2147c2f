//! # MANET Core
//!
//! Core identifiers, packets, and capabilities shared by the routing,
//! detection, and simulation crates.
//!
//! ## Key Traits
//!
//! - [`LinkModel`]: Something that carries frames between nodes (radio, tunnel)
//! - [`Detector`]: Classifies a route from its observable timing only
//! - [`Clock`]: Source of simulated time
//!
//! ## Key Types
//!
//! - [`NodeId`]: Address of a node in the network
//! - [`SimTime`]: Monotonic simulated instant
//! - [`Packet`] / [`Frame`]: Routing and data traffic on the air
//! - [`NetworkEvent`]: Events recorded over a run

pub mod detect;
pub mod error;
pub mod event;
pub mod identity;
pub mod link;
pub mod packet;
pub mod time;

// Re-export main types
pub use detect::*;
pub use error::*;
pub use event::*;
pub use identity::*;
pub use link::*;
pub use packet::*;
pub use time::*;
