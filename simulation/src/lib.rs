//! # MANET Wormhole Simulation
//!
//! A discrete-event simulation of an ad hoc wireless network under a
//! wormhole attack, and of an RTT-based countermeasure against it.
//!
//! ## Overview
//!
//! Nodes run an on-demand distance-vector router ([`manet_routing`]). Two
//! colluding nodes share an out-of-band tunnel that makes distant parts of
//! the network look adjacent, so discovery prefers routes through them. The
//! countermeasure times every route request/reply round trip and refuses
//! routes that come back faster than their hop count allows.
//!
//! ## Architecture
//!
//! - **Config** (`config.rs`): [`SimConfig`] with every knob of a run
//! - **Topology** (`topology.rs`): node placement and radio adjacency
//! - **Links** (`link.rs`, `tunnel.rs`): radio timing and loss, the tunnel
//! - **Scheduler** (`scheduler.rs`): the single event timeline
//! - **Simulation** (`simulation.rs`): the engine driving routers and apps
//! - **Apps** (`app.rs`, `node.rs`): UDP echo client and server
//! - **Flows** (`flow.rs`, `report.rs`): per-flow statistics and the JSON trace
//! - **Scenarios** (`scenarios.rs`): calibration and the attack comparison
//!
//! ## Example
//!
//! ```rust,no_run
//! use manet_simulation::{SimConfig, scenarios};
//!
//! let comparison = scenarios::compare(&SimConfig::default())?;
//! assert!(comparison.undefended.uses_tunnel);
//! assert!(!comparison.defended.uses_tunnel);
//! # Ok::<(), manet_simulation::SimError>(())
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod flow;
pub mod link;
pub mod node;
pub mod report;
pub mod scenarios;
pub mod scheduler;
pub mod simulation;
pub mod topology;
pub mod tunnel;

#[cfg(test)]
mod integration_scenarios;

pub use app::{Application, EchoClient, EchoServer, PacketHandler};
pub use config::{CountermeasureConfig, EchoConfig, Layout, PhyMode, SimConfig, TunnelConfig};
pub use error::{ConfigError, SimError, SimResult};
pub use flow::{Direction, FlowMonitor, FlowRecord, FlowStats};
pub use link::WirelessLink;
pub use node::Node;
pub use report::{FlowTrace, format_flow_stats};
pub use scenarios::{Comparison, RouteSummary, ScenarioRun};
pub use scheduler::{EventId, Scheduler};
pub use simulation::{SimEvent, SimStats, Simulation};
pub use topology::{Position, Topology};
pub use tunnel::WormholeTunnel;
