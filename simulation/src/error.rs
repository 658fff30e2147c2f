//! Error types for the simulation crate

use manet_core::NodeId;
use manet_routing::RouterError;
use thiserror::Error;

/// Setup problems, all reported before the clock starts
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("At least {min} nodes are required, got {got}")]
    TooFewNodes { min: u32, got: u32 },

    #[error("Node spacing must be positive, got {0}")]
    InvalidSpacing(f64),

    #[error("Radio range must be positive, got {0}")]
    InvalidRange(f64),

    #[error("Grid needs at least one column")]
    InvalidGrid,

    #[error("Simulation duration must be positive")]
    ZeroDuration,

    #[error("Unknown PHY mode: {0}")]
    UnknownPhyMode(String),

    #[error("{name} must lie in {range}, got {value}")]
    InvalidProbability {
        name: &'static str,
        range: &'static str,
        value: f64,
    },

    #[error("Tunnel endpoint {endpoint} is not one of the {nodes} nodes")]
    TunnelEndpointOutOfRange { endpoint: NodeId, nodes: u32 },

    #[error("Tunnel endpoints must differ, both are {0}")]
    IdenticalTunnelEndpoints(NodeId),

    #[error("Echo endpoint {endpoint} is not one of the {nodes} nodes")]
    EchoEndpointOutOfRange { endpoint: NodeId, nodes: u32 },

    #[error("Echo source and sink must differ, both are {0}")]
    IdenticalEchoEndpoints(NodeId),

    #[error("Countermeasure needs a baseline when calibration is off")]
    MissingBaseline,

    #[error(transparent)]
    Router(#[from] RouterError),
}

/// Errors raised while preparing, running or reporting a simulation
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Calibration run produced no round-trip samples")]
    NoCalibrationSamples,

    #[error("Failed to serialize trace: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write trace: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for simulation operations
pub type SimResult<T> = Result<T, SimError>;
