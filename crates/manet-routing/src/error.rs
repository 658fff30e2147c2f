//! Routing error types
//!
//! Re-exports the core routing errors and adds the router's own.

use thiserror::Error;

// Re-export core routing errors
pub use manet_core::RoutingError as CoreRoutingError;

/// Extended routing errors for the routing crate
#[derive(Debug, Error)]
pub enum RouterError {
    /// Core routing error
    #[error("Core routing error: {0}")]
    Core(#[from] CoreRoutingError),

    /// Invalid router configuration
    #[error("Invalid router configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for routing operations
pub type RoutingResult<T> = Result<T, RouterError>;

#[cfg(test)]
mod tests {
    use super::*;
    use manet_core::NodeId;

    #[test]
    fn test_router_error_from_core() {
        let err: RouterError = CoreRoutingError::SuspectedWormhole {
            destination: NodeId(4),
            next_hop: NodeId(0),
        }
        .into();
        assert!(format!("{}", err).contains("Suspected wormhole"));
    }

    #[test]
    fn test_router_error_display() {
        assert!(format!("{}", RouterError::InvalidConfig("zero timeout".into())).contains("zero timeout"));
    }
}
