//! Wormhole tunnel
//!
//! Two colluding nodes share an out-of-band link. Anything one endpoint
//! transmits reaches the other after the tunnel latency, regardless of
//! distance or channel loss. The receiver processes it as a normal single
//! hop, so the tunnel shortens the hop count without adding delay.

use std::time::Duration;

use manet_core::{Carry, LinkModel, NodeId};
use rand::RngCore;
use tracing::info;

use crate::config::TunnelConfig;
use crate::error::ConfigError;

/// Link name reported in logs and events
pub const TUNNEL_LINK: &str = "tunnel";

/// Bidirectional tunnel between two endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WormholeTunnel {
    a: NodeId,
    b: NodeId,
    latency: Duration,
}

impl WormholeTunnel {
    /// Set up the tunnel between `a` and `b` among `nodes` nodes
    pub fn install(a: NodeId, b: NodeId, latency: Duration, nodes: u32) -> Result<Self, ConfigError> {
        for endpoint in [a, b] {
            if endpoint.index() >= nodes {
                return Err(ConfigError::TunnelEndpointOutOfRange { endpoint, nodes });
            }
        }
        if a == b {
            return Err(ConfigError::IdenticalTunnelEndpoints(a));
        }
        info!(%a, %b, latency_ns = latency.as_nanos() as u64, "Wormhole tunnel installed");
        Ok(Self { a, b, latency })
    }

    /// Tunnel described by `config`, `None` when disabled
    pub fn from_config(config: &TunnelConfig, nodes: u32) -> Result<Option<Self>, ConfigError> {
        if !config.enabled {
            return Ok(None);
        }
        let (a, b) = config.endpoints;
        Self::install(a, b, config.latency, nodes).map(Some)
    }

    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.a, self.b)
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn is_endpoint(&self, node: NodeId) -> bool {
        node == self.a || node == self.b
    }

    /// Where a frame sent by `from` comes out, and after how long
    pub fn relay(&self, from: NodeId) -> Option<(NodeId, Duration)> {
        if from == self.a {
            Some((self.b, self.latency))
        } else if from == self.b {
            Some((self.a, self.latency))
        } else {
            None
        }
    }

    /// Whether consecutive hops `from -> to` cross the tunnel
    pub fn crosses(&self, from: NodeId, to: NodeId) -> bool {
        self.relay(from).is_some_and(|(exit, _)| exit == to)
    }
}

impl LinkModel for WormholeTunnel {
    fn name(&self) -> &'static str {
        TUNNEL_LINK
    }

    fn receivers(&self, from: NodeId) -> Vec<NodeId> {
        self.relay(from).map(|(to, _)| vec![to]).unwrap_or_default()
    }

    fn connects(&self, from: NodeId, to: NodeId) -> bool {
        self.crosses(from, to)
    }

    fn carry(&self, from: NodeId, to: NodeId, _bytes: usize, _rng: &mut dyn RngCore) -> Carry {
        match self.relay(from) {
            Some((exit, delay)) if exit == to => Carry::Delivered { delay },
            _ => Carry::Unreachable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn tunnel() -> WormholeTunnel {
        WormholeTunnel::install(NodeId(0), NodeId(5), Duration::from_micros(1), 6).unwrap()
    }

    #[test]
    fn test_install_rejects_bad_endpoints() {
        assert!(matches!(
            WormholeTunnel::install(NodeId(0), NodeId(6), Duration::ZERO, 6),
            Err(ConfigError::TunnelEndpointOutOfRange { endpoint: NodeId(6), .. })
        ));
        assert!(matches!(
            WormholeTunnel::install(NodeId(3), NodeId(3), Duration::ZERO, 6),
            Err(ConfigError::IdenticalTunnelEndpoints(NodeId(3)))
        ));
    }

    #[test]
    fn test_relay_is_bidirectional() {
        let tunnel = tunnel();
        assert_eq!(tunnel.relay(NodeId(0)), Some((NodeId(5), Duration::from_micros(1))));
        assert_eq!(tunnel.relay(NodeId(5)), Some((NodeId(0), Duration::from_micros(1))));
        assert_eq!(tunnel.relay(NodeId(2)), None);
        assert!(tunnel.crosses(NodeId(5), NodeId(0)));
        assert!(!tunnel.crosses(NodeId(0), NodeId(1)));
    }

    #[test]
    fn test_link_model_ignores_size() {
        let tunnel = tunnel();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(tunnel.receivers(NodeId(0)), vec![NodeId(5)]);
        assert!(tunnel.receivers(NodeId(1)).is_empty());
        assert_eq!(
            tunnel.carry(NodeId(0), NodeId(5), 1_000_000, &mut rng),
            Carry::Delivered {
                delay: Duration::from_micros(1)
            }
        );
        assert_eq!(tunnel.carry(NodeId(0), NodeId(1), 10, &mut rng), Carry::Unreachable);
    }

    #[test]
    fn test_from_config() {
        let mut config = TunnelConfig::default();
        assert!(WormholeTunnel::from_config(&config, 6).unwrap().is_some());
        config.enabled = false;
        assert!(WormholeTunnel::from_config(&config, 6).unwrap().is_none());
    }
}
