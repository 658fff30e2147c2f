//! Range-limited wireless link
//!
//! Delay per hop is PLCP preamble + (wire bytes + MAC framing) at the PHY
//! rate + propagation at the speed of light + a fixed processing delay.
//! There is no contention; each frame sees the channel idle.

use std::time::Duration;

use manet_core::{Carry, LinkModel, NodeId};
use rand::{Rng, RngCore};

use crate::config::{PhyMode, SimConfig};
use crate::topology::Topology;

/// 802.11 MAC header, FCS and LLC/SNAP bytes added to every frame
pub const MAC_OVERHEAD: usize = 36;

/// Receive-side processing before a node acts on a frame
pub const PROCESSING_DELAY: Duration = Duration::from_micros(50);

pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Shared radio channel between nodes in range of each other
#[derive(Debug, Clone)]
pub struct WirelessLink {
    topology: Topology,
    range: f64,
    phy_mode: PhyMode,
    loss_probability: f64,
    /// Neighbors of node `i` at index `i`
    neighbors: Vec<Vec<NodeId>>,
}

impl WirelessLink {
    pub fn new(topology: Topology, range: f64, phy_mode: PhyMode, loss_probability: f64) -> Self {
        let neighbors = topology
            .node_ids()
            .into_iter()
            .map(|node| topology.neighbors_within(node, range))
            .collect();
        Self {
            topology,
            range,
            phy_mode,
            loss_probability,
            neighbors,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(
            Topology::from_layout(config.layout, config.nodes, config.spacing),
            config.range,
            config.phy_mode,
            config.loss_probability,
        )
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn range(&self) -> f64 {
        self.range
    }

    pub fn phy_mode(&self) -> PhyMode {
        self.phy_mode
    }

    pub fn loss_probability(&self) -> f64 {
        self.loss_probability
    }

    /// Time on air for a frame carrying `bytes` wire bytes
    pub fn airtime(&self, bytes: usize) -> Duration {
        let bits = ((bytes + MAC_OVERHEAD) * 8) as u128;
        let nanos = bits * 1_000_000_000 / u128::from(self.phy_mode.bitrate());
        self.phy_mode.preamble() + Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Time for the signal to cover `distance` metres
    pub fn propagation(distance: f64) -> Duration {
        Duration::from_nanos((distance / SPEED_OF_LIGHT * 1e9).round() as u64)
    }

    /// Sender start to receiver ready, for one frame over `distance`
    pub fn hop_delay(&self, bytes: usize, distance: f64) -> Duration {
        self.airtime(bytes) + Self::propagation(distance) + PROCESSING_DELAY
    }
}

impl LinkModel for WirelessLink {
    fn name(&self) -> &'static str {
        "wireless"
    }

    fn receivers(&self, from: NodeId) -> Vec<NodeId> {
        self.neighbors
            .get(from.index() as usize)
            .cloned()
            .unwrap_or_default()
    }

    fn connects(&self, from: NodeId, to: NodeId) -> bool {
        self.neighbors
            .get(from.index() as usize)
            .is_some_and(|n| n.contains(&to))
    }

    fn carry(&self, from: NodeId, to: NodeId, bytes: usize, rng: &mut dyn RngCore) -> Carry {
        if !self.connects(from, to) {
            return Carry::Unreachable;
        }
        let Some(distance) = self.topology.distance(from, to) else {
            return Carry::Unreachable;
        };
        // Only draw when loss is on, so lossless runs keep the jitter stream
        if self.loss_probability > 0.0 && rng.random::<f64>() < self.loss_probability {
            return Carry::Lost;
        }
        Carry::Delivered {
            delay: self.hop_delay(bytes, distance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn link(loss: f64) -> WirelessLink {
        WirelessLink::new(Topology::line(6, 100.0), 150.0, PhyMode::DsssRate1Mbps, loss)
    }

    #[test]
    fn test_airtime_dsss_1mbps() {
        // (1052 + 36) bytes * 8 bits at 1 Mbps, plus the long preamble
        assert_eq!(link(0.0).airtime(1052), Duration::from_micros(8_704 + 192));
    }

    #[test]
    fn test_airtime_ofdm() {
        let link = WirelessLink::new(Topology::line(2, 10.0), 50.0, PhyMode::ErpOfdmRate54Mbps, 0.0);
        // 100 bytes: 1088 bits at 54 Mbps = 20148 ns
        assert_eq!(link.airtime(100), Duration::from_nanos(20_000 + 20_148));
    }

    #[test]
    fn test_hop_delay() {
        assert_eq!(WirelessLink::propagation(100.0), Duration::from_nanos(334));
        assert_eq!(
            link(0.0).hop_delay(1052, 100.0),
            Duration::from_micros(8_896) + Duration::from_nanos(334) + PROCESSING_DELAY
        );
    }

    #[test]
    fn test_receivers_follow_range() {
        let link = link(0.0);
        assert_eq!(link.receivers(NodeId(0)), vec![NodeId(1)]);
        assert_eq!(link.receivers(NodeId(3)), vec![NodeId(2), NodeId(4)]);
        assert!(link.receivers(NodeId(9)).is_empty());
        assert!(link.connects(NodeId(4), NodeId(5)));
        assert!(!link.connects(NodeId(0), NodeId(5)));
    }

    #[test]
    fn test_carry() {
        let mut rng = StdRng::seed_from_u64(1);
        let link = link(0.0);
        assert_eq!(
            link.carry(NodeId(1), NodeId(2), 100, &mut rng).delay(),
            Some(link.hop_delay(100, 100.0))
        );
        assert_eq!(link.carry(NodeId(0), NodeId(2), 100, &mut rng), Carry::Unreachable);
    }

    #[test]
    fn test_total_loss() {
        let mut rng = StdRng::seed_from_u64(1);
        let link = link(1.0);
        for _ in 0..20 {
            assert_eq!(link.carry(NodeId(1), NodeId(2), 100, &mut rng), Carry::Lost);
        }
    }

    #[test]
    fn test_partial_loss_is_seeded() {
        let link = link(0.5);
        let outcomes = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..64)
                .map(|_| link.carry(NodeId(1), NodeId(2), 100, &mut rng) == Carry::Lost)
                .collect::<Vec<_>>()
        };
        let first = outcomes(9);
        assert_eq!(first, outcomes(9));
        assert!(first.iter().any(|lost| *lost));
        assert!(first.iter().any(|lost| !*lost));
    }
}
