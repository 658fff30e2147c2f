//! Simulation configuration
//!
//! [`SimConfig`] gathers every knob of a run. Defaults reproduce the
//! reference scenario: six nodes on a line 100 m apart, a tunnel between
//! the two ends, and one echo from node 1 to node 4.

use std::str::FromStr;
use std::time::Duration;

use derive_more::Display;
use manet_core::NodeId;
use manet_detect::{Baseline, DetectorConfig, RttConfig};
use manet_routing::RouterConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 802.11b/g rate modes, named as ns-3 names them
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhyMode {
    #[default]
    #[display("DsssRate1Mbps")]
    DsssRate1Mbps,
    #[display("DsssRate2Mbps")]
    DsssRate2Mbps,
    #[display("DsssRate5_5Mbps")]
    DsssRate5_5Mbps,
    #[display("DsssRate11Mbps")]
    DsssRate11Mbps,
    #[display("ErpOfdmRate6Mbps")]
    ErpOfdmRate6Mbps,
    #[display("ErpOfdmRate12Mbps")]
    ErpOfdmRate12Mbps,
    #[display("ErpOfdmRate24Mbps")]
    ErpOfdmRate24Mbps,
    #[display("ErpOfdmRate54Mbps")]
    ErpOfdmRate54Mbps,
}

impl PhyMode {
    pub const ALL: [PhyMode; 8] = [
        PhyMode::DsssRate1Mbps,
        PhyMode::DsssRate2Mbps,
        PhyMode::DsssRate5_5Mbps,
        PhyMode::DsssRate11Mbps,
        PhyMode::ErpOfdmRate6Mbps,
        PhyMode::ErpOfdmRate12Mbps,
        PhyMode::ErpOfdmRate24Mbps,
        PhyMode::ErpOfdmRate54Mbps,
    ];

    /// Data rate in bits per second
    pub fn bitrate(&self) -> u64 {
        match self {
            Self::DsssRate1Mbps => 1_000_000,
            Self::DsssRate2Mbps => 2_000_000,
            Self::DsssRate5_5Mbps => 5_500_000,
            Self::DsssRate11Mbps => 11_000_000,
            Self::ErpOfdmRate6Mbps => 6_000_000,
            Self::ErpOfdmRate12Mbps => 12_000_000,
            Self::ErpOfdmRate24Mbps => 24_000_000,
            Self::ErpOfdmRate54Mbps => 54_000_000,
        }
    }

    pub fn is_dsss(&self) -> bool {
        matches!(
            self,
            Self::DsssRate1Mbps | Self::DsssRate2Mbps | Self::DsssRate5_5Mbps | Self::DsssRate11Mbps
        )
    }

    /// PLCP preamble and header time
    pub fn preamble(&self) -> Duration {
        if self.is_dsss() {
            Duration::from_micros(192)
        } else {
            Duration::from_micros(20)
        }
    }
}

impl FromStr for PhyMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.to_string() == s)
            .ok_or_else(|| ConfigError::UnknownPhyMode(s.to_string()))
    }
}

/// Node placement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    /// Nodes on the x axis, `spacing` apart
    #[default]
    Line,
    /// Row-major grid with `columns` nodes per row
    Grid { columns: u32 },
}

/// The colluding pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TunnelConfig {
    pub enabled: bool,
    pub endpoints: (NodeId, NodeId),
    pub latency: Duration,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoints: (NodeId(0), NodeId(5)),
            latency: Duration::from_micros(1),
        }
    }
}

/// UDP echo traffic between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EchoConfig {
    /// Node running the client
    pub source: NodeId,
    /// Node running the server
    pub sink: NodeId,
    pub port: u16,
    pub packet_size: u32,
    pub max_packets: u32,
    pub interval: Duration,
    pub server_start: Duration,
    pub client_start: Duration,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            source: NodeId(1),
            sink: NodeId(4),
            port: 9,
            packet_size: 1024,
            max_packets: 1,
            interval: Duration::from_secs(1),
            server_start: Duration::from_secs(1),
            client_start: Duration::from_secs(2),
        }
    }
}

/// RTT-based route gating
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CountermeasureConfig {
    pub enabled: bool,
    /// Measure the per-hop baseline in a wormhole-free run first
    pub calibrate: bool,
    pub detector: DetectorConfig,
    /// Used when calibration is off
    pub baseline: Option<Baseline>,
}

impl Default for CountermeasureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            calibrate: true,
            detector: DetectorConfig::default(),
            baseline: None,
        }
    }
}

/// Configuration for one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub nodes: u32,
    pub layout: Layout,
    /// Metres between neighboring nodes
    pub spacing: f64,
    /// Radio range in metres
    pub range: f64,
    /// Independent per-frame loss on the radio
    pub loss_probability: f64,
    pub phy_mode: PhyMode,
    pub duration: Duration,
    pub seed: u64,
    pub flow_monitor: bool,
    pub tunnel: TunnelConfig,
    pub echo: Option<EchoConfig>,
    pub countermeasure: CountermeasureConfig,
    pub router: RouterConfig,
    pub rtt: RttConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            nodes: 6,
            layout: Layout::Line,
            spacing: 100.0,
            range: 150.0,
            loss_probability: 0.0,
            phy_mode: PhyMode::default(),
            duration: Duration::from_secs(100),
            seed: 1,
            flow_monitor: true,
            tunnel: TunnelConfig::default(),
            echo: Some(EchoConfig::default()),
            countermeasure: CountermeasureConfig::default(),
            router: RouterConfig::default(),
            rtt: RttConfig::default(),
        }
    }
}

impl SimConfig {
    pub const MIN_NODES: u32 = 2;

    pub fn with_nodes(mut self, nodes: u32) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_phy_mode(mut self, phy_mode: PhyMode) -> Self {
        self.phy_mode = phy_mode;
        self
    }

    pub fn with_loss(mut self, probability: f64) -> Self {
        self.loss_probability = probability;
        self
    }

    pub fn with_wormhole(mut self, enabled: bool) -> Self {
        self.tunnel.enabled = enabled;
        self
    }

    pub fn with_countermeasure(mut self, enabled: bool) -> Self {
        self.countermeasure.enabled = enabled;
        self
    }

    /// Use a fixed per-hop baseline instead of calibrating
    pub fn with_baseline(mut self, baseline: Baseline) -> Self {
        self.countermeasure.calibrate = false;
        self.countermeasure.baseline = Some(baseline);
        self
    }

    pub fn with_echo(mut self, echo: Option<EchoConfig>) -> Self {
        self.echo = echo;
        self
    }

    pub fn with_router(mut self, router: RouterConfig) -> Self {
        self.router = router;
        self
    }

    /// Check everything that would make the run meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nodes < Self::MIN_NODES {
            return Err(ConfigError::TooFewNodes {
                min: Self::MIN_NODES,
                got: self.nodes,
            });
        }
        if !(self.spacing.is_finite() && self.spacing > 0.0) {
            return Err(ConfigError::InvalidSpacing(self.spacing));
        }
        if !(self.range.is_finite() && self.range > 0.0) {
            return Err(ConfigError::InvalidRange(self.range));
        }
        if let Layout::Grid { columns: 0 } = self.layout {
            return Err(ConfigError::InvalidGrid);
        }
        if self.duration.is_zero() {
            return Err(ConfigError::ZeroDuration);
        }
        if !(0.0..=1.0).contains(&self.loss_probability) {
            return Err(ConfigError::InvalidProbability {
                name: "loss probability",
                range: "[0, 1]",
                value: self.loss_probability,
            });
        }

        if self.tunnel.enabled {
            let (a, b) = self.tunnel.endpoints;
            for endpoint in [a, b] {
                if endpoint.index() >= self.nodes {
                    return Err(ConfigError::TunnelEndpointOutOfRange {
                        endpoint,
                        nodes: self.nodes,
                    });
                }
            }
            if a == b {
                return Err(ConfigError::IdenticalTunnelEndpoints(a));
            }
        }

        if let Some(echo) = &self.echo {
            for endpoint in [echo.source, echo.sink] {
                if endpoint.index() >= self.nodes {
                    return Err(ConfigError::EchoEndpointOutOfRange {
                        endpoint,
                        nodes: self.nodes,
                    });
                }
            }
            if echo.source == echo.sink {
                return Err(ConfigError::IdenticalEchoEndpoints(echo.source));
            }
        }

        let countermeasure = &self.countermeasure;
        let tolerance = countermeasure.detector.tolerance;
        if !(0.0..1.0).contains(&tolerance) {
            return Err(ConfigError::InvalidProbability {
                name: "detector tolerance",
                range: "[0, 1)",
                value: tolerance,
            });
        }
        if countermeasure.enabled && !countermeasure.calibrate && countermeasure.baseline.is_none() {
            return Err(ConfigError::MissingBaseline);
        }

        self.router.validate()?;
        Ok(())
    }
}
