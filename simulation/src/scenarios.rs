//! Prepared scenarios
//!
//! Wires a [`SimConfig`] into a ready [`Simulation`]: picks the detector,
//! calibrating the per-hop baseline first when asked to, and runs the
//! wormhole scenario with and without the countermeasure.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use manet_core::{Detector, NodeId, SimTime};
use manet_detect::{Baseline, Calibration, PassthroughDetector, RttDetector};
use manet_routing::RouteEntry;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::{EchoConfig, SimConfig};
use crate::error::{ConfigError, SimError, SimResult};
use crate::simulation::Simulation;

/// First calibration discovery
pub const CALIBRATION_START: SimTime = SimTime::from_secs(1);

/// Gap between consecutive calibration discoveries
pub const CALIBRATION_STAGGER: Duration = Duration::from_millis(50);

/// Quiet time after the last calibration discovery
const CALIBRATION_SETTLE: Duration = Duration::from_secs(5);

/// A simulation ready to run, with the baseline its detector uses
pub struct ScenarioRun {
    pub sim: Simulation,
    pub baseline: Option<Baseline>,
}

/// Measure the honest per-hop round trip
///
/// Runs the same network without the tunnel, every node discovering every
/// other node in turn, and feeds every request/reply round trip into a
/// [`Calibration`].
#[instrument(skip(config), fields(nodes = config.nodes))]
pub fn calibrate(config: &SimConfig) -> SimResult<Calibration> {
    let honest = config
        .clone()
        .with_wormhole(false)
        .with_echo(None)
        .with_countermeasure(false);
    let mut sim = Simulation::new(honest, Arc::new(PassthroughDetector))?;

    let nodes = NodeId::range(config.nodes);
    let mut at = CALIBRATION_START;
    for &origin in &nodes {
        for &destination in nodes.iter().filter(|&&d| d != origin) {
            sim.schedule_discovery(origin, destination, at);
            at += CALIBRATION_STAGGER;
        }
    }
    sim.run_until(at + CALIBRATION_SETTLE);

    let mut calibration = Calibration::new(config.rtt);
    for node in sim.nodes() {
        for sample in node.router().samples() {
            calibration.record_sample(sample);
        }
    }
    let Some(baseline) = calibration.baseline() else {
        return Err(SimError::NoCalibrationSamples);
    };
    info!(
        samples = calibration.samples(),
        per_hop_us = baseline.per_hop.as_micros() as u64,
        bound_us = baseline.per_hop_bound.as_micros() as u64,
        "Calibration complete"
    );
    Ok(calibration)
}

/// The detector every router of `config` uses, and its baseline
pub fn detector_for(
    config: &SimConfig,
) -> SimResult<(Arc<dyn Detector + Send + Sync>, Option<Baseline>)> {
    let countermeasure = &config.countermeasure;
    if !countermeasure.enabled {
        return Ok((Arc::new(PassthroughDetector), None));
    }

    let baseline = if countermeasure.calibrate {
        calibrate(config)?
            .baseline()
            .ok_or(SimError::NoCalibrationSamples)?
    } else {
        countermeasure.baseline.ok_or(ConfigError::MissingBaseline)?
    };
    info!(
        per_hop_us = baseline.per_hop.as_micros() as u64,
        tolerance = countermeasure.detector.tolerance,
        "Countermeasure armed"
    );
    Ok((
        Arc::new(RttDetector::new(baseline, countermeasure.detector)),
        Some(baseline),
    ))
}

/// Validate `config` and build its simulation without running it
pub fn prepare(config: &SimConfig) -> SimResult<ScenarioRun> {
    config.validate()?;
    let (detector, baseline) = detector_for(config)?;
    let sim = Simulation::new(config.clone(), detector)?;
    Ok(ScenarioRun { sim, baseline })
}

/// Build and run `config` to its configured end
pub fn run(config: &SimConfig) -> SimResult<ScenarioRun> {
    let mut scenario = prepare(config)?;
    scenario.sim.run();
    Ok(scenario)
}

/// The route one run settled on between the echo endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSummary {
    pub countermeasure: bool,
    pub source: NodeId,
    pub destination: NodeId,
    /// Last entry the source stored, usable or not
    pub route: Option<RouteEntry>,
    /// Next hops followed from source to destination
    pub path: Vec<NodeId>,
    pub uses_tunnel: bool,
    /// Neighbors the source stopped trusting
    pub suspects: Vec<NodeId>,
    pub routes_rejected: usize,
    pub tunnel_relays: u64,
    pub echo_rtts: Vec<Duration>,
    pub baseline: Option<Baseline>,
}

impl RouteSummary {
    pub fn from_run(scenario: &ScenarioRun, source: NodeId, destination: NodeId) -> Self {
        let sim = &scenario.sim;
        let router = sim.node(source).map(|node| node.router());
        let path = sim.path(source, destination);
        Self {
            countermeasure: sim.config().countermeasure.enabled,
            source,
            destination,
            route: router.and_then(|r| r.table().get(destination)),
            uses_tunnel: sim.path_uses_tunnel(&path),
            path,
            suspects: router
                .map(|r| r.suspects().iter().copied().collect())
                .unwrap_or_default(),
            routes_rejected: sim.verdicts().iter().filter(|v| v.is_suspected()).count(),
            tunnel_relays: sim.stats().tunnel_relays,
            echo_rtts: sim
                .echo_client()
                .map(|client| client.rtts().to_vec())
                .unwrap_or_default(),
            baseline: scenario.baseline,
        }
    }
}

impl fmt::Display for RouteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = if self.countermeasure {
            "Countermeasure enabled"
        } else {
            "Countermeasure disabled"
        };
        writeln!(f, "{label}:")?;
        match &self.route {
            Some(route) => writeln!(
                f,
                "  Route {} -> {}: via {}, {} hops{}",
                self.source,
                self.destination,
                route.next_hop,
                route.hop_count,
                if route.valid { "" } else { " (invalid)" }
            )?,
            None => writeln!(f, "  Route {} -> {}: none", self.source, self.destination)?,
        }
        let path: Vec<String> = self.path.iter().map(ToString::to_string).collect();
        writeln!(f, "  Path: {}", path.join(" -> "))?;
        writeln!(f, "  Uses tunnel: {}", if self.uses_tunnel { "yes" } else { "no" })?;
        writeln!(f, "  Routes rejected: {}", self.routes_rejected)?;
        if !self.suspects.is_empty() {
            let suspects: Vec<String> = self.suspects.iter().map(ToString::to_string).collect();
            writeln!(f, "  Suspects: {}", suspects.join(", "))?;
        }
        writeln!(f, "  Tunnel relays: {}", self.tunnel_relays)?;
        for (i, rtt) in self.echo_rtts.iter().enumerate() {
            writeln!(f, "  Echo {i} RTT: {:.3} ms", rtt.as_secs_f64() * 1_000.0)?;
        }
        if let Some(baseline) = self.baseline {
            writeln!(
                f,
                "  Baseline per hop: {:.3} ms",
                baseline.per_hop.as_secs_f64() * 1_000.0
            )?;
        }
        Ok(())
    }
}

/// The same scenario without and with the countermeasure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    pub undefended: RouteSummary,
    pub defended: RouteSummary,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.undefended)?;
        writeln!(f)?;
        write!(f, "{}", self.defended)
    }
}

/// Run `config` twice, countermeasure off then on, and compare the routes
/// between the echo endpoints
pub fn compare(config: &SimConfig) -> SimResult<Comparison> {
    let endpoints = config.echo.unwrap_or_default();
    let summarize = |config: SimConfig| -> SimResult<RouteSummary> {
        let mut scenario = prepare(&config)?;
        if config.echo.is_none() {
            schedule_echo_discovery(&mut scenario.sim, &endpoints);
        }
        scenario.sim.run();
        Ok(RouteSummary::from_run(&scenario, endpoints.source, endpoints.sink))
    };

    Ok(Comparison {
        undefended: summarize(config.clone().with_countermeasure(false))?,
        defended: summarize(config.clone().with_countermeasure(true))?,
    })
}

/// Without echo traffic, discover the route the client would have used
fn schedule_echo_discovery(sim: &mut Simulation, echo: &EchoConfig) {
    let at = SimTime::from_duration(echo.client_start);
    sim.schedule_discovery(echo.source, echo.sink, at);
}
