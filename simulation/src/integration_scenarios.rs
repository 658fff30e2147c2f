//! End-to-end wormhole scenarios
//!
//! These scenarios run the full stack:
//! - manet-routing discovery over the radio and the tunnel
//! - manet-detect calibration and RTT gating
//! - echo traffic and flow statistics

use std::sync::Arc;
use std::time::Duration;

use manet_core::{NetworkEvent, NodeId, RoutingError, SimTime};
use manet_detect::{Baseline, PassthroughDetector};
use manet_routing::RouterConfig;

use crate::config::SimConfig;
use crate::scenarios::{self, RouteSummary};
use crate::simulation::Simulation;

fn short(config: SimConfig) -> SimConfig {
    config.with_duration(Duration::from_secs(10))
}

/// Without the countermeasure the route goes through the tunnel
#[test]
fn test_undefended_route_through_tunnel() {
    let config = short(SimConfig::default().with_countermeasure(false));
    let scenario = scenarios::run(&config).unwrap();
    let summary = RouteSummary::from_run(&scenario, NodeId(1), NodeId(4));

    let route = summary.route.unwrap();
    assert_eq!(route.next_hop, NodeId(0));
    assert_eq!(route.hop_count, 3);
    assert_eq!(summary.path, vec![NodeId(1), NodeId(0), NodeId(5), NodeId(4)]);
    assert!(summary.uses_tunnel);
    assert!(summary.suspects.is_empty());
    assert_eq!(summary.routes_rejected, 0);
    assert!(summary.tunnel_relays > 0);

    // Echo still completes over the attacker's route
    assert_eq!(summary.echo_rtts.len(), 1);
}

/// With the countermeasure the tunnel route is rejected and the honest
/// route through n2 is installed
#[test]
fn test_defended_route_avoids_tunnel() {
    let config = short(SimConfig::default());
    let scenario = scenarios::run(&config).unwrap();
    let summary = RouteSummary::from_run(&scenario, NodeId(1), NodeId(4));

    let route = summary.route.unwrap();
    assert_eq!(route.next_hop, NodeId(2));
    assert_eq!(route.hop_count, 3);
    assert_eq!(summary.path, vec![NodeId(1), NodeId(2), NodeId(3), NodeId(4)]);
    assert!(!summary.uses_tunnel);
    assert_eq!(summary.suspects, vec![NodeId(0)]);
    assert!(summary.routes_rejected >= 1);
    assert!(summary.baseline.is_some());

    let rejected = scenario
        .sim
        .events()
        .iter()
        .find_map(|event| match event {
            NetworkEvent::RouteRejected { node, verdict, .. } if *node == NodeId(1) => Some(*verdict),
            _ => None,
        })
        .unwrap();
    assert_eq!(rejected.route.next_hop, NodeId(0));
    assert!(rejected.evidence.observed_srtt < rejected.evidence.expected_floor);
}

#[test]
fn test_compare_reports_both_runs() {
    let comparison = scenarios::compare(&short(SimConfig::default())).unwrap();
    assert!(!comparison.undefended.countermeasure);
    assert!(comparison.undefended.uses_tunnel);
    assert!(comparison.defended.countermeasure);
    assert!(!comparison.defended.uses_tunnel);

    let text = comparison.to_string();
    assert!(text.contains("Countermeasure disabled:"));
    assert!(text.contains("Countermeasure enabled:"));
    assert!(text.contains("Suspects: n0"));
}

#[test]
fn test_compare_without_echo_discovers_route() {
    let config = short(SimConfig::default().with_echo(None));
    let comparison = scenarios::compare(&config).unwrap();
    assert_eq!(comparison.undefended.path[1], NodeId(0));
    assert_eq!(comparison.defended.path[1], NodeId(2));
    assert!(comparison.defended.echo_rtts.is_empty());
}

/// Tunnel disabled: the detector accepts the honest route
#[test]
fn test_no_false_positive_without_tunnel() {
    let config = short(SimConfig::default().with_wormhole(false));
    let scenario = scenarios::run(&config).unwrap();
    let summary = RouteSummary::from_run(&scenario, NodeId(1), NodeId(4));

    assert_eq!(summary.route.unwrap().next_hop, NodeId(2));
    assert_eq!(summary.routes_rejected, 0);
    assert!(summary.suspects.is_empty());
    assert_eq!(summary.tunnel_relays, 0);
}

#[test]
fn test_calibrated_baseline_matches_radio() {
    let calibration = scenarios::calibrate(&SimConfig::default()).unwrap();
    let baseline = calibration.baseline().unwrap();

    // One control frame each way is a little under a millisecond at 1 Mbps
    assert!(baseline.per_hop > Duration::from_micros(1_600), "{:?}", baseline.per_hop);
    assert!(baseline.per_hop < Duration::from_micros(2_000), "{:?}", baseline.per_hop);
    assert!(baseline.per_hop_bound >= baseline.per_hop);
    // Every ordered pair of six nodes
    assert_eq!(calibration.samples(), 30);
}

/// A fixed baseline far above real timings rejects every multi-hop route,
/// so discovery exhausts its retries
#[test]
fn test_retry_exhaustion_surfaces_no_route() {
    let config = short(
        SimConfig::default()
            .with_wormhole(false)
            .with_baseline(Baseline::exact(Duration::from_millis(50))),
    );
    let scenario = scenarios::run(&config).unwrap();
    let sim = &scenario.sim;

    let client = sim.echo_client().unwrap();
    assert_eq!(client.rtts().len(), 0);
    assert!(matches!(
        client.failures(),
        [RoutingError::NoRouteFound {
            destination: NodeId(4),
            ..
        }]
    ));
    assert!(sim.events().iter().any(|e| matches!(
        e,
        NetworkEvent::DiscoveryFailed {
            originator: NodeId(1),
            destination: NodeId(4),
            ..
        }
    )));
    assert!(sim.route(NodeId(1), NodeId(4)).is_none());
}

#[test]
fn test_echo_flow_statistics() {
    let config = short(SimConfig::default().with_countermeasure(false));
    let scenario = scenarios::run(&config).unwrap();
    let report = scenario.sim.flow_report();

    assert_eq!(report.len(), 2);
    let request = &report[0];
    assert_eq!(request.flow.source, NodeId(1));
    assert_eq!(request.flow.destination_port, 9);
    assert_eq!(request.tx_packets, 1);
    assert_eq!(request.rx_packets, 1);
    assert_eq!(request.rx_bytes, 1_052);
    assert!(request.mean_delay.unwrap() > Duration::ZERO);

    let reply = &report[1];
    assert_eq!(reply.flow.source, NodeId(4));
    assert_eq!(reply.rx_bytes, 1_052);
}

#[test]
fn test_multiple_echoes_share_route() {
    let mut config = short(SimConfig::default().with_countermeasure(false).with_wormhole(false));
    if let Some(echo) = config.echo.as_mut() {
        echo.max_packets = 3;
    }
    let scenario = scenarios::run(&config).unwrap();
    let client = scenario.sim.echo_client().unwrap();

    assert_eq!(client.sent(), 3);
    assert_eq!(client.rtts().len(), 3);
    // Only the first echo waited for discovery
    assert!(client.rtts()[0] > client.rtts()[1]);
    let discoveries = scenario
        .sim
        .events()
        .iter()
        .filter(|e| matches!(e, NetworkEvent::DiscoveryStarted { originator: NodeId(1), .. }))
        .count();
    assert_eq!(discoveries, 1);
}

#[test]
fn test_lossy_channel_is_reproducible() {
    let run = || {
        let config = short(
            SimConfig::default()
                .with_countermeasure(false)
                .with_loss(0.3)
                .with_seed(7),
        );
        let mut sim = Simulation::new(config, Arc::new(PassthroughDetector)).unwrap();
        sim.run();
        (sim.stats().clone(), sim.flow_report())
    };
    let (stats, flows) = run();
    assert!(stats.frames_lost > 0);
    assert_eq!(run(), (stats, flows));
}

#[test]
fn test_discovery_timer_cancelled_on_reply() {
    let config = SimConfig::default()
        .with_wormhole(false)
        .with_echo(None)
        .with_countermeasure(false)
        .with_router(RouterConfig::default().with_discovery_timeout(Duration::from_millis(100)));
    let mut sim = Simulation::new(config, Arc::new(PassthroughDetector)).unwrap();
    sim.schedule_discovery(NodeId(0), NodeId(5), SimTime::from_secs(1));
    sim.run_until(SimTime::from_secs(2));

    let started = sim
        .events()
        .iter()
        .filter(|e| matches!(e, NetworkEvent::DiscoveryStarted { .. }))
        .count();
    assert_eq!(started, 1);
    assert_eq!(sim.stats().timers_cancelled, 1);
}
