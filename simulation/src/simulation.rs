//! Simulation engine
//!
//! Implements a discrete-event simulation with:
//! - One clock and one event queue for every node
//! - Frames carried by each [`LinkModel`] that connects sender and receiver
//! - Router actions (transmit, timers, local delivery) carried out on the
//!   router's behalf
//! - Echo traffic counted by the flow monitor
//!
//! Every node callback runs inside that node's logging context.

use std::collections::HashMap;
use std::sync::Arc;

use manet_core::{
    Addressing, Carry, DataPacket, DetectionVerdict, Detector, DropReason, Frame, IP_UDP_HEADER,
    LinkModel, NetworkEvent, NodeId, SimTime,
};
use manet_logging::NodeContextGuard;
use manet_routing::{AodvRouter, RouteEntry, RouterAction, RouterTimer};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::app::{Application, EchoClient, EchoServer, PacketHandler};
use crate::config::SimConfig;
use crate::error::ConfigError;
use crate::flow::{Direction, FlowMonitor, FlowStats};
use crate::link::WirelessLink;
use crate::node::Node;
use crate::scheduler::{EventId, Scheduler};
use crate::topology::Topology;
use crate::tunnel::{TUNNEL_LINK, WormholeTunnel};

/// Something due at an instant
#[derive(Debug, Clone)]
pub enum SimEvent {
    /// A frame arrives at `node`
    Receive { node: NodeId, frame: Frame },
    /// A frame `node` deferred goes on the air
    Transmit { node: NodeId, frame: Frame },
    /// A router timer expires
    Timer { node: NodeId, timer: RouterTimer },
    /// The echo client on `node` sends its next request
    EchoSend { node: NodeId },
    /// `node` starts a route discovery
    Discover { node: NodeId, destination: NodeId },
}

/// Engine counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimStats {
    pub events_processed: u64,
    pub frames_sent: u64,
    pub frames_delivered: u64,
    pub frames_lost: u64,
    pub frames_unreachable: u64,
    pub tunnel_relays: u64,
    pub timers_cancelled: u64,
}

/// The simulation state
pub struct Simulation {
    config: SimConfig,
    run_id: Uuid,
    scheduler: Scheduler<SimEvent>,
    nodes: Vec<Node>,
    wireless: WirelessLink,
    tunnel: Option<WormholeTunnel>,
    /// Armed router timers, so they can be cancelled
    timers: HashMap<(NodeId, RouterTimer), EventId>,
    rng: StdRng,
    flows: FlowMonitor,
    /// Global event log
    events: Vec<NetworkEvent>,
    stats: SimStats,
}

impl Simulation {
    /// Build the network described by `config`, every router gated by `detector`
    pub fn new(
        config: SimConfig,
        detector: Arc<dyn Detector + Send + Sync>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let wireless = WirelessLink::from_config(&config);
        let tunnel = WormholeTunnel::from_config(&config.tunnel, config.nodes)?;
        let nodes = wireless
            .topology()
            .iter()
            .map(|(id, position)| {
                let router = AodvRouter::with_detector(id, config.router, Arc::clone(&detector))
                    .with_rtt_config(config.rtt);
                Node::new(id, position, router)
            })
            .collect();

        let mut sim = Self {
            run_id: Uuid::new_v4(),
            scheduler: Scheduler::new(),
            nodes,
            wireless,
            tunnel,
            timers: HashMap::new(),
            rng: StdRng::seed_from_u64(config.seed),
            flows: FlowMonitor::new(config.flow_monitor),
            events: Vec::new(),
            stats: SimStats::default(),
            config,
        };
        sim.install_echo();

        info!(
            run_id = %sim.run_id,
            nodes = sim.nodes.len(),
            phy = %sim.config.phy_mode,
            wormhole = sim.tunnel.is_some(),
            "Simulation initialized"
        );
        Ok(sim)
    }

    fn install_echo(&mut self) {
        let Some(echo) = self.config.echo else {
            return;
        };
        let stop = self.end_time();
        if let Some(sink) = self.node_mut(echo.sink) {
            sink.install(Application::EchoServer(EchoServer::new(
                echo.sink,
                echo.port,
                SimTime::from_duration(echo.server_start),
                stop,
            )));
        }
        let client = EchoClient::new(echo.source, echo.sink, &echo, stop, self.config.rtt);
        let start = client.start();
        if let Some(source) = self.node_mut(echo.source) {
            source.install(Application::EchoClient(client));
            self.scheduler
                .schedule_at(start, SimEvent::EchoSend { node: echo.source });
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    /// Configured end of the run
    pub fn end_time(&self) -> SimTime {
        SimTime::from_duration(self.config.duration)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn topology(&self) -> &Topology {
        self.wireless.topology()
    }

    pub fn wireless(&self) -> &WirelessLink {
        &self.wireless
    }

    pub fn tunnel(&self) -> Option<&WormholeTunnel> {
        self.tunnel.as_ref()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index() as usize)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index() as usize)
    }

    pub fn flows(&self) -> &FlowMonitor {
        &self.flows
    }

    pub fn flow_report(&self) -> Vec<FlowStats> {
        self.flows.report()
    }

    /// Every network event, in the order it happened
    pub fn events(&self) -> &[NetworkEvent] {
        &self.events
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    /// The echo client, if one is installed
    pub fn echo_client(&self) -> Option<&EchoClient> {
        let echo = self.config.echo?;
        self.node(echo.source)?.echo_client()
    }

    /// Every detector verdict of every node, node by node
    pub fn verdicts(&self) -> Vec<DetectionVerdict> {
        self.nodes
            .iter()
            .flat_map(|node| node.router().verdicts().iter().copied())
            .collect()
    }

    /// Usable route from `node` to `destination` right now
    pub fn route(&self, node: NodeId, destination: NodeId) -> Option<RouteEntry> {
        self.node(node)?.router().route_to(destination, self.now())
    }

    /// Follow stored next hops from `from` to `to`, valid or not
    ///
    /// Returns the node sequence including both ends, or an empty path if
    /// the chain breaks or loops.
    pub fn path(&self, from: NodeId, to: NodeId) -> Vec<NodeId> {
        let mut path = vec![from];
        let mut current = from;
        while current != to {
            let Some(entry) = self.node(current).and_then(|n| n.router().table().get(to)) else {
                return Vec::new();
            };
            if path.contains(&entry.next_hop) {
                return Vec::new();
            }
            path.push(entry.next_hop);
            current = entry.next_hop;
        }
        path
    }

    /// Whether any consecutive pair of `path` crosses the tunnel
    pub fn path_uses_tunnel(&self, path: &[NodeId]) -> bool {
        let Some(tunnel) = &self.tunnel else {
            return false;
        };
        path.windows(2).any(|hop| tunnel.crosses(hop[0], hop[1]))
    }

    /// Have `node` discover a route to `destination` at `at`
    pub fn schedule_discovery(&mut self, node: NodeId, destination: NodeId, at: SimTime) {
        self.scheduler
            .schedule_at(at, SimEvent::Discover { node, destination });
    }

    /// Process the next event; `false` when nothing is left
    pub fn step(&mut self) -> bool {
        let Some((now, event)) = self.scheduler.pop() else {
            return false;
        };
        self.stats.events_processed += 1;

        match event {
            SimEvent::Receive { node, frame } => self.handle_receive(node, frame, now),
            SimEvent::Transmit { node, frame } => self.send_frame(node, frame, now),
            SimEvent::Timer { node, timer } => {
                self.timers.remove(&(node, timer));
                let run_id = self.run_id;
                let Some(target) = self.node_mut(node) else {
                    return true;
                };
                let actions = {
                    let _ctx = enter_node(node, run_id);
                    target.router_mut().on_timer(timer, now)
                };
                self.apply(node, actions, now);
            }
            SimEvent::EchoSend { node } => self.handle_echo_send(node, now),
            SimEvent::Discover { node, destination } => {
                let run_id = self.run_id;
                let Some(target) = self.node_mut(node) else {
                    return true;
                };
                let actions = {
                    let _ctx = enter_node(node, run_id);
                    target.router_mut().discover(destination, now)
                };
                self.apply(node, actions, now);
            }
        }
        true
    }

    /// Process every event due at or before `end`
    pub fn run_until(&mut self, end: SimTime) {
        while let Some(next) = self.scheduler.peek_time() {
            if next > end {
                break;
            }
            self.step();
        }
        self.scheduler.advance_to(end);
    }

    /// Run to the configured end
    pub fn run(&mut self) {
        let end = self.end_time();
        self.run_until(end);
        info!(
            at = %self.now(),
            events = self.stats.events_processed,
            frames = self.stats.frames_sent,
            tunnel_relays = self.stats.tunnel_relays,
            "Simulation complete"
        );
    }

    fn handle_receive(&mut self, node: NodeId, frame: Frame, now: SimTime) {
        let Some(target) = self.nodes.get_mut(node.index() as usize) else {
            return;
        };
        let actions = {
            let _ctx = enter_node(node, self.run_id);
            target.router_mut().on_receive(frame, now, &mut self.rng)
        };
        self.apply(node, actions, now);
    }

    fn handle_echo_send(&mut self, node: NodeId, now: SimTime) {
        let Some(client) = self.node_mut(node).and_then(Node::echo_client_mut) else {
            return;
        };
        let request = client.next_request(now);
        let next = client.has_more(now).then(|| client.interval());
        if let Some(interval) = next {
            self.scheduler
                .schedule_in(interval, SimEvent::EchoSend { node });
        }
        if let Some(packet) = request {
            self.send_data(node, packet, now);
        }
    }

    /// Hand application data to the node's router
    fn send_data(&mut self, node: NodeId, packet: DataPacket, now: SimTime) {
        self.flows
            .observe(packet.flow, wire_bytes(&packet), Direction::Transmit, now);
        let run_id = self.run_id;
        let Some(source) = self.node_mut(node) else {
            return;
        };
        let actions = {
            let _ctx = enter_node(node, run_id);
            source.router_mut().send(packet, now)
        };
        self.apply(node, actions, now);
    }

    /// Carry out what a router asked for
    fn apply(&mut self, node: NodeId, actions: Vec<RouterAction>, now: SimTime) {
        for action in actions {
            match action {
                RouterAction::Transmit { frame, delay } => {
                    if delay.is_zero() {
                        self.send_frame(node, frame, now);
                    } else {
                        self.scheduler
                            .schedule_in(delay, SimEvent::Transmit { node, frame });
                    }
                }
                RouterAction::ArmTimer { timer, after } => {
                    let id = self
                        .scheduler
                        .schedule_in(after, SimEvent::Timer { node, timer });
                    if let Some(previous) = self.timers.insert((node, timer), id) {
                        self.scheduler.cancel(previous);
                    }
                }
                RouterAction::CancelTimer { timer } => {
                    if let Some(id) = self.timers.remove(&(node, timer)) {
                        if self.scheduler.cancel(id) {
                            trace!(%node, ?timer, "Timer cancelled");
                            self.stats.timers_cancelled += 1;
                        }
                    }
                }
                RouterAction::Deliver { packet, from } => self.deliver_local(node, packet, from, now),
                RouterAction::SendComplete { packet, result } => {
                    let run_id = self.run_id;
                    if let Some(target) = self.node_mut(node) {
                        let _ctx = enter_node(node, run_id);
                        target.on_send_complete(&packet, &result, now);
                    }
                }
                RouterAction::Event(event) => self.events.push(event),
            }
        }
    }

    /// Data reached its destination: count it and let the applications answer
    fn deliver_local(&mut self, node: NodeId, packet: DataPacket, from: NodeId, now: SimTime) {
        trace!(%node, %from, flow = %packet.flow, "Delivering to applications");
        self.flows
            .observe_delivery(packet.flow, wire_bytes(&packet), packet.sent_at, now);
        let run_id = self.run_id;
        let Some(target) = self.node_mut(node) else {
            return;
        };
        let replies = {
            let _ctx = enter_node(node, run_id);
            target.on_receive(&packet, now)
        };
        for reply in replies {
            self.send_data(node, reply, now);
        }
    }

    /// Put a frame on every link that reaches its addressee
    fn send_frame(&mut self, sender: NodeId, frame: Frame, now: SimTime) {
        let bytes = match frame.wire_size() {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(node = %sender, error = %err, "Frame could not be encoded, dropping");
                self.events
                    .push(NetworkEvent::packet_dropped(sender, DropReason::Encoding, now));
                return;
            }
        };
        self.stats.frames_sent += 1;

        let mut outcomes: Vec<(NodeId, Carry, bool)> = Vec::new();
        let links = link_set(&self.wireless, self.tunnel.as_ref());
        match frame.to {
            Addressing::Broadcast => {
                for link in &links {
                    for receiver in link.receivers(sender) {
                        let carry = link.carry(sender, receiver, bytes, &mut self.rng);
                        outcomes.push((receiver, carry, link.name() == TUNNEL_LINK));
                    }
                }
            }
            Addressing::Unicast(next_hop) => {
                match links.iter().find(|link| link.connects(sender, next_hop)) {
                    Some(link) => {
                        let carry = link.carry(sender, next_hop, bytes, &mut self.rng);
                        outcomes.push((next_hop, carry, link.name() == TUNNEL_LINK));
                    }
                    None => outcomes.push((next_hop, Carry::Unreachable, false)),
                }
            }
        }

        let unicast = matches!(frame.to, Addressing::Unicast(_));
        for (receiver, carry, via_tunnel) in outcomes {
            match carry {
                Carry::Delivered { delay } => {
                    if via_tunnel {
                        trace!(from = %sender, to = %receiver, kind = frame.packet.kind_name(), "Tunnel relay");
                        self.stats.tunnel_relays += 1;
                        self.events.push(NetworkEvent::TunnelRelayed {
                            from: sender,
                            to: receiver,
                            kind: frame.packet.kind_name().to_string(),
                            at: now,
                        });
                    }
                    self.stats.frames_delivered += 1;
                    self.scheduler.schedule_in(
                        delay,
                        SimEvent::Receive {
                            node: receiver,
                            frame: frame.clone(),
                        },
                    );
                }
                Carry::Lost => {
                    trace!(from = %sender, to = %receiver, "Frame lost on the channel");
                    self.stats.frames_lost += 1;
                    if unicast {
                        self.events
                            .push(NetworkEvent::packet_dropped(sender, DropReason::ChannelLoss, now));
                    }
                }
                Carry::Unreachable => {
                    debug!(from = %sender, to = %receiver, "Next hop out of reach, dropping");
                    self.stats.frames_unreachable += 1;
                    self.events
                        .push(NetworkEvent::packet_dropped(sender, DropReason::NoRoute, now));
                }
            }
        }
    }
}

/// Links in the order a unicast frame tries them
fn link_set<'a>(
    wireless: &'a WirelessLink,
    tunnel: Option<&'a WormholeTunnel>,
) -> Vec<&'a dyn LinkModel> {
    let mut links: Vec<&dyn LinkModel> = vec![wireless];
    if let Some(tunnel) = tunnel {
        links.push(tunnel);
    }
    links
}

fn enter_node(node: NodeId, run_id: Uuid) -> NodeContextGuard {
    NodeContextGuard::new(node, run_id)
}

fn wire_bytes(packet: &DataPacket) -> u64 {
    u64::from(packet.payload_len) + IP_UDP_HEADER as u64
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use std::io;
    use std::sync::Mutex;

    use manet_core::{DataKind, FlowKey, Packet};
    use manet_detect::PassthroughDetector;
    use manet_logging::{JsonlConfig, jsonl_layer};
    use tracing_subscriber::fmt::MakeWriter;
    use tracing_subscriber::{Registry, layer::SubscriberExt};

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn quiet() -> SimConfig {
        SimConfig::default()
            .with_echo(None)
            .with_countermeasure(false)
    }

    fn sim(config: SimConfig) -> Simulation {
        Simulation::new(config, Arc::new(PassthroughDetector)).unwrap()
    }

    #[test]
    fn test_builds_nodes_from_topology() {
        let sim = sim(quiet());
        assert_eq!(sim.nodes().len(), 6);
        assert_eq!(sim.node(NodeId(2)).unwrap().position().x, 200.0);
        assert_eq!(sim.tunnel().unwrap().endpoints(), (NodeId(0), NodeId(5)));
        assert!(sim.node(NodeId(6)).is_none());
    }

    #[test]
    fn test_node_logs_carry_node_and_run() {
        let logs = CapturedLogs::default();
        let subscriber =
            Registry::default().with(jsonl_layer(&JsonlConfig::default(), logs.clone()));
        let mut sim = sim(quiet().with_wormhole(false));
        let run_id = sim.run_id();

        tracing::subscriber::with_default(subscriber, || {
            sim.schedule_discovery(NodeId(0), NodeId(2), SimTime::from_secs(1));
            sim.run_until(SimTime::from_secs(2));
        });

        let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        let line = text
            .lines()
            .find(|l| l.contains("Route installed"))
            .unwrap();
        assert!(line.contains(r#""node":"n0""#), "{line}");
        assert!(line.contains(&run_id.to_string()), "{line}");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = Simulation::new(quiet().with_nodes(1), Arc::new(PassthroughDetector));
        assert!(matches!(result, Err(ConfigError::TooFewNodes { .. })));
    }

    #[test]
    fn test_discovery_without_tunnel_follows_line() {
        let mut sim = sim(quiet().with_wormhole(false));
        sim.schedule_discovery(NodeId(0), NodeId(5), SimTime::from_secs(1));
        sim.run_until(SimTime::from_millis(1_100));

        let route = sim.route(NodeId(0), NodeId(5)).unwrap();
        assert_eq!(route.next_hop, NodeId(1));
        assert_eq!(route.hop_count, 5);
        assert_eq!(sim.path(NodeId(0), NodeId(5)), NodeId::range(6));
        assert_eq!(sim.stats().tunnel_relays, 0);
        // Reply cancelled the retry timer
        assert_eq!(sim.stats().timers_cancelled, 1);
    }

    #[test]
    fn test_tunnel_carries_request() {
        let mut sim = sim(quiet());
        sim.schedule_discovery(NodeId(0), NodeId(5), SimTime::from_secs(1));
        sim.run_until(SimTime::from_millis(1_100));

        let route = sim.route(NodeId(0), NodeId(5)).unwrap();
        assert_eq!(route.next_hop, NodeId(5));
        assert_eq!(route.hop_count, 1);
        assert!(sim.path_uses_tunnel(&sim.path(NodeId(0), NodeId(5))));
        assert!(sim.stats().tunnel_relays > 0);
        assert!(sim
            .events()
            .iter()
            .any(|e| matches!(e, NetworkEvent::TunnelRelayed { kind, .. } if kind == "RREQ")));
    }

    #[test]
    fn test_one_hop_round_trip_matches_link_model() {
        let mut sim = sim(quiet().with_wormhole(false));
        sim.schedule_discovery(NodeId(2), NodeId(3), SimTime::from_secs(1));
        sim.run_until(SimTime::from_millis(1_100));

        let sample = sim.node(NodeId(2)).unwrap().router().samples()[0];
        assert_eq!(sample.hops, 1);
        // One radio hop each way, no forwarding jitter
        let lower = sim.wireless().hop_delay(IP_UDP_HEADER, 100.0) * 2;
        let upper = sim.wireless().hop_delay(IP_UDP_HEADER + 64, 100.0) * 2;
        assert!(sample.rtt > lower && sample.rtt < upper, "{:?}", sample.rtt);
    }

    #[test]
    fn test_unicast_to_unreachable_dropped() {
        let mut sim = sim(quiet().with_wormhole(false));
        let frame = Frame::unicast(
            NodeId(0),
            NodeId(3),
            Packet::Data(DataPacket {
                flow: FlowKey::udp(NodeId(0), 49153, NodeId(3), 9),
                sequence: 0,
                payload_len: 10,
                kind: DataKind::EchoRequest,
                sent_at: SimTime::ZERO,
            }),
        );
        sim.send_frame(NodeId(0), frame, SimTime::ZERO);
        assert_eq!(sim.stats().frames_unreachable, 1);
        assert!(sim.events().iter().any(|e| matches!(
            e,
            NetworkEvent::PacketDropped {
                reason: DropReason::NoRoute,
                ..
            }
        )));
        assert!(!sim.step());
    }

    #[test]
    fn test_total_loss_fails_discovery() {
        let mut sim = sim(quiet().with_wormhole(false).with_loss(1.0));
        sim.schedule_discovery(NodeId(0), NodeId(2), SimTime::from_secs(1));
        sim.run_until(SimTime::from_secs(10));

        assert!(sim.route(NodeId(0), NodeId(2)).is_none());
        assert!(sim.events().iter().any(|e| matches!(
            e,
            NetworkEvent::DiscoveryFailed { attempts: 3, .. }
        )));
        assert_eq!(sim.stats().frames_delivered, 0);
    }

    #[test]
    fn test_echo_round_trip() {
        let mut sim = sim(SimConfig::default().with_countermeasure(false).with_wormhole(false));
        sim.run_until(SimTime::from_secs(3));

        let client = sim.echo_client().unwrap();
        assert_eq!(client.sent(), 1);
        assert_eq!(client.rtts().len(), 1);
        assert_eq!(sim.node(NodeId(4)).unwrap().echo_server().unwrap().received(), 1);

        let report = sim.flow_report();
        assert_eq!(report.len(), 2);
        for stats in &report {
            assert_eq!(stats.tx_bytes, 1_052);
            assert_eq!(stats.rx_bytes, 1_052);
            assert_eq!(stats.lost_packets, 0);
            assert!(stats.throughput_bps > 0.0);
        }
    }

    #[test]
    fn test_same_seed_same_run() {
        let run = || {
            let mut sim = sim(SimConfig::default().with_countermeasure(false));
            sim.run_until(SimTime::from_secs(3));
            (sim.events().to_vec(), sim.stats().clone())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_run_stops_at_duration() {
        let mut sim = sim(quiet().with_duration(Duration::from_secs(5)));
        sim.schedule_discovery(NodeId(1), NodeId(4), SimTime::from_secs(6));
        sim.run();
        assert_eq!(sim.now(), SimTime::from_secs(5));
        assert!(sim.events().is_empty());
    }
}
