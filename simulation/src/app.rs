//! UDP echo application
//!
//! The server answers every echo request it receives while active. The
//! client sends a fixed number of requests at a fixed interval and times
//! each reply against the send time of its own sequence number.

use std::collections::HashMap;
use std::time::Duration;

use manet_core::{DataKind, DataPacket, FlowKey, NodeId, RoutingError, SimTime};
use manet_detect::{RttConfig, RttEstimator};
use tracing::{debug, info, warn};

use crate::config::EchoConfig;

/// Ephemeral port the client sends from
pub const CLIENT_PORT: u16 = 49153;

/// Callbacks the engine invokes on a node's applications
pub trait PacketHandler {
    /// A data packet arrived for this node; returns packets to send in reply
    fn on_receive(&mut self, packet: &DataPacket, now: SimTime) -> Vec<DataPacket>;

    /// The router finished with a packet this node sent
    fn on_send_complete(&mut self, packet: &DataPacket, result: &Result<(), RoutingError>, now: SimTime);
}

/// Answers echo requests on one port
#[derive(Debug, Clone)]
pub struct EchoServer {
    node: NodeId,
    port: u16,
    start: SimTime,
    stop: SimTime,
    received: u64,
}

impl EchoServer {
    pub fn new(node: NodeId, port: u16, start: SimTime, stop: SimTime) -> Self {
        Self {
            node,
            port,
            start,
            stop,
            received: 0,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Requests answered so far
    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn is_active(&self, now: SimTime) -> bool {
        now >= self.start && now < self.stop
    }
}

impl PacketHandler for EchoServer {
    fn on_receive(&mut self, packet: &DataPacket, now: SimTime) -> Vec<DataPacket> {
        if packet.kind != DataKind::EchoRequest
            || packet.flow.destination_port != self.port
            || packet.destination() != self.node
        {
            return Vec::new();
        }
        if !self.is_active(now) {
            debug!(node = %self.node, "Echo server inactive, ignoring request");
            return Vec::new();
        }
        self.received += 1;
        info!(
            node = %self.node,
            from = %packet.source(),
            sequence = packet.sequence,
            bytes = packet.payload_len,
            "Echo request received"
        );
        vec![DataPacket {
            flow: packet.flow.reversed(),
            sequence: packet.sequence,
            payload_len: packet.payload_len,
            kind: DataKind::EchoReply,
            sent_at: now,
        }]
    }

    fn on_send_complete(&mut self, packet: &DataPacket, result: &Result<(), RoutingError>, _now: SimTime) {
        if packet.kind != DataKind::EchoReply || packet.flow.source_port != self.port {
            return;
        }
        if let Err(err) = result {
            warn!(node = %self.node, sequence = packet.sequence, error = %err, "Echo reply not sent");
        }
    }
}

/// Sends echo requests and measures their round trips
#[derive(Debug, Clone)]
pub struct EchoClient {
    flow: FlowKey,
    packet_size: u32,
    max_packets: u32,
    interval: Duration,
    start: SimTime,
    stop: SimTime,
    next_sequence: u32,
    /// Send time of every request still awaiting its reply
    pending: HashMap<u32, SimTime>,
    rtt: RttEstimator,
    rtts: Vec<Duration>,
    failures: Vec<RoutingError>,
}

impl EchoClient {
    pub fn new(source: NodeId, sink: NodeId, config: &EchoConfig, stop: SimTime, rtt_config: RttConfig) -> Self {
        Self {
            flow: FlowKey::udp(source, CLIENT_PORT, sink, config.port),
            packet_size: config.packet_size,
            max_packets: config.max_packets,
            interval: config.interval,
            start: SimTime::from_duration(config.client_start),
            stop,
            next_sequence: 0,
            pending: HashMap::new(),
            rtt: RttEstimator::new(rtt_config),
            rtts: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn flow(&self) -> FlowKey {
        self.flow
    }

    /// When the first request goes out
    pub fn start(&self) -> SimTime {
        self.start
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn sent(&self) -> u32 {
        self.next_sequence
    }

    /// Round trips measured, in arrival order
    pub fn rtts(&self) -> &[Duration] {
        &self.rtts
    }

    pub fn estimator(&self) -> &RttEstimator {
        &self.rtt
    }

    pub fn failures(&self) -> &[RoutingError] {
        &self.failures
    }

    /// Requests sent and not yet answered or failed
    pub fn outstanding(&self) -> usize {
        self.pending.len()
    }

    /// Produce the next request, if the budget and the clock allow
    pub fn next_request(&mut self, now: SimTime) -> Option<DataPacket> {
        if self.next_sequence >= self.max_packets || now < self.start || now >= self.stop {
            return None;
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.pending.insert(sequence, now);
        info!(flow = %self.flow, sequence, bytes = self.packet_size, "Echo request sent");
        Some(DataPacket {
            flow: self.flow,
            sequence,
            payload_len: self.packet_size,
            kind: DataKind::EchoRequest,
            sent_at: now,
        })
    }

    /// Whether another request remains after the one just sent
    pub fn has_more(&self, now: SimTime) -> bool {
        self.next_sequence < self.max_packets && now + self.interval < self.stop
    }
}

impl PacketHandler for EchoClient {
    fn on_receive(&mut self, packet: &DataPacket, now: SimTime) -> Vec<DataPacket> {
        if packet.kind != DataKind::EchoReply || packet.flow != self.flow.reversed() {
            return Vec::new();
        }
        let Some(sent_at) = self.pending.remove(&packet.sequence) else {
            debug!(sequence = packet.sequence, "Reply for unknown echo, ignoring");
            return Vec::new();
        };
        let rtt = now.saturating_duration_since(sent_at);
        self.rtt.record(rtt);
        self.rtts.push(rtt);
        info!(
            flow = %self.flow,
            sequence = packet.sequence,
            rtt_us = rtt.as_micros() as u64,
            srtt_us = self.rtt.estimate().unwrap_or_default().as_micros() as u64,
            "Echo reply received"
        );
        Vec::new()
    }

    fn on_send_complete(&mut self, packet: &DataPacket, result: &Result<(), RoutingError>, _now: SimTime) {
        if packet.flow != self.flow {
            return;
        }
        match result {
            Ok(()) => debug!(sequence = packet.sequence, "Echo request handed to next hop"),
            Err(err) => {
                warn!(flow = %self.flow, sequence = packet.sequence, error = %err, "Echo request failed");
                self.pending.remove(&packet.sequence);
                self.failures.push(err.clone());
            }
        }
    }
}

/// An application installed on a node
#[derive(Debug, Clone)]
pub enum Application {
    EchoServer(EchoServer),
    EchoClient(EchoClient),
}

impl PacketHandler for Application {
    fn on_receive(&mut self, packet: &DataPacket, now: SimTime) -> Vec<DataPacket> {
        match self {
            Self::EchoServer(server) => server.on_receive(packet, now),
            Self::EchoClient(client) => client.on_receive(packet, now),
        }
    }

    fn on_send_complete(&mut self, packet: &DataPacket, result: &Result<(), RoutingError>, now: SimTime) {
        match self {
            Self::EchoServer(server) => server.on_send_complete(packet, result, now),
            Self::EchoClient(client) => client.on_send_complete(packet, result, now),
        }
    }
}
