//! On-demand distance-vector router
//!
//! The [`AodvRouter`] runs the route discovery state machine for one node.
//! Per destination it moves through `NoRoute -> Discovering -> Active ->
//! Expired`.
//!
//! ## Discovery
//!
//! 1. **REQUEST**: the originator floods a RREQ over every link it has
//! 2. **REVERSE**: each receiver installs a route back to the originator and
//!    re-broadcasts once per (originator, request id)
//! 3. **REPLY**: the destination unicasts a RREP back along the reverse path;
//!    each hop installs the forward route
//! 4. **GATE**: the originator times the round trip, asks its [`Detector`]
//!    and either installs the route or discards it and tries again around
//!    the suspected neighbor
//!
//! The router is sans-I/O: every entry point returns [`RouterAction`]s for
//! the caller to carry out.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use manet_core::{
    DataPacket, DetectionVerdict, Detector, DropReason, Frame, NetworkEvent, NodeId,
    Packet, RequestId, RouteKey, RouteReply, RouteRequest, RoutingError, RttEstimate, RttSample,
    SeqNo, SimTime,
};
use manet_detect::{PassthroughDetector, RttConfig, RttEstimator};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};

use crate::discovery::{PendingDiscovery, RequestCache, backoff};
use crate::error::{RouterError, RoutingResult};
use crate::table::{RouteEntry, RouteUpdate, RoutingTable};

/// Router timing and limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Lifetime of a route without use
    pub active_route_timeout: Duration,
    /// Wait for a reply before the first retry; doubles per attempt
    pub discovery_timeout: Duration,
    /// Retries after the first request before giving up
    pub rreq_retries: u32,
    /// Upper bound of the random delay before re-broadcasting a RREQ
    pub forward_jitter: Duration,
    /// How long seen requests are remembered
    pub request_cache_lifetime: Duration,
    /// Packets held per destination while discovering
    pub max_queue: usize,
    /// RTT samples and verdicts kept for reporting; oldest dropped first
    pub max_history: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            active_route_timeout: Duration::from_secs(3),
            discovery_timeout: Duration::from_millis(500),
            rreq_retries: 2,
            forward_jitter: Duration::from_micros(100),
            request_cache_lifetime: Duration::from_secs(3),
            max_queue: 64,
            max_history: 1024,
        }
    }
}

impl RouterConfig {
    pub fn with_active_route_timeout(mut self, timeout: Duration) -> Self {
        self.active_route_timeout = timeout;
        self
    }

    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    pub fn with_rreq_retries(mut self, retries: u32) -> Self {
        self.rreq_retries = retries;
        self
    }

    pub fn with_forward_jitter(mut self, jitter: Duration) -> Self {
        self.forward_jitter = jitter;
        self
    }

    pub fn with_max_history(mut self, entries: usize) -> Self {
        self.max_history = entries;
        self
    }

    /// Reject timings the state machine cannot run with
    pub fn validate(&self) -> RoutingResult<()> {
        if self.active_route_timeout.is_zero() {
            return Err(RouterError::InvalidConfig(
                "active route timeout must be positive".into(),
            ));
        }
        if self.discovery_timeout.is_zero() {
            return Err(RouterError::InvalidConfig(
                "discovery timeout must be positive".into(),
            ));
        }
        if self.max_queue == 0 {
            return Err(RouterError::InvalidConfig("queue must hold at least one packet".into()));
        }
        if self.max_history == 0 {
            return Err(RouterError::InvalidConfig("history must hold at least one entry".into()));
        }
        Ok(())
    }
}

/// Timers a router asks the engine to arm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouterTimer {
    /// No reply to `request_id` yet
    Discovery {
        destination: NodeId,
        request_id: RequestId,
    },
}

/// Something the engine must do on the router's behalf
#[derive(Debug, Clone, PartialEq)]
pub enum RouterAction {
    /// Put a frame on the air after `delay`
    Transmit { frame: Frame, delay: Duration },
    ArmTimer { timer: RouterTimer, after: Duration },
    CancelTimer { timer: RouterTimer },
    /// Hand a data packet to the local application
    Deliver { packet: DataPacket, from: NodeId },
    /// Outcome of an application send
    SendComplete {
        packet: DataPacket,
        result: Result<(), RoutingError>,
    },
    Event(NetworkEvent),
}

/// Counters kept by a router
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterStats {
    pub requests_originated: u64,
    pub requests_forwarded: u64,
    pub replies_sent: u64,
    pub replies_forwarded: u64,
    pub duplicates_dropped: u64,
    pub stale_updates: u64,
    pub data_forwarded: u64,
    pub data_dropped: u64,
    pub routes_installed: u64,
    pub routes_rejected: u64,
    pub discoveries_failed: u64,
}

/// Per-node route discovery state machine
pub struct AodvRouter {
    id: NodeId,
    config: RouterConfig,
    seq: SeqNo,
    next_request_id: RequestId,
    table: RoutingTable,
    request_cache: RequestCache,
    pending: HashMap<NodeId, PendingDiscovery>,
    /// Nodes heard directly, over any link
    neighbors: BTreeSet<NodeId>,
    /// Neighbors implicated by a wormhole verdict; a subset of `neighbors`
    suspects: BTreeSet<NodeId>,
    estimators: HashMap<RouteKey, RttEstimator>,
    rtt_config: RttConfig,
    detector: Arc<dyn Detector + Send + Sync>,
    samples: VecDeque<RttSample>,
    verdicts: VecDeque<DetectionVerdict>,
    stats: RouterStats,
}

impl AodvRouter {
    /// Create a router that accepts every discovered route
    pub fn new(id: NodeId, config: RouterConfig) -> Self {
        Self::with_detector(id, config, Arc::new(PassthroughDetector))
    }

    /// Create a router gated by `detector`
    pub fn with_detector(
        id: NodeId,
        config: RouterConfig,
        detector: Arc<dyn Detector + Send + Sync>,
    ) -> Self {
        Self {
            id,
            config,
            seq: SeqNo::default(),
            next_request_id: RequestId(1),
            table: RoutingTable::new(config.active_route_timeout),
            request_cache: RequestCache::new(config.request_cache_lifetime),
            pending: HashMap::new(),
            neighbors: BTreeSet::new(),
            suspects: BTreeSet::new(),
            estimators: HashMap::new(),
            rtt_config: RttConfig::default(),
            detector,
            samples: VecDeque::new(),
            verdicts: VecDeque::new(),
            stats: RouterStats::default(),
        }
    }

    /// Use different smoothing for the per-route estimators
    pub fn with_rtt_config(mut self, rtt_config: RttConfig) -> Self {
        self.rtt_config = rtt_config;
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Own destination sequence number
    pub fn sequence(&self) -> SeqNo {
        self.seq
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// Usable route to `destination` at `now`
    pub fn route_to(&self, destination: NodeId, now: SimTime) -> Option<RouteEntry> {
        self.table.lookup(destination, now)
    }

    pub fn neighbors(&self) -> &BTreeSet<NodeId> {
        &self.neighbors
    }

    pub fn suspects(&self) -> &BTreeSet<NodeId> {
        &self.suspects
    }

    /// Whether a discovery towards `destination` is in flight
    pub fn is_discovering(&self, destination: NodeId) -> bool {
        self.pending.contains_key(&destination)
    }

    /// Snapshot of the estimator for `route`
    pub fn estimate(&self, route: &RouteKey) -> Option<RttEstimate> {
        self.estimators.get(route).map(RttEstimator::snapshot)
    }

    /// The last `max_history` request/reply measurements, oldest first
    pub fn samples(&self) -> &VecDeque<RttSample> {
        &self.samples
    }

    /// The last `max_history` detector verdicts, oldest first
    pub fn verdicts(&self) -> &VecDeque<DetectionVerdict> {
        &self.verdicts
    }

    pub fn stats(&self) -> &RouterStats {
        &self.stats
    }

    /// Send application data, discovering a route first if needed
    #[instrument(skip(self, packet), fields(node = %self.id, dest = %packet.destination()))]
    pub fn send(&mut self, packet: DataPacket, now: SimTime) -> Vec<RouterAction> {
        let mut actions = Vec::new();
        let destination = packet.destination();

        if destination == self.id {
            actions.push(RouterAction::Deliver {
                packet: packet.clone(),
                from: self.id,
            });
            actions.push(RouterAction::SendComplete {
                packet,
                result: Ok(()),
            });
            return actions;
        }

        if let Some(entry) = self.table.lookup(destination, now) {
            self.table.refresh(destination, now);
            trace!(next_hop = %entry.next_hop, "Route known, sending");
            actions.push(transmit(Frame::unicast(
                self.id,
                entry.next_hop,
                Packet::Data(packet.clone()),
            )));
            actions.push(RouterAction::SendComplete {
                packet,
                result: Ok(()),
            });
            return actions;
        }

        let capacity = self.config.max_queue;
        let starting = !self.pending.contains_key(&destination);
        let pending = self
            .pending
            .entry(destination)
            .or_insert_with(|| PendingDiscovery::new(destination));
        if let Err(packet) = pending.enqueue(packet, capacity) {
            debug!("Discovery queue full, dropping packet");
            actions.push(RouterAction::Event(NetworkEvent::packet_dropped(
                self.id,
                DropReason::QueueFull,
                now,
            )));
            actions.push(RouterAction::SendComplete {
                packet,
                result: Err(RoutingError::NoRouteFound {
                    destination,
                    attempts: 0,
                }),
            });
            return actions;
        }

        if starting {
            debug!("No route, starting discovery");
            self.begin_attempt(destination, now, &mut actions);
        }
        actions
    }

    /// Discover a route to `destination` even if one is known
    ///
    /// Does nothing while a discovery to the same destination is in flight.
    #[instrument(skip(self), fields(node = %self.id))]
    pub fn discover(&mut self, destination: NodeId, now: SimTime) -> Vec<RouterAction> {
        let mut actions = Vec::new();
        if destination == self.id || self.pending.contains_key(&destination) {
            return actions;
        }
        self.pending
            .insert(destination, PendingDiscovery::new(destination));
        self.begin_attempt(destination, now, &mut actions);
        actions
    }

    /// Process a frame addressed to this node
    #[instrument(skip(self, frame, rng), fields(node = %self.id, from = %frame.sender, kind = frame.packet.kind_name()))]
    pub fn on_receive(
        &mut self,
        frame: Frame,
        now: SimTime,
        rng: &mut dyn RngCore,
    ) -> Vec<RouterAction> {
        let mut actions = Vec::new();
        let sender = frame.sender;
        if sender != self.id {
            self.neighbors.insert(sender);
        }

        match frame.packet {
            Packet::RouteRequest(rreq) => self.handle_request(rreq, sender, now, rng, &mut actions),
            Packet::RouteReply(rrep) => self.handle_reply(rrep, sender, now, &mut actions),
            Packet::Data(data) => self.handle_data(data, sender, now, &mut actions),
        }
        actions
    }

    /// Handle an expired timer
    #[instrument(skip(self), fields(node = %self.id))]
    pub fn on_timer(&mut self, timer: RouterTimer, now: SimTime) -> Vec<RouterAction> {
        let mut actions = Vec::new();
        match timer {
            RouterTimer::Discovery {
                destination,
                request_id,
            } => {
                let Some(pending) = self.pending.get(&destination) else {
                    return actions;
                };
                if pending.current() != Some(request_id) {
                    trace!(%request_id, "Stale discovery timer");
                    return actions;
                }
                debug!(%destination, attempts = pending.attempts(), "Discovery timed out");
                self.retry_or_fail(destination, now, &mut actions);
            }
        }
        actions
    }

    fn handle_request(
        &mut self,
        rreq: RouteRequest,
        sender: NodeId,
        now: SimTime,
        rng: &mut dyn RngCore,
        actions: &mut Vec<RouterAction>,
    ) {
        if !self
            .request_cache
            .insert(rreq.originator, rreq.request_id, now)
        {
            let err = RoutingError::DuplicateRequest {
                originator: rreq.originator,
                request_id: rreq.request_id,
            };
            trace!(error = %err, "Dropping duplicate request");
            self.stats.duplicates_dropped += 1;
            return;
        }

        let hops = rreq.hop_count.saturating_add(1);
        let reverse = RouteUpdate {
            destination: rreq.originator,
            next_hop: sender,
            hop_count: hops,
            seq: rreq.originator_seq,
        };
        if let Err(err) = self
            .table
            .update(reverse, self.config.active_route_timeout, now)
        {
            info!(error = %err, "Reverse route not updated");
            self.stats.stale_updates += 1;
        }

        if rreq.destination == self.id {
            let known = rreq.destination_seq.unwrap_or(self.seq);
            self.seq = self.seq.max(known).next();

            let next_hop = self
                .table
                .lookup(rreq.originator, now)
                .map_or(sender, |entry| entry.next_hop);
            let rrep = RouteReply {
                originator: rreq.originator,
                destination: self.id,
                request_id: rreq.request_id,
                hop_count: 0,
                destination_seq: self.seq,
                sent_at: rreq.sent_at,
                lifetime: self.config.active_route_timeout,
            };
            debug!(
                originator = %rreq.originator,
                request_id = %rreq.request_id,
                %next_hop,
                hops,
                "Answering route request"
            );
            self.stats.replies_sent += 1;
            actions.push(transmit(Frame::unicast(
                self.id,
                next_hop,
                Packet::RouteReply(rrep),
            )));
            actions.push(RouterAction::Event(NetworkEvent::ReplySent {
                destination: self.id,
                originator: rreq.originator,
                request_id: rreq.request_id,
                next_hop,
                at: now,
            }));
            return;
        }

        let jitter = self.jitter(rng);
        trace!(hops, jitter_us = jitter.as_micros() as u64, "Re-broadcasting request");
        self.stats.requests_forwarded += 1;
        actions.push(RouterAction::Event(NetworkEvent::RequestForwarded {
            node: self.id,
            originator: rreq.originator,
            request_id: rreq.request_id,
            hop_count: hops,
            at: now,
        }));
        let forwarded = RouteRequest {
            hop_count: hops,
            ..rreq
        };
        actions.push(RouterAction::Transmit {
            frame: Frame::broadcast(self.id, Packet::RouteRequest(forwarded)),
            delay: jitter,
        });
    }

    fn handle_reply(
        &mut self,
        rrep: RouteReply,
        sender: NodeId,
        now: SimTime,
        actions: &mut Vec<RouterAction>,
    ) {
        let hops = rrep.hop_count.saturating_add(1);
        let forward = RouteUpdate {
            destination: rrep.destination,
            next_hop: sender,
            hop_count: hops,
            seq: rrep.destination_seq,
        };

        if rrep.originator == self.id {
            self.complete_discovery(rrep, forward, now, actions);
            return;
        }

        if let Err(err) = self.table.update(forward, rrep.lifetime, now) {
            info!(error = %err, "Forward route not updated");
            self.stats.stale_updates += 1;
        }

        let Some(reverse) = self.table.lookup(rrep.originator, now) else {
            debug!(originator = %rrep.originator, "No reverse route for reply");
            self.stats.data_dropped += 1;
            actions.push(RouterAction::Event(NetworkEvent::packet_dropped(
                self.id,
                DropReason::NoRoute,
                now,
            )));
            return;
        };
        self.table.refresh(rrep.originator, now);
        self.stats.replies_forwarded += 1;
        trace!(next_hop = %reverse.next_hop, hops, "Forwarding reply");
        let forwarded = RouteReply {
            hop_count: hops,
            ..rrep
        };
        actions.push(transmit(Frame::unicast(
            self.id,
            reverse.next_hop,
            Packet::RouteReply(forwarded),
        )));
    }

    /// A reply reached the originator: time it, judge it, act on the verdict
    fn complete_discovery(
        &mut self,
        rrep: RouteReply,
        candidate: RouteUpdate,
        now: SimTime,
        actions: &mut Vec<RouterAction>,
    ) {
        let destination = rrep.destination;
        let Some(pending) = self.pending.get(&destination) else {
            debug!(%destination, "Unsolicited reply");
            return;
        };
        let Some(sent_at) = pending.sent_at(rrep.request_id) else {
            debug!(%destination, request_id = %rrep.request_id, "Reply to unknown request");
            return;
        };
        let current = pending.current();

        let rtt = now.saturating_duration_since(sent_at);
        let route = RouteKey::new(self.id, destination, candidate.next_hop);
        let rtt_config = self.rtt_config;
        let estimator = self
            .estimators
            .entry(route)
            .or_insert_with(|| RttEstimator::new(rtt_config));
        estimator.record(rtt);
        let estimate = estimator.snapshot();

        let limit = self.config.max_history;
        push_bounded(
            &mut self.samples,
            RttSample {
                route,
                rtt,
                hops: candidate.hop_count,
                at: now,
            },
            limit,
        );
        actions.push(RouterAction::Event(NetworkEvent::RttMeasured {
            route,
            rtt,
            hops: candidate.hop_count,
            at: now,
        }));

        let verdict = self
            .detector
            .evaluate(route, candidate.hop_count, &estimate);
        push_bounded(&mut self.verdicts, verdict, limit);

        if let Some(request_id) = current {
            actions.push(RouterAction::CancelTimer {
                timer: RouterTimer::Discovery {
                    destination,
                    request_id,
                },
            });
        }

        if verdict.is_suspected() {
            let err = RoutingError::SuspectedWormhole {
                destination,
                next_hop: candidate.next_hop,
            };
            warn!(
                error = %err,
                rtt_us = rtt.as_micros() as u64,
                hops = candidate.hop_count,
                floor_us = verdict.evidence.expected_floor.as_micros() as u64,
                "Route rejected"
            );
            self.stats.routes_rejected += 1;
            if self
                .table
                .get(destination)
                .is_some_and(|entry| entry.valid && entry.next_hop == candidate.next_hop)
            {
                self.table.invalidate(destination);
            }
            self.table.record_rejected(candidate);
            self.suspects.insert(candidate.next_hop);
            actions.push(RouterAction::Event(NetworkEvent::RouteRejected {
                node: self.id,
                verdict,
                at: now,
            }));
            self.retry_or_fail(destination, now, actions);
            return;
        }

        let installed = match self.table.update(candidate, rrep.lifetime, now) {
            Ok(entry) => Some(entry),
            Err(err) => {
                info!(error = %err, "Discovered route not fresher than stored entry");
                self.stats.stale_updates += 1;
                self.table.lookup(destination, now)
            }
        };
        let Some(entry) = installed else {
            // Nothing usable; keep waiting for another reply or the timer
            return;
        };

        info!(
            %destination,
            next_hop = %entry.next_hop,
            hops = entry.hop_count,
            rtt_us = rtt.as_micros() as u64,
            "Route installed"
        );
        self.stats.routes_installed += 1;
        actions.push(RouterAction::Event(NetworkEvent::RouteInstalled {
            node: self.id,
            destination,
            next_hop: entry.next_hop,
            hop_count: entry.hop_count,
            at: now,
        }));

        let queued = self
            .pending
            .remove(&destination)
            .map(|mut p| p.drain_queue())
            .unwrap_or_default();
        for packet in queued {
            actions.push(transmit(Frame::unicast(
                self.id,
                entry.next_hop,
                Packet::Data(packet.clone()),
            )));
            actions.push(RouterAction::SendComplete {
                packet,
                result: Ok(()),
            });
        }
    }

    fn handle_data(
        &mut self,
        data: DataPacket,
        sender: NodeId,
        now: SimTime,
        actions: &mut Vec<RouterAction>,
    ) {
        self.table.refresh(data.source(), now);

        if data.destination() == self.id {
            trace!(flow = %data.flow, sequence = data.sequence, "Delivering data");
            actions.push(RouterAction::Event(NetworkEvent::PacketDelivered {
                flow: data.flow,
                sequence: data.sequence,
                at: now,
            }));
            actions.push(RouterAction::Deliver {
                packet: data,
                from: sender,
            });
            return;
        }

        match self.table.lookup(data.destination(), now) {
            Some(entry) => {
                self.table.refresh(data.destination(), now);
                self.stats.data_forwarded += 1;
                trace!(next_hop = %entry.next_hop, "Forwarding data");
                actions.push(transmit(Frame::unicast(
                    self.id,
                    entry.next_hop,
                    Packet::Data(data),
                )));
            }
            None => {
                debug!(dest = %data.destination(), "No route for data, dropping");
                self.stats.data_dropped += 1;
                actions.push(RouterAction::Event(NetworkEvent::packet_dropped(
                    self.id,
                    DropReason::NoRoute,
                    now,
                )));
            }
        }
    }

    /// Send another request if the budget allows, otherwise give up
    fn retry_or_fail(&mut self, destination: NodeId, now: SimTime, actions: &mut Vec<RouterAction>) {
        let attempts = self
            .pending
            .get(&destination)
            .map_or(0, PendingDiscovery::attempts);
        if attempts <= self.config.rreq_retries {
            self.begin_attempt(destination, now, actions);
            return;
        }

        let err = RoutingError::NoRouteFound {
            destination,
            attempts,
        };
        warn!(error = %err, "Route discovery failed");
        self.stats.discoveries_failed += 1;
        actions.push(RouterAction::Event(NetworkEvent::DiscoveryFailed {
            originator: self.id,
            destination,
            attempts,
            at: now,
        }));
        let queued = self
            .pending
            .remove(&destination)
            .map(|mut p| p.drain_queue())
            .unwrap_or_default();
        for packet in queued {
            actions.push(RouterAction::Event(NetworkEvent::packet_dropped(
                self.id,
                DropReason::DiscoveryFailed,
                now,
            )));
            actions.push(RouterAction::SendComplete {
                packet,
                result: Err(err.clone()),
            });
        }
    }

    /// Issue a new RREQ for the pending discovery to `destination`
    fn begin_attempt(&mut self, destination: NodeId, now: SimTime, actions: &mut Vec<RouterAction>) {
        if !self.pending.contains_key(&destination) {
            return;
        }
        self.seq = self.seq.next();
        let request_id = self.next_request_id;
        self.next_request_id = request_id.next();
        self.request_cache.insert(self.id, request_id, now);

        let Some(pending) = self.pending.get_mut(&destination) else {
            return;
        };
        pending.record_attempt(request_id, now);
        let attempt = pending.attempts();

        let rreq = RouteRequest {
            originator: self.id,
            destination,
            request_id,
            hop_count: 0,
            originator_seq: self.seq,
            destination_seq: self.table.last_known_seq(destination),
            sent_at: now,
        };

        let trusted: Vec<NodeId> = if self.suspects.is_empty() {
            Vec::new()
        } else {
            self.neighbors.difference(&self.suspects).copied().collect()
        };
        if trusted.is_empty() {
            actions.push(transmit(Frame::broadcast(
                self.id,
                Packet::RouteRequest(rreq),
            )));
        } else {
            debug!(?trusted, suspects = ?self.suspects, "Requesting via trusted neighbors only");
            for neighbor in trusted {
                actions.push(transmit(Frame::unicast(
                    self.id,
                    neighbor,
                    Packet::RouteRequest(rreq.clone()),
                )));
            }
        }

        self.stats.requests_originated += 1;
        debug!(%destination, %request_id, attempt, "Route request sent");
        actions.push(RouterAction::Event(NetworkEvent::DiscoveryStarted {
            originator: self.id,
            destination,
            request_id,
            attempt,
            at: now,
        }));
        actions.push(RouterAction::ArmTimer {
            timer: RouterTimer::Discovery {
                destination,
                request_id,
            },
            after: backoff(self.config.discovery_timeout, attempt),
        });
    }

    fn jitter(&self, rng: &mut dyn RngCore) -> Duration {
        let max = u64::try_from(self.config.forward_jitter.as_nanos()).unwrap_or(u64::MAX);
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(rng.random_range(0..=max))
    }
}

fn push_bounded<T>(history: &mut VecDeque<T>, item: T, limit: usize) {
    while history.len() >= limit {
        history.pop_front();
    }
    history.push_back(item);
}

fn transmit(frame: Frame) -> RouterAction {
    RouterAction::Transmit {
        frame,
        delay: Duration::ZERO,
    }
}
