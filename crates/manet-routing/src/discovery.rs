//! Route discovery bookkeeping
//!
//! [`RequestCache`] suppresses duplicate route requests.
//! [`PendingDiscovery`] tracks one in-flight discovery at its originator:
//! which request ids were sent and when, and the data waiting for a route.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use manet_core::{DataPacket, NodeId, RequestId, SimTime};

/// Recently seen (originator, request id) pairs
#[derive(Debug, Clone)]
pub struct RequestCache {
    seen: HashMap<(NodeId, RequestId), SimTime>,
    lifetime: Duration,
}

impl RequestCache {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            seen: HashMap::new(),
            lifetime,
        }
    }

    /// Record a request; `false` if it was already seen
    pub fn insert(&mut self, originator: NodeId, request_id: RequestId, now: SimTime) -> bool {
        self.prune(now);
        match self.seen.entry((originator, request_id)) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        }
    }

    pub fn contains(&self, originator: NodeId, request_id: RequestId) -> bool {
        self.seen.contains_key(&(originator, request_id))
    }

    /// Forget requests older than the cache lifetime
    pub fn prune(&mut self, now: SimTime) {
        let lifetime = self.lifetime;
        self.seen
            .retain(|_, seen_at| now.saturating_duration_since(*seen_at) < lifetime);
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// An in-flight discovery at its originator
#[derive(Debug, Clone)]
pub struct PendingDiscovery {
    destination: NodeId,
    /// Send time of every request id issued for this discovery
    sent_at: HashMap<RequestId, SimTime>,
    current: Option<RequestId>,
    attempts: u32,
    queued: VecDeque<DataPacket>,
}

impl PendingDiscovery {
    pub fn new(destination: NodeId) -> Self {
        Self {
            destination,
            sent_at: HashMap::new(),
            current: None,
            attempts: 0,
            queued: VecDeque::new(),
        }
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    /// Note that `request_id` went out at `now`
    pub fn record_attempt(&mut self, request_id: RequestId, now: SimTime) {
        self.sent_at.insert(request_id, now);
        self.current = Some(request_id);
        self.attempts += 1;
    }

    /// Send time of a request issued by this discovery
    pub fn sent_at(&self, request_id: RequestId) -> Option<SimTime> {
        self.sent_at.get(&request_id).copied()
    }

    /// The most recent request id
    pub fn current(&self) -> Option<RequestId> {
        self.current
    }

    /// Requests sent so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Queue a packet; hands it back if the queue is full
    pub fn enqueue(&mut self, packet: DataPacket, capacity: usize) -> Result<(), DataPacket> {
        if self.queued.len() >= capacity {
            return Err(packet);
        }
        self.queued.push_back(packet);
        Ok(())
    }

    pub fn queued(&self) -> usize {
        self.queued.len()
    }

    /// Take every queued packet in arrival order
    pub fn drain_queue(&mut self) -> Vec<DataPacket> {
        self.queued.drain(..).collect()
    }
}

/// Retry timeout for the given attempt (1-based), doubling each time
pub fn backoff(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    base * (1u32 << exponent)
}
