//! Routing table with sequence-number freshness
//!
//! The [`RoutingTable`] holds one entry per destination. Updates pass the
//! freshness rule: a candidate replaces the stored entry only if it carries
//! a newer destination sequence number, the same number with fewer hops,
//! or the same number while the stored entry is no longer valid.
//!
//! Expiry is lazy: an entry past its deadline is marked invalid the next
//! time it is looked up, keeping its sequence number.
//!
//! Routes a detector refused never enter the table. Only their sequence
//! number is remembered, so later requests ask for something fresher.

use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use manet_core::{NodeId, RoutingError, SeqNo, SimTime};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// A route to one destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub destination: NodeId,
    pub next_hop: NodeId,
    pub hop_count: u8,
    pub seq: SeqNo,
    pub updated_at: SimTime,
    pub expires_at: SimTime,
    pub valid: bool,
}

impl RouteEntry {
    /// Valid and not yet expired at `now`
    pub fn is_usable(&self, now: SimTime) -> bool {
        self.valid && now < self.expires_at
    }
}

/// A candidate route offered by a received RREQ or RREP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteUpdate {
    pub destination: NodeId,
    pub next_hop: NodeId,
    pub hop_count: u8,
    pub seq: SeqNo,
}

impl RouteUpdate {
    /// Whether this candidate may replace `stored` at `now`
    pub fn is_fresher_than(&self, stored: &RouteEntry, now: SimTime) -> bool {
        if self.seq.is_newer_than(stored.seq) {
            return true;
        }
        self.seq == stored.seq && (self.hop_count < stored.hop_count || !stored.is_usable(now))
    }

    fn into_entry(self, now: SimTime, lifetime: Duration) -> RouteEntry {
        RouteEntry {
            destination: self.destination,
            next_hop: self.next_hop,
            hop_count: self.hop_count,
            seq: self.seq,
            updated_at: now,
            expires_at: now + lifetime,
            valid: true,
        }
    }
}

/// Per-node routing table
pub struct RoutingTable {
    routes: DashMap<NodeId, RouteEntry>,
    /// Freshest sequence number carried by a refused route
    refused_seq: DashMap<NodeId, SeqNo>,
    /// Lifetime given to refreshed routes
    active_timeout: Duration,
}

impl RoutingTable {
    /// Create a new routing table
    ///
    /// # Arguments
    /// * `active_timeout` - How long a route stays valid without use
    pub fn new(active_timeout: Duration) -> Self {
        Self {
            routes: DashMap::new(),
            refused_seq: DashMap::new(),
            active_timeout,
        }
    }

    /// Offer a candidate route
    ///
    /// Returns the installed entry, or `StaleSequenceNumber` if the stored
    /// entry is at least as fresh.
    pub fn update(
        &self,
        update: RouteUpdate,
        lifetime: Duration,
        now: SimTime,
    ) -> Result<RouteEntry, RoutingError> {
        match self.routes.entry(update.destination) {
            Entry::Vacant(slot) => {
                let entry = update.into_entry(now, lifetime);
                slot.insert(entry.clone());
                trace!(dest = %update.destination, next_hop = %update.next_hop, "New route entry");
                Ok(entry)
            }
            Entry::Occupied(mut slot) => {
                let stored = slot.get();
                if !update.is_fresher_than(stored, now) {
                    return Err(RoutingError::StaleSequenceNumber {
                        destination: update.destination,
                        offered: update.seq.0,
                        current: stored.seq.0,
                    });
                }
                let entry = update.into_entry(now, lifetime);
                slot.insert(entry.clone());
                trace!(dest = %update.destination, next_hop = %update.next_hop, "Route entry replaced");
                Ok(entry)
            }
        }
    }

    /// Remember a refused candidate's sequence number
    ///
    /// The stored entry, if any, is left alone. Returns the freshest refused
    /// number for the destination.
    pub fn record_rejected(&self, update: RouteUpdate) -> SeqNo {
        let mut seq = self
            .refused_seq
            .entry(update.destination)
            .or_insert(update.seq);
        *seq = (*seq).max(update.seq);
        *seq
    }

    /// Get a usable route, invalidating it if it has expired
    pub fn lookup(&self, destination: NodeId, now: SimTime) -> Option<RouteEntry> {
        let mut entry = self.routes.get_mut(&destination)?;
        if entry.valid && now >= entry.expires_at {
            trace!(dest = %destination, "Route expired");
            entry.valid = false;
        }
        entry.valid.then(|| entry.value().clone())
    }

    /// Get the stored entry regardless of validity
    pub fn get(&self, destination: NodeId) -> Option<RouteEntry> {
        self.routes.get(&destination).map(|e| e.value().clone())
    }

    /// Extend a usable route's lifetime after use
    pub fn refresh(&self, destination: NodeId, now: SimTime) -> bool {
        match self.routes.get_mut(&destination) {
            Some(mut entry) if entry.is_usable(now) => {
                entry.expires_at = entry.expires_at.max(now + self.active_timeout);
                true
            }
            _ => false,
        }
    }

    /// Mark a route unusable, keeping its sequence number
    pub fn invalidate(&self, destination: NodeId) -> Option<RouteEntry> {
        let mut entry = self.routes.get_mut(&destination)?;
        entry.valid = false;
        Some(entry.value().clone())
    }

    /// Last destination sequence number seen, valid, expired or refused
    pub fn last_known_seq(&self, destination: NodeId) -> Option<SeqNo> {
        let stored = self.routes.get(&destination).map(|e| e.seq);
        let refused = self.refused_seq.get(&destination).map(|s| *s);
        match (stored, refused) {
            (Some(stored), Some(refused)) => Some(stored.max(refused)),
            (stored, refused) => stored.or(refused),
        }
    }

    /// Snapshot of all entries ordered by destination
    pub fn entries(&self) -> Vec<RouteEntry> {
        let mut entries: Vec<_> = self.routes.iter().map(|e| e.value().clone()).collect();
        entries.sort_by_key(|e| e.destination);
        entries
    }

    pub fn active_timeout(&self) -> Duration {
        self.active_timeout
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIFETIME: Duration = Duration::from_secs(3);

    fn candidate(dest: u32, next_hop: u32, hops: u8, seq: u32) -> RouteUpdate {
        RouteUpdate {
            destination: NodeId(dest),
            next_hop: NodeId(next_hop),
            hop_count: hops,
            seq: SeqNo(seq),
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let table = RoutingTable::default();
        let now = SimTime::from_secs(1);

        table.update(candidate(4, 2, 3, 1), LIFETIME, now).unwrap();

        let entry = table.lookup(NodeId(4), now).unwrap();
        assert_eq!(entry.next_hop, NodeId(2));
        assert_eq!(entry.hop_count, 3);
        assert_eq!(entry.expires_at, SimTime::from_secs(4));
    }

    #[test]
    fn test_newer_seq_accepted() {
        let table = RoutingTable::default();
        let now = SimTime::ZERO;
        table.update(candidate(4, 0, 3, 1), LIFETIME, now).unwrap();

        // More hops, but newer sequence number wins
        table.update(candidate(4, 2, 5, 2), LIFETIME, now).unwrap();
        assert_eq!(table.lookup(NodeId(4), now).unwrap().next_hop, NodeId(2));
    }

    #[test]
    fn test_equal_seq_fewer_hops_accepted() {
        let table = RoutingTable::default();
        let now = SimTime::ZERO;
        table.update(candidate(4, 0, 4, 1), LIFETIME, now).unwrap();
        table.update(candidate(4, 2, 3, 1), LIFETIME, now).unwrap();
        assert_eq!(table.lookup(NodeId(4), now).unwrap().hop_count, 3);
    }

    #[test]
    fn test_stale_seq_rejected() {
        let table = RoutingTable::default();
        let now = SimTime::ZERO;
        table.update(candidate(4, 0, 3, 5), LIFETIME, now).unwrap();

        let err = table.update(candidate(4, 2, 1, 4), LIFETIME, now).unwrap_err();
        assert_eq!(
            err,
            RoutingError::StaleSequenceNumber {
                destination: NodeId(4),
                offered: 4,
                current: 5,
            }
        );

        // Equal seq with equal hops is also stale
        assert!(table.update(candidate(4, 2, 3, 5), LIFETIME, now).is_err());
        assert_eq!(table.lookup(NodeId(4), now).unwrap().next_hop, NodeId(0));
    }

    #[test]
    fn test_equal_seq_replaces_invalid_entry() {
        let table = RoutingTable::default();
        let now = SimTime::ZERO;
        table.update(candidate(4, 0, 2, 7), LIFETIME, now).unwrap();
        table.invalidate(NodeId(4));

        let entry = table.update(candidate(4, 2, 3, 7), LIFETIME, now).unwrap();
        assert!(entry.valid);
        assert_eq!(entry.next_hop, NodeId(2));
    }

    #[test]
    fn test_lazy_expiry_keeps_seq() {
        let table = RoutingTable::default();
        table.update(candidate(4, 2, 3, 9), LIFETIME, SimTime::ZERO).unwrap();

        assert!(table.lookup(NodeId(4), SimTime::from_secs(3)).is_none());
        let stored = table.get(NodeId(4)).unwrap();
        assert!(!stored.valid);
        assert_eq!(table.last_known_seq(NodeId(4)), Some(SeqNo(9)));
    }

    #[test]
    fn test_refresh_extends_lifetime() {
        let table = RoutingTable::default();
        table.update(candidate(4, 2, 3, 1), LIFETIME, SimTime::ZERO).unwrap();

        assert!(table.refresh(NodeId(4), SimTime::from_secs(2)));
        assert!(table.lookup(NodeId(4), SimTime::from_secs(4)).is_some());
        assert!(table.lookup(NodeId(4), SimTime::from_secs(5)).is_none());
        assert!(!table.refresh(NodeId(4), SimTime::from_secs(5)));
    }

    #[test]
    fn test_rejected_route_not_usable() {
        let table = RoutingTable::default();
        let now = SimTime::ZERO;
        assert_eq!(table.record_rejected(candidate(4, 0, 3, 2)), SeqNo(2));

        assert!(table.lookup(NodeId(4), now).is_none());
        assert!(table.get(NodeId(4)).is_none());
        assert_eq!(table.last_known_seq(NodeId(4)), Some(SeqNo(2)));

        // Same number over an honest path is still accepted
        table.update(candidate(4, 2, 3, 2), LIFETIME, now).unwrap();
        assert_eq!(table.lookup(NodeId(4), now).unwrap().next_hop, NodeId(2));
    }

    #[test]
    fn test_rejected_route_keeps_honest_entry() {
        let table = RoutingTable::default();
        let now = SimTime::from_millis(6);
        table.update(candidate(4, 2, 3, 1), LIFETIME, now).unwrap();

        // Fresher number through the suspect
        table.record_rejected(candidate(4, 0, 3, 2));
        table.record_rejected(candidate(4, 0, 3, 1));

        let entry = table.lookup(NodeId(4), SimTime::from_millis(102)).unwrap();
        assert_eq!(entry.next_hop, NodeId(2));
        assert_eq!(entry.seq, SeqNo(1));
        assert_eq!(table.last_known_seq(NodeId(4)), Some(SeqNo(2)));
    }

    #[test]
    fn test_entries_sorted() {
        let table = RoutingTable::default();
        let now = SimTime::ZERO;
        table.update(candidate(5, 4, 1, 1), LIFETIME, now).unwrap();
        table.update(candidate(1, 2, 2, 1), LIFETIME, now).unwrap();
        table.update(candidate(3, 2, 1, 1), LIFETIME, now).unwrap();

        let dests: Vec<_> = table.entries().iter().map(|e| e.destination).collect();
        assert_eq!(dests, vec![NodeId(1), NodeId(3), NodeId(5)]);
        assert_eq!(table.len(), 3);
    }
}
