//! Detection capability
//!
//! A [`Detector`] sees only what a node can measure locally: the RTT
//! estimate of a route and the hop count the route claims. It never learns
//! how the route was built.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::identity::NodeId;
use crate::time::SimTime;

/// Identity of a candidate route as seen by its originator
///
/// Distinct next hops give distinct keys, so a tunnel route and an honest
/// route to the same destination never share RTT history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RouteKey {
    pub originator: NodeId,
    pub destination: NodeId,
    pub next_hop: NodeId,
}

impl RouteKey {
    pub fn new(originator: NodeId, destination: NodeId, next_hop: NodeId) -> Self {
        Self {
            originator,
            destination,
            next_hop,
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{} via {}", self.originator, self.destination, self.next_hop)
    }
}

/// One completed request/reply measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RttSample {
    pub route: RouteKey,
    pub rtt: Duration,
    /// Hop count the reply advertised
    pub hops: u8,
    pub at: SimTime,
}

/// Immutable view of an estimator's state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RttEstimate {
    /// Smoothed mean (SRTT)
    pub srtt: Duration,
    /// Smoothed mean deviation (RTTVAR)
    pub rttvar: Duration,
    /// SRTT + k * RTTVAR
    pub bound: Duration,
    pub samples: u32,
}

impl RttEstimate {
    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }
}

/// Outcome of evaluating a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    Accepted,
    SuspectedWormhole,
}

/// Why the detector reached its classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerdictBasis {
    /// Compared against the expected timing
    Measured,
    /// Fewer samples than required; accepted without judgement
    InsufficientSamples,
    /// Route too short for timing to tell anything
    BelowMinimumHops,
    /// Detection switched off
    Disabled,
}

/// Numbers the verdict was based on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub observed_srtt: Duration,
    pub observed_bound: Duration,
    /// Per-hop baseline times claimed hops
    pub expected_rtt: Duration,
    pub expected_floor: Duration,
    pub expected_ceiling: Duration,
    pub hops: u8,
    pub samples: u32,
}

/// A detector's judgement on one route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionVerdict {
    pub route: RouteKey,
    pub classification: Classification,
    pub basis: VerdictBasis,
    pub evidence: Evidence,
}

impl DetectionVerdict {
    pub fn accepted(route: RouteKey, basis: VerdictBasis, evidence: Evidence) -> Self {
        Self {
            route,
            classification: Classification::Accepted,
            basis,
            evidence,
        }
    }

    pub fn is_suspected(&self) -> bool {
        self.classification == Classification::SuspectedWormhole
    }
}

/// Classifies routes from their timing
pub trait Detector {
    /// Judge `route`, which claims `reported_hops` hops, given its estimate
    fn evaluate(&self, route: RouteKey, reported_hops: u8, estimate: &RttEstimate)
    -> DetectionVerdict;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn evaluate(
        &self,
        route: RouteKey,
        reported_hops: u8,
        estimate: &RttEstimate,
    ) -> DetectionVerdict {
        (**self).evaluate(route, reported_hops, estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_key_display() {
        let key = RouteKey::new(NodeId(1), NodeId(4), NodeId(0));
        assert_eq!(key.to_string(), "n1->n4 via n0");
    }

    #[test]
    fn test_verdict_helpers() {
        let key = RouteKey::new(NodeId(1), NodeId(4), NodeId(2));
        let verdict = DetectionVerdict::accepted(key, VerdictBasis::Disabled, Evidence::default());
        assert!(!verdict.is_suspected());
        assert!(RttEstimate::default().is_empty());
    }
}
