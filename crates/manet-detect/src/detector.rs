//! Timing-based wormhole detection
//!
//! A route that claims `H` hops should take roughly `H` per-hop round trips
//! to traverse. A tunnel lets a route claim hops it never paid for in time,
//! so its RTT falls below what the hop count predicts.

use std::time::Duration;

use manet_core::{
    Classification, DetectionVerdict, Detector, Evidence, RouteKey, RttEstimate, VerdictBasis,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Per-hop round-trip timing of an honest network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    /// Mean round trip per hop
    pub per_hop: Duration,
    /// Upper bound of the per-hop round trip
    pub per_hop_bound: Duration,
}

impl Baseline {
    pub fn new(per_hop: Duration, per_hop_bound: Duration) -> Self {
        Self {
            per_hop,
            per_hop_bound: per_hop_bound.max(per_hop),
        }
    }

    /// Baseline with no spread
    pub fn exact(per_hop: Duration) -> Self {
        Self::new(per_hop, per_hop)
    }
}

/// Detector thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Fraction below the expected RTT still considered honest
    pub tolerance: f64,
    /// Samples required before a route can be judged
    pub min_samples: u32,
    /// Shorter routes are never judged
    pub min_hops: u8,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.2,
            min_samples: 1,
            min_hops: 2,
        }
    }
}

impl DetectorConfig {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_min_samples(mut self, min_samples: u32) -> Self {
        self.min_samples = min_samples;
        self
    }

    pub fn with_min_hops(mut self, min_hops: u8) -> Self {
        self.min_hops = min_hops;
        self
    }
}

/// Flags routes that are faster than their hop count allows
#[derive(Debug, Clone)]
pub struct RttDetector {
    baseline: Baseline,
    config: DetectorConfig,
}

impl RttDetector {
    pub fn new(baseline: Baseline, config: DetectorConfig) -> Self {
        Self { baseline, config }
    }

    pub fn baseline(&self) -> Baseline {
        self.baseline
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    fn evidence(&self, hops: u8, estimate: &RttEstimate) -> Evidence {
        let hops_u32 = u32::from(hops);
        let expected = self.baseline.per_hop * hops_u32;
        let tolerance = self.config.tolerance.clamp(0.0, 1.0);
        Evidence {
            observed_srtt: estimate.srtt,
            observed_bound: estimate.bound,
            expected_rtt: expected,
            expected_floor: scale(expected, 1.0 - tolerance),
            expected_ceiling: self.baseline.per_hop_bound * hops_u32,
            hops,
            samples: estimate.samples,
        }
    }
}

impl Detector for RttDetector {
    fn evaluate(
        &self,
        route: RouteKey,
        reported_hops: u8,
        estimate: &RttEstimate,
    ) -> DetectionVerdict {
        let evidence = self.evidence(reported_hops, estimate);

        if estimate.samples < self.config.min_samples {
            debug!(%route, samples = estimate.samples, "Not enough samples to judge route");
            return DetectionVerdict::accepted(route, VerdictBasis::InsufficientSamples, evidence);
        }
        if reported_hops < self.config.min_hops {
            debug!(%route, hops = reported_hops, "Route too short to judge");
            return DetectionVerdict::accepted(route, VerdictBasis::BelowMinimumHops, evidence);
        }

        if estimate.srtt < evidence.expected_floor {
            warn!(
                %route,
                hops = reported_hops,
                srtt_us = estimate.srtt.as_micros() as u64,
                floor_us = evidence.expected_floor.as_micros() as u64,
                "Route faster than its hop count allows"
            );
            return DetectionVerdict {
                route,
                classification: Classification::SuspectedWormhole,
                basis: VerdictBasis::Measured,
                evidence,
            };
        }

        if estimate.srtt > evidence.expected_ceiling {
            debug!(%route, srtt_us = estimate.srtt.as_micros() as u64, "Route slower than baseline bound");
        }
        DetectionVerdict::accepted(route, VerdictBasis::Measured, evidence)
    }
}

fn scale(duration: Duration, factor: f64) -> Duration {
    Duration::from_nanos((duration.as_nanos() as f64 * factor).round() as u64)
}

/// Detector used when the countermeasure is off
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughDetector;

impl Detector for PassthroughDetector {
    fn evaluate(
        &self,
        route: RouteKey,
        reported_hops: u8,
        estimate: &RttEstimate,
    ) -> DetectionVerdict {
        let evidence = Evidence {
            observed_srtt: estimate.srtt,
            observed_bound: estimate.bound,
            hops: reported_hops,
            samples: estimate.samples,
            ..Evidence::default()
        };
        DetectionVerdict::accepted(route, VerdictBasis::Disabled, evidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manet_core::NodeId;

    fn route() -> RouteKey {
        RouteKey::new(NodeId(1), NodeId(4), NodeId(0))
    }

    fn estimate(srtt: Duration, samples: u32) -> RttEstimate {
        RttEstimate {
            srtt,
            rttvar: srtt / 2,
            bound: srtt * 3,
            samples,
        }
    }

    fn detector() -> RttDetector {
        RttDetector::new(
            Baseline::new(Duration::from_millis(2), Duration::from_micros(2_400)),
            DetectorConfig::default(),
        )
    }

    #[test]
    fn test_tunnel_route_suspected() {
        // 3 hops claimed, but the round trip looks like a single hop
        let verdict = detector().evaluate(route(), 3, &estimate(Duration::from_millis(2), 1));
        assert_eq!(verdict.classification, Classification::SuspectedWormhole);
        assert_eq!(verdict.basis, VerdictBasis::Measured);
        assert_eq!(verdict.evidence.expected_rtt, Duration::from_millis(6));
        assert_eq!(verdict.evidence.expected_floor, Duration::from_micros(4_800));
        assert_eq!(verdict.evidence.expected_ceiling, Duration::from_micros(7_200));
    }

    #[test]
    fn test_honest_route_accepted() {
        let verdict = detector().evaluate(route(), 3, &estimate(Duration::from_millis(6), 4));
        assert_eq!(verdict.classification, Classification::Accepted);
        assert_eq!(verdict.basis, VerdictBasis::Measured);
    }

    #[test]
    fn test_within_tolerance_accepted() {
        let verdict = detector().evaluate(route(), 3, &estimate(Duration::from_micros(4_900), 2));
        assert!(!verdict.is_suspected());
    }

    #[test]
    fn test_insufficient_samples_accepted() {
        let detector = RttDetector::new(
            Baseline::exact(Duration::from_millis(2)),
            DetectorConfig::default().with_min_samples(3),
        );
        let verdict = detector.evaluate(route(), 3, &estimate(Duration::from_micros(100), 2));
        assert_eq!(verdict.classification, Classification::Accepted);
        assert_eq!(verdict.basis, VerdictBasis::InsufficientSamples);
    }

    #[test]
    fn test_empty_estimate_accepted() {
        let verdict = detector().evaluate(route(), 3, &RttEstimate::default());
        assert_eq!(verdict.basis, VerdictBasis::InsufficientSamples);
    }

    #[test]
    fn test_short_route_not_judged() {
        let verdict = detector().evaluate(route(), 1, &estimate(Duration::from_micros(10), 5));
        assert_eq!(verdict.classification, Classification::Accepted);
        assert_eq!(verdict.basis, VerdictBasis::BelowMinimumHops);
    }

    #[test]
    fn test_passthrough_always_accepts() {
        let verdict =
            PassthroughDetector.evaluate(route(), 3, &estimate(Duration::from_micros(1), 9));
        assert_eq!(verdict.classification, Classification::Accepted);
        assert_eq!(verdict.basis, VerdictBasis::Disabled);
        assert_eq!(verdict.evidence.samples, 9);
    }

    #[test]
    fn test_baseline_bound_never_below_mean() {
        let baseline = Baseline::new(Duration::from_millis(3), Duration::from_millis(1));
        assert_eq!(baseline.per_hop_bound, Duration::from_millis(3));
    }
}
