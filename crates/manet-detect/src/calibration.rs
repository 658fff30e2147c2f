//! Per-hop baseline calibration
//!
//! Collects round trips from a run without the attack, normalizes each by
//! its hop count and derives the honest per-hop timing.

use std::time::Duration;

use manet_core::RttSample;
use tracing::debug;

use crate::detector::Baseline;
use crate::rtt::{RttConfig, RttEstimator};

/// Accumulates per-hop RTT samples from honest traffic
#[derive(Debug, Clone)]
pub struct Calibration {
    estimator: RttEstimator,
    total: Duration,
    min: Option<Duration>,
    max: Option<Duration>,
    count: u32,
}

impl Calibration {
    pub fn new(config: RttConfig) -> Self {
        Self {
            estimator: RttEstimator::new(config),
            total: Duration::ZERO,
            min: None,
            max: None,
            count: 0,
        }
    }

    /// Add a round trip over a route of `hops` hops
    ///
    /// Zero-hop samples carry no per-hop information and are skipped.
    pub fn record(&mut self, rtt: Duration, hops: u8) {
        if hops == 0 {
            return;
        }
        let per_hop = rtt / u32::from(hops);
        self.estimator.record(per_hop);
        self.total += per_hop;
        self.min = Some(self.min.map_or(per_hop, |m| m.min(per_hop)));
        self.max = Some(self.max.map_or(per_hop, |m| m.max(per_hop)));
        self.count += 1;
        debug!(rtt_us = rtt.as_micros() as u64, hops, per_hop_us = per_hop.as_micros() as u64, "Calibration sample");
    }

    pub fn record_sample(&mut self, sample: &RttSample) {
        self.record(sample.rtt, sample.hops);
    }

    pub fn samples(&self) -> u32 {
        self.count
    }

    /// Mean per-hop round trip
    pub fn mean(&self) -> Option<Duration> {
        (self.count > 0).then(|| self.total / self.count)
    }

    pub fn min(&self) -> Option<Duration> {
        self.min
    }

    pub fn max(&self) -> Option<Duration> {
        self.max
    }

    /// Mean per hop and the estimator bound, `None` without samples
    pub fn baseline(&self) -> Option<Baseline> {
        let mean = self.mean()?;
        let bound = self.estimator.estimate_bound()?;
        Some(Baseline::new(mean, bound))
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::new(RttConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_calibration() {
        let cal = Calibration::default();
        assert_eq!(cal.baseline(), None);
        assert_eq!(cal.mean(), None);
    }

    #[test]
    fn test_normalizes_by_hops() {
        let mut cal = Calibration::default();
        cal.record(Duration::from_millis(2), 1);
        cal.record(Duration::from_millis(6), 3);
        cal.record(Duration::from_millis(8), 4);
        assert_eq!(cal.samples(), 3);
        assert_eq!(cal.mean(), Some(Duration::from_millis(2)));

        let baseline = cal.baseline().unwrap();
        assert_eq!(baseline.per_hop, Duration::from_millis(2));
        assert!(baseline.per_hop_bound >= baseline.per_hop);
    }

    #[test]
    fn test_zero_hops_skipped() {
        let mut cal = Calibration::default();
        cal.record(Duration::from_millis(5), 0);
        assert_eq!(cal.samples(), 0);
    }

    #[test]
    fn test_min_max() {
        let mut cal = Calibration::default();
        cal.record(Duration::from_millis(3), 1);
        cal.record(Duration::from_millis(4), 2);
        assert_eq!(cal.min(), Some(Duration::from_millis(2)));
        assert_eq!(cal.max(), Some(Duration::from_millis(3)));
    }
}
