//! Smoothed RTT estimation
//!
//! TCP-style SRTT/RTTVAR tracking. The first sample seeds the estimate,
//! later samples update RTTVAR first and then SRTT:
//!
//! ```text
//! RTTVAR = (1 - beta) * RTTVAR + beta * |sample - SRTT|
//! SRTT   = (1 - alpha) * SRTT + alpha * sample
//! bound  = SRTT + k * RTTVAR
//! ```

use std::time::Duration;

use manet_core::RttEstimate;
use serde::{Deserialize, Serialize};

/// Smoothing parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RttConfig {
    /// Gain on the mean (default 1/8)
    pub alpha: f64,
    /// Gain on the deviation (default 1/4)
    pub beta: f64,
    /// Deviation multiplier for the bound (default 4)
    pub k: f64,
    /// Seed deviation; half the first sample when `None`
    pub initial_deviation: Option<Duration>,
}

impl Default for RttConfig {
    fn default() -> Self {
        Self {
            alpha: 0.125,
            beta: 0.25,
            k: 4.0,
            initial_deviation: None,
        }
    }
}

impl RttConfig {
    pub fn with_gains(mut self, alpha: f64, beta: f64) -> Self {
        self.alpha = alpha;
        self.beta = beta;
        self
    }

    pub fn with_k(mut self, k: f64) -> Self {
        self.k = k;
        self
    }

    pub fn with_initial_deviation(mut self, deviation: Duration) -> Self {
        self.initial_deviation = Some(deviation);
        self
    }
}

/// Running SRTT/RTTVAR for one route
///
/// No sample is ever discarded and the estimator is never reset.
#[derive(Debug, Clone)]
pub struct RttEstimator {
    config: RttConfig,
    // nanoseconds
    srtt: f64,
    rttvar: f64,
    samples: u32,
}

impl RttEstimator {
    pub fn new(config: RttConfig) -> Self {
        Self {
            config,
            srtt: 0.0,
            rttvar: 0.0,
            samples: 0,
        }
    }

    /// Feed one measured round trip
    pub fn record(&mut self, sample: Duration) {
        let s = sample.as_nanos() as f64;
        if self.samples == 0 {
            self.srtt = s;
            self.rttvar = match self.config.initial_deviation {
                Some(dev) => dev.as_nanos() as f64,
                None => s / 2.0,
            };
        } else {
            let beta = self.config.beta;
            let alpha = self.config.alpha;
            self.rttvar = (1.0 - beta) * self.rttvar + beta * (s - self.srtt).abs();
            self.srtt = (1.0 - alpha) * self.srtt + alpha * s;
        }
        self.samples = self.samples.saturating_add(1);
    }

    /// Current SRTT, `None` before the first sample
    pub fn estimate(&self) -> Option<Duration> {
        (self.samples > 0).then(|| to_duration(self.srtt))
    }

    /// SRTT + k * RTTVAR, `None` before the first sample
    pub fn estimate_bound(&self) -> Option<Duration> {
        (self.samples > 0).then(|| to_duration(self.bound_nanos()))
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn config(&self) -> &RttConfig {
        &self.config
    }

    /// Immutable view for detectors; all zeros before the first sample
    pub fn snapshot(&self) -> RttEstimate {
        if self.samples == 0 {
            return RttEstimate::default();
        }
        RttEstimate {
            srtt: to_duration(self.srtt),
            rttvar: to_duration(self.rttvar),
            bound: to_duration(self.bound_nanos()),
            samples: self.samples,
        }
    }

    fn bound_nanos(&self) -> f64 {
        self.srtt + self.config.k * self.rttvar
    }
}

impl Default for RttEstimator {
    fn default() -> Self {
        Self::new(RttConfig::default())
    }
}

fn to_duration(nanos: f64) -> Duration {
    if nanos.is_finite() && nanos > 0.0 {
        Duration::from_nanos(nanos.round() as u64)
    } else {
        Duration::ZERO
    }
}
