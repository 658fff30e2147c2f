//! # MANET Detect
//!
//! RTT estimation and timing-based wormhole detection.
//!
//! - [`RttEstimator`]: SRTT/RTTVAR per route, TCP-style smoothing
//! - [`RttDetector`]: flags routes faster than their hop count allows
//! - [`PassthroughDetector`]: accepts everything (countermeasure off)
//! - [`Calibration`]: derives the honest per-hop [`Baseline`]
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use manet_core::{Detector, NodeId, RouteKey};
//! use manet_detect::{Baseline, DetectorConfig, RttDetector, RttEstimator};
//!
//! let detector = RttDetector::new(
//!     Baseline::exact(Duration::from_millis(2)),
//!     DetectorConfig::default(),
//! );
//!
//! let mut estimator = RttEstimator::default();
//! estimator.record(Duration::from_millis(2));
//!
//! let route = RouteKey::new(NodeId(1), NodeId(4), NodeId(0));
//! let verdict = detector.evaluate(route, 3, &estimator.snapshot());
//! assert!(verdict.is_suspected());
//! ```

pub mod calibration;
pub mod detector;
pub mod rtt;

pub use calibration::Calibration;
pub use detector::{Baseline, DetectorConfig, PassthroughDetector, RttDetector};
pub use rtt::{RttConfig, RttEstimator};
