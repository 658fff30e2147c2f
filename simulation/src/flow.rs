//! Per-flow traffic statistics
//!
//! The [`FlowMonitor`] counts bytes and packets of every end-to-end flow as
//! they leave the source and reach the destination, and produces a
//! [`FlowStats`] summary per flow at the end of a run.

use std::collections::BTreeMap;
use std::time::Duration;

use derive_more::Display;
use manet_core::{FlowKey, SimTime};
use serde::{Deserialize, Serialize};

/// Which end of the flow saw the packet
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[display("tx")]
    Transmit,
    #[display("rx")]
    Receive,
}

/// Raw counters for one flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub flow: FlowKey,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub first_tx: Option<SimTime>,
    pub last_tx: Option<SimTime>,
    pub first_rx: Option<SimTime>,
    pub last_rx: Option<SimTime>,
    /// Sum of one-way delays of received packets
    pub delay_sum: Duration,
}

impl FlowRecord {
    pub fn new(flow: FlowKey) -> Self {
        Self {
            flow,
            tx_bytes: 0,
            rx_bytes: 0,
            tx_packets: 0,
            rx_packets: 0,
            first_tx: None,
            last_tx: None,
            first_rx: None,
            last_rx: None,
            delay_sum: Duration::ZERO,
        }
    }

    fn observe(&mut self, bytes: u64, direction: Direction, at: SimTime) {
        match direction {
            Direction::Transmit => {
                self.tx_bytes += bytes;
                self.tx_packets += 1;
                self.first_tx.get_or_insert(at);
                self.last_tx = Some(at);
            }
            Direction::Receive => {
                self.rx_bytes += bytes;
                self.rx_packets += 1;
                self.first_rx.get_or_insert(at);
                self.last_rx = Some(at);
            }
        }
    }

    /// Summarize the counters
    pub fn stats(&self) -> FlowStats {
        let throughput_bps = match (self.first_tx, self.last_rx) {
            (Some(first_tx), Some(last_rx)) => throughput_bps(self.rx_bytes, first_tx, last_rx),
            _ => 0.0,
        };
        FlowStats {
            flow: self.flow,
            tx_bytes: self.tx_bytes,
            rx_bytes: self.rx_bytes,
            tx_packets: self.tx_packets,
            rx_packets: self.rx_packets,
            lost_packets: self.tx_packets.saturating_sub(self.rx_packets),
            mean_delay: u32::try_from(self.rx_packets)
                .ok()
                .filter(|&n| n > 0)
                .map(|n| self.delay_sum / n),
            throughput_bps,
        }
    }
}

/// End-of-run summary for one flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowStats {
    pub flow: FlowKey,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub lost_packets: u64,
    /// Mean one-way delay, `None` when nothing arrived
    pub mean_delay: Option<Duration>,
    pub throughput_bps: f64,
}

impl FlowStats {
    pub fn throughput_mbps(&self) -> f64 {
        self.throughput_bps / 1_000_000.0
    }
}

/// Received bits over the time from first send to last receipt
///
/// Zero when nothing was received or no time elapsed.
pub fn throughput_bps(rx_bytes: u64, first_tx: SimTime, last_rx: SimTime) -> f64 {
    let Some(elapsed) = last_rx.checked_duration_since(first_tx) else {
        return 0.0;
    };
    if rx_bytes == 0 || elapsed.is_zero() {
        return 0.0;
    }
    rx_bytes as f64 * 8.0 / elapsed.as_secs_f64()
}

/// Collects [`FlowRecord`]s for every flow seen
#[derive(Debug, Clone, Default)]
pub struct FlowMonitor {
    enabled: bool,
    records: BTreeMap<FlowKey, FlowRecord>,
}

impl FlowMonitor {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            records: BTreeMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Count `bytes` of `flow` leaving the source or reaching the destination
    pub fn observe(&mut self, flow: FlowKey, bytes: u64, direction: Direction, at: SimTime) {
        if !self.enabled {
            return;
        }
        self.records
            .entry(flow)
            .or_insert_with(|| FlowRecord::new(flow))
            .observe(bytes, direction, at);
    }

    /// Count a receipt and its one-way delay since `sent_at`
    pub fn observe_delivery(&mut self, flow: FlowKey, bytes: u64, sent_at: SimTime, at: SimTime) {
        if !self.enabled {
            return;
        }
        let record = self
            .records
            .entry(flow)
            .or_insert_with(|| FlowRecord::new(flow));
        record.observe(bytes, Direction::Receive, at);
        record.delay_sum += at.saturating_duration_since(sent_at);
    }

    pub fn record(&self, flow: &FlowKey) -> Option<&FlowRecord> {
        self.records.get(flow)
    }

    /// Records ordered by flow key
    pub fn records(&self) -> impl Iterator<Item = &FlowRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Summaries ordered by flow key
    pub fn report(&self) -> Vec<FlowStats> {
        self.records.values().map(FlowRecord::stats).collect()
    }
}
