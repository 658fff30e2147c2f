//! End-of-run reporting
//!
//! [`FlowTrace`] bundles what a run exposes to reporting: per-flow records
//! and statistics, detector verdicts and the event log. It serializes to
//! JSON with `serde_json`.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use manet_core::{DetectionVerdict, NetworkEvent};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::SimConfig;
use crate::error::SimResult;
use crate::flow::{FlowRecord, FlowStats};
use crate::simulation::{SimStats, Simulation};

/// Serializable record of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowTrace {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub config: SimConfig,
    pub stats: SimStats,
    pub flows: Vec<FlowStats>,
    pub records: Vec<FlowRecord>,
    pub verdicts: Vec<DetectionVerdict>,
    pub events: Vec<NetworkEvent>,
}

impl FlowTrace {
    pub fn from_simulation(sim: &Simulation) -> Self {
        Self {
            run_id: sim.run_id(),
            generated_at: Utc::now(),
            config: sim.config().clone(),
            stats: sim.stats().clone(),
            flows: sim.flow_report(),
            records: sim.flows().records().cloned().collect(),
            verdicts: sim.verdicts(),
            events: sim.events().to_vec(),
        }
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the trace as pretty JSON to `path`
    pub fn write_to(&self, path: impl AsRef<Path>) -> SimResult<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), flows = self.flows.len(), "Flow trace written");
        Ok(())
    }
}

/// Per-flow summary in the classic flow-monitor layout
pub fn format_flow_stats(stats: &[FlowStats]) -> String {
    let mut output = String::new();
    for (i, flow) in stats.iter().enumerate() {
        let _ = writeln!(
            output,
            "Flow {} ({} -> {})",
            i + 1,
            flow.flow.source,
            flow.flow.destination
        );
        let _ = writeln!(output, "  Tx Bytes:   {}", flow.tx_bytes);
        let _ = writeln!(output, "  Rx Bytes:   {}", flow.rx_bytes);
        let _ = writeln!(output, "  Tx Packets: {}", flow.tx_packets);
        let _ = writeln!(output, "  Rx Packets: {}", flow.rx_packets);
        let _ = writeln!(output, "  Lost:       {}", flow.lost_packets);
        if let Some(delay) = flow.mean_delay {
            let _ = writeln!(output, "  Mean Delay: {:.3} ms", delay.as_secs_f64() * 1_000.0);
        }
        let _ = writeln!(output, "  Throughput: {:.6} Mbps", flow.throughput_mbps());
    }
    output
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use manet_core::SimTime;
    use manet_detect::PassthroughDetector;

    fn finished_run() -> Simulation {
        let config = SimConfig::default()
            .with_wormhole(false)
            .with_countermeasure(false);
        let mut sim = Simulation::new(config, Arc::new(PassthroughDetector)).unwrap();
        sim.run_until(SimTime::from_secs(3));
        sim
    }

    #[test]
    fn test_trace_collects_run() {
        let sim = finished_run();
        let trace = FlowTrace::from_simulation(&sim);
        assert_eq!(trace.run_id, sim.run_id());
        assert_eq!(trace.flows.len(), 2);
        assert_eq!(trace.records.len(), 2);
        assert!(!trace.events.is_empty());
        assert_eq!(trace.verdicts.len(), sim.verdicts().len());
    }

    #[test]
    fn test_trace_json() {
        let trace = FlowTrace::from_simulation(&finished_run());
        let json = trace.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["flows"].as_array().unwrap().len(), 2);
        assert_eq!(value["flows"][0]["tx_bytes"], 1052);
        assert_eq!(value["config"]["nodes"], 6);
    }

    #[test]
    fn test_write_to_unwritable_path() {
        let trace = FlowTrace::from_simulation(&finished_run());
        let result = trace.write_to("/nonexistent-dir/trace.json");
        assert!(matches!(result, Err(crate::error::SimError::Io(_))));
    }

    #[test]
    fn test_format_flow_stats() {
        let text = format_flow_stats(&finished_run().flow_report());
        assert!(text.contains("Flow 1 (n1 -> n4)"));
        assert!(text.contains("Flow 2 (n4 -> n1)"));
        assert!(text.contains("Tx Bytes:   1052"));
        assert!(text.contains("Throughput:"));
    }
}
