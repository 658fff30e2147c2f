//! MANET wormhole simulation
//!
//! Runs the wormhole scenario, with or without the RTT countermeasure, and
//! prints per-flow statistics and the routes discovery settled on.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use manet_core::NodeId;
use manet_detect::Baseline;
use manet_logging::{FileConfig, ManetSubscriberBuilder};

use manet_simulation::{
    EchoConfig, FlowTrace, Layout, PhyMode, SimConfig, format_flow_stats, scenarios,
};

#[derive(Parser)]
#[command(
    name = "manet-sim",
    about = "Wormhole attack and RTT countermeasure in an ad hoc wireless network",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Console log format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Also write logs to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one simulation and print flow statistics
    Run {
        #[command(flatten)]
        sim: SimArgs,

        /// Write a JSON trace of the run to this file
        #[arg(long)]
        trace: Option<PathBuf>,
    },

    /// Run with the countermeasure off and on and compare routes
    Compare {
        #[command(flatten)]
        sim: SimArgs,
    },

    /// Measure and print the honest per-hop baseline
    Calibrate {
        #[command(flatten)]
        sim: SimArgs,
    },

    /// Print node placement, radio links and tunnel
    Topology {
        #[command(flatten)]
        sim: SimArgs,
    },
}

#[derive(Args)]
struct SimArgs {
    /// Number of nodes
    #[arg(short, long, default_value = "6")]
    nodes: u32,

    /// Lay nodes out in a grid this many columns wide instead of a line
    #[arg(long)]
    grid_columns: Option<u32>,

    /// Distance between neighboring nodes in metres
    #[arg(long, default_value = "100")]
    spacing: f64,

    /// Radio range in metres
    #[arg(long, default_value = "150")]
    range: f64,

    /// Per-frame loss probability
    #[arg(long, default_value = "0")]
    loss: f64,

    /// PHY rate mode, e.g. DsssRate1Mbps or ErpOfdmRate54Mbps
    #[arg(long, default_value = "DsssRate1Mbps")]
    phy_mode: String,

    /// Simulated seconds
    #[arg(short, long, default_value = "100")]
    duration: u64,

    #[arg(long, default_value = "1")]
    seed: u64,

    /// Run without the tunnel
    #[arg(long)]
    no_wormhole: bool,

    /// Tunnel endpoints
    #[arg(long, num_args = 2, value_names = ["A", "B"], default_values = ["0", "5"])]
    tunnel: Vec<NodeId>,

    /// One-way tunnel latency in microseconds
    #[arg(long, default_value = "1")]
    tunnel_latency_us: u64,

    /// Disable the RTT countermeasure
    #[arg(long)]
    no_countermeasure: bool,

    /// Fixed per-hop baseline in microseconds instead of calibrating
    #[arg(long)]
    baseline_us: Option<u64>,

    /// Fraction below the expected RTT still accepted
    #[arg(long, default_value = "0.2")]
    tolerance: f64,

    /// Echo client and server nodes
    #[arg(long, num_args = 2, value_names = ["SOURCE", "SINK"], default_values = ["1", "4"])]
    echo: Vec<NodeId>,

    /// Run without echo traffic
    #[arg(long)]
    no_echo: bool,

    /// Echo requests to send
    #[arg(long, default_value = "1")]
    packets: u32,

    /// Echo payload bytes
    #[arg(long, default_value = "1024")]
    packet_size: u32,

    /// Milliseconds between echo requests
    #[arg(long, default_value = "1000")]
    interval_ms: u64,

    /// Skip flow statistics
    #[arg(long)]
    no_flow_monitor: bool,
}

impl SimArgs {
    fn into_config(self) -> anyhow::Result<SimConfig> {
        let phy_mode: PhyMode = self.phy_mode.parse()?;
        let mut config = SimConfig::default()
            .with_nodes(self.nodes)
            .with_phy_mode(phy_mode)
            .with_loss(self.loss)
            .with_seed(self.seed)
            .with_duration(Duration::from_secs(self.duration))
            .with_wormhole(!self.no_wormhole)
            .with_countermeasure(!self.no_countermeasure);

        if let Some(columns) = self.grid_columns {
            config = config.with_layout(Layout::Grid { columns });
        }
        config.spacing = self.spacing;
        config.range = self.range;
        config.flow_monitor = !self.no_flow_monitor;

        if let [a, b] = self.tunnel[..] {
            config.tunnel.endpoints = (a, b);
        }
        config.tunnel.latency = Duration::from_micros(self.tunnel_latency_us);

        config.countermeasure.detector.tolerance = self.tolerance;
        if let Some(per_hop) = self.baseline_us {
            config = config.with_baseline(Baseline::exact(Duration::from_micros(per_hop)));
        }

        let echo = match self.echo[..] {
            _ if self.no_echo => None,
            [source, sink] => Some(EchoConfig {
                source,
                sink,
                max_packets: self.packets,
                packet_size: self.packet_size,
                interval: Duration::from_millis(self.interval_ms),
                ..EchoConfig::default()
            }),
            _ => Some(EchoConfig::default()),
        };
        config = config.with_echo(echo);

        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut logging = ManetSubscriberBuilder::new()
        .with_level(if cli.verbose { "debug" } else { "info" })
        .with_pretty_console(matches!(cli.log_format, LogFormat::Pretty));
    if let Some(directory) = &cli.log_dir {
        logging = logging.with_file_output(FileConfig {
            directory: directory.clone(),
            ..FileConfig::default()
        });
    }
    let _log_guard = logging.init()?;

    match cli.command {
        Commands::Run { sim, trace } => {
            let config = sim.into_config()?;
            println!("{}", visualize(&config));
            let scenario = scenarios::run(&config)?;

            println!("=== Flow Statistics ===");
            print!("{}", format_flow_stats(&scenario.sim.flow_report()));

            if let Some(path) = trace {
                FlowTrace::from_simulation(&scenario.sim)
                    .write_to(&path)
                    .with_context(|| format!("writing trace to {}", path.display()))?;
                println!("Trace written to {}", path.display());
            }
        }
        Commands::Compare { sim } => {
            let config = sim.into_config()?;
            println!("{}", visualize(&config));
            let comparison = scenarios::compare(&config)?;
            print!("{comparison}");
        }
        Commands::Calibrate { sim } => {
            let config = sim.into_config()?;
            let calibration = scenarios::calibrate(&config)?;
            let baseline = calibration
                .baseline()
                .context("calibration produced no baseline")?;
            println!("Calibration samples: {}", calibration.samples());
            if let (Some(min), Some(max)) = (calibration.min(), calibration.max()) {
                println!(
                    "Per-hop RTT range: {:.3} - {:.3} ms",
                    min.as_secs_f64() * 1_000.0,
                    max.as_secs_f64() * 1_000.0
                );
            }
            println!(
                "Per-hop baseline: {:.3} ms (bound {:.3} ms)",
                baseline.per_hop.as_secs_f64() * 1_000.0,
                baseline.per_hop_bound.as_secs_f64() * 1_000.0
            );
        }
        Commands::Topology { sim } => {
            let config = sim.into_config()?;
            println!("{}", visualize(&config));
        }
    }

    Ok(())
}

fn visualize(config: &SimConfig) -> String {
    let topology = manet_simulation::Topology::from_layout(config.layout, config.nodes, config.spacing);
    let tunnel = config.tunnel.enabled.then_some(config.tunnel.endpoints);
    topology.visualize(config.range, tunnel)
}
