// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Simulate permutation traffic across a k-port fat-tree.
//!
//! Links can be failed and repaired while traffic is running using
//! `--failures`, for example:
//!
//! ```text
//! sim-fat-tree --stdout --failures 0.0.1:5@0 --failures clear@100000
//! ```
//!
//! Every option other than the tracker options can also be set from a TOML
//! file (`--conf-file`) or from `VTURN_`-prefixed environment variables.

use std::path::PathBuf;

use clap::{Args, Parser};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use simplelog::{ConfigBuilder, SimpleLogger};
use vturn_config::{MultiSourceConfig, load_config, merge_fields};
use vturn_engine::engine::Engine;
use vturn_engine::types::SimError;
use vturn_models::fat_tree::FatTreeConfig;
use vturn_models::faults::FaultSchedule;
use vturn_models::network::{NetEvent, Network};
use vturn_models::packet::Protocol;
use vturn_models::queue::QueueMode;
use vturn_models::traffic::{FlowTemplate, permutation_flows};
use vturn_routing::config::{ReroutePolicy, TopologyVariant};
use vturn_track::builder::{TrackerConfig, TrackersConfig, setup_trackers};
use vturn_track::{Tracker, error, info};

/// Command-line arguments.
#[derive(Parser)]
#[command(about = "Fat-tree local failover evaluation application")]
struct Cli {
    /// Enable logging to the console.
    #[arg(long, default_value = "false")]
    stdout: bool,

    /// Level of log message to display.
    #[arg(long, default_value = "Info")]
    stdout_level: log::Level,

    /// Set a regular expression for which entites should have logging level set
    /// to `--stdout-level`. Others will have level set to `Error`.
    #[arg(long, default_value = "")]
    stdout_filter_regex: String,

    /// Write the log to a file as well.
    #[arg(long)]
    log_file: Option<String>,

    /// Level of log message to write to `--log-file`.
    #[arg(long, default_value = "Debug")]
    log_file_level: log::Level,

    #[command(flatten)]
    config: Config,
}

/// Simulation options that can come from any configuration source.
#[derive(Args, Clone, Debug, Serialize, Deserialize)]
struct Config {
    /// Number of ports on every switch. Must be even.
    #[arg(long)]
    port_count: Option<usize>,

    #[arg(long, value_enum)]
    topology: Option<TopologyVariant>,

    /// How switches in the destination pod react to a failed link.
    #[arg(long, value_enum)]
    reroute_policy: Option<ReroutePolicy>,

    /// Number of flows between randomly paired servers.
    #[arg(long)]
    num_flows: Option<usize>,

    #[arg(long)]
    packets_per_flow: Option<u64>,

    #[arg(long)]
    packet_bytes: Option<usize>,

    /// Time between packets of a flow.
    #[arg(long)]
    interval_ns: Option<u64>,

    #[arg(long, value_enum)]
    protocol: Option<Protocol>,

    /// Seed for random number generator.
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    data_rate_gbps: Option<f64>,

    /// Propagation delay of every link.
    #[arg(long)]
    delay_ns: Option<u64>,

    #[arg(long, value_enum)]
    queue_mode: Option<QueueMode>,

    /// Capacity of each device queue. Uses the default for the mode if not
    /// given.
    #[arg(long)]
    queue_limit: Option<usize>,

    /// Hop limit given to each packet.
    #[arg(long)]
    ttl: Option<u32>,

    /// Faults written as `pod.switch.level:port@time_ns` or `clear@time_ns`.
    #[arg(long)]
    failures: Option<Vec<String>>,

    /// Stop the simulation at this time. Runs to completion if not given.
    #[arg(long)]
    finish_ns: Option<u64>,

    /// Extra TOML configuration file.
    #[arg(long)]
    #[serde(skip)]
    conf_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port_count: Some(8),
            topology: Some(TopologyVariant::default()),
            reroute_policy: Some(ReroutePolicy::default()),
            num_flows: Some(16),
            packets_per_flow: Some(10),
            packet_bytes: Some(1000),
            interval_ns: Some(10_000),
            protocol: Some(Protocol::default()),
            seed: Some(1),
            data_rate_gbps: Some(1.0),
            delay_ns: Some(1000),
            queue_mode: Some(QueueMode::default()),
            queue_limit: None,
            ttl: Some(64),
            failures: Some(Vec::new()),
            finish_ns: None,
            conf_file: None,
        }
    }
}

impl MultiSourceConfig for Config {
    fn conf_file(&self) -> Option<&std::path::Path> {
        self.conf_file.as_deref()
    }

    fn merge_from(&mut self, other: Self) {
        merge_fields!(self, other ;
            port_count, topology, reroute_policy, num_flows, packets_per_flow,
            packet_bytes, interval_ns, protocol, seed, data_rate_gbps, delay_ns,
            queue_mode, queue_limit, ttl, failures, finish_ns, conf_file);
    }
}

/// Return a field that has a default, or fail if it has been cleared.
fn required<T: Clone>(value: &Option<T>, name: &str) -> Result<T, SimError> {
    value
        .clone()
        .ok_or_else(|| SimError(format!("No value for '{name}'")))
}

fn setup_all_trackers(args: &Cli) -> Result<Tracker, SimError> {
    let config = TrackersConfig {
        stdout: TrackerConfig {
            enable: args.stdout,
            level: args.stdout_level,
            filter_regex: &args.stdout_filter_regex,
            file: None,
        },
        log_file: TrackerConfig {
            enable: args.log_file.is_some(),
            level: args.log_file_level,
            filter_regex: "",
            file: args.log_file.as_deref(),
        },
    };
    Ok(setup_trackers(&config)?)
}

fn create_fat_tree(config: &Config) -> Result<FatTreeConfig, SimError> {
    let fat_tree = FatTreeConfig::new(
        required(&config.port_count, "port_count")?,
        required(&config.topology, "topology")?,
        required(&config.reroute_policy, "reroute_policy")?,
    )?
    .set_link(
        required(&config.data_rate_gbps, "data_rate_gbps")?,
        required(&config.delay_ns, "delay_ns")?,
    )?
    .set_queue(
        required(&config.queue_mode, "queue_mode")?,
        config.queue_limit,
    )
    .set_ttl(required(&config.ttl, "ttl")?);
    Ok(fat_tree)
}

fn build(engine: &mut Engine<NetEvent>, config: &Config) -> Result<Network, SimError> {
    let top = engine.top().clone();
    let mut network = Network::new(&top, "net", create_fat_tree(config)?)?;

    // Faults go first so that they apply before packets sent at the same time
    let faults = FaultSchedule::parse(config.failures.as_deref().unwrap_or_default())?;
    faults.schedule(engine)?;
    for fault in faults.faults() {
        info!(top ; "fault {fault}");
    }

    let template = FlowTemplate {
        num_packets: required(&config.packets_per_flow, "packets_per_flow")?,
        packet_bytes: required(&config.packet_bytes, "packet_bytes")?,
        interval_ns: required(&config.interval_ns, "interval_ns")?,
        protocol: required(&config.protocol, "protocol")?,
    };
    let num_flows = required(&config.num_flows, "num_flows")?;
    let seed = required(&config.seed, "seed")?;
    for flow in permutation_flows(network.config(), &template, num_flows, seed)? {
        network.add_flow(engine, flow)?;
    }
    info!(top ; "{num_flows} flows of {} x {}B packets every {}ns. Random seed {seed}",
        template.num_packets, template.packet_bytes, template.interval_ns);
    Ok(network)
}

fn print_summary(engine: &Engine<NetEvent>, network: &Network) {
    let top = engine.top();
    let stats = network.stats();
    let forwarding = network.forwarding_stats();
    let queues = network.queue_stats();

    info!(top ; "Finished at {}ns after {} events", engine.time_now_ns(), engine.num_processed());
    info!(top ; "Packets: {stats}");
    info!(top ; "Mean latency {:.2}ns", stats.mean_latency_ns());
    info!(top ; "Decisions: {} normal, {} cached, {} recovery, {} backtrack, {} bounce",
        forwarding.normal,
        forwarding.cached,
        forwarding.recovery,
        forwarding.backtracked,
        forwarding.bounced);
    info!(top ; "Queues: {} enqueued, {} dropped ({} rerouted)",
        queues.enqueued, queues.dropped, queues.revised_dropped);
}

fn main() -> Result<(), SimError> {
    let args = Cli::parse();

    // Reports problems found before the trackers exist
    let log_config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .set_location_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build();
    SimpleLogger::init(LevelFilter::Warn, log_config)
        .map_err(|e| SimError(format!("Unable to set up logging: {e}")))?;

    let config = load_config(args.config.clone()).map_err(|e| {
        log::error!("{e}");
        SimError(format!("{e}"))
    })?;
    log::debug!("{config:?}");

    let tracker = setup_all_trackers(&args).inspect_err(|e| log::error!("{e}"))?;
    let mut engine = Engine::new(&tracker);
    let top = engine.top().clone();

    let mut network = match build(&mut engine, &config) {
        Ok(network) => network,
        Err(e) => {
            error!(top ; "{e}");
            tracker.shutdown();
            return Err(e);
        }
    };

    let result = match config.finish_ns {
        Some(finish_ns) => engine.run_until(finish_ns, &mut network),
        None => engine.run(&mut network),
    };
    if let Err(e) = result {
        error!(top ; "{e}");
        tracker.shutdown();
        return Err(e);
    }

    print_summary(&engine, &network);
    if network.stats().in_flight() > 0 {
        info!(top ; "{} packets still in flight", network.stats().in_flight());
    }
    tracker.shutdown();
    Ok(())
}
