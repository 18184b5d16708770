//! CLI argument parsing and command dispatch

mod config;
mod run;

pub use config::BenchConfig;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use mqtt_bench_core::{parse_port, CodecKind};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mqtt-bench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a load experiment
    Run(RunArgs),
    /// Validate a configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Flags for `run`; every flag overrides the configuration file
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Path to configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Broker host
    #[arg(short, long)]
    pub server: Option<String>,

    /// Broker port (empty means 1883)
    #[arg(short, long, value_parser = parse_port_arg)]
    pub port: Option<u16>,

    /// Client id; `{worker}` is replaced by the worker id
    #[arg(long)]
    pub client_id: Option<String>,

    /// Username
    #[arg(short, long)]
    pub username: Option<String>,

    /// Password
    #[arg(long, env = "MQTT_BENCH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Topic to publish to
    #[arg(short, long)]
    pub topic: Option<String>,

    /// QoS level (0, 1 or 2)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=2))]
    pub qos: Option<u8>,

    /// Set the retain flag
    #[arg(long)]
    pub retain: bool,

    /// Open a new connection for every sample
    #[arg(long)]
    pub no_reuse: bool,

    /// Close the connection after each sample (true/false)
    #[arg(long)]
    pub close: Option<bool>,

    /// Message body
    #[arg(short, long)]
    pub message: Option<String>,

    /// Payload codec (text, json or kura)
    #[arg(long)]
    pub codec: Option<CodecKind>,

    /// Number of concurrent workers
    #[arg(short = 'n', long)]
    pub concurrency: Option<usize>,

    /// Total samples to run
    #[arg(long, conflicts_with = "duration")]
    pub samples: Option<usize>,

    /// Run for this many seconds
    #[arg(long)]
    pub duration: Option<u64>,

    /// Samples per second across all workers
    #[arg(long)]
    pub rate_limit: Option<f64>,

    /// What an unset close flag resolves to
    #[arg(long)]
    pub close_default: Option<bool>,

    /// MQTT keep-alive in seconds
    #[arg(long)]
    pub keep_alive: Option<u64>,

    /// Handshake timeout in seconds
    #[arg(long)]
    pub connect_timeout: Option<u64>,

    /// Write the summary as JSON to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn parse_port_arg(text: &str) -> Result<u16, String> {
    parse_port(text).map_err(|e| e.to_string())
}

/// Execute the parsed command
pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => run::run(args).await,
        Commands::Validate { config } => {
            let config = BenchConfig::load(&config)?;
            config.validate()?;
            println!(
                "Configuration is valid: {} -> {} ({} workers, {:?})",
                config.request.label(),
                config.request.topic,
                config.experiment.concurrency,
                config.experiment.stop_condition
            );
            Ok(())
        }
    }
}
