//! solarman - command line client for Solarman data loggers
//!
//! Polls register blocks from a logger stick, and decodes or builds frames
//! offline for troubleshooting captures.

mod frames;
mod output;
mod poll;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use common::logging::LogConfig;
use serde::Serialize;
use solarman::{LoggerConfig, LoggerMode};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "solarman")]
#[command(about = "Read inverter registers through a Solarman data logger")]
#[command(long_about = "Read inverter registers through a Solarman data logger

Commands:
  poll        Connect and read all configured register blocks
  decode      Decode a captured response frame offline
  frame       Print the request frame that would be sent

Configuration is read from --config (YAML, TOML or JSON), then SOLARMAN_*
environment variables, then the command line overrides below.

Examples:
  solarman --host 192.168.1.50 --serial 2712345678 poll
  solarman --config logger.yaml poll --watch
  solarman --mode raw --host 10.0.0.8 --request 0x04:0-9 poll
  solarman --serial 2712345678 decode --first 0x0003 --last 0x0070 'A5 ...'")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Logger configuration file
    #[arg(short, long, global = true, env = "SOLARMAN_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,
}

/// Command line overrides, merged above file and environment values
#[derive(Args, Debug, Default, Serialize)]
struct Overrides {
    /// Logger hostname or IP address
    #[arg(long = "host", global = true)]
    #[serde(rename = "hostname", skip_serializing_if = "Option::is_none")]
    host: Option<String>,

    /// Logger TCP port
    #[arg(long, global = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,

    /// Logger stick serial number (V5 mode)
    #[arg(long = "serial", global = true)]
    #[serde(rename = "serial_number", skip_serializing_if = "Option::is_none")]
    serial: Option<u32>,

    /// Framing mode: v5 or raw
    #[arg(long, global = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<LoggerMode>,

    /// Register block `<fc>:<first>-<last>`, repeatable
    #[arg(long = "request", global = true)]
    #[serde(rename = "requests", skip_serializing_if = "Vec::is_empty")]
    requests: Vec<String>,

    /// Log every TX/RX frame as hex
    #[arg(long, global = true)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    frame_logging: bool,
}

impl Overrides {
    fn is_empty(&self) -> bool {
        self.host.is_none()
            && self.port.is_none()
            && self.serial.is_none()
            && self.mode.is_none()
            && self.requests.is_empty()
            && !self.frame_logging
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and read all configured register blocks
    Poll {
        /// Keep polling every refresh interval
        #[arg(short, long)]
        watch: bool,
    },

    /// Decode a captured response frame
    Decode {
        /// Response bytes as hex, separators allowed
        frame: String,

        /// First register of the request that produced the frame
        #[arg(long, value_parser = parse_register)]
        first: u16,

        /// Last register of the request that produced the frame
        #[arg(long, value_parser = parse_register)]
        last: u16,
    },

    /// Print the request frame for one register block
    Frame {
        /// Register block `<fc>:<first>-<last>`
        request: String,
    },
}

/// Register address in decimal or `0x` hex
fn parse_register(s: &str) -> std::result::Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid register address '{s}': {e}"))
}

/// Merge file, environment and command line into one logger config
fn resolve_config(cli: &Cli) -> Result<LoggerConfig> {
    let path = cli.config.as_deref();
    let config = if cli.overrides.is_empty() {
        LoggerConfig::load(path)
    } else {
        LoggerConfig::load_with_overrides(path, &cli.overrides)
    };
    config.context("Failed to resolve logger configuration")
}

fn log_config(cli: &Cli) -> LogConfig {
    LogConfig {
        level: if cli.verbose { "debug" } else { "info" }.to_string(),
        json: cli.log_json,
        ansi: !cli.no_color,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    common::logging::init_with_config(log_config(&cli))
        .context("Failed to initialize logging")?;

    match &cli.command {
        Commands::Poll { watch } => {
            let config = resolve_config(&cli)?;
            config.validate().context("Invalid logger configuration")?;
            poll::run(&config, *watch).await
        },
        Commands::Decode { frame, first, last } => {
            let config = resolve_config(&cli)?;
            frames::decode(&config, frame, *first, *last)
        },
        Commands::Frame { request } => {
            let config = resolve_config(&cli)?;
            frames::print_request(&config, request)
        },
    }
}
