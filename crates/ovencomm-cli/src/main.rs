//! OvenComm CLI - command-line front end for oven temperature controllers

mod session;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ovencomm_core::config::OvenConfig;
use ovencomm_core::demo::DemoOven;
use ovencomm_core::protocol::{list_ports, SerialTransport};
use std::path::PathBuf;
use tracing::info;

use crate::session::Session;

/// Oven controller command-line tool
#[derive(Parser, Debug)]
#[command(name = "ovencomm", version, about, long_about = None)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long, env = "OVENCOMM_CONFIG")]
    config: Option<PathBuf>,

    /// Serial port name (e.g. /dev/ttyUSB0, COM3)
    #[arg(short, long, env = "OVENCOMM_PORT")]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Talk to a simulated oven instead of a serial port
    #[arg(long)]
    demo: bool,

    /// Response timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Print every raw response frame with a timestamp
    #[arg(long)]
    raw: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Heater power state
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PowerState {
    On,
    Off,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available serial ports
    ListPorts,

    /// Read the current temperature
    ReadTemp,

    /// Read the temperature set point
    ReadSetTemp,

    /// Write a new temperature set point
    SetTemp {
        /// Set point in °C
        #[arg(allow_negative_numbers = true)]
        celsius: f64,
    },

    /// Read the heater output level
    ReadOutput,

    /// Read the temperature sensor status
    SensorStatus,

    /// Switch the heater power on or off
    Power {
        #[arg(value_enum)]
        state: PowerState,
    },

    /// Read the heater power status
    PowerStatus,

    /// Poll temperature, set point, output and power status
    Monitor {
        /// Time between polls in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Stop after this many polls
        #[arg(long)]
        count: Option<u64>,
    },

    /// Write the effective configuration to a file
    WriteConfig {
        /// Destination file
        path: PathBuf,
    },
}

/// Operation a session performs on an open link
#[derive(Debug, Clone, Copy)]
enum Action {
    ReadTemp,
    ReadSetTemp,
    SetTemp(f64),
    ReadOutput,
    SensorStatus,
    Power(bool),
    PowerStatus,
    Monitor { interval_ms: u64, count: Option<u64> },
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Load the configuration file (if any) and apply command-line overrides
fn effective_config(cli: &Cli) -> Result<OvenConfig> {
    let mut config = match &cli.config {
        Some(path) => OvenConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => OvenConfig::default(),
    };

    if let Some(port) = &cli.port {
        config.port.port_name = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.port.baud_rate = baud;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.response_timeout_ms = timeout_ms;
    }
    if cli.demo && config.port.port_name.is_empty() {
        config.port.port_name = "demo".to_string();
    }
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = effective_config(&cli)?;

    let action = match cli.command {
        Commands::ListPorts => {
            let ports = list_ports();
            if ports.is_empty() {
                println!("No serial ports found");
            }
            for port in ports {
                match (port.vid, port.pid) {
                    (Some(vid), Some(pid)) => println!(
                        "{}  [{:04x}:{:04x}] {}",
                        port.name,
                        vid,
                        pid,
                        port.product.unwrap_or_default()
                    ),
                    _ => println!("{}", port.name),
                }
            }
            return Ok(());
        }
        Commands::WriteConfig { ref path } => {
            config
                .save(path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("configuration written to {}", path.display());
            return Ok(());
        }
        Commands::ReadTemp => Action::ReadTemp,
        Commands::ReadSetTemp => Action::ReadSetTemp,
        Commands::SetTemp { celsius } => Action::SetTemp(celsius),
        Commands::ReadOutput => Action::ReadOutput,
        Commands::SensorStatus => Action::SensorStatus,
        Commands::Power { state } => Action::Power(state == PowerState::On),
        Commands::PowerStatus => Action::PowerStatus,
        Commands::Monitor { interval_ms, count } => Action::Monitor { interval_ms, count },
    };

    if cli.demo {
        info!("using simulated oven");
        Session::open(DemoOven::new(), &config, cli.raw)?
            .run(action)
            .await
    } else {
        if config.port.port_name.is_empty() {
            bail!("no serial port given; use --port, a config file or --demo");
        }
        Session::open(SerialTransport::new(), &config, cli.raw)?
            .run(action)
            .await
    }
}
