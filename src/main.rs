//! CLI entry point for the Atlas thermistor instrument
//!
//! # Usage
//!
//! Read one batch of temperatures (auto-detects the port):
//! ```bash
//! atlas
//! atlas read --digits 1
//! ```
//!
//! Read from a specific port, or print raw resistances:
//! ```bash
//! atlas read --port /dev/ttyACM0 --raw
//! ```
//!
//! Try it without hardware, or list ports:
//! ```bash
//! atlas read --mock
//! atlas ports
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use atlas_daq::config::AtlasConfig;
use atlas_daq::discovery::{self, PortDescription};
use atlas_daq::logging::{self, TracingConfig};
use atlas_daq::mock::{FrameBuilder, MockLink};
use atlas_daq::session::{InstrumentLink, InstrumentSession, SerialSession};

#[derive(Parser)]
#[command(name = "atlas", version)]
#[command(about = "Read temperatures from an Atlas thermistor instrument", long_about = None)]
struct Cli {
    /// Config file (default: config/atlas.toml, skipped if missing)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format: pretty, compact, json
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Request one batch of readings (default)
    Read(ReadArgs),

    /// List available serial ports
    Ports,
}

#[derive(Args, Default)]
struct ReadArgs {
    /// Serial port to open instead of scanning
    #[arg(short, long)]
    port: Option<String>,

    /// Fractional digits in temperatures
    #[arg(short, long)]
    digits: Option<i32>,

    /// Print resistances in ohms instead of temperatures
    #[arg(long)]
    raw: bool,

    /// Talk to the built-in mock instrument
    #[arg(long, conflicts_with = "port")]
    mock: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AtlasConfig::load_required(path),
        None => AtlasConfig::load(),
    }
    .context("Failed to load configuration")?;
    apply_overrides(&mut config, &cli);
    config.validate()?;

    logging::init(TracingConfig::from_app_config(&config.application)?);

    match cli.command.unwrap_or(Commands::Read(ReadArgs::default())) {
        Commands::Read(args) => run_read(&config, args),
        Commands::Ports => list_ports(),
    }
}

/// Command-line values win over file and environment.
fn apply_overrides(config: &mut AtlasConfig, cli: &Cli) {
    if let Some(level) = &cli.log_level {
        config.application.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.application.log_format = format.clone();
    }
    if let Some(Commands::Read(args)) = &cli.command {
        if let Some(digits) = args.digits {
            config.instrument.digits = digits;
        }
    }
}

fn run_read(config: &AtlasConfig, args: ReadArgs) -> Result<()> {
    let digits = config.instrument.digits;

    if args.mock {
        let mut session = InstrumentSession::from_link("mock", MockLink::new(&FrameBuilder::demo()));
        println!("Connected to Atlas device at {}.", session.port_name());
        return print_batch(&mut session, digits, args.raw);
    }

    let session = match args.port.or_else(|| config.instrument.port.clone()) {
        Some(port) => Some(SerialSession::open(&port)?),
        None => discovery::auto_connect()?,
    };
    let Some(mut session) = session else {
        println!("No Atlas device found.");
        return Ok(());
    };

    println!("Connected to Atlas device at {}.", session.port_name());
    print_batch(&mut session, digits, args.raw)
}

fn print_batch<L: InstrumentLink>(
    session: &mut InstrumentSession<L>,
    digits: i32,
    raw: bool,
) -> Result<()> {
    if raw {
        let ohms: Vec<u32> = session
            .read_resistances()
            .context("Failed to read resistances")?
            .into_iter()
            .map(u32::from)
            .collect();
        println!("{ohms:?}");
    } else {
        let readings = session
            .read_celsius(digits)
            .context("Failed to read temperatures")?;
        println!("{}", format_readings(&readings));
    }
    Ok(())
}

fn format_readings(readings: &[Option<f64>]) -> String {
    let items: Vec<String> = readings
        .iter()
        .map(|reading| match reading {
            Some(celsius) => format!("{celsius:?}"),
            None => "None".to_string(),
        })
        .collect();
    format!("[{}]", items.join(", "))
}

fn list_ports() -> Result<()> {
    let ports = discovery::available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found.");
    }
    for port in &ports {
        println!("{}", PortDescription(port));
    }
    Ok(())
}
