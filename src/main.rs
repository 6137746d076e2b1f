use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use iec62056_rs::{
    init_logger, log_info, to_json, ClientConfig, Iec6205621Client, MeterManager,
    SerialTransport, TcpTransport, Transport,
};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "iec62056-cli")]
#[command(about = "CLI tool for IEC 62056-21 mode C meter readout")]
struct Cli {
    /// Serial port of the optical probe, e.g. /dev/ttyUSB0
    #[arg(long, conflicts_with = "tcp")]
    port: Option<String>,
    /// TCP gateway address, host:port
    #[arg(long)]
    tcp: Option<String>,
    /// JSON client configuration
    #[arg(short, long)]
    config: Option<String>,
    #[arg(short, long)]
    device_address: Option<String>,
    #[arg(long)]
    battery_powered: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Standard readout of all published registers
    Readout,
    /// Load profile between two dates (YYYY-MM-DD, inclusive)
    Profile { start: NaiveDate, end: NaiveDate },
    /// Read one register in programming mode
    Read {
        address: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Write one register in programming mode
    Write {
        address: String,
        value: String,
        #[arg(long)]
        password: Option<String>,
    },
}

async fn run<T: Transport>(transport: T, config: ClientConfig, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Readout => {
            let manager = MeterManager::new(transport, config)?;
            let data = manager.get_standard_data().await?;
            println!("{}", to_json(&data)?);
        }
        Commands::Profile { start, end } => {
            let manager = MeterManager::new(transport, config)?;
            let profile = manager.get_profile(start, end).await?;
            println!("{}", to_json(&profile)?);
        }
        Commands::Read { address, password } => {
            let mut client = Iec6205621Client::builder(transport).config(config).build()?;
            client.connect().await?;
            client.access_programming_mode().await?;
            client.authenticate(password.as_deref()).await?;
            let result = client.read_single_value(&address, None).await;
            client.end_session().await?;
            println!("{}", to_json(&result?)?);
        }
        Commands::Write {
            address,
            value,
            password,
        } => {
            let mut client = Iec6205621Client::builder(transport).config(config).build()?;
            client.connect().await?;
            client.access_programming_mode().await?;
            client.authenticate(password.as_deref()).await?;
            let result = client.write_single_value(&address, &value).await;
            client.end_session().await?;
            result?;
            log_info(&format!("Wrote {value} to {address}"));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path).with_context(|| format!("loading {path}"))?,
        None => ClientConfig::default(),
    };
    if let Some(address) = cli.device_address {
        config.device_address = address;
    }
    config.battery_powered |= cli.battery_powered;

    match (cli.port, cli.tcp) {
        (Some(port), None) => run(SerialTransport::new(port), config, cli.command).await,
        (None, Some(address)) => {
            run(TcpTransport::new(address, Duration::from_secs(5)), config, cli.command).await
        }
        _ => bail!("exactly one of --port or --tcp is required"),
    }
}
