use clap::{ArgAction, Parser};
use mudlink::{ClientConfig, ClientResult, MudSession, logging};

use std::path::PathBuf;
use telnet_gmcp::Connection;
use tracing::info;

/// Connect to a MUD, speaking GMCP behind the scenes
#[derive(Debug, Parser)]
#[command(name = "mudlink", version, about)]
struct Cli {
    /// Server to connect to (host:port), overrides the config file
    #[arg(long)]
    addr: Option<String>,

    /// Path to the configuration file
    #[arg(long, default_value = "mudlink.conf")]
    config: PathBuf,

    /// Echo received GMCP messages
    #[arg(long)]
    show_gmcp: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// More log output (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ClientResult<()> {
    let cli = Cli::parse();

    let mut config = ClientConfig::load_from_file(&cli.config)?;
    if let Some(addr) = cli.addr {
        config.server.address = addr;
    }
    if cli.show_gmcp {
        config.logging.show_gmcp = true;
    }

    if cli.print_config {
        print!("{}", config.to_config_file_format());
        return Ok(());
    }

    logging::init(&config.logging.level, cli.verbose)?;

    println!("Connecting to {} ...", config.server.address);
    let mut connection = Connection::with_options(config.to_connection_options());
    connection.dial(&config.server.network, &config.server.address)?;
    info!(address = %config.server.address, "connected");
    println!("Connected. Type /quit to leave.\r");

    MudSession::new(config, connection).run()
}
