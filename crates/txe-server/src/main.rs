use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};

use txe_server::{ExchangeServer, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "txe-server", version, about = "Content transaction exchange server")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "txe.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = if args.config.is_file() {
        ServerConfig::load(&args.config)?
    } else {
        warn!(path = %args.config.display(), "config file not found, using defaults");
        ServerConfig::default()
    };
    info!(addr = %config.bind_addr, "starting transaction exchange");

    let server = ExchangeServer::new(config);
    server.startup_sweep();
    server.serve().await?;
    Ok(())
}
