use clap::Parser;
use log::info;
use server::{Server, ServerConfig};
use std::path::PathBuf;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Path to a TOML config file
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// Server IP address to bind to, overrides the config file
    #[clap(short = 'H', long)]
    host: Option<String>,
    /// Server port to listen on, overrides the config file
    #[clap(short, long)]
    port: Option<u16>,
}

/// Main-method of the application.
/// Loads settings, starts the server and runs it until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let mut server = Server::start(config).await?;
    info!("City server running on {}", server.local_addr());

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down gracefully...");
    server.stop().await;

    Ok(())
}
