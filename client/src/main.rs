use clap::Parser;
use client::network::Client;
use log::info;
use std::time::Duration;
use tokio::time::interval;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:7777")]
    server: String,

    /// Display name shown to other players
    #[arg(short = 'n', long, default_value = "Player")]
    name: String,

    /// Seconds between mirror summaries
    #[arg(short = 'i', long, default_value = "5")]
    report_interval: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);

    let client = Client::connect(&args.server, &args.name).await?;
    info!("Joined as {} ({})", client.name(), client.player_id());

    let mut report = interval(Duration::from_secs(args.report_interval.max(1)));
    loop {
        tokio::select! {
            _ = report.tick() => {
                if !client.is_connected() {
                    info!("Connection lost");
                    break;
                }
                info!("{}", client.snapshot().await.summary());
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, disconnecting...");
                break;
            }
        }
    }

    client.disconnect().await;
    Ok(())
}
