//! earshot-relay: standalone position relay hub.
//!
//! Accepts WebSocket connections on one port and rebroadcasts every
//! participant's position to all other participants. Runs no local session.

use std::time::Duration;

use clap::Parser;
use earshot_relay::{HubConfig, RelayHub};

#[derive(Parser)]
#[command(name = "earshot-relay", about = "Position relay hub for earshot proximity voice")]
struct Args {
    /// Address to bind.
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = 8970)]
    port: u16,

    /// Seconds between liveness pings.
    #[arg(long, default_value_t = 15)]
    ping_interval: u64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "earshot_relay=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = HubConfig {
        bind_address: format!("{}:{}", args.bind, args.port),
        ping_interval: Duration::from_secs(args.ping_interval.max(1)),
        ..HubConfig::default()
    };

    let hub = match RelayHub::start(config).await {
        Ok(hub) => hub,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start relay hub");
            std::process::exit(1);
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
    }
    hub.shutdown().await;
}
