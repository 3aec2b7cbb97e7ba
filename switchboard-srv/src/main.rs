//! switchboard-srv: entry point.
//!
//! ```text
//! switchboard-srv                      Serve with ./switchboard-srv.toml
//! switchboard-srv --config <path>      Load a custom config TOML
//! switchboard-srv --address <addr>     Override the listening endpoint
//! switchboard-srv --gen-config         Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use switchboard_core::Endpoint;
use switchboard_srv::config::ServerConfig;
use switchboard_srv::service::SwitchService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "switchboard-srv", about = "Switchboard control-plane server")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "switchboard-srv.toml")]
    config: PathBuf,

    /// Endpoint to listen on, e.g. `tcp:host=127.0.0.1,port=5000`.
    #[arg(short, long)]
    address: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ServerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let config = ServerConfig::load(&cli.config);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let endpoint: Endpoint = match &cli.address {
        Some(address) => address.parse()?,
        None => config.endpoint()?,
    };

    info!("switchboard-srv v{}", env!("CARGO_PKG_VERSION"));
    info!("compose port: {}", config.media.compose_port);
    info!("encode port: {}", config.media.encode_port);
    info!("audio port: {}", config.media.audio_port);

    let service = SwitchService::start_on(&config, &endpoint).await?;
    info!("listening on {}", service.local_endpoint());

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");
    service.shutdown().await;

    Ok(())
}
