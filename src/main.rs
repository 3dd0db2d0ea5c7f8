// src/main.rs
//! BorderHop backend entry point
use anyhow::Result;
use borderhop::api::server::BorderHopServer;
use borderhop::core::config::AppConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "borderhop")]
#[command(about = "BorderHop cross-chain remittance backend")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, env = "CONFIG_PATH", default_value = "borderhop.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Server {
        /// Port to bind the server to (overrides config and PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the effective configuration with secrets redacted
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging()?;

    let mut config = AppConfig::load(&args.config)?;

    match args.command.unwrap_or(Commands::Server { port: None }) {
        Commands::Config => {
            println!("{:#?}", config);
        }
        Commands::Server { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            info!("Starting BorderHop backend v{}", env!("CARGO_PKG_VERSION"));
            info!(
                environment = %config.circle.environment,
                api_key = if config.circle.api_configured() { "configured" } else { "missing" },
                client_key = if config.circle.client_configured() { "configured" } else { "missing" },
                "Circle CCTP V2"
            );
            let server = BorderHopServer::new(config).await?;
            server.start().await?;
        }
    }

    Ok(())
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=info,h2=info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_max_level(tracing::Level::TRACE)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
