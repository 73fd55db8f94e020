//! Tollgate gateway binary: loads configuration, wires the admission
//! engine behind the Axum chassis, and runs until a shutdown signal.

use clap::Parser;
use tollgate::config::GatewayConfig;
use tollgate::server::Server;
use tracing_subscriber::EnvFilter;

/// Command-line overrides layered on top of environment configuration.
/// Any flag left unset falls through to `GatewayConfig::from_env`.
#[derive(Debug, Parser)]
#[command(name = "tollgate", about = "Token-bucket API gateway")]
struct Cli {
    /// Override GATEWAY_HOST/GATEWAY_PORT, e.g. "0.0.0.0:8000"
    #[arg(long, env = "GATEWAY_BIND")]
    bind: Option<String>,

    /// Override REDIS_URL; omit to run with the in-memory store
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let mut config = GatewayConfig::from_env()?;
    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }
    if let Some(redis_url) = cli.redis_url {
        config.redis_url = Some(redis_url);
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!(bind_address = %config.bind_address, "starting tollgate gateway");

    let server = Server::new(config).await;
    server.run().await?;

    tracing::info!("tollgate gateway shut down cleanly");
    Ok(())
}
