//! packetmap-daemon entrypoint.
//!
//! Parses CLI arguments, loads and validates configuration, initializes
//! logging, then hands control to the [`orchestrator::Orchestrator`].

use anyhow::Result;
use clap::Parser;

use packetmap_core::config::PacketmapConfig;
use packetmap_daemon::cli::DaemonCli;
use packetmap_daemon::logging;
use packetmap_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = PacketmapConfig::load(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", cli.config.display(), e))?;

    // CLI flags win over config file and environment
    if let Some(level) = &cli.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.general.log_format = format.clone();
    }
    if let Some(pid_file) = &cli.pid_file {
        config.general.pid_file = pid_file.clone();
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "packetmap-daemon starting"
    );

    let mut orchestrator = Orchestrator::build_from_config(config).await?;
    orchestrator.run().await?;

    tracing::info!("packetmap-daemon shut down");
    Ok(())
}
