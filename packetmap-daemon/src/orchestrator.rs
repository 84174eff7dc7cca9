//! Module orchestration -- assembly, wiring, and lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `packetmap-daemon`.
//! It loads configuration and reference datasets, wires the capture path
//! (source -> classifier -> ledger), manages startup/shutdown ordering,
//! and runs the main signal loop.
//!
//! # Startup Order
//!
//! 1. Ingestion controller (produces observations)
//! 2. Decay scheduler (ages observations)
//! 3. Reporter task (reads snapshots)
//!
//! # Shutdown Order (reverse)
//!
//! 1. Reporter task (stop reading)
//! 2. Decay scheduler
//! 3. Ingestion controller (capture thread joined last, it holds the
//!    blocking read)

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::broadcast;

use packetmap_core::config::PacketmapConfig;
use packetmap_core::pipeline::{HealthStatus, Pipeline};
use packetmap_geo::{AddressBlockIndex, CountryDirectory, ReferenceData};
use packetmap_ingest::{
    DecayScheduler, DecaySettings, FrequencyLedger, IngestionController, PacketClassifier,
    PnetOpener,
};

use crate::health::{DaemonHealth, ModuleHealth, aggregate_status};
use crate::metrics_server;
use crate::reporter;

/// The main daemon orchestrator.
///
/// Owns every module and the shared ledger. Reference data is loaded
/// once during build; a failure there aborts startup before any capture
/// begins.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: PacketmapConfig,
    /// Shared per-country activity ledger.
    ledger: Arc<FrequencyLedger>,
    /// Country id -> name directory (read-only after load).
    directory: Arc<CountryDirectory>,
    /// Capture lifecycle (absent when `[capture] enabled = false`).
    ingestion: Option<IngestionController>,
    /// Periodic count decay.
    decay: DecayScheduler,
    /// Shutdown broadcast sender (signals all background tasks).
    shutdown_tx: broadcast::Sender<()>,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator").finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Load configuration from disk and build the orchestrator.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = PacketmapConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    ///
    /// # Errors
    ///
    /// - Configuration validation fails
    /// - Reference datasets cannot be loaded (fatal: the daemon must not
    ///   capture without a classification table)
    pub async fn build_from_config(config: PacketmapConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        // Install metrics recorder before any module records metrics
        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
        }

        tracing::info!(
            countries_csv = config.geo.countries_csv.as_str(),
            blocks_csv = config.geo.blocks_csv.as_str(),
            "loading reference datasets"
        );
        let data = ReferenceData::load(&config.geo)
            .map_err(|e| anyhow::anyhow!("failed to load reference data: {}", e))?;

        let index = Arc::new(AddressBlockIndex::from_blocks(&data.blocks));
        let directory = Arc::new(CountryDirectory::from_countries(&data.countries));
        let ledger = Arc::new(FrequencyLedger::new());
        let classifier = Arc::new(PacketClassifier::new(
            Arc::clone(&index),
            Arc::clone(&directory),
            Arc::clone(&ledger),
        ));

        let ingestion = if config.capture.enabled {
            let opener = Arc::new(PnetOpener::new(
                config.capture.interface.clone(),
                config.capture.promiscuous,
                Duration::from_millis(config.capture.read_timeout_ms),
            ));
            Some(IngestionController::new(
                opener,
                classifier,
                Duration::from_millis(config.capture.stop_timeout_ms),
            ))
        } else {
            tracing::warn!("capture disabled, daemon will only serve an empty ledger");
            None
        };

        let settings = Arc::new(DecaySettings::new(
            config.decay.enabled,
            config.decay.interval_secs,
            config.decay.floor,
        ));
        let decay = DecayScheduler::new(Arc::clone(&ledger), settings);

        let (shutdown_tx, _) = broadcast::channel(16);

        if config.metrics.enabled {
            record_daemon_metrics();
        }

        tracing::info!(
            blocks = index.len(),
            countries = directory.len(),
            capture = config.capture.enabled,
            "orchestrator initialized"
        );

        Ok(Self {
            config,
            ledger,
            directory,
            ingestion,
            decay,
            shutdown_tx,
            start_time: Instant::now(),
        })
    }

    /// Start all modules and block until a shutdown signal arrives.
    ///
    /// # Shutdown Triggers
    ///
    /// - `SIGTERM` (from systemd, Docker, or `kill`)
    /// - `SIGINT` (Ctrl+C)
    pub async fn run(&mut self) -> Result<()> {
        // Write PID file if configured
        if !self.config.general.pid_file.is_empty() {
            let path = Path::new(&self.config.general.pid_file);
            write_pid_file(path)?;
        }

        if let Err(e) = self.start_modules().await {
            // Rollback: stop whatever came up before the failure
            tracing::warn!("startup failed, rolling back already-started modules");
            if let Err(stop_err) = self.stop_modules().await {
                tracing::error!(
                    startup_error = %e,
                    rollback_error = %stop_err,
                    "rollback also failed during startup failure cleanup"
                );
            }
            if !self.config.general.pid_file.is_empty() {
                remove_pid_file(Path::new(&self.config.general.pid_file));
            }
            return Err(e);
        }

        // Spawn the observation reporter
        let mut reporter_task = if self.config.reporter.enabled {
            let shutdown_rx = self.shutdown_tx.subscribe();
            Some(reporter::spawn_reporter(
                &self.config.reporter,
                Arc::clone(&self.ledger),
                Arc::clone(&self.directory),
                shutdown_rx,
            ))
        } else {
            None
        };

        // Spawn uptime updater task
        let mut uptime_task = if self.config.metrics.enabled {
            let shutdown_rx = self.shutdown_tx.subscribe();
            Some(spawn_uptime_updater(self.start_time, shutdown_rx))
        } else {
            None
        };

        tracing::info!("entering main signal loop");
        let signal = wait_for_shutdown_signal().await?;
        tracing::info!(signal = signal, "shutdown signal received");

        // Stop background tasks first, then the modules
        let _ = self.shutdown_tx.send(());
        if let Some(task) = reporter_task.take() {
            let _ = task.await;
        }
        if let Some(task) = uptime_task.take() {
            let _ = task.await;
        }

        let result = self.stop_modules().await;

        if !self.config.general.pid_file.is_empty() {
            remove_pid_file(Path::new(&self.config.general.pid_file));
        }

        result
    }

    async fn start_modules(&mut self) -> Result<()> {
        if let Some(ingestion) = &mut self.ingestion {
            tracing::info!("starting ingestion controller");
            ingestion
                .start()
                .await
                .map_err(|e| anyhow::anyhow!("failed to start ingestion: {}", e))?;
        }

        tracing::info!("starting decay scheduler");
        self.decay
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start decay scheduler: {}", e))?;
        Ok(())
    }

    async fn stop_modules(&mut self) -> Result<()> {
        let mut first_error = None;

        tracing::info!("stopping decay scheduler");
        if let Err(e) = self.decay.stop().await {
            tracing::error!(error = %e, "failed to stop decay scheduler");
            first_error.get_or_insert_with(|| anyhow::anyhow!("decay stop failed: {}", e));
        }

        if let Some(ingestion) = &mut self.ingestion {
            tracing::info!("stopping ingestion controller");
            if let Err(e) = ingestion.stop().await {
                tracing::error!(error = %e, "failed to stop ingestion");
                first_error.get_or_insert_with(|| anyhow::anyhow!("ingestion stop failed: {}", e));
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Get the current aggregated health status.
    pub async fn health(&self) -> DaemonHealth {
        let mut modules = Vec::new();

        match &self.ingestion {
            Some(ingestion) => modules.push(ModuleHealth {
                name: "ingestion".to_owned(),
                enabled: true,
                status: ingestion.health_check().await,
            }),
            None => modules.push(ModuleHealth {
                name: "ingestion".to_owned(),
                enabled: false,
                status: HealthStatus::Healthy,
            }),
        }

        modules.push(ModuleHealth {
            name: "decay".to_owned(),
            enabled: true,
            status: self.decay.health_check().await,
        });

        let overall_status = aggregate_status(&modules);
        let uptime_secs = self.start_time.elapsed().as_secs();

        DaemonHealth {
            status: overall_status,
            uptime_secs,
            modules,
        }
    }

    /// Live control surface of the decay scheduler.
    pub fn decay_settings(&self) -> Arc<DecaySettings> {
        self.decay.settings()
    }

    /// Get a reference to the shared ledger.
    pub fn ledger(&self) -> &Arc<FrequencyLedger> {
        &self.ledger
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &PacketmapConfig {
        &self.config
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Write the current process PID to a file.
///
/// Used to prevent duplicate daemon instances.
///
/// # Security
///
/// - Uses `create_new(true)` to atomically create the file
/// - Verifies the created file is a regular file
/// - Creates the parent directory with restrictive permissions (0o700)
fn write_pid_file(path: &Path) -> Result<()> {
    use std::fs::{self, OpenOptions};
    use std::io::{ErrorKind, Write};

    if let Some(parent) = path.parent() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            let mut builder = fs::DirBuilder::new();
            builder.mode(0o700).recursive(true);
            builder.create(parent)?;
        }
        #[cfg(not(unix))]
        {
            fs::create_dir_all(parent)?;
        }
    }

    let pid = std::process::id();

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let existing_pid = fs::read_to_string(path).unwrap_or_else(|_| "unknown".to_string());
            return Err(anyhow::anyhow!(
                "PID file {} already exists with PID: {}. Is another instance running?",
                path.display(),
                existing_pid.trim()
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let metadata = file.metadata()?;
    if !metadata.is_file() {
        let _ = fs::remove_file(path);
        return Err(anyhow::anyhow!(
            "PID file {} is not a regular file (possible symlink attack)",
            path.display()
        ));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        file.set_permissions(permissions)?;
    }

    writeln!(file, "{}", pid)?;

    tracing::info!(pid = pid, path = %path.display(), "PID file written");
    Ok(())
}

/// Remove the PID file on daemon shutdown.
///
/// Logs a warning but does not fail if the file cannot be removed.
fn remove_pid_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(
            path = %path.display(),
            error = %e,
            "failed to remove PID file"
        );
    } else {
        tracing::info!(path = %path.display(), "PID file removed");
    }
}

/// Record daemon-level metrics (build info).
fn record_daemon_metrics() {
    use packetmap_core::metrics as m;

    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "daemon metrics recorded");
}

/// Spawn a background task that periodically updates the uptime metric.
///
/// Updates every 10 seconds to keep the metric fresh for Prometheus scrapes.
fn spawn_uptime_updater(
    start_time: Instant,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    use packetmap_core::metrics as m;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(10));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let uptime_secs = start_time.elapsed().as_secs();
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(uptime_secs as f64);
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}
