//! Periodic observation reporter.
//!
//! Polls the frequency ledger at a fixed interval and logs the most
//! active countries with their resolved names. This is the daemon's
//! observer surface: it only reads snapshots, never mutates the ledger.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use packetmap_core::config::ReporterConfig;
use packetmap_geo::CountryDirectory;
use packetmap_ingest::FrequencyLedger;

/// Render the top of a ledger snapshot as a compact `name=count` list.
///
/// Entries whose country id has no name in the directory are rendered
/// with the raw id. The snapshot is already sorted by count.
pub fn format_top(
    ledger: &FrequencyLedger,
    directory: &CountryDirectory,
    top: usize,
) -> String {
    let snapshot = ledger.snapshot();
    snapshot
        .iter()
        .take(top)
        .map(|entry| {
            let name = directory
                .resolve_name(entry.country)
                .map_or_else(|| entry.country.to_string(), str::to_owned);
            format!("{}={}", name, entry.count)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Spawn a background task that periodically logs the top active countries.
///
/// The task exits when the shutdown broadcast fires.
pub fn spawn_reporter(
    config: &ReporterConfig,
    ledger: Arc<FrequencyLedger>,
    directory: Arc<CountryDirectory>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    let interval_secs = config.interval_secs.max(1);
    let top = config.top;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let tracked = ledger.len();
                    if tracked == 0 {
                        tracing::debug!("no activity observed yet");
                        continue;
                    }
                    let summary = format_top(&ledger, &directory, top);
                    tracing::info!(tracked, top = %summary, "activity snapshot");
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("reporter shutting down");
                    break;
                }
            }
        }
    })
}
