//! Reload the model catalog when its file changes.

use llamaswitch_core::ModelCatalog;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::session::SessionController;

/// How often the config file's mtime is checked.
pub const CATALOG_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Poll `catalog`'s file every `every` and reload it when it changes.
///
/// A successful reload stops the running model, since its command may
/// have changed. Runs until `cancel` fires.
pub fn watch_catalog(
    catalog: Arc<ModelCatalog>,
    controller: SessionController,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Some(path) = catalog.path().map(|p| p.display().to_string()) else {
            debug!("Catalog has no backing file, not watching");
            return;
        };
        info!(path = %path, "Watching config for changes");

        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            // Stat and parse off the async workers
            let reloaded = {
                let catalog = catalog.clone();
                tokio::task::spawn_blocking(move || {
                    catalog.changed_on_disk().then(|| catalog.reload())
                })
                .await
            };
            match reloaded {
                Ok(None) => {}
                Ok(Some(Ok(count))) => {
                    info!(path = %path, count, "Config changed, reloaded models");
                    controller.shutdown().await;
                }
                Ok(Some(Err(e))) => error!(path = %path, error = %e, "Failed to reload config"),
                Err(e) => error!(path = %path, error = %e, "Config reload task failed"),
            }
        }
        debug!(path = %path, "Config watcher stopped");
    })
}
