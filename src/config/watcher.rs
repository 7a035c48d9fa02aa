//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::watch::debounce::Debouncer;
use crate::watch::filter::classify;
use crate::watch::{Intent, WatchError};

/// A watcher that monitors the configuration file for changes.
///
/// The parent directory is watched so that editors replacing the file
/// atomically are still observed.
pub struct ConfigWatcher {
    path: PathBuf,
    debounce: Duration,
}

impl ConfigWatcher {
    pub fn new(path: &Path, debounce: Duration) -> Self {
        Self {
            path: path.to_path_buf(),
            debounce,
        }
    }

    /// Start watching. Each debounced burst of changes yields one `Intent::ConfigChanged`.
    pub fn run(self, intents: mpsc::UnboundedSender<Intent>) -> Result<(RecommendedWatcher, JoinHandle<()>), WatchError> {
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for change in classify(&event) {
                        if change.path() == path {
                            let _ = change_tx.send(change);
                        }
                    }
                }
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        let task = tokio::spawn(Debouncer::new(self.debounce).run(change_rx, move |_| {
            tracing::info!("Config file change detected, reloading...");
            let _ = intents.send(Intent::ConfigChanged);
        }));

        tracing::info!(path = %self.path.display(), "Config watcher started");
        Ok((watcher, task))
    }
}
