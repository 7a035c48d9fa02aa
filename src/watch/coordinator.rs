//! File-watch coordinator.
//!
//! # Responsibilities
//! - Own the project-root watcher and the configuration-file watcher
//! - Turn debounced batches into registry intents
//!
//! # Routing
//! ```text
//! added / removed  → Intent::HandlersChanged
//! any path         → Intent::FilesChanged(paths)
//! config file      → Intent::ConfigChanged
//! ```
//!
//! Editors that save by renaming a temp file over the original report an
//! add, not a change. Added and removed paths are therefore also sent as
//! `FilesChanged`; the actor decides whether they touch a handler.

use std::path::PathBuf;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::watcher::ConfigWatcher;
use crate::watch::debounce::{Batch, Debouncer};
use crate::watch::filter::EventFilter;
use crate::watch::{Intent, WatchError};

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub project_dir: PathBuf,
    pub config_path: Option<PathBuf>,
    pub build_output_dir: PathBuf,
    pub ignore: Vec<String>,
    pub debounce: Duration,
}

/// Keeps watchers alive. Dropping it stops watching.
pub struct WatchHandles {
    _watchers: Vec<RecommendedWatcher>,
    tasks: Vec<JoinHandle<()>>,
}

impl Drop for WatchHandles {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

pub struct WatchCoordinator;

impl WatchCoordinator {
    /// Start all watchers. Must be called from within a tokio runtime.
    pub fn start(options: WatchOptions, intents: mpsc::UnboundedSender<Intent>) -> Result<WatchHandles, WatchError> {
        let mut excluded = vec![options.build_output_dir.clone()];
        excluded.extend(options.config_path.iter().cloned());
        let filter = EventFilter::new(&options.ignore, excluded)?;

        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let mut project_watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for change in filter.changes(&event) {
                        let _ = change_tx.send(change);
                    }
                }
                Err(e) => tracing::error!(error = %e, "Project watch error"),
            },
            Config::default(),
        )?;
        project_watcher.watch(&options.project_dir, RecursiveMode::Recursive)?;

        let project_intents = intents.clone();
        let mut tasks = vec![tokio::spawn(Debouncer::new(options.debounce).run(change_rx, move |batch| {
            for intent in intents_for(batch) {
                let _ = project_intents.send(intent);
            }
        }))];
        let mut watchers = vec![project_watcher];

        tracing::info!(path = %options.project_dir.display(), "Watching project directory");

        if let Some(config_path) = options.config_path {
            let (watcher, task) = ConfigWatcher::new(&config_path, options.debounce).run(intents)?;
            watchers.push(watcher);
            tasks.push(task);
        }

        Ok(WatchHandles {
            _watchers: watchers,
            tasks,
        })
    }
}

/// Map one debounced batch to the intents it triggers, rescans first.
pub fn intents_for(batch: Batch) -> Vec<Intent> {
    let mut intents = Vec::new();
    if !batch.added.is_empty() || !batch.removed.is_empty() {
        intents.push(Intent::HandlersChanged);
    }
    let mut paths = batch.changed;
    paths.extend(batch.added);
    paths.extend(batch.removed);
    if !paths.is_empty() {
        intents.push(Intent::FilesChanged(paths.into_iter().collect()));
    }
    intents
}
