//! Trailing-window debouncer for filesystem changes.
//!
//! A batch is emitted once no new change has arrived for `window`, or once
//! `max_wait` has passed since the first change of the batch, whichever is
//! first. Paths are deduplicated per change type.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use crate::watch::filter::FsChange;

/// Changes coalesced over one debounce window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    pub added: BTreeSet<PathBuf>,
    pub changed: BTreeSet<PathBuf>,
    pub removed: BTreeSet<PathBuf>,
}

impl Batch {
    pub fn push(&mut self, change: FsChange) {
        match change {
            FsChange::Added(p) => {
                self.added.insert(p);
            }
            FsChange::Changed(p) => {
                self.changed.insert(p);
            }
            FsChange::Removed(p) => {
                self.removed.insert(p);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    window: Duration,
    max_wait: Duration,
}

impl Debouncer {
    /// Debouncer whose batches are capped at ten windows.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            max_wait: window * 10,
        }
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait.max(self.window);
        self
    }

    /// Consume changes until the sender side closes, emitting one batch per burst.
    ///
    /// A pending batch is flushed when the channel closes.
    pub async fn run<F>(self, mut rx: mpsc::UnboundedReceiver<FsChange>, mut emit: F)
    where
        F: FnMut(Batch),
    {
        while let Some(first) = rx.recv().await {
            let mut batch = Batch::default();
            batch.push(first);

            let deadline = Instant::now() + self.max_wait;
            let mut quiet_at = Instant::now() + self.window;
            let mut closed = false;

            loop {
                tokio::select! {
                    next = rx.recv() => match next {
                        Some(change) => {
                            batch.push(change);
                            quiet_at = Instant::now() + self.window;
                        }
                        None => {
                            closed = true;
                            break;
                        }
                    },
                    _ = sleep_until(quiet_at.min(deadline)) => break,
                }
            }

            tracing::trace!(
                added = batch.added.len(),
                changed = batch.changed.len(),
                removed = batch.removed.len(),
                "Debounced filesystem changes"
            );
            emit(batch);

            if closed {
                break;
            }
        }
    }
}
