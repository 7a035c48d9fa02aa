//! File-watch subsystem.
//!
//! # Data Flow
//! ```text
//! notify watcher callback (project root, recursive)
//!     → filter.rs (classify add/change/remove, drop ignored paths)
//!     → debounce.rs (coalesce bursts into one batch per event type)
//!     → coordinator.rs (batch → Intent)
//!     → registry actor
//!
//! config::watcher (parent of the config file, non-recursive)
//!     → debounce.rs
//!     → Intent::ConfigChanged
//! ```
//!
//! # Design Decisions
//! - Watchers only produce intents; all decisions happen in the registry actor
//! - Build output directory and the config file are excluded from the project watcher
//! - Dropping the handles stops every watcher and task

pub mod coordinator;
pub mod debounce;
pub mod filter;

use std::path::PathBuf;

use thiserror::Error;

pub use coordinator::{intents_for, WatchCoordinator, WatchHandles, WatchOptions};
pub use debounce::{Batch, Debouncer};
pub use filter::{classify, EventFilter, FsChange};

/// What a filesystem event asks the registry to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Files were added or removed; rescan for handlers.
    HandlersChanged,
    /// Files changed, including files replaced, added or removed.
    FilesChanged(Vec<PathBuf>),
    /// The project configuration file changed.
    ConfigChanged,
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("file watcher error: {0}")]
    Notify(#[from] notify::Error),

    #[error("invalid ignore pattern: {0}")]
    Glob(#[from] globset::Error),
}
