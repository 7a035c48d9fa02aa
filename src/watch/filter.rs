//! Event classification and ignore rules.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};

use crate::watch::WatchError;

/// A filesystem change, reduced to what the registry cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsChange {
    Added(PathBuf),
    Changed(PathBuf),
    Removed(PathBuf),
}

impl FsChange {
    pub fn path(&self) -> &Path {
        match self {
            FsChange::Added(p) | FsChange::Changed(p) | FsChange::Removed(p) => p,
        }
    }
}

/// Reduce a notify event to add/change/remove changes.
///
/// Renames become a removal of the old path and an addition of the new one.
/// Access and metadata-only events are dropped.
pub fn classify(event: &Event) -> Vec<FsChange> {
    let paths = event.paths.iter().cloned();
    match event.kind {
        EventKind::Create(_) => paths.map(FsChange::Added).collect(),
        EventKind::Remove(_) => paths.map(FsChange::Removed).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => paths.map(FsChange::Removed).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => paths.map(FsChange::Added).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut changes = Vec::new();
            if let Some(from) = event.paths.first() {
                changes.push(FsChange::Removed(from.clone()));
            }
            if let Some(to) = event.paths.get(1) {
                changes.push(FsChange::Added(to.clone()));
            }
            changes
        }
        // Backend could not tell which side of the rename this is.
        EventKind::Modify(ModifyKind::Name(_)) => paths
            .map(|p| if p.exists() { FsChange::Added(p) } else { FsChange::Removed(p) })
            .collect(),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(_) => paths.map(FsChange::Changed).collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

/// Decides which paths the project watcher ignores.
#[derive(Debug, Clone)]
pub struct EventFilter {
    globs: GlobSet,
    excluded: Vec<PathBuf>,
}

impl EventFilter {
    /// `patterns` are globs; `excluded` are directories or files ignored with everything beneath them.
    pub fn new<S: AsRef<str>>(patterns: &[S], excluded: Vec<PathBuf>) -> Result<Self, WatchError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern.as_ref())?);
        }
        Ok(Self {
            globs: builder.build()?,
            excluded,
        })
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        self.excluded.iter().any(|dir| path.starts_with(dir)) || self.globs.is_match(path)
    }

    /// Classify `event` and drop ignored paths.
    pub fn changes(&self, event: &Event) -> Vec<FsChange> {
        classify(event)
            .into_iter()
            .filter(|change| !self.is_ignored(change.path()))
            .collect()
    }
}
