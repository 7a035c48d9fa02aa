//! The task that owns all mutable registry state.
//!
//! # Responsibilities
//! - Run the initial scan and first build
//! - Coalesce queued intents into one pass (at most one build running, one queued)
//! - Decide whether a pass needs a rescan, a rebuild, or nothing
//! - Publish status and developer-facing events
//!
//! # Design Decisions
//! - Builds run in trigger order; a later trigger never loses to an earlier one
//! - Every rebuild is whole-registry; changed paths only shape the messages

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tokio::sync::{broadcast, mpsc, watch};

use crate::build::{BuildInput, BuildOutcome, BuildScheduler, BuildState, RouteSnapshot};
use crate::config::load_config;
use crate::config::DevConfig;
use crate::declarations::deploy::DEPLOY_MANIFEST_FILE;
use crate::declarations::{DeclarationCollector, HandlerSource};
use crate::error::{BuildError, SharedBuildError};
use crate::registry::events::{EventKind, RegistryEvent};
use crate::registry::status::RegistryStatus;
use crate::watch::Intent;

/// Intents merged between two passes.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct PendingWork {
    pub config_changed: bool,
    pub rescan: bool,
    pub changed: BTreeSet<PathBuf>,
}

impl PendingWork {
    pub fn push(&mut self, intent: Intent) {
        match intent {
            Intent::HandlersChanged => self.rescan = true,
            Intent::FilesChanged(paths) => self.changed.extend(paths),
            Intent::ConfigChanged => self.config_changed = true,
        }
    }
}

pub(crate) struct Actor {
    pub collector: DeclarationCollector,
    pub scheduler: BuildScheduler,
    pub snapshot: RouteSnapshot,
    pub project_dir: PathBuf,
    pub config_path: Option<PathBuf>,
    pub import_map: Option<PathBuf>,
    pub internal_dir: PathBuf,
    pub dev: DevConfig,
    pub events: broadcast::Sender<RegistryEvent>,
    pub status: watch::Sender<RegistryStatus>,
    pub initialized: bool,
}

impl Actor {
    pub async fn run(mut self, mut intents: mpsc::UnboundedReceiver<Intent>, mut shutdown: broadcast::Receiver<()>) {
        tokio::select! {
            _ = self.initial_scan() => {}
            _ = shutdown.recv() => return,
        }

        loop {
            let intent = tokio::select! {
                intent = intents.recv() => match intent {
                    Some(intent) => intent,
                    None => break,
                },
                _ = shutdown.recv() => break,
            };

            let mut work = PendingWork::default();
            work.push(intent);
            while let Ok(next) = intents.try_recv() {
                work.push(next);
            }
            self.process(work).await;
        }

        tracing::debug!("Registry actor stopped");
    }

    async fn initial_scan(&mut self) {
        match self.collector.collect().await {
            Ok(collection) => match self.build().await {
                Ok(outcome) => {
                    for handler in collection.handlers.all() {
                        self.emit_for(EventKind::Loaded, handler, &outcome);
                    }
                }
                Err(e) => self.emit(RegistryEvent::build_error(&e)),
            },
            Err(e) => {
                let e = self.scheduler.record_error(e.into());
                self.emit(RegistryEvent::build_error(&e));
            }
        }

        // Matching must work after initialize(), even if nothing was ever built.
        self.scheduler.ensure_installed();
        self.initialized = true;
        self.publish();
    }

    pub(crate) async fn process(&mut self, work: PendingWork) {
        let declarations_changed = work.config_changed && self.reload_config();

        let mut added = Vec::new();
        let mut removed = Vec::new();
        let mut rescan_build = declarations_changed;

        if work.rescan || work.config_changed || self.needs_rescan(&work.changed) {
            match self.collector.collect().await {
                Ok(collection) => {
                    rescan_build |= collection.has_changes();
                    added = collection.added;
                    removed = collection.removed;
                }
                Err(e) => {
                    let e = self.scheduler.record_error(e.into());
                    self.publish();
                    self.emit(RegistryEvent::build_error(&e));
                    return;
                }
            }
        }

        let affected = self.affected_handlers(&work.changed);
        let file_build =
            !work.changed.is_empty() && (!affected.is_empty() || self.scheduler.build_error().is_some());

        if !rescan_build && !file_build {
            if !work.changed.is_empty() {
                tracing::trace!(paths = ?work.changed, "Changed files do not affect any edge function");
            }
            return;
        }

        if file_build {
            self.emit(RegistryEvent::new(EventKind::Reloading));
        }

        let outcome = match self.build().await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.emit(RegistryEvent::build_error(&e));
                return;
            }
        };

        for handler in &removed {
            self.emit_for(EventKind::Removed, handler, &outcome);
        }
        for handler in &added {
            self.emit_for(EventKind::Loaded, handler, &outcome);
        }
        let mut reported = !removed.is_empty() || !added.is_empty();
        for function in affected {
            if added.iter().chain(&removed).any(|h| h.name == function) {
                continue;
            }
            let display_name = self.collector.display_name(&function).to_string();
            self.emit(RegistryEvent::for_function(
                EventKind::Reloaded,
                &function,
                &display_name,
                outcome.warnings_for(&function),
            ));
            reported = true;
        }
        if !reported {
            self.emit(RegistryEvent::new(EventKind::Reloaded));
        }
    }

    async fn build(&mut self) -> Result<BuildOutcome, SharedBuildError> {
        self.publish_state(BuildState::Building);

        let declarations = self.collector.declaration_sources();
        let import_map_paths = self.import_map_paths();
        let result = self
            .scheduler
            .build(BuildInput {
                handlers: self.collector.handlers(),
                declarations: &declarations,
                import_map_paths: &import_map_paths,
                path_index: self.collector.path_index(),
            })
            .await;

        self.publish();
        result
    }

    /// Re-read static declarations. Returns true if anything that affects routing changed.
    fn reload_config(&mut self) -> bool {
        let Some(path) = &self.config_path else {
            return false;
        };

        let config = match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to reload config. Keeping current configuration.");
                return false;
            }
        };

        if config.dev != self.dev {
            tracing::warn!("Changes to [dev] settings take effect after a restart");
        }

        let import_map_changed = config.import_map != self.import_map;
        self.import_map = config.import_map;
        let declarations_changed = self.collector.set_static_declarations(config.edge_functions);

        tracing::info!(
            declarations_changed,
            import_map_changed,
            "Reloaded edge function configuration"
        );
        declarations_changed || import_map_changed
    }

    /// A sticky discovery error or a touched deploy manifest forces a rescan.
    fn needs_rescan(&self, changed: &BTreeSet<PathBuf>) -> bool {
        let discovery_failed = self
            .scheduler
            .build_error()
            .is_some_and(|e| matches!(**e, BuildError::Discovery(_)));
        let manifest = self.internal_dir.join(DEPLOY_MANIFEST_FILE);
        discovery_failed || changed.contains(&manifest)
    }

    /// Handlers whose entry file or transitive dependencies include a changed path.
    fn affected_handlers(&self, changed: &BTreeSet<PathBuf>) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        };
        for path in changed {
            if let Some(name) = self.collector.handler_for_path(path) {
                push(name);
            }
            for name in self.scheduler.dependency_index().handlers_for(path) {
                push(name);
            }
        }
        names
    }

    fn import_map_paths(&self) -> Vec<PathBuf> {
        let project = self.import_map.as_ref().map(|p| self.project_dir.join(p));
        let deploy = self.collector.deploy_import_map().map(Path::to_path_buf);
        project.into_iter().chain(deploy).collect()
    }

    fn emit_for(&self, kind: EventKind, handler: &HandlerSource, outcome: &BuildOutcome) {
        let display_name = self.collector.display_name(&handler.name);
        self.emit(RegistryEvent::for_function(
            kind,
            &handler.name,
            display_name,
            outcome.warnings_for(&handler.name),
        ));
    }

    fn emit(&self, event: RegistryEvent) {
        event.log();
        // No subscribers is fine; events are informational.
        let _ = self.events.send(event);
    }

    fn publish_state(&self, state: BuildState) {
        self.status.send_modify(|status| status.state = state);
    }

    fn publish(&self) {
        let routes = self.snapshot.load_full().map_or(0, |table| table.len());
        let status = RegistryStatus {
            initialized: self.initialized,
            state: self.scheduler.state(),
            functions: self.collector.handlers().all().map(|h| h.name.clone()).collect(),
            routes,
            generation: self.scheduler.generation(),
            build_error: self.scheduler.build_error().map(|e| e.to_string()),
        };
        self.status.send_replace(status);
    }
}

/// Resolve `path` against `base` unless it is already absolute.
pub(crate) fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
