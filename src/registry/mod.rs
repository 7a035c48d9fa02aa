//! Registry composition root.
//!
//! # Data Flow
//! ```text
//! Registry::start
//!     → spawn actor (initial scan + first build, not awaited)
//!     → start watchers (intents queue behind the initial scan)
//!
//! watchers / trigger() ──Intent──▶ actor ──install──▶ RouteSnapshot
//!                                    │                    │
//!                                    ├─events──▶ subscribe()
//!                                    └─status──▶ status(), initialize()
//!
//! match_url_path() reads RouteSnapshot only; it never waits for a build.
//! ```
//!
//! # Design Decisions
//! - All mutable state lives in the actor; the handle only holds channels and the snapshot
//! - Matching reads whichever table is installed (stale-while-revalidate)
//! - `initialize()` waits for the first build only

pub mod actor;
pub mod events;
pub mod status;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::build::{BuildScheduler, Compiler, DeclarationGenerator, ManifestGenerator, ProcessCompiler, RouteSnapshot};
use crate::config::{DevConfig, ProjectConfig};
use crate::declarations::{DeclarationCollector, FsScanner, Scanner};
use crate::error::RegistryError;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::routing::{RouteMatch, RouteTable};
use crate::watch::{Intent, WatchCoordinator, WatchHandles, WatchOptions};

use actor::{resolve, Actor};
pub use events::{EventKind, RegistryEvent};
pub use status::RegistryStatus;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct RegistryOptions {
    pub project_dir: PathBuf,
    /// Project configuration file, watched for changes when `watch` is set.
    pub config_path: Option<PathBuf>,
    pub config: ProjectConfig,
    pub watch: bool,
}

impl RegistryOptions {
    pub fn new(project_dir: impl Into<PathBuf>, config: ProjectConfig) -> Self {
        Self {
            project_dir: project_dir.into(),
            config_path: None,
            config,
            watch: false,
        }
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }
}

/// External services the registry depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub scanner: Arc<dyn Scanner>,
    pub compiler: Arc<dyn Compiler>,
    pub generator: Arc<dyn ManifestGenerator>,
}

impl Collaborators {
    /// Filesystem scanner, subprocess compiler and the declaration generator.
    pub fn from_config(project_dir: &Path, dev: &DevConfig) -> Self {
        Self {
            scanner: Arc::new(FsScanner),
            compiler: Arc::new(ProcessCompiler::new(
                dev.compiler.clone(),
                project_dir,
                Duration::from_secs(dev.compiler_timeout_secs),
            )),
            generator: Arc::new(DeclarationGenerator),
        }
    }
}

/// Handle to a running registry.
pub struct Registry {
    snapshot: RouteSnapshot,
    intents: mpsc::UnboundedSender<Intent>,
    status: watch::Receiver<RegistryStatus>,
    events: broadcast::Sender<RegistryEvent>,
    shutdown: Shutdown,
    watchers: Mutex<Option<WatchHandles>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Registry {
    /// Start the registry. The initial scan runs in the background; await
    /// [`initialize`](Self::initialize) to wait for it.
    pub async fn start(options: RegistryOptions, collaborators: Collaborators) -> Result<Self, RegistryError> {
        let project_dir = tokio::fs::canonicalize(&options.project_dir)
            .await
            .map_err(|source| RegistryError::ProjectDir {
                path: options.project_dir.clone(),
                source,
            })?;
        let config_path = options.config_path.as_deref().map(|p| resolve(&project_dir, p));
        let config = options.config;
        let dev = config.dev.clone();

        let internal_dir = resolve(&project_dir, &dev.internal_dir);
        let user_dirs = dev.functions_dirs.iter().map(|d| resolve(&project_dir, d)).collect();

        let snapshot = RouteSnapshot::default();
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(RegistryStatus::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shutdown = Shutdown::new();

        let actor = Actor {
            collector: DeclarationCollector::new(
                collaborators.scanner,
                internal_dir.clone(),
                user_dirs,
                config.edge_functions,
            ),
            scheduler: BuildScheduler::new(
                collaborators.compiler,
                collaborators.generator,
                dev.compiler_env(),
                dev.feature_flags.clone(),
                snapshot.clone(),
            ),
            snapshot: snapshot.clone(),
            project_dir: project_dir.clone(),
            config_path: config_path.clone(),
            import_map: config.import_map,
            internal_dir,
            dev: dev.clone(),
            events: events.clone(),
            status: status_tx,
            initialized: false,
        };
        let task = tokio::spawn(actor.run(intent_rx, shutdown.subscribe()));

        let watchers = if options.watch {
            let handles = WatchCoordinator::start(
                WatchOptions {
                    project_dir: project_dir.clone(),
                    config_path,
                    build_output_dir: resolve(&project_dir, &dev.build_output_dir),
                    ignore: dev.ignore.clone(),
                    debounce: Duration::from_millis(dev.debounce_ms),
                },
                intent_tx.clone(),
            );
            match handles {
                Ok(handles) => Some(handles),
                Err(e) => {
                    shutdown.trigger();
                    return Err(e.into());
                }
            }
        } else {
            None
        };

        tracing::info!(project_dir = %project_dir.display(), watch = options.watch, "Edge function registry started");

        Ok(Self {
            snapshot,
            intents: intent_tx,
            status: status_rx,
            events,
            shutdown,
            watchers: Mutex::new(watchers),
            task: Mutex::new(Some(task)),
        })
    }

    /// Queue an intent for the actor, as a watcher would.
    pub fn trigger(&self, intent: Intent) -> Result<(), RegistryError> {
        self.intents.send(intent).map_err(|_| RegistryError::Stopped)
    }

    /// Resolves once the initial scan and first build have completed, successfully or not.
    pub async fn initialize(&self) -> Result<(), RegistryError> {
        let mut status = self.status.clone();
        status
            .wait_for(|s| s.initialized)
            .await
            .map(|_| ())
            .map_err(|_| RegistryError::Stopped)
    }

    /// Handlers that should run for a request, from the currently installed table.
    pub fn match_url_path(&self, path: &str, method: &str) -> Result<RouteMatch, RegistryError> {
        let table = self.snapshot.load_full().ok_or(RegistryError::NotReady)?;
        let matched = table.match_path(path, method);
        metrics::record_match(!matched.is_empty());
        Ok(matched)
    }

    /// The installed route table, if any.
    pub fn route_table(&self) -> Option<Arc<RouteTable>> {
        self.snapshot.load_full()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    pub fn status(&self) -> RegistryStatus {
        self.status.borrow().clone()
    }

    /// Wait until the status satisfies `predicate`.
    pub async fn wait_for_status<F>(&self, predicate: F) -> Result<RegistryStatus, RegistryError>
    where
        F: FnMut(&RegistryStatus) -> bool,
    {
        let mut rx = self.status.clone();
        let current = rx.wait_for(predicate).await.map_err(|_| RegistryError::Stopped)?;
        Ok(current.clone())
    }

    /// Stop watchers and the actor. A build in flight runs to completion.
    pub fn shutdown(&self) {
        if let Ok(mut watchers) = self.watchers.lock() {
            watchers.take();
        }
        self.shutdown.trigger();
    }

    /// Wait for the actor task to exit.
    pub async fn stopped(&self) {
        let task = self.task.lock().ok().and_then(|mut task| task.take());
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Registry actor panicked");
            }
        }
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
