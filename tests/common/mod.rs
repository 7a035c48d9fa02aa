//! Shared utilities for registry integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::broadcast;

use edge_registry::build::{CompileOptions, CompileOutput, Compiler, DeclarationGenerator};
use edge_registry::config::ProjectConfig;
use edge_registry::declarations::{FsScanner, FunctionConfig, HandlerSource};
use edge_registry::graph::{Dependency, Module, ModuleGraph};
use edge_registry::registry::{EventKind, RegistryEvent, RegistryStatus};
use edge_registry::{BuildError, Collaborators, Registry, RegistryOptions};

pub const WAIT: Duration = Duration::from_secs(5);

/// Compiler fake with scripted per-handler config, imports and failures.
#[derive(Default)]
pub struct ScriptedCompiler {
    configs: Mutex<HashMap<String, FunctionConfig>>,
    imports: Mutex<BTreeMap<PathBuf, Vec<PathBuf>>>,
    fail: AtomicBool,
    no_graph: AtomicBool,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    last_env: Mutex<BTreeMap<String, String>>,
    last_import_maps: Mutex<Vec<PathBuf>>,
}

impl ScriptedCompiler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_config(&self, function: &str, config: FunctionConfig) {
        self.configs.lock().unwrap().insert(function.to_string(), config);
    }

    /// Record that `file` imports `deps`.
    pub fn set_imports(&self, file: &Path, deps: &[&Path]) {
        self.imports
            .lock()
            .unwrap()
            .insert(file.to_path_buf(), deps.iter().map(|p| p.to_path_buf()).collect());
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_no_graph(&self, no_graph: bool) {
        self.no_graph.store(no_graph, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn last_env(&self) -> BTreeMap<String, String> {
        self.last_env.lock().unwrap().clone()
    }

    pub fn last_import_maps(&self) -> Vec<PathBuf> {
        self.last_import_maps.lock().unwrap().clone()
    }

    fn graph(&self, handlers: &[HandlerSource]) -> ModuleGraph {
        let imports = self.imports.lock().unwrap();
        let mut files: Vec<PathBuf> = handlers.iter().map(|h| h.path.clone()).collect();
        files.extend(imports.keys().cloned());
        files.sort();
        files.dedup();

        ModuleGraph {
            modules: files
                .into_iter()
                .map(|file| Module {
                    specifier: url::Url::from_file_path(&file).unwrap().to_string(),
                    dependencies: imports
                        .get(&file)
                        .map(|deps| deps.iter().map(|d| Dependency::local(d)).collect())
                        .unwrap_or_default(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl Compiler for ScriptedCompiler {
    async fn compile(
        &self,
        handlers: &[HandlerSource],
        env: &BTreeMap<String, String>,
        opts: &CompileOptions,
    ) -> Result<CompileOutput, BuildError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        *self.last_env.lock().unwrap() = env.clone();
        *self.last_import_maps.lock().unwrap() = opts.import_map_paths.clone();

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let output = if self.fail.load(Ordering::SeqCst) {
            CompileOutput {
                function_config: Vec::new(),
                graph: None,
                success: false,
                ..Default::default()
            }
        } else {
            let configs = self.configs.lock().unwrap();
            CompileOutput {
                function_config: handlers
                    .iter()
                    .map(|h| configs.get(&h.name).cloned().unwrap_or_default())
                    .collect(),
                graph: if self.no_graph.load(Ordering::SeqCst) {
                    None
                } else {
                    Some(self.graph(handlers))
                },
                success: true,
                ..Default::default()
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(output)
    }
}

/// A temporary project directory with helpers for writing handlers.
pub struct Project {
    _dir: TempDir,
    pub root: PathBuf,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::create_dir_all(root.join("edge-functions")).unwrap();
        Self { _dir: dir, root }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Write a user handler `edge-functions/<name>.ts` and return its path.
    pub fn add_handler(&self, name: &str) -> PathBuf {
        self.write(&format!("edge-functions/{name}.ts"), "export default () => new Response('ok')")
    }

    /// Write an internal handler `.edge/internal/<name>.ts` and return its path.
    pub fn add_internal_handler(&self, name: &str) -> PathBuf {
        self.write(&format!(".edge/internal/{name}.ts"), "export default () => new Response('ok')")
    }

    pub fn remove(&self, relative: &str) {
        std::fs::remove_file(self.path(relative)).unwrap();
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        path
    }
}

pub fn collaborators(compiler: Arc<ScriptedCompiler>) -> Collaborators {
    Collaborators {
        scanner: Arc::new(FsScanner),
        compiler,
        generator: Arc::new(DeclarationGenerator),
    }
}

pub fn parse_config(toml_text: &str) -> ProjectConfig {
    edge_registry::config::loader::parse_config(toml_text).unwrap()
}

/// Start a registry over `project` without file watching.
pub async fn start(project: &Project, config: ProjectConfig, compiler: Arc<ScriptedCompiler>) -> Registry {
    Registry::start(RegistryOptions::new(&project.root, config), collaborators(compiler))
        .await
        .unwrap()
}

/// Wait for the next event of `kind`, skipping others.
pub async fn next_event(rx: &mut broadcast::Receiver<RegistryEvent>, kind: EventKind) -> RegistryEvent {
    tokio::time::timeout(WAIT, async {
        loop {
            let event = rx.recv().await.unwrap();
            if event.kind == kind {
                return event;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {kind:?} event"))
}

pub async fn wait_for_status<F>(registry: &Registry, predicate: F) -> RegistryStatus
where
    F: FnMut(&RegistryStatus) -> bool,
{
    tokio::time::timeout(WAIT, registry.wait_for_status(predicate))
        .await
        .expect("timed out waiting for registry status")
        .unwrap()
}

pub fn handler_names(registry: &Registry, path: &str, method: &str) -> Vec<String> {
    registry.match_url_path(path, method).unwrap().handler_names
}
