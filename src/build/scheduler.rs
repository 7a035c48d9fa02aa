//! Build scheduler.
//!
//! # Responsibilities
//! - Invoke the compiler over the full handler list (internal first)
//! - Merge declarations with in-source config and generate the manifest
//! - Compile the manifest into a route table and install it atomically
//! - Rebuild the dependency index from the module graph
//! - Hold the sticky build error
//!
//! # State Machine
//! ```text
//! Idle ──build()──▶ Building ──ok──▶ Idle
//!                      │
//!                      └──err──▶ Failed ──build()──▶ Building
//! ```
//!
//! # Design Decisions
//! - A failed build leaves the previous route table installed
//! - Manifest and compiled routes are one value, swapped in one store
//! - The scheduler is owned by a single task; callers serialize builds

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwapOption;
use serde::Serialize;

use crate::build::compiler::{CompileOptions, Compiler};
use crate::build::manifest::{ManifestGenerator, ManifestInput};
use crate::declarations::normalize::normalize;
use crate::declarations::{DeclarationSource, FunctionConfig, HandlerSet, HandlerSource};
use crate::error::{BuildError, SharedBuildError};
use crate::graph::DependencyIndex;
use crate::observability::metrics;
use crate::routing::RouteTable;

pub const UNROUTED_WARNING: &str = "Edge function is not accessible because it does not have a path configured.";
pub const PATHS_TYPO_WARNING: &str = "Unknown 'paths' configuration property. Did you mean 'path'?";

/// Shared slot holding the installed route table.
pub type RouteSnapshot = Arc<ArcSwapOption<RouteTable>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildState {
    #[default]
    Idle,
    Building,
    Failed,
}

/// Result of a successful build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildOutcome {
    /// Warnings keyed by handler name.
    pub warnings: BTreeMap<String, Vec<String>>,
    /// npm packages the compiler flagged as possibly unsupported.
    pub unsupported_npm_modules: Vec<String>,
}

impl BuildOutcome {
    pub fn warnings_for(&self, function: &str) -> &[String] {
        self.warnings.get(function).map(Vec::as_slice).unwrap_or_default()
    }

    fn warn(&mut self, function: &str, message: &str) {
        self.warnings
            .entry(function.to_string())
            .or_default()
            .push(message.to_string());
    }
}

/// Inputs for one build pass.
#[derive(Debug, Clone, Copy)]
pub struct BuildInput<'a> {
    pub handlers: &'a HandlerSet,
    /// Static and deploy-time declarations.
    pub declarations: &'a [DeclarationSource],
    pub import_map_paths: &'a [PathBuf],
    pub path_index: &'a HashMap<PathBuf, String>,
}

pub struct BuildScheduler {
    compiler: Arc<dyn Compiler>,
    generator: Arc<dyn ManifestGenerator>,
    env: BTreeMap<String, String>,
    feature_flags: BTreeMap<String, bool>,
    snapshot: RouteSnapshot,
    dependency_index: DependencyIndex,
    build_error: Option<SharedBuildError>,
    state: BuildState,
    generation: u64,
}

impl BuildScheduler {
    pub fn new(
        compiler: Arc<dyn Compiler>,
        generator: Arc<dyn ManifestGenerator>,
        env: BTreeMap<String, String>,
        feature_flags: BTreeMap<String, bool>,
        snapshot: RouteSnapshot,
    ) -> Self {
        Self {
            compiler,
            generator,
            env,
            feature_flags,
            snapshot,
            dependency_index: DependencyIndex::new(),
            build_error: None,
            state: BuildState::Idle,
            generation: 0,
        }
    }

    /// Run one build and install its result.
    ///
    /// On failure the error is recorded as the sticky build error and the
    /// previously installed table stays authoritative.
    pub async fn build(&mut self, input: BuildInput<'_>) -> Result<BuildOutcome, SharedBuildError> {
        let start = Instant::now();
        self.state = BuildState::Building;

        match self.run(input).await {
            Ok(outcome) => {
                self.build_error = None;
                self.generation += 1;
                self.state = BuildState::Idle;
                metrics::record_build(true, start);
                tracing::debug!(
                    generation = self.generation,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Edge functions build complete"
                );
                Ok(outcome)
            }
            Err(e) => {
                metrics::record_build(false, start);
                Err(self.record_error(e))
            }
        }
    }

    /// Record a failure that happened outside `build()`, e.g. during discovery.
    pub fn record_error(&mut self, error: BuildError) -> SharedBuildError {
        let error = Arc::new(error);
        self.build_error = Some(error.clone());
        self.state = BuildState::Failed;
        error
    }

    /// Install an empty table if nothing has been installed yet.
    pub fn ensure_installed(&self) {
        if self.snapshot.load().is_none() {
            self.snapshot.store(Some(Arc::new(RouteTable::empty())));
            metrics::set_routes(0);
        }
    }

    async fn run(&mut self, input: BuildInput<'_>) -> Result<BuildOutcome, BuildError> {
        if input.handlers.is_empty() {
            self.install(RouteTable::empty());
            self.dependency_index = DependencyIndex::new();
            return Ok(BuildOutcome::default());
        }

        let handlers = input.handlers.to_vec();
        let options = CompileOptions {
            emit_config: true,
            import_map_paths: input.import_map_paths.to_vec(),
        };
        let output = self.compiler.compile(&handlers, &self.env, &options).await?;

        if !output.success {
            return Err(BuildError::Compile("Build error".to_string()));
        }
        if output.function_config.len() != handlers.len() {
            return Err(BuildError::ConfigCountMismatch {
                expected: handlers.len(),
                actual: output.function_config.len(),
            });
        }

        let configs: Vec<(&HandlerSource, FunctionConfig)> =
            handlers.iter().zip(output.function_config).collect();
        // Configs are positional; internal handlers come first.
        let user_configs = &configs[input.handlers.internal.len()..];

        let mut sources = input.declarations.to_vec();
        sources.extend(configs.iter().map(|(handler, config)| DeclarationSource::InSource {
            function: handler.name.clone(),
            config: config.clone(),
            internal: handler.is_internal,
        }));
        let declarations = normalize(sources);

        let function_config: BTreeMap<String, FunctionConfig> = configs
            .iter()
            .map(|(handler, config)| (handler.name.clone(), config.clone()))
            .collect();

        let generated = self.generator.generate(ManifestInput {
            declarations: &declarations,
            function_config: &function_config,
            handlers: &handlers,
            feature_flags: &self.feature_flags,
        })?;
        let table = RouteTable::compile(generated.manifest)?;

        let mut outcome = BuildOutcome::default();
        for function in &generated.unrouted_functions {
            outcome.warn(function, UNROUTED_WARNING);
        }
        for (handler, config) in user_configs {
            if config.has_paths_typo() {
                outcome.warn(&handler.name, PATHS_TYPO_WARNING);
            }
        }

        if !output.npm_specifiers_with_extraneous_files.is_empty() {
            tracing::warn!(
                modules = %output.npm_specifiers_with_extraneous_files.join(", "),
                "The following npm modules, which are directly or indirectly imported by an edge function, may not be supported"
            );
            outcome.unsupported_npm_modules = output.npm_specifiers_with_extraneous_files.clone();
        }

        match &output.graph {
            Some(graph) => self.dependency_index = DependencyIndex::from_graph(graph, input.path_index),
            None => tracing::warn!(
                "Could not process edge functions dependency graph. Live reload will not be available."
            ),
        }

        self.install(table);
        Ok(outcome)
    }

    fn install(&self, table: RouteTable) {
        metrics::set_routes(table.len());
        self.snapshot.store(Some(Arc::new(table)));
    }

    pub fn dependency_index(&self) -> &DependencyIndex {
        &self.dependency_index
    }

    pub fn build_error(&self) -> Option<&SharedBuildError> {
        self.build_error.as_ref()
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Number of successful builds so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
