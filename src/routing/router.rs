//! Route lookup.
//!
//! # Responsibilities
//! - Compile a manifest into an immutable route table
//! - Return every handler whose route matches a request
//! - Produce the invocation metadata handed to the execution runtime
//!
//! # Design Decisions
//! - Immutable after construction (shared behind an `Arc` without locks)
//! - O(n) scan over routes; all matches are collected, in route order
//! - Empty match is a normal result, not an error

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::build::manifest::{Manifest, ManifestFunctionConfig, RouteEntry};
use crate::error::BuildError;
use crate::routing::matcher::{Exclusions, Matcher, MethodSet, PathPattern};

/// A manifest route with its patterns compiled.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    pub function: String,
    pub path: Option<String>,
    pub pattern: PathPattern,
    pub methods: MethodSet,
    pub excluded: Exclusions,
}

impl CompiledRoute {
    fn compile(entry: &RouteEntry) -> Result<Self, BuildError> {
        let pattern = PathPattern::new(&entry.pattern).map_err(|source| BuildError::InvalidPattern {
            function: entry.function.clone(),
            pattern: entry.pattern.clone(),
            source: Box::new(source),
        })?;
        Ok(Self {
            function: entry.function.clone(),
            path: entry.path.clone(),
            pattern,
            methods: MethodSet::new(&entry.methods),
            excluded: compile_exclusions(&entry.function, &entry.excluded_patterns)?,
        })
    }

    /// Apply method, pattern and route-level exclusion checks.
    pub fn matches(&self, path: &str, method: &str) -> bool {
        self.methods.allows(method) && self.pattern.matches(path) && !self.excluded.matches(path)
    }
}

fn compile_exclusions(function: &str, patterns: &[String]) -> Result<Exclusions, BuildError> {
    Exclusions::compile(patterns).map_err(|(pattern, source)| BuildError::InvalidPattern {
        function: function.to_string(),
        pattern,
        source: Box::new(source),
    })
}

/// Route as reported to handlers, independent of the current match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub function: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub pattern: String,
}

/// Metadata the execution runtime passes to matched handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationMetadata {
    pub function_config: BTreeMap<String, ManifestFunctionConfig>,
    /// Indices into `routes` of the routes that matched.
    pub req_routes: Vec<usize>,
    pub routes: Vec<RouteSummary>,
}

/// Result of matching one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMatch {
    /// Matched handlers in route order. A handler may appear more than once.
    pub handler_names: Vec<String>,
    pub invocation_metadata: InvocationMetadata,
}

impl RouteMatch {
    pub fn is_empty(&self) -> bool {
        self.handler_names.is_empty()
    }
}

/// Manifest plus its compiled routes, produced by one build.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    manifest: Manifest,
    routes: Vec<CompiledRoute>,
    function_exclusions: HashMap<String, Exclusions>,
    summaries: Vec<RouteSummary>,
}

impl RouteTable {
    /// Compile every pattern in `manifest`. Fails on the first invalid pattern.
    pub fn compile(manifest: Manifest) -> Result<Self, BuildError> {
        let routes = manifest
            .all_routes()
            .map(CompiledRoute::compile)
            .collect::<Result<Vec<_>, _>>()?;

        let mut function_exclusions = HashMap::new();
        for (function, config) in &manifest.function_config {
            let exclusions = compile_exclusions(function, &config.excluded_patterns)?;
            if !exclusions.is_empty() {
                function_exclusions.insert(function.clone(), exclusions);
            }
        }

        let summaries = manifest
            .all_routes()
            .map(|r| RouteSummary {
                function: r.function.clone(),
                path: r.path.clone(),
                pattern: r.pattern.clone(),
            })
            .collect();

        Ok(Self {
            manifest,
            routes,
            function_exclusions,
            summaries,
        })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Compiled routes: pre-cache routes followed by post-cache routes.
    pub fn routes(&self) -> &[CompiledRoute] {
        &self.routes
    }

    pub fn summaries(&self) -> &[RouteSummary] {
        &self.summaries
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find every handler that should run for `path` and `method`.
    pub fn match_path(&self, path: &str, method: &str) -> RouteMatch {
        let mut handler_names = Vec::new();
        let mut req_routes = Vec::new();

        for (index, route) in self.routes.iter().enumerate() {
            if !route.matches(path, method) {
                continue;
            }
            let excluded_by_function = self
                .function_exclusions
                .get(&route.function)
                .is_some_and(|e| e.matches(path));
            if excluded_by_function {
                continue;
            }
            handler_names.push(route.function.clone());
            req_routes.push(index);
        }

        RouteMatch {
            handler_names,
            invocation_metadata: InvocationMetadata {
                function_config: self.manifest.function_config.clone(),
                req_routes,
                routes: self.summaries.clone(),
            },
        }
    }
}
