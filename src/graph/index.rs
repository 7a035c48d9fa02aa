//! Reverse index from source file to the handlers that import it.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::graph::module::{Module, ModuleGraph};

/// Multimap `absolute path → handler names`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyIndex {
    entries: BTreeMap<PathBuf, BTreeSet<String>>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from a fresh module graph.
    ///
    /// Entry points are the modules whose path maps to a handler in `handler_paths`.
    pub fn from_graph(graph: &ModuleGraph, handler_paths: &HashMap<PathBuf, String>) -> Self {
        let mut by_path: HashMap<PathBuf, &Module> = HashMap::new();
        let mut entry_points = Vec::new();

        for module in &graph.modules {
            let Some(path) = module.local_path() else {
                continue;
            };
            if let Some(handler) = handler_paths.get(&path) {
                entry_points.push((handler.as_str(), module));
            }
            by_path.insert(path, module);
        }

        let mut memo = HashMap::new();
        let mut index = Self::new();
        for (handler, module) in entry_points {
            for path in traverse(module, &by_path, &mut memo) {
                index.insert(path, handler);
            }
        }

        tracing::debug!(
            modules = graph.modules.len(),
            files = index.len(),
            "Rebuilt dependency index"
        );
        index
    }

    pub fn insert(&mut self, path: PathBuf, handler: &str) {
        self.entries.entry(path).or_default().insert(handler.to_string());
    }

    /// Handlers that transitively import `path`.
    pub fn handlers_for(&self, path: &Path) -> impl Iterator<Item = &str> {
        self.entries
            .get(path)
            .into_iter()
            .flat_map(|names| names.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Local dependency paths of `module`, deepest first, each listed once.
fn traverse<'g>(
    module: &'g Module,
    by_path: &HashMap<PathBuf, &'g Module>,
    memo: &mut HashMap<&'g str, Vec<PathBuf>>,
) -> Vec<PathBuf> {
    if let Some(done) = memo.get(module.specifier.as_str()) {
        return done.clone();
    }
    // In-progress marker; a cycle back to this module contributes nothing.
    memo.insert(&module.specifier, Vec::new());

    let mut paths = Vec::new();
    for dependency in &module.dependencies {
        let Some(path) = dependency.local_path() else {
            continue;
        };
        if let Some(&child) = by_path.get(&path) {
            paths.extend(traverse(child, by_path, memo));
        }
        paths.push(path);
    }

    let mut seen = HashSet::new();
    paths.retain(|p| seen.insert(p.clone()));

    memo.insert(&module.specifier, paths.clone());
    paths
}
