//! Declaration collection and handler add/remove detection.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::declarations::deploy::{read_deploy_config, DeployConfig};
use crate::declarations::scanner::Scanner;
use crate::declarations::types::{Declaration, DeclarationSource, HandlerSource};
use crate::error::DiscoveryError;

/// Current handlers, internal first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerSet {
    pub internal: Vec<HandlerSource>,
    pub user: Vec<HandlerSource>,
}

impl HandlerSet {
    /// Build a handler set, resolving name collisions.
    ///
    /// Within one set the first handler with a given name wins. A user
    /// handler shadows an internal handler of the same name.
    pub fn new(internal: Vec<HandlerSource>, user: Vec<HandlerSource>) -> Self {
        let user = dedup_by_name(user);
        let user_names: HashSet<&str> = user.iter().map(|h| h.name.as_str()).collect();
        let internal = dedup_by_name(internal)
            .into_iter()
            .filter(|h| {
                let shadowed = user_names.contains(h.name.as_str());
                if shadowed {
                    tracing::warn!(function = %h.name, path = %h.path.display(), "Internal edge function shadowed by user function with the same name");
                }
                !shadowed
            })
            .map(HandlerSource::internal)
            .collect();
        Self { internal, user }
    }

    /// All handlers, internal first. Compiler output is positional over this order.
    pub fn all(&self) -> impl Iterator<Item = &HandlerSource> {
        self.internal.iter().chain(self.user.iter())
    }

    pub fn to_vec(&self) -> Vec<HandlerSource> {
        self.all().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.internal.len() + self.user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map every handler path to its name.
    pub fn path_index(&self) -> HashMap<PathBuf, String> {
        self.all().map(|h| (h.path.clone(), h.name.clone())).collect()
    }
}

fn dedup_by_name(handlers: Vec<HandlerSource>) -> Vec<HandlerSource> {
    let mut seen = HashSet::new();
    handlers
        .into_iter()
        .filter(|h| {
            let first = seen.insert(h.name.clone());
            if !first {
                tracing::warn!(function = %h.name, path = %h.path.display(), "Duplicate edge function name, ignoring");
            }
            first
        })
        .collect()
}

/// Result of one collection pass.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub declarations: Vec<DeclarationSource>,
    pub handlers: HandlerSet,
    pub added: Vec<HandlerSource>,
    pub removed: Vec<HandlerSource>,
    /// Deploy manifest declarations or import map differ from the previous pass.
    pub deploy_changed: bool,
}

impl Collection {
    /// True when the route table must be rebuilt.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty() || self.deploy_changed
    }
}

/// Merges static, deploy-time and scanned declarations.
pub struct DeclarationCollector {
    scanner: Arc<dyn Scanner>,
    internal_dir: PathBuf,
    user_dirs: Vec<PathBuf>,
    static_declarations: Vec<Declaration>,
    deploy: DeployConfig,
    handlers: HandlerSet,
    path_index: HashMap<PathBuf, String>,
}

impl DeclarationCollector {
    pub fn new(
        scanner: Arc<dyn Scanner>,
        internal_dir: PathBuf,
        user_dirs: Vec<PathBuf>,
        static_declarations: Vec<Declaration>,
    ) -> Self {
        Self {
            scanner,
            internal_dir,
            user_dirs,
            static_declarations,
            deploy: DeployConfig::default(),
            handlers: HandlerSet::default(),
            path_index: HashMap::new(),
        }
    }

    /// Replace the static declarations. Returns true if they changed.
    pub fn set_static_declarations(&mut self, declarations: Vec<Declaration>) -> bool {
        if self.static_declarations == declarations {
            return false;
        }
        self.static_declarations = declarations;
        true
    }

    /// Scan all sources and diff the handler set against the previous scan.
    ///
    /// State is only replaced when every source was read successfully.
    pub async fn collect(&mut self) -> Result<Collection, DiscoveryError> {
        let internal_dirs = [self.internal_dir.clone()];
        let (internal, user, deploy) = tokio::try_join!(
            self.scanner.find(&internal_dirs),
            self.scanner.find(&self.user_dirs),
            read_deploy_config(&self.internal_dir),
        )?;

        let handlers = HandlerSet::new(internal, user);
        let (added, removed) = diff_handlers(&self.handlers, &handlers);

        let deploy = deploy.unwrap_or_default();
        let deploy_changed = deploy != self.deploy;
        self.deploy = deploy;
        self.path_index = handlers.path_index();
        self.handlers = handlers.clone();

        tracing::debug!(
            handlers = handlers.len(),
            added = added.len(),
            removed = removed.len(),
            deploy_changed,
            "Collected edge function declarations"
        );

        Ok(Collection {
            declarations: self.declaration_sources(),
            handlers,
            added,
            removed,
            deploy_changed,
        })
    }

    /// Static and deploy-time declarations as tagged sources.
    pub fn declaration_sources(&self) -> Vec<DeclarationSource> {
        self.static_declarations
            .iter()
            .cloned()
            .map(DeclarationSource::Static)
            .chain(self.deploy.declarations.iter().cloned().map(DeclarationSource::DeployTime))
            .collect()
    }

    pub fn handlers(&self) -> &HandlerSet {
        &self.handlers
    }

    pub fn path_index(&self) -> &HashMap<PathBuf, String> {
        &self.path_index
    }

    pub fn handler_for_path(&self, path: &Path) -> Option<&str> {
        self.path_index.get(path).map(String::as_str)
    }

    pub fn deploy_import_map(&self) -> Option<&Path> {
        self.deploy.import_map.as_deref()
    }

    /// Display name from the first static or deploy-time declaration naming one.
    pub fn display_name<'a>(&'a self, function: &'a str) -> &'a str {
        self.static_declarations
            .iter()
            .chain(self.deploy.declarations.iter())
            .find(|d| d.function == function)
            .and_then(|d| d.name.as_deref())
            .unwrap_or(function)
    }
}

/// Diff two handler sets by `(name, path)` value.
pub fn diff_handlers(previous: &HandlerSet, current: &HandlerSet) -> (Vec<HandlerSource>, Vec<HandlerSource>) {
    let before: HashSet<_> = previous.all().map(HandlerSource::identity).collect();
    let after: HashSet<_> = current.all().map(HandlerSource::identity).collect();

    let added = current
        .all()
        .filter(|h| !before.contains(&h.identity()))
        .cloned()
        .collect();
    let removed = previous
        .all()
        .filter(|h| !after.contains(&h.identity()))
        .cloned()
        .collect();
    (added, removed)
}
