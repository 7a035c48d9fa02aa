//! Manifest types and the manifest generator seam.
//!
//! The manifest is the serialisable form of a build: raw route patterns plus
//! per-function configuration. It is compiled into a
//! [`RouteTable`](crate::routing::RouteTable) before being installed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::declarations::{Declaration, FunctionConfig, HandlerSource};
use crate::error::BuildError;

/// One route binding in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub function: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
}

/// Per-function configuration carried in the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFunctionConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<String>,
}

/// Compiled set of routes plus per-function configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub routes: Vec<RouteEntry>,
    pub post_cache_routes: Vec<RouteEntry>,
    pub function_config: BTreeMap<String, ManifestFunctionConfig>,
}

impl Manifest {
    /// Routes in match order: pre-cache first, then post-cache.
    pub fn all_routes(&self) -> impl Iterator<Item = &RouteEntry> {
        self.routes.iter().chain(self.post_cache_routes.iter())
    }
}

/// Everything a generator needs to produce a manifest.
#[derive(Debug, Clone, Copy)]
pub struct ManifestInput<'a> {
    pub declarations: &'a [Declaration],
    pub function_config: &'a BTreeMap<String, FunctionConfig>,
    pub handlers: &'a [HandlerSource],
    pub feature_flags: &'a BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedManifest {
    pub manifest: Manifest,
    /// Handlers that ended up with no route.
    pub unrouted_functions: Vec<String>,
}

/// Turns merged declarations into a manifest.
pub trait ManifestGenerator: Send + Sync {
    fn generate(&self, input: ManifestInput<'_>) -> Result<GeneratedManifest, BuildError>;
}
