//! Configuration schema definitions.
//!
//! This module defines the project configuration read from `edge.toml`.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::declarations::Declaration;

/// Default configuration file name, relative to the project directory.
pub const DEFAULT_CONFIG_FILE: &str = "edge.toml";

/// Root project configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProjectConfig {
    /// Import map passed to the compiler, relative to the project directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_map: Option<PathBuf>,

    /// Static route declarations.
    pub edge_functions: Vec<Declaration>,

    /// Local development settings.
    pub dev: DevConfig,
}

/// Local development settings. Changes require a restart.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DevConfig {
    /// User handler directories, relative to the project directory.
    pub functions_dirs: Vec<PathBuf>,

    /// Internal handler directory; also holds the deploy manifest.
    pub internal_dir: PathBuf,

    /// Build output directory, excluded from watching.
    pub build_output_dir: PathBuf,

    /// Debounce window for filesystem events.
    pub debounce_ms: u64,

    /// Glob patterns ignored by the project watcher.
    pub ignore: Vec<String>,

    /// Compiler command and arguments.
    pub compiler: Vec<String>,

    pub compiler_timeout_secs: u64,

    /// Inspector API bind address.
    pub inspector_address: String,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Environment passed to the compiler.
    pub env: BTreeMap<String, String>,

    /// Feature flags forwarded to the manifest generator.
    pub feature_flags: BTreeMap<String, bool>,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            functions_dirs: vec![PathBuf::from("edge-functions")],
            internal_dir: PathBuf::from(".edge/internal"),
            build_output_dir: PathBuf::from(".edge/serve"),
            debounce_ms: 100,
            ignore: vec!["**/node_modules/**".to_string(), "**/.git/**".to_string()],
            compiler: vec![
                "deno".to_string(),
                "run".to_string(),
                "-A".to_string(),
                "bundler.ts".to_string(),
            ],
            compiler_timeout_secs: 60,
            inspector_address: "127.0.0.1:8970".to_string(),
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
            env: BTreeMap::new(),
            feature_flags: BTreeMap::new(),
        }
    }
}

impl DevConfig {
    /// Compiler environment: configured variables plus the local region marker.
    pub fn compiler_env(&self) -> BTreeMap<String, String> {
        let mut env = self.env.clone();
        env.insert("EDGE_REGION".to_string(), "local".to_string());
        env
    }
}
