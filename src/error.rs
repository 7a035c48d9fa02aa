//! Error taxonomy for the registry.
//!
//! # Design Decisions
//! - Discovery failures are fatal only for an unsupported deploy manifest
//! - Build failures are held as the sticky build error behind an `Arc`
//! - Matching never fails once a route table has been installed

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::watch::WatchError;

/// Handler discovery or deploy manifest failure.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to scan {}: {source}", dir.display())]
    Scan {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported deploy manifest format (version {0})")]
    UnsupportedManifestVersion(String),
}

/// Compiler service or manifest generator failure.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("build error: {0}")]
    Compile(String),

    #[error("could not start compiler: {0}")]
    CompilerUnavailable(#[source] std::io::Error),

    #[error("compiler returned malformed output: {0}")]
    CompilerProtocol(#[from] serde_json::Error),

    #[error("compiler did not finish within {0:?}")]
    Timeout(Duration),

    #[error("compiler returned {actual} function configs for {expected} functions")]
    ConfigCountMismatch { expected: usize, actual: usize },

    #[error("invalid pattern {pattern:?} for function {function}: {source}")]
    InvalidPattern {
        function: String,
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

/// Sticky build error shared between the scheduler, status readers and events.
pub type SharedBuildError = Arc<BuildError>;

/// Errors surfaced by the [`Registry`](crate::Registry) handle.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no route table has been installed yet")]
    NotReady,

    #[error("registry has stopped")]
    Stopped,

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error("failed to resolve project directory {}: {source}", path.display())]
    ProjectDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
