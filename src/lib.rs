//! Local development registry for per-route edge functions.
//!
//! Discovers edge function handlers and their route declarations, keeps a
//! compiled route table current while sources change, and answers which
//! handlers run for each incoming request.

// Core subsystems
pub mod build;
pub mod declarations;
pub mod graph;
pub mod registry;
pub mod routing;
pub mod watch;

// Integration
pub mod config;
pub mod http;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::ProjectConfig;
pub use error::{BuildError, DiscoveryError, RegistryError};
pub use http::InspectorServer;
pub use lifecycle::Shutdown;
pub use registry::{Collaborators, Registry, RegistryEvent, RegistryOptions};
pub use routing::RouteMatch;
pub use watch::Intent;
