//! Build subsystem.
//!
//! # Data Flow
//! ```text
//! HandlerSet (internal ++ user)
//!     → compiler.rs (positional function configs + module graph)
//!     → declarations::normalize (static + deploy-time + in-source)
//!     → manifest.rs / generator.rs (routes, post-cache routes, function config)
//!     → routing::RouteTable::compile
//!     → scheduler.rs installs table, rebuilds dependency index
//! ```
//!
//! # Design Decisions
//! - Compiler and manifest generator are trait objects; tests swap in fakes
//! - Rebuilds are always whole-registry

pub mod compiler;
pub mod generator;
pub mod manifest;
pub mod scheduler;

pub use compiler::{CompileOptions, CompileOutput, Compiler, ProcessCompiler};
pub use generator::{path_to_pattern, DeclarationGenerator};
pub use manifest::{GeneratedManifest, Manifest, ManifestFunctionConfig, ManifestGenerator, ManifestInput, RouteEntry};
pub use scheduler::{BuildInput, BuildOutcome, BuildScheduler, BuildState, RouteSnapshot};
