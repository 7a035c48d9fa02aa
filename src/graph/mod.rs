//! Module dependency tracking for live reload.
//!
//! # Data Flow
//! ```text
//! compiler module graph (file:// specifiers)
//!     → index.rs (traverse from every handler entry module, memoized per specifier)
//!     → DependencyIndex: absolute path → { handler names }
//!     → watch coordinator resolves changed paths to affected handlers
//! ```
//!
//! # Design Decisions
//! - Rebuilt wholesale after each successful build; never merged
//! - Only local (`file://`) dependencies are tracked
//! - Cycles and diamonds terminate: each specifier is walked once

pub mod index;
pub mod module;

pub use index::DependencyIndex;
pub use module::{CodeDependency, Dependency, Module, ModuleGraph};
