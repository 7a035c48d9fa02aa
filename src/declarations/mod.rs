//! Declaration collection subsystem.
//!
//! # Data Flow
//! ```text
//! project config [[edge_functions]]  ─┐
//! <internal_dir>/manifest.json        ─┼→ collector.rs → Collection { declarations, handlers, added, removed, deploy_changed }
//! scanner.rs (internal + user dirs)   ─┘
//!
//! At build time:
//!     Static + DeployTime + InSource (compiler output)
//!     → normalize.rs (precedence merge)
//!     → manifest generator
//! ```
//!
//! # Design Decisions
//! - Every scan replaces the handler set wholesale; diffing is by `(name, path)` value
//! - A missing or corrupt deploy manifest contributes nothing; an unknown version fails the pass
//! - Name collisions are resolved at scan time: user handlers shadow internal ones

pub mod collector;
pub mod deploy;
pub mod normalize;
pub mod scanner;
pub mod types;

pub use collector::{Collection, DeclarationCollector, HandlerSet};
pub use scanner::{FsScanner, Scanner};
pub use types::{CacheMode, Declaration, DeclarationSource, FunctionConfig, HandlerSource};
