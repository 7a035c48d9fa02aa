//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! edge.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProjectConfig (validated, immutable)
//!     → registry (static declarations, dev settings)
//!
//! On file change:
//!     watcher.rs detects change
//!     → Intent::ConfigChanged to the registry actor
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → static declarations replaced; invalid config keeps the previous ones
//! ```
//!
//! # Design Decisions
//! - Only `edge_functions` and `import_map` are hot-reloaded; `[dev]` needs a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_config_or_default, ConfigError};
pub use schema::{DevConfig, ProjectConfig, DEFAULT_CONFIG_FILE};
pub use validation::ValidationError;
