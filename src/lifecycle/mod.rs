//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Trigger → registry actor stops → watchers dropped → inspector drains → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     SIGHUP → Re-read the project configuration
//! ```
//!
//! # Design Decisions
//! - One broadcast channel shared by every long-running task
//! - Reload never restarts the process

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
