//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Registry subsystems produce:
//!     → logging.rs (structured log events, developer-facing registry events)
//!     → metrics.rs (build counters and durations, route gauge, match counters)
//!
//! Consumers:
//!     → Terminal (fmt layer)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level
//! - Metric updates are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
