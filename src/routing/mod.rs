//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (path, method)
//!     → router.rs (linear scan over routes ++ post_cache_routes)
//!     → matcher.rs (method set, compiled pattern, exclusions)
//!     → RouteMatch { handler_names, invocation_metadata }
//!
//! Route compilation (at manifest install):
//!     Manifest
//!     → compile every pattern and exclusion once
//!     → freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Tables are immutable once built; a rebuild swaps in a whole new table
//! - No regex compilation on the request path
//! - Every matching route is returned, not just the first
//! - Route order is fixed: pre-cache routes, then post-cache routes

pub mod matcher;
pub mod router;

pub use matcher::{Exclusions, Matcher, MethodSet, PathPattern};
pub use router::{CompiledRoute, InvocationMetadata, RouteMatch, RouteSummary, RouteTable};
