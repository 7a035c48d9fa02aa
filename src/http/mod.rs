//! HTTP integration subsystem.
//!
//! # Data Flow
//! ```text
//! Dev server request
//!     → layer.rs (skip passthrough, await initialize, match_url_path)
//!     → x-edge-functions / x-edge-functions-metadata headers
//!     → handler execution runtime (outside this crate)
//!
//! Developer / registry-cli
//!     → server.rs (status, routes, match)
//! ```

pub mod layer;
pub mod server;

pub use layer::{
    decode_metadata, encode_metadata, tag_edge_functions, EDGE_FUNCTIONS_HEADER, EDGE_METADATA_HEADER,
    EDGE_PASSTHROUGH_HEADER,
};
pub use server::InspectorServer;
