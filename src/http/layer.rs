//! Request tagging middleware.
//!
//! # Responsibilities
//! - Ask the registry which edge functions run for each request
//! - Tag the request with the matched function names and invocation metadata
//!
//! # Headers
//! - `x-edge-functions`: comma-separated handler names, in route order
//! - `x-edge-functions-metadata`: base64-encoded JSON invocation metadata
//! - `x-edge-passthrough`: set by the execution runtime on its own
//!   upstream requests; such requests are never tagged again
//!
//! # Design Decisions
//! - Untagged requests pass through unchanged
//! - The full [`RouteMatch`] is also inserted into request extensions

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine};

use crate::registry::Registry;
use crate::routing::{InvocationMetadata, RouteMatch};

pub const EDGE_FUNCTIONS_HEADER: &str = "x-edge-functions";
pub const EDGE_METADATA_HEADER: &str = "x-edge-functions-metadata";
pub const EDGE_PASSTHROUGH_HEADER: &str = "x-edge-passthrough";

/// Encode invocation metadata for the metadata header.
pub fn encode_metadata(metadata: &InvocationMetadata) -> Result<String, serde_json::Error> {
    Ok(STANDARD.encode(serde_json::to_vec(metadata)?))
}

/// Decode a metadata header value produced by [`encode_metadata`].
pub fn decode_metadata(value: &str) -> Option<InvocationMetadata> {
    let bytes = STANDARD.decode(value).ok()?;
    serde_json::from_slice(&bytes).ok()
}

pub async fn tag_edge_functions(
    State(registry): State<Arc<Registry>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if req.headers().contains_key(EDGE_PASSTHROUGH_HEADER) {
        return next.run(req).await;
    }

    if let Err(e) = registry.initialize().await {
        tracing::error!(error = %e, "Edge function registry unavailable");
        return (StatusCode::SERVICE_UNAVAILABLE, "Edge function registry unavailable").into_response();
    }

    let path = req.uri().path().to_string();
    let matched = match registry.match_url_path(&path, req.method().as_str()) {
        Ok(matched) => matched,
        Err(e) => {
            tracing::error!(error = %e, path = %path, "Failed to match edge functions");
            return next.run(req).await;
        }
    };

    if matched.is_empty() {
        return next.run(req).await;
    }

    tracing::debug!(path = %path, functions = ?matched.handler_names, "Matched edge functions");

    match tag_headers(&matched) {
        Ok((names, metadata)) => {
            let headers = req.headers_mut();
            headers.insert(EDGE_FUNCTIONS_HEADER, names);
            headers.insert(EDGE_METADATA_HEADER, metadata);
        }
        Err(e) => tracing::error!(error = %e, path = %path, "Failed to encode edge function headers"),
    }
    req.extensions_mut().insert(matched);

    next.run(req).await
}

fn tag_headers(matched: &RouteMatch) -> Result<(HeaderValue, HeaderValue), Box<dyn std::error::Error + Send + Sync>> {
    let names = HeaderValue::from_str(&matched.handler_names.join(","))?;
    let metadata = HeaderValue::from_str(&encode_metadata(&matched.invocation_metadata)?)?;
    Ok((names, metadata))
}
