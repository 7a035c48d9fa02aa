//! Inspector API.
//!
//! # Responsibilities
//! - Serve registry status, the installed routes, and ad-hoc matches as JSON
//! - Shut down gracefully with the registry
//!
//! # Endpoints
//! - `GET /__edge/status`
//! - `GET /__edge/routes`
//! - `GET /__edge/match?path=/x&method=GET`

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::build::Manifest;
use crate::lifecycle::Shutdown;
use crate::registry::Registry;
use crate::routing::RouteSummary;

#[derive(Debug, Serialize, Deserialize)]
pub struct RoutesResponse {
    pub routes: Vec<RouteSummary>,
    pub manifest: Manifest,
}

#[derive(Debug, Deserialize)]
pub struct MatchQuery {
    pub path: String,
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".to_string()
}

/// HTTP server exposing the registry to developers and `registry-cli`.
pub struct InspectorServer {
    router: Router,
}

impl InspectorServer {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            router: Self::build_router(registry),
        }
    }

    pub fn build_router(registry: Arc<Registry>) -> Router {
        Router::new()
            .route("/__edge/status", get(get_status))
            .route("/__edge/routes", get(get_routes))
            .route("/__edge/match", get(get_match))
            .with_state(registry)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` is triggered.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Inspector server starting");

        let mut stop = shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await?;

        tracing::info!("Inspector server stopped");
        Ok(())
    }
}

async fn get_status(State(registry): State<Arc<Registry>>) -> Response {
    Json(registry.status()).into_response()
}

async fn get_routes(State(registry): State<Arc<Registry>>) -> Response {
    match registry.route_table() {
        Some(table) => Json(RoutesResponse {
            routes: table.summaries().to_vec(),
            manifest: table.manifest().clone(),
        })
        .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "No routes installed yet").into_response(),
    }
}

async fn get_match(State(registry): State<Arc<Registry>>, Query(query): Query<MatchQuery>) -> Response {
    match registry.match_url_path(&query.path, &query.method) {
        Ok(matched) => Json(matched).into_response(),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
    }
}
