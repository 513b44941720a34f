//! HTTP API layer: health and statistics endpoints plus the OpenAPI
//! document describing them.

pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::domain::RegistryStats;

/// OpenAPI document for the HTTP endpoints.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "gridwarriors-server",
        description = "Two-player tic-tac-toe over WebSocket. Game traffic uses `GET /ws`."
    ),
    paths(handlers::system::health_handler, handlers::system::stats_handler),
    components(schemas(handlers::system::HealthResponse, RegistryStats)),
    tags((name = "System", description = "Service status"))
)]
pub struct ApiDoc;

/// Builds the router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new().merge(handlers::system::routes())
}
