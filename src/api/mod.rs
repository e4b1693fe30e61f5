//! REST API layer: route handlers and router composition.
//!
//! The REST surface of the gateway is operational only — the streaming
//! traffic itself goes through the WebSocket endpoint in [`crate::ws`].

pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new().merge(handlers::system::routes())
}
