//! WebSocket layer: upgrade handling and the per-connection relay loop.
//!
//! The stream endpoint at `/v1/streams` authenticates the handshake token,
//! upgrades the connection, and binds it into the channel registry for
//! fan-out.

pub mod connection;
pub mod handler;
pub mod throttle;

use axum::Router;
use axum::routing::get;

use crate::app_state::AppState;

/// Builds the stream upgrade routes.
///
/// Both spellings are routed; deployed clients request the trailing-slash
/// form.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/streams", get(handler::stream_handler))
        .route("/v1/streams/", get(handler::stream_handler))
}
