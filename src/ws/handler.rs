//! Axum WebSocket upgrade handler.
//!
//! All handshake validation happens here, before the protocol switch: a
//! request that fails token or stream-type checks is answered with a 400
//! JSON error and never upgraded.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::auth;
use crate::domain::{Connection, StreamKind};
use crate::error::GatewayError;

/// Query parameters carried by a stream upgrade request.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Base64-encoded JSON identity assertion.
    pub handshake_token: Option<String>,
    /// Application id; must match the token's.
    pub app_id: Option<String>,
    /// Requested stream kind.
    #[serde(rename = "type")]
    pub stream_type: Option<String>,
}

/// `GET /v1/streams` — authenticate, then upgrade to a stream connection.
///
/// # Errors
///
/// Returns a [`GatewayError`] (400 response) when a query parameter is
/// missing, the handshake token fails validation, or the stream type is
/// unrecognized. No upgrade is attempted in those cases.
pub async fn stream_handler(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, GatewayError> {
    let token = query
        .handshake_token
        .as_deref()
        .ok_or(GatewayError::MissingParam("handshake_token"))?;
    let app_id = query
        .app_id
        .as_deref()
        .ok_or(GatewayError::MissingParam("app_id"))?;
    let stream_type = query
        .stream_type
        .as_deref()
        .ok_or(GatewayError::MissingParam("type"))?;

    let identity = auth::validate(token, app_id)?;
    let kind: StreamKind = stream_type.parse()?;

    let conn = Connection::new(identity, kind);
    tracing::info!(conn = %conn.id, kind = %kind, app_id = %conn.identity.app_id, "stream authenticated");

    Ok(ws.on_upgrade(move |socket| run_connection(socket, state, conn)))
}
