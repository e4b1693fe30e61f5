//! # stream-gateway
//!
//! WebSocket relay gateway for real-time log streaming and app
//! notifications.
//!
//! Clients authenticate with a base64/JSON handshake token, then either
//! publish lines into a logical channel or subscribe to receive them.
//! Channels are keyed by `(app_id, user_id, kind)`; frames are forwarded
//! verbatim to every currently-attached reader and never stored.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket, HTTP)
//!     │
//!     ├── Upgrade Handler (ws/) ── Handshake Auth (auth/)
//!     ├── Relay Loop (ws/connection)
//!     │
//!     ├── ChannelRegistry (domain/)
//!     ├── Channel fan-out (domain/channel)
//!     │
//!     └── REST Handlers (api/)
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod ws;

use axum::Router;

use crate::app_state::AppState;

/// Composes the full gateway router: stream upgrades plus the REST surface.
pub fn build_router() -> Router<AppState> {
    Router::new().merge(api::build_router()).merge(ws::routes())
}
