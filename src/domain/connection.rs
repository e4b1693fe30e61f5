//! Connection record bound into the channel registry.

use chrono::{DateTime, Utc};

use super::{ChannelKey, ConnectionId, Identity, StreamKind};

/// One authenticated WebSocket connection.
///
/// Created after a successful upgrade and owned by the task that pumps the
/// socket; the channel it joins references it only by [`ConnectionId`]. A
/// connection belongs to exactly one channel for its lifetime.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Unique identifier for this connection.
    pub id: ConnectionId,
    /// Identity established by the handshake token.
    pub identity: Identity,
    /// The stream kind requested at upgrade time.
    pub kind: StreamKind,
    /// When the connection joined its channel.
    pub joined_at: DateTime<Utc>,
}

impl Connection {
    /// Creates a connection record with a fresh id and join timestamp.
    #[must_use]
    pub fn new(identity: Identity, kind: StreamKind) -> Self {
        Self {
            id: ConnectionId::new(),
            identity,
            kind,
            joined_at: Utc::now(),
        }
    }

    /// The channel key this connection binds to.
    #[must_use]
    pub fn channel_key(&self) -> ChannelKey {
        ChannelKey::new(&self.identity, self.kind.channel_kind())
    }
}
