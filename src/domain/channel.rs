//! Per-key fan-out channel: live membership and ordered broadcast.
//!
//! A [`Channel`] holds the writer set and the reader slots for one
//! [`ChannelKey`]. It forwards, never stores: a frame is delivered to the
//! readers registered at broadcast time and to nobody else. Reader slots are
//! keyed by [`ConnectionId`], so removing one member never invalidates
//! iteration over the rest.

use std::collections::{HashMap, HashSet};
use std::fmt;

use axum::extract::ws::Message;
use tokio::sync::mpsc;

use super::{ChannelKind, ConnectionId, Identity};

/// The partition under which fan-out happens.
///
/// `log_writer` and `log_reader` connections of the same identity resolve to
/// the same key and therefore the same channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelKey {
    /// Application identifier.
    pub app_id: String,
    /// User identifier.
    pub user_id: String,
    /// Channel partition (logs or notifications).
    pub kind: ChannelKind,
}

impl ChannelKey {
    /// Builds the key for an identity and channel kind.
    #[must_use]
    pub fn new(identity: &Identity, kind: ChannelKind) -> Self {
        Self {
            app_id: identity.app_id.clone(),
            user_id: identity.user_id.clone(),
            kind,
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ChannelKind::Logs => "logs",
            ChannelKind::Notifications => "notifications",
        };
        write!(f, "{}/{}/{kind}", self.app_id, self.user_id)
    }
}

/// What to do with a reader whose bounded outbound queue is full.
///
/// Delivery to sibling readers is never blocked either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackpressurePolicy {
    /// Discard the frame for the lagging reader only.
    Drop,
    /// Remove the lagging reader's slot; its connection task observes the
    /// closed queue and shuts the socket.
    Disconnect,
}

/// Live membership for one channel key.
#[derive(Debug)]
pub struct Channel {
    key: ChannelKey,
    writers: HashSet<ConnectionId>,
    readers: HashMap<ConnectionId, mpsc::Sender<Message>>,
}

impl Channel {
    /// Creates an empty channel for the given key.
    #[must_use]
    pub fn new(key: ChannelKey) -> Self {
        Self {
            key,
            writers: HashSet::new(),
            readers: HashMap::new(),
        }
    }

    /// Returns the channel's key.
    #[must_use]
    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    /// Registers a writer connection.
    pub fn add_writer(&mut self, id: ConnectionId) {
        self.writers.insert(id);
    }

    /// Registers a reader slot with its bounded outbound queue.
    pub fn add_reader(&mut self, id: ConnectionId, tx: mpsc::Sender<Message>) {
        self.readers.insert(id, tx);
    }

    /// Removes a connection from both role sets.
    pub fn remove(&mut self, id: ConnectionId) {
        self.writers.remove(&id);
        self.readers.remove(&id);
    }

    /// Returns `true` when no connection references this channel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writers.is_empty() && self.readers.is_empty()
    }

    /// Number of registered reader slots.
    #[must_use]
    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }

    /// Number of registered writers.
    #[must_use]
    pub fn writer_count(&self) -> usize {
        self.writers.len()
    }

    /// Hands one frame to every currently-registered reader slot.
    ///
    /// Delivery is a non-blocking `try_send` into each reader's bounded
    /// queue, so a slow reader never stalls the writer or its siblings.
    /// Slots whose queue has been closed by a departed reader are pruned;
    /// full queues are handled per `policy`. Returns the number of readers
    /// the frame was queued for.
    pub fn broadcast(&mut self, frame: &Message, policy: BackpressurePolicy) -> usize {
        let mut delivered = 0;
        let mut stale: Vec<ConnectionId> = Vec::new();

        for (id, tx) in &self.readers {
            match tx.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => match policy {
                    BackpressurePolicy::Drop => {
                        tracing::warn!(key = %self.key, reader = %id, "reader lagging, frame dropped");
                    }
                    BackpressurePolicy::Disconnect => {
                        tracing::warn!(key = %self.key, reader = %id, "reader lagging, disconnecting");
                        stale.push(*id);
                    }
                },
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    stale.push(*id);
                }
            }
        }

        for id in stale {
            self.readers.remove(&id);
        }
        delivered
    }
}
