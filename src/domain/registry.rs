//! Process-wide channel registry with per-channel fine-grained locking.
//!
//! [`ChannelRegistry`] maps every [`ChannelKey`] to its live [`Channel`].
//! Channels are created lazily on first join and erased when the last member
//! leaves. The outer map is guarded by a [`tokio::sync::RwLock`] and each
//! channel by its own [`tokio::sync::Mutex`], so traffic on distinct
//! channels never contends while join/leave stay linearizable with respect
//! to each other and to broadcasts on the same channel.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::Message;
use tokio::sync::{Mutex, RwLock, mpsc};

use super::channel::{BackpressurePolicy, Channel, ChannelKey};
use super::{Connection, ConnectionId};

/// Handle returned by [`ChannelRegistry::join`].
///
/// Used by the connection task for frame routing and later removal. Holding
/// the handle keeps the channel reachable even after the registry erases the
/// map entry, so a racing broadcast never dereferences a dead channel.
#[derive(Debug)]
pub struct ChannelHandle {
    conn_id: ConnectionId,
    key: ChannelKey,
    channel: Arc<Mutex<Channel>>,
}

impl ChannelHandle {
    /// The id of the connection this handle was issued to.
    #[must_use]
    pub fn connection_id(&self) -> ConnectionId {
        self.conn_id
    }

    /// The key of the channel this handle is bound to.
    #[must_use]
    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    /// Relays one frame to every reader currently in the channel.
    ///
    /// Returns the number of readers the frame was queued for.
    pub async fn broadcast(&self, frame: &Message, policy: BackpressurePolicy) -> usize {
        self.channel.lock().await.broadcast(frame, policy)
    }
}

/// Central store mapping channel keys to live channels.
///
/// Constructed once at server start and shared as `Arc<ChannelRegistry>`
/// through the application state; torn down with the process.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: RwLock<HashMap<ChannelKey, Arc<Mutex<Channel>>>>,
}

impl ChannelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Atomically binds a connection into its channel, creating the channel
    /// if this is the first member.
    ///
    /// Connections whose kind receives broadcasts get a bounded reader queue
    /// of `queue_capacity` frames; the receiving half is returned for the
    /// connection task to drain. Writers are registered in the writer set.
    pub async fn join(
        &self,
        conn: &Connection,
        queue_capacity: usize,
    ) -> (ChannelHandle, Option<mpsc::Receiver<Message>>) {
        let key = conn.channel_key();
        let mut map = self.channels.write().await;
        let entry = Arc::clone(
            map.entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(Channel::new(key.clone())))),
        );

        let mut channel = entry.lock().await;
        if conn.kind.relays_inbound() {
            channel.add_writer(conn.id);
        }
        let reader_rx = if conn.kind.receives_broadcasts() {
            let (tx, rx) = mpsc::channel(queue_capacity);
            channel.add_reader(conn.id, tx);
            Some(rx)
        } else {
            None
        };
        drop(channel);

        tracing::debug!(key = %key, conn = %conn.id, kind = %conn.kind, "connection joined");
        (
            ChannelHandle {
                conn_id: conn.id,
                key,
                channel: entry,
            },
            reader_rx,
        )
    }

    /// Atomically removes the handle's connection from its channel and
    /// erases the channel once both role sets are empty.
    pub async fn leave(&self, handle: &ChannelHandle) {
        let mut map = self.channels.write().await;
        let mut channel = handle.channel.lock().await;
        channel.remove(handle.conn_id);
        let drained = channel.is_empty();
        drop(channel);

        // A slow leave can arrive after the key was erased and re-created
        // for fresh members; only erase the channel this handle belongs to.
        if drained
            && let Some(current) = map.get(&handle.key)
            && Arc::ptr_eq(current, &handle.channel)
        {
            map.remove(&handle.key);
            tracing::debug!(key = %handle.key, "channel reclaimed");
        }
        tracing::debug!(key = %handle.key, conn = %handle.conn_id, "connection left");
    }

    /// Number of live channels.
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Writer and reader counts for a key, if the channel exists.
    pub async fn member_counts(&self, key: &ChannelKey) -> Option<(usize, usize)> {
        let map = self.channels.read().await;
        let entry = Arc::clone(map.get(key)?);
        drop(map);
        let channel = entry.lock().await;
        Some((channel.writer_count(), channel.reader_count()))
    }
}
