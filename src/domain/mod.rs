//! Domain layer: identity, stream kinds, channels, and the registry.
//!
//! This module contains the server-side domain model: the identity asserted
//! by a handshake token, the stream kinds a client may request, the channel
//! membership structures, and the process-wide registry that binds
//! connections to channels.

pub mod channel;
pub mod connection;
pub mod connection_id;
pub mod identity;
pub mod registry;
pub mod stream_kind;

pub use channel::{BackpressurePolicy, Channel, ChannelKey};
pub use connection::Connection;
pub use connection_id::ConnectionId;
pub use identity::Identity;
pub use registry::{ChannelHandle, ChannelRegistry};
pub use stream_kind::{ChannelKind, StreamKind};
