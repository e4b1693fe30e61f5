//! Stream kinds and the channel partitioning they imply.

use std::fmt;
use std::str::FromStr;

use crate::error::GatewayError;

/// The connection category requested via the `type` query parameter.
///
/// `log_writer` and `log_reader` are two roles over the same underlying logs
/// channel; `notifications` is its own channel kind where every connection
/// both relays and receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Role-agnostic notification stream: relays inbound frames to every
    /// notifications connection of the same identity, itself included.
    Notifications,
    /// Publishes log lines into the logs channel.
    LogWriter,
    /// Receives log lines fanned out from writers on the logs channel.
    LogReader,
}

/// The channel partition a stream kind resolves to.
///
/// Writers and readers of the same identity land on the same [`ChannelKind`]
/// and therefore the same channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Log fan-out channel shared by `log_writer` and `log_reader`.
    Logs,
    /// Notification relay channel.
    Notifications,
}

impl StreamKind {
    /// Returns the wire-level `type` string for this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Notifications => "notifications",
            Self::LogWriter => "log_writer",
            Self::LogReader => "log_reader",
        }
    }

    /// Returns the channel partition this kind binds to.
    #[must_use]
    pub const fn channel_kind(&self) -> ChannelKind {
        match self {
            Self::Notifications => ChannelKind::Notifications,
            Self::LogWriter | Self::LogReader => ChannelKind::Logs,
        }
    }

    /// Whether inbound frames from this connection are relayed to the
    /// channel's readers.
    #[must_use]
    pub const fn relays_inbound(&self) -> bool {
        matches!(self, Self::Notifications | Self::LogWriter)
    }

    /// Whether this connection registers a reader slot and receives
    /// broadcast frames.
    #[must_use]
    pub const fn receives_broadcasts(&self) -> bool {
        matches!(self, Self::Notifications | Self::LogReader)
    }
}

impl FromStr for StreamKind {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "notifications" => Ok(Self::Notifications),
            "log_writer" => Ok(Self::LogWriter),
            "log_reader" => Ok(Self::LogReader),
            other => Err(GatewayError::UnknownStreamKind(other.to_string())),
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
