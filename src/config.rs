//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`), with defaults suitable for relaying
//! single log lines.

use std::net::SocketAddr;

use anyhow::Context as _;

use crate::domain::BackpressurePolicy;

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8080`).
    pub listen_addr: SocketAddr,

    /// Maximum relayed frame size in bytes. A writer frame above this limit
    /// is never forwarded; the writer's connection is closed.
    pub max_frame_bytes: usize,

    /// Capacity of each reader's bounded outbound queue, in frames.
    pub reader_queue_capacity: usize,

    /// What to do with a reader whose outbound queue is full.
    pub backpressure: BackpressurePolicy,

    /// Relayed-frame allowance refilled per throttle window.
    pub throttle_rate: f64,

    /// Throttle window length in seconds.
    pub throttle_per_secs: f64,

    /// Interval between server-sent keepalive pings, in seconds.
    pub ping_interval_secs: u64,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .context("LISTEN_ADDR is not a valid socket address")?;

        Ok(Self {
            listen_addr,
            max_frame_bytes: parse_env("MAX_FRAME_BYTES", 1024 * 25),
            reader_queue_capacity: parse_env("READER_QUEUE_CAPACITY", 256),
            backpressure: parse_policy(std::env::var("BACKPRESSURE_POLICY").ok().as_deref()),
            throttle_rate: parse_env("THROTTLE_RATE", 20.0),
            throttle_per_secs: parse_env("THROTTLE_PER_SECS", 5.0),
            ping_interval_secs: parse_env("PING_INTERVAL_SECS", 54),
        })
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_frame_bytes: 1024 * 25,
            reader_queue_capacity: 256,
            backpressure: BackpressurePolicy::Drop,
            throttle_rate: 20.0,
            throttle_per_secs: 5.0,
            ping_interval_secs: 54,
        }
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses the backpressure policy. Accepts `"drop"` and `"disconnect"`
/// (case-insensitive); anything else keeps the default of dropping frames
/// for lagging readers.
fn parse_policy(value: Option<&str>) -> BackpressurePolicy {
    match value.map(str::to_ascii_lowercase).as_deref() {
        Some("disconnect") => BackpressurePolicy::Disconnect,
        Some("drop") | None => BackpressurePolicy::Drop,
        Some(other) => {
            tracing::warn!(value = other, "unknown BACKPRESSURE_POLICY, using drop");
            BackpressurePolicy::Drop
        }
    }
}
