//! Authenticated identity decoded from the handshake token.

use serde::Deserialize;

/// The `(app, user)` identity asserted by a handshake token.
///
/// Established once during authentication and immutable afterwards. Together
/// with the stream kind it determines which channel a connection binds to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    /// Application identifier.
    pub app_id: String,
    /// User identifier.
    pub user_id: String,
}
