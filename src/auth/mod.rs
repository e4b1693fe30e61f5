//! Handshake token validation.
//!
//! Clients authenticate before the WebSocket upgrade with a `handshake_token`
//! query parameter: a base64-encoded JSON object carrying `user_id` and
//! `app_id`. Validation is pure — decode, parse, and compare against the
//! request's `app_id` — and resolves entirely before any upgrade is
//! attempted.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::domain::Identity;

/// Errors produced while validating a handshake token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The token is not valid base64, not valid JSON, or is missing a
    /// required field.
    #[error("invalid handshake token: {0}")]
    InvalidToken(String),

    /// The token's app identity disagrees with the request's `app_id`.
    #[error("handshake token app_id {token_app_id:?} does not match request app_id {query_app_id:?}")]
    IdentityMismatch {
        /// The `app_id` carried inside the token payload.
        token_app_id: String,
        /// The `app_id` supplied as a query parameter.
        query_app_id: String,
    },
}

/// Decodes and validates a handshake token against the request's `app_id`.
///
/// # Errors
///
/// Returns [`AuthError::InvalidToken`] when the token fails base64 decoding,
/// JSON parsing, or carries missing/empty identity fields, and
/// [`AuthError::IdentityMismatch`] when the token's `app_id` does not equal
/// `query_app_id`.
pub fn validate(token_text: &str, query_app_id: &str) -> Result<Identity, AuthError> {
    let decoded = BASE64
        .decode(token_text)
        .map_err(|e| AuthError::InvalidToken(format!("invalid base64: {e}")))?;

    let identity: Identity = serde_json::from_slice(&decoded)
        .map_err(|e| AuthError::InvalidToken(format!("invalid payload: {e}")))?;

    if identity.user_id.is_empty() || identity.app_id.is_empty() {
        return Err(AuthError::InvalidToken(
            "empty user_id or app_id".to_string(),
        ));
    }

    if identity.app_id != query_app_id {
        return Err(AuthError::IdentityMismatch {
            token_app_id: identity.app_id,
            query_app_id: query_app_id.to_string(),
        });
    }

    Ok(identity)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn encode_token(user_id: &str, app_id: &str) -> String {
        let payload = format!("{{\"user_id\": \"{user_id}\", \"app_id\": \"{app_id}\"}}");
        BASE64.encode(payload)
    }

    #[test]
    fn valid_token_yields_identity() {
        let token = encode_token("user-1", "app-1");
        let Ok(identity) = validate(&token, "app-1") else {
            panic!("expected valid token");
        };
        assert_eq!(identity.user_id, "user-1");
        assert_eq!(identity.app_id, "app-1");
    }

    #[test]
    fn malformed_base64_rejected() {
        let result = validate("bad-tkn", "app-1");
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn malformed_json_rejected() {
        let token = BASE64.encode("not json at all");
        let result = validate(&token, "app-1");
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn missing_field_rejected() {
        let token = BASE64.encode("{\"user_id\": \"user-1\"}");
        let result = validate(&token, "app-1");
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn empty_field_rejected() {
        let token = encode_token("", "app-1");
        let result = validate(&token, "app-1");
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn app_id_mismatch_rejected() {
        let token = encode_token("user-1", "app-1");
        let result = validate(&token, "other-app");
        assert!(matches!(result, Err(AuthError::IdentityMismatch { .. })));
    }
}
