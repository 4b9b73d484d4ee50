//! Session-bound CSRF protection.
//!
//! Every dynamic request gets a per-session random token; forms echo it back
//! in a hidden `csrf_token` field. The guard verifies the submitted field
//! against the session-bound token on every POST before the handler runs, so
//! a third-party site cannot forge a valid submission even if it knows the
//! endpoint shape.

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use subtle::ConstantTimeEq;
use tower_sessions::Session;
use tracing::warn;

use crate::gather::error::AppError;

pub const SESSION_CSRF_KEY: &str = "csrfToken";

/// Name of the hidden form field carrying the token.
pub const TOKEN_FIELD: &str = "csrf_token";

const TOKEN_BYTES: usize = 32;

// Submitted forms are small, anything larger is not ours.
const MAX_FORM_BYTES: usize = 64 * 1024;

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

// Fixed-time comparison, the timing of a mismatch must not leak how much of
// the token was correct.
fn tokens_match(submitted: &str, expected: &str) -> bool {
    submitted.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// The session's CSRF token, generated on first use.
pub async fn token(session: &Session) -> Result<String, AppError> {
    if let Some(token) = session.get::<String>(SESSION_CSRF_KEY).await? {
        return Ok(token);
    }
    let token = generate_token();
    session.insert(SESSION_CSRF_KEY, token.clone()).await?;
    Ok(token)
}

/// Middleware guarding state-changing submissions.
///
/// Issues the session token on every request; on POST it buffers the
/// urlencoded body, checks the `csrf_token` field, and only forwards the
/// reassembled request downstream when the tokens match.
pub async fn guard(session: Session, request: Request, next: Next) -> Result<Response, AppError> {
    let expected = token(&session).await?;

    if request.method() != Method::POST {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_FORM_BYTES)
        .await
        .map_err(|err| anyhow::anyhow!("failed to read form body: {err}"))?;

    let submitted = serde_urlencoded::from_bytes::<Vec<(String, String)>>(&bytes)
        .ok()
        .and_then(|pairs| {
            pairs
                .into_iter()
                .find(|(name, _)| name == TOKEN_FIELD)
                .map(|(_, value)| value)
        });

    let valid = submitted
        .as_deref()
        .is_some_and(|token| tokens_match(token, &expected));

    if !valid {
        warn!(
            path = parts.uri.path(),
            "rejected POST with missing or mismatched CSRF token"
        );
        return Ok(StatusCode::FORBIDDEN.into_response());
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_unique_and_unguessable_length() {
        let first = generate_token();
        let second = generate_token();
        assert_ne!(first, second);
        // 32 bytes, base64url without padding
        assert_eq!(first.len(), 43);
    }

    #[test]
    fn test_tokens_match_exact_only() {
        let token = generate_token();
        assert!(tokens_match(&token, &token));
        assert!(!tokens_match(&token, &generate_token()));
        // differing lengths, including a truncated prefix
        assert!(!tokens_match(&token[..token.len() - 1], &token));
        assert!(!tokens_match("", &token));
    }
}
