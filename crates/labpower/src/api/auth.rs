//! Session extractor guarding the control endpoints
//!
//! A handler that takes `Authenticated` only runs once the gate has admitted
//! the caller, so the dispatcher is never reached by an anonymous request.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use labpower_api::SESSION_HEADER;
use labpower_core::Operator;
use tracing::debug;

use crate::api::error::AppError;
use crate::state::AppState;

/// An admitted caller and the token it presented
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub operator: Operator,
    pub token: String,
}

impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers) else {
            debug!(path = %parts.uri.path(), "request without session token");
            return Err(AppError::unauthorized());
        };

        let operator = state.gate.authorize(&token).await?;

        Ok(Self { operator, token })
    }
}

/// Token from `Authorization: Bearer ...`, else from the session header
fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        && let Some(rest) = value.strip_prefix("Bearer ")
    {
        let rest = rest.trim();
        if !rest.is_empty() {
            return Some(rest.to_string());
        }
    }

    headers
        .get(SESSION_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_session_header_token() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, HeaderValue::from_static(" abc123 "));
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_missing_or_blank_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        headers.insert(SESSION_HEADER, HeaderValue::from_static("  "));
        assert_eq!(session_token(&headers), None);
    }
}
