use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use streampay_runtime::{IntentError, SessionIdentity};

use crate::ApiState;
use crate::error::ApiError;

/// Bearer token from `Authorization`, with or without the `Bearer ` prefix.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get("authorization").and_then(|v| v.to_str().ok())?;
    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    (!token.is_empty()).then_some(token)
}

/// Resolves a `sess_` token to a [`SessionIdentity`] request extension.
///
/// Requests without a token pass through anonymously; handlers that need
/// an identity reject them. A token that is present but unknown or expired
/// is rejected here.
pub async fn auth_middleware(
    State(state): State<Arc<ApiState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path();

    // Skip auth for health check and session auth endpoints
    if path == "/health"
        || path == "/session/auth/challenge"
        || path == "/session/auth/verify"
    {
        return Ok(next.run(request).await);
    }

    let Some(token) = bearer_token(request.headers()) else {
        return Ok(next.run(request).await);
    };

    match state.sessions.validate(token) {
        Some(address) => {
            request.extensions_mut().insert(SessionIdentity::new(address));
            Ok(next.run(request).await)
        }
        None => Err(ApiError(IntentError::NotAuthenticated)),
    }
}
