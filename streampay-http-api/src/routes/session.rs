use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use serde_json::{Value, json};

use streampay_runtime::IntentError;

use crate::ApiState;
use crate::auth::bearer_token;
use crate::error::ApiError;
use crate::session_auth;

pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        // Auth routes (no auth required)
        .route("/session/auth/challenge", post(session_auth::challenge))
        .route("/session/auth/verify", post(session_auth::verify))
        .route("/session/auth/logout", post(logout))
}

async fn logout(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let token = bearer_token(&headers).ok_or(IntentError::NotAuthenticated)?;
    if !state.sessions.revoke(token) {
        return Err(IntentError::NotAuthenticated.into());
    }
    Ok(Json(json!({"status": "logged_out"})))
}
