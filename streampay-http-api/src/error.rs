//! JSON error responses for [`IntentError`].

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use streampay_runtime::{FieldError, IntentError};

/// Handler error: an [`IntentError`] rendered as
/// `{ success: false, error, code }` with a matching status.
#[derive(Debug)]
pub struct ApiError(pub IntentError);

impl From<IntentError> for ApiError {
    fn from(e: IntentError) -> Self {
        ApiError(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(IntentError::MalformedRequest(vec![FieldError::new(
            "body",
            rejection.body_text(),
        )]))
    }
}

pub fn status_for(error: &IntentError) -> StatusCode {
    match error {
        IntentError::NotAuthenticated
        | IntentError::SignatureExpired { .. }
        | IntentError::InvalidSignature(_) => StatusCode::UNAUTHORIZED,
        IntentError::UserMismatch { .. } => StatusCode::FORBIDDEN,
        IntentError::RequestReplayed { .. } => StatusCode::CONFLICT,
        IntentError::UnsupportedIntent { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        IntentError::MalformedRequest(_)
        | IntentError::InvalidParameters { .. }
        | IntentError::InvalidAddress { .. }
        | IntentError::InvalidAmount { .. }
        | IntentError::InvalidDuration(_)
        | IntentError::UnresolvedToken { .. } => StatusCode::BAD_REQUEST,
        IntentError::ConfigError(_) | IntentError::SerializationError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(code = self.0.code(), "request failed: {}", self.0);
        }
        let mut body = json!({
            "success": false,
            "error": self.0.to_string(),
            "code": self.0.code(),
        });
        let fields = self.0.field_errors();
        if !fields.is_empty() {
            body["fields"] = json!(fields);
        }
        (status, Json(body)).into_response()
    }
}
