use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::IntentKind;

/// A single field-level diagnostic attached to a rejected request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntentError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Malformed request: {}", join_fields(.0))]
    MalformedRequest(Vec<FieldError>),

    #[error("Authorization expired at {expires_at} (now {now})")]
    SignatureExpired { expires_at: i64, now: i64 },

    #[error("Session account {session} does not match payload user {payload}")]
    UserMismatch { session: String, payload: String },

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Authorization request {request_id} was already used")]
    RequestReplayed { request_id: String },

    #[error("Invalid parameter '{field}': {message}")]
    InvalidParameters { field: String, message: String },

    #[error("Invalid address for '{field}': {value}")]
    InvalidAddress { field: String, value: String },

    #[error("Invalid amount for '{field}': {message}")]
    InvalidAmount { field: String, message: String },

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Token '{token}' is not registered on {network}")]
    UnresolvedToken { token: String, network: String },

    #[error("{kind} is not supported: {reason}")]
    UnsupportedIntent { kind: IntentKind, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl IntentError {
    pub fn invalid_parameter(field: impl Into<String>, message: impl Into<String>) -> Self {
        IntentError::InvalidParameters {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_amount(field: impl Into<String>, message: impl Into<String>) -> Self {
        IntentError::InvalidAmount {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_address(field: impl Into<String>, value: impl Into<String>) -> Self {
        IntentError::InvalidAddress {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Stable machine-readable code returned to clients.
    pub fn code(&self) -> &'static str {
        match self {
            IntentError::NotAuthenticated => "NOT_AUTHENTICATED",
            IntentError::MalformedRequest(_) => "MALFORMED_REQUEST",
            IntentError::SignatureExpired { .. } => "SIGNATURE_EXPIRED",
            IntentError::UserMismatch { .. } => "USER_MISMATCH",
            IntentError::InvalidSignature(_) => "INVALID_SIGNATURE",
            IntentError::RequestReplayed { .. } => "REQUEST_REPLAYED",
            IntentError::InvalidParameters { .. } => "INVALID_PARAMETERS",
            IntentError::InvalidAddress { .. } => "INVALID_ADDRESS",
            IntentError::InvalidAmount { .. } => "INVALID_AMOUNT",
            IntentError::InvalidDuration(_) => "INVALID_DURATION",
            IntentError::UnresolvedToken { .. } => "UNRESOLVED_TOKEN",
            IntentError::UnsupportedIntent { .. } => "UNSUPPORTED_INTENT",
            IntentError::ConfigError(_) => "CONFIG_ERROR",
            IntentError::SerializationError(_) => "SERIALIZATION_ERROR",
        }
    }

    /// `false` only for faults on our side of the wire.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            IntentError::ConfigError(_) | IntentError::SerializationError(_)
        )
    }

    /// Rejections worth an audit trail on the caller's side.
    pub fn is_security_rejection(&self) -> bool {
        matches!(
            self,
            IntentError::UserMismatch { .. }
                | IntentError::InvalidSignature(_)
                | IntentError::RequestReplayed { .. }
        )
    }

    /// Field-level diagnostics, when the error carries any.
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            IntentError::MalformedRequest(errors) => errors.clone(),
            IntentError::InvalidParameters { field, message }
            | IntentError::InvalidAmount { field, message } => {
                vec![FieldError::new(field.clone(), message.clone())]
            }
            IntentError::InvalidAddress { field, value } => {
                vec![FieldError::new(field.clone(), format!("not an account address: {value}"))]
            }
            IntentError::InvalidDuration(message) => {
                vec![FieldError::new("duration", message.clone())]
            }
            _ => Vec::new(),
        }
    }
}

impl From<serde_json::Error> for IntentError {
    fn from(e: serde_json::Error) -> Self {
        IntentError::SerializationError(e.to_string())
    }
}

impl From<toml::de::Error> for IntentError {
    fn from(e: toml::de::Error) -> Self {
        IntentError::ConfigError(format!("Invalid registry TOML: {e}"))
    }
}
