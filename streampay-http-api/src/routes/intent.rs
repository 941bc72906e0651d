use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use streampay_runtime::intent::{missing_parameters, validate_intent};
use streampay_runtime::{
    ActionRequest, IntentError, IntentKind, ParsedIntent, SessionIdentity, SignableAuthorization,
    intent_description,
};

use crate::ApiState;
use crate::error::ApiError;

pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/intent/parse", post(parse))
        .route("/intent/authorize", post(authorize))
}

#[derive(Deserialize)]
pub struct ParseRequest {
    pub text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResponse {
    #[serde(flatten)]
    pub intent: ParsedIntent,
    pub valid: bool,
    pub description: &'static str,
    pub missing_parameters: Vec<&'static str>,
}

async fn parse(
    State(state): State<Arc<ApiState>>,
    body: Result<Json<ParseRequest>, JsonRejection>,
) -> Result<Json<ParseResponse>, ApiError> {
    let Json(request) = body?;
    let intent = state.parser.parse_intent(&request.text);
    tracing::debug!(
        intent_kind = %intent.intent_kind,
        confidence = intent.confidence,
        "intent parsed"
    );
    Ok(Json(ParseResponse {
        valid: validate_intent(&intent),
        description: intent_description(&intent),
        missing_parameters: missing_parameters(&intent),
        intent,
    }))
}

/// Either free text or an already structured intent.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeRequest {
    pub text: Option<String>,
    pub intent_kind: Option<IntentKind>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

async fn authorize(
    State(state): State<Arc<ApiState>>,
    session: Option<Extension<SessionIdentity>>,
    body: Result<Json<AuthorizeRequest>, JsonRejection>,
) -> Result<Json<SignableAuthorization>, ApiError> {
    let Extension(session) = session.ok_or(IntentError::NotAuthenticated)?;
    let Json(request) = body?;

    let (kind, parameters) = match (request.text, request.intent_kind) {
        (Some(text), _) => structured_from_text(&state, &text)?,
        (None, Some(kind)) => (kind, request.parameters),
        (None, None) => {
            return Err(IntentError::invalid_parameter("text", "provide text or intentKind").into());
        }
    };

    if kind.is_read_only() {
        return Err(IntentError::UnsupportedIntent {
            kind,
            reason: "read-only request, nothing to authorize".into(),
        }
        .into());
    }

    // Refuse to issue anything the orchestrator would reject after signing.
    ActionRequest::decode(kind, &parameters, state.registry.active())?;

    let signable = state
        .builder
        .build(&session.account_address, kind, parameters)?;
    Ok(Json(signable))
}

fn structured_from_text(
    state: &ApiState,
    text: &str,
) -> Result<(IntentKind, Map<String, Value>), IntentError> {
    let parsed = state.parser.parse_intent(text);
    if parsed.intent_kind == IntentKind::Unknown {
        return Err(IntentError::invalid_parameter(
            "text",
            format!("could not understand request: {}", parsed.reasoning),
        ));
    }
    let missing = missing_parameters(&parsed);
    if let Some(first) = missing.first() {
        return Err(IntentError::invalid_parameter(
            *first,
            format!(
                "{} needs: {}",
                intent_description(&parsed),
                missing.join(", ")
            ),
        ));
    }
    Ok((parsed.intent_kind, parsed.parameters_json()))
}
