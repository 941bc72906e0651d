use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use serde::Serialize;
use serde_json::Value;

use streampay_runtime::{SessionIdentity, TransactionDescriptor};

use crate::ApiState;
use crate::error::ApiError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub success: bool,
    pub tx_requests: Vec<TransactionDescriptor>,
}

pub fn router() -> Router<Arc<ApiState>> {
    Router::new().route("/intent/execute", post(execute))
}

/// `{ signature, payload }` → ordered unsigned transactions.
///
/// The body is taken as raw JSON so every shape problem reaches the gate
/// and comes back as field diagnostics.
async fn execute(
    State(state): State<Arc<ApiState>>,
    session: Option<Extension<SessionIdentity>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let session = session.map(|Extension(s)| s);
    // An anonymous caller gets NotAuthenticated from the gate before any
    // body diagnostics.
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) if session.is_some() => return Err(rejection.into()),
        Err(_) => Value::Null,
    };

    let signature = body.get("signature").and_then(Value::as_str).unwrap_or_default();
    let payload = body.get("payload").cloned().unwrap_or(Value::Null);

    let verified = state.gate.verify(session.as_ref(), signature, &payload)?;
    let tx_requests = state.orchestrator.resolve_verified(&verified)?;

    tracing::info!(
        request_id = %verified.payload.request_id,
        signer = %verified.recovered_address,
        steps = tx_requests.len(),
        "execution plan returned"
    );

    Ok(Json(ExecuteResponse {
        success: true,
        tx_requests,
    }))
}
