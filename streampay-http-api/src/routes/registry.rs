use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use streampay_runtime::NetworkConfig;

use crate::ApiState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryResponse {
    pub active: NetworkConfig,
    pub networks: Vec<String>,
}

pub fn router() -> Router<Arc<ApiState>> {
    Router::new().route("/registry", get(registry))
}

async fn registry(State(state): State<Arc<ApiState>>) -> Json<RegistryResponse> {
    Json(RegistryResponse {
        active: state.registry.active().clone(),
        networks: state.registry.networks().map(|n| n.name.clone()).collect(),
    })
}
