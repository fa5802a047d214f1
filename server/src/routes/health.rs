//! Liveness and identity endpoints. Neither needs credentials nor touches
//! the database.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

pub const SERVICE_NAME: &str = "Lumen Transaction Mirror";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    /// Reconciliation engine the mirror validates documents with
    pub engine_version: &'static str,
    pub mirror_key_required: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { SERVICE_NAME }))
        .route("/health", get(health))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        engine_version: lumen_engine::VERSION,
        mirror_key_required: state.config.auth_secret.is_some(),
    })
}
