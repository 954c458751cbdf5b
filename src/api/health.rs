//! Health check endpoint

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use super::ApiState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Whether the provider credential is configured
    #[serde(rename = "groqKey")]
    pub groq_key: bool,
    pub version: &'static str,
}

/// Build health router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state)
}

/// Liveness probe - answers even when the credential is missing
async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        groq_key: state.credential_configured,
        version: env!("CARGO_PKG_VERSION"),
    })
}
