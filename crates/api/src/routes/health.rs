use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Health check routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/ping", get(ping))
}

/// Full health check, including a storage round trip.
async fn health_check(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    state
        .content()
        .ping()
        .await
        .map_err(|e| ApiError::Internal(format!("storage health check failed: {e}")))?;

    Ok(Json(json!({
        "status": "ok",
        "database": "connected",
        "subscribers": state.event_bus().subscriber_count(),
        "cachedEntries": state.cache().len().await,
    })))
}

/// Lightweight ping without touching storage.
async fn ping() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
