use agency_cms_core::preview::PreviewOutcome;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::state::AppState;

/// Public, unauthenticated preview route.
pub fn routes() -> Router<AppState> {
    Router::new().route("/preview/{token}", get(show_preview))
}

#[derive(Debug, Deserialize)]
pub struct PreviewParams {
    #[serde(default)]
    pub password: Option<String>,
}

async fn show_preview(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Query(params): Query<PreviewParams>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let outcome = state
        .previews()
        .resolve(&token, params.password.as_deref())
        .await?;

    let response = match outcome {
        PreviewOutcome::Content { link, entry } => (
            StatusCode::OK,
            json!({
                "state": "ok",
                "content": entry,
                "message": link.message,
                "expiresAt": link.expires_at,
            }),
        ),
        PreviewOutcome::Expired => (
            StatusCode::GONE,
            json!({ "state": "expired", "message": "This preview link has expired." }),
        ),
        PreviewOutcome::NotFound => (
            StatusCode::NOT_FOUND,
            json!({ "state": "notFound", "message": "This preview link does not exist." }),
        ),
        PreviewOutcome::PasswordRequired => (
            StatusCode::UNAUTHORIZED,
            json!({ "state": "passwordRequired", "message": "Enter the password to view this preview." }),
        ),
    };

    Ok((response.0, Json(response.1)))
}
