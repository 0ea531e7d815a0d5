use agency_cms_core::content::{ContentKind, ContentRef};
use agency_cms_core::preview::{IssuePreviewLink, LinkState, PreviewLink};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{RequireAdmin, RequireEditor};
use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Preview link management for editors; revocation is admin-only.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/preview-links", post(issue_link))
        .route("/admin/preview-links/{id}", delete(revoke_link))
        .route("/admin/preview-links/{id}/deactivate", post(deactivate_link))
        .route("/admin/content/{kind}/{id}/preview-links", get(list_links))
}

#[derive(Debug, Deserialize)]
pub struct IssueRequest {
    pub content_type: ContentKind,
    pub content_id: i64,
    /// Absolute expiry. Wins over `expires_in_hours`.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_in_hours: Option<i64>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PreviewLinkResource {
    #[serde(flatten)]
    pub link: PreviewLink,
    pub url: String,
    pub requires_password: bool,
    pub state: LinkState,
}

impl PreviewLinkResource {
    fn new(link: PreviewLink, config: &AppConfig) -> Self {
        Self {
            url: config.preview_url(&link.token),
            requires_password: link.requires_password(),
            state: link.state_at(Utc::now()),
            link,
        }
    }
}

/// `now + hours`, or `None` when the result is not representable.
pub fn expiry_after_hours(now: DateTime<Utc>, hours: i64) -> Option<DateTime<Utc>> {
    Duration::try_hours(hours).and_then(|lifetime| now.checked_add_signed(lifetime))
}

async fn issue_link(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Json(body): Json<IssueRequest>,
) -> ApiResult<(StatusCode, Json<PreviewLinkResource>)> {
    let expires_at = match (body.expires_at, body.expires_in_hours) {
        (Some(at), _) => at,
        (None, Some(hours)) if hours > 0 => expiry_after_hours(Utc::now(), hours)
            .ok_or_else(|| ApiError::Unprocessable("expires_in_hours is out of range".into()))?,
        (None, Some(_)) => {
            return Err(ApiError::Unprocessable(
                "expires_in_hours must be positive".into(),
            ))
        }
        (None, None) => expiry_after_hours(Utc::now(), state.config().preview_default_ttl_hours)
            .ok_or_else(|| ApiError::Unprocessable("default preview lifetime is out of range".into()))?,
    };

    let link = state
        .previews()
        .issue(IssuePreviewLink {
            content: ContentRef::new(body.content_type, body.content_id),
            expires_at,
            password: body.password,
            message: body.message,
            issuer_id: Some(user.user_id),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PreviewLinkResource::new(link, state.config())),
    ))
}

async fn list_links(
    State(state): State<AppState>,
    RequireEditor(_user): RequireEditor,
    Path((kind, id)): Path<(ContentKind, i64)>,
) -> ApiResult<Json<Vec<PreviewLinkResource>>> {
    let links = state.previews().list_links(ContentRef::new(kind, id)).await?;
    Ok(Json(
        links
            .into_iter()
            .map(|link| PreviewLinkResource::new(link, state.config()))
            .collect(),
    ))
}

async fn deactivate_link(
    State(state): State<AppState>,
    RequireEditor(_user): RequireEditor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PreviewLinkResource>> {
    let link = state.previews().deactivate(id).await?;
    Ok(Json(PreviewLinkResource::new(link, state.config())))
}

async fn revoke_link(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.previews().revoke(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
