use agency_cms_core::content::{ContentEntry, ContentKind, ContentRef};
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Public read of published entries, served through the content cache.
pub fn routes() -> Router<AppState> {
    Router::new().route("/content/{kind}/{id}", get(show_published))
}

async fn show_published(
    State(state): State<AppState>,
    Path((kind, id)): Path<(ContentKind, i64)>,
) -> ApiResult<Json<ContentEntry>> {
    let content = ContentRef::new(kind, id);
    if let Some(entry) = state.cache().get(content).await {
        return Ok(Json(ContentEntry::clone(&entry)));
    }

    let entry = state
        .content()
        .find_entry(content)
        .await?
        .filter(|entry| entry.is_published)
        .ok_or_else(|| ApiError::NotFound(format!("content {content}")))?;

    let cached = state.cache().insert(entry).await;
    Ok(Json(ContentEntry::clone(&cached)))
}
