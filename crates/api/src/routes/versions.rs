use agency_cms_core::content::{ContentKind, ContentRef};
use agency_cms_core::version::{ContentSnapshot, VersionComparison, VersioningService};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::RequireEditor;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Version history routes for editors.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/admin/content/{kind}/{id}/versions",
            get(list_versions).post(create_version),
        )
        .route("/admin/content/{kind}/{id}/versions/compare", get(compare_versions))
        .route("/admin/content/{kind}/{id}/versions/{version}", get(show_version))
        .route(
            "/admin/content/{kind}/{id}/versions/{version}/restore",
            post(restore_version),
        )
        .route(
            "/admin/content/{kind}/{id}/versions/{version}/publish",
            post(publish_version),
        )
        .route("/admin/content/{kind}/{id}/drafts", post(create_draft))
}

/// A snapshot with its rendered change summary.
#[derive(Debug, Serialize)]
pub struct VersionResource {
    #[serde(flatten)]
    pub snapshot: ContentSnapshot,
    pub summary: String,
}

impl VersionResource {
    async fn build(versioning: &VersioningService, snapshot: ContentSnapshot) -> ApiResult<Self> {
        let summary = versioning.summarize(&snapshot).await?;
        Ok(Self { snapshot, summary })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SnapshotRequest {
    #[serde(default)]
    pub change_summary: Option<String>,
    #[serde(default)]
    pub change_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub patch: Value,
    #[serde(default)]
    pub change_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompareParams {
    pub from: i32,
    pub to: i32,
}

#[derive(Debug, Serialize)]
pub struct RestoreResponse {
    pub restored: bool,
    pub version: VersionResource,
}

async fn list_versions(
    State(state): State<AppState>,
    RequireEditor(_user): RequireEditor,
    Path((kind, id)): Path<(ContentKind, i64)>,
) -> ApiResult<Json<Vec<VersionResource>>> {
    let versioning = state.versioning();
    let snapshots = versioning.list_versions(ContentRef::new(kind, id)).await?;

    let mut resources = Vec::with_capacity(snapshots.len());
    for snapshot in snapshots {
        resources.push(VersionResource::build(versioning, snapshot).await?);
    }
    Ok(Json(resources))
}

async fn create_version(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path((kind, id)): Path<(ContentKind, i64)>,
    Json(body): Json<SnapshotRequest>,
) -> ApiResult<(StatusCode, Json<VersionResource>)> {
    let versioning = state.versioning();
    let snapshot = versioning
        .snapshot_entry(
            ContentRef::new(kind, id),
            Some(user.user_id),
            body.change_summary,
            body.change_notes,
        )
        .await?;
    let resource = VersionResource::build(versioning, snapshot).await?;
    Ok((StatusCode::CREATED, Json(resource)))
}

async fn show_version(
    State(state): State<AppState>,
    RequireEditor(_user): RequireEditor,
    Path((kind, id, version)): Path<(ContentKind, i64, i32)>,
) -> ApiResult<Json<VersionResource>> {
    let versioning = state.versioning();
    let snapshot = versioning.get_version(ContentRef::new(kind, id), version).await?;
    Ok(Json(VersionResource::build(versioning, snapshot).await?))
}

async fn compare_versions(
    State(state): State<AppState>,
    RequireEditor(_user): RequireEditor,
    Path((kind, id)): Path<(ContentKind, i64)>,
    Query(params): Query<CompareParams>,
) -> ApiResult<Json<VersionComparison>> {
    let comparison = state
        .versioning()
        .compare(ContentRef::new(kind, id), params.from, params.to)
        .await?;
    Ok(Json(comparison))
}

async fn restore_version(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path((kind, id, version)): Path<(ContentKind, i64, i32)>,
) -> ApiResult<Json<RestoreResponse>> {
    let subject = ContentRef::new(kind, id);
    let versioning = state.versioning();
    let snapshot = versioning.get_version(subject, version).await?;

    if !versioning.restore(&snapshot).await? {
        return Err(ApiError::NotFound(format!(
            "content {subject} no longer exists"
        )));
    }
    tracing::info!(content = %subject, version, user = user.user_id, "version restored via admin");

    let snapshot = versioning.get_version(subject, version).await?;
    Ok(Json(RestoreResponse {
        restored: true,
        version: VersionResource::build(versioning, snapshot).await?,
    }))
}

async fn publish_version(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path((kind, id, version)): Path<(ContentKind, i64, i32)>,
) -> ApiResult<(StatusCode, Json<VersionResource>)> {
    let versioning = state.versioning();
    let snapshot = versioning
        .publish(ContentRef::new(kind, id), version, Some(user.user_id))
        .await?;
    let resource = VersionResource::build(versioning, snapshot).await?;
    Ok((StatusCode::CREATED, Json(resource)))
}

async fn create_draft(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path((kind, id)): Path<(ContentKind, i64)>,
    Json(body): Json<DraftRequest>,
) -> ApiResult<(StatusCode, Json<VersionResource>)> {
    let versioning = state.versioning();
    let draft = versioning
        .draft_entry(
            ContentRef::new(kind, id),
            &body.patch,
            Some(user.user_id),
            body.change_notes,
        )
        .await?;
    let resource = VersionResource::build(versioning, draft).await?;
    Ok((StatusCode::CREATED, Json(resource)))
}
