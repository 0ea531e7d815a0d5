//! HTTP-level tests for preview link management and the public preview route.

mod common;

use agency_cms_core::content::{ContentKind, ContentRef};
use agency_cms_core::store::PreviewLinkRepository;
use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::{build_test_app, seed_entry, send, token_for};
use serde_json::json;
use uuid::Uuid;

fn service() -> ContentRef {
    ContentRef::new(ContentKind::Service, 3)
}

#[tokio::test]
async fn issue_and_resolve_public_link() {
    let app = build_test_app();
    let editor = token_for(2, "editor");
    seed_entry(&app.store, service(), json!({ "title": "Brand Strategy" })).await;

    let (status, link) = send(
        &app.router,
        Method::POST,
        "/admin/preview-links",
        Some(&editor),
        Some(json!({ "content_type": "service", "content_id": 3, "expires_in_hours": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(link["view_count"], 0);
    assert_eq!(link["requires_password"], false);
    assert_eq!(link["state"], "active");
    assert!(link.get("password_hash").is_none());
    let token = link["token"].as_str().unwrap().to_string();
    assert_eq!(link["url"], format!("https://studio.test/preview/{token}"));

    let (status, body) = send(&app.router, Method::GET, &format!("/preview/{token}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "ok");
    assert_eq!(body["content"]["fields"]["title"], "Brand Strategy");

    let (status, list) = send(
        &app.router,
        Method::GET,
        "/admin/content/service/3/preview-links",
        Some(&editor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["view_count"], 1);
}

#[tokio::test]
async fn password_protected_link() {
    let app = build_test_app();
    let editor = token_for(2, "editor");
    seed_entry(&app.store, service(), json!({ "title": "Secret" })).await;

    let (_, link) = send(
        &app.router,
        Method::POST,
        "/admin/preview-links",
        Some(&editor),
        Some(json!({
            "content_type": "service",
            "content_id": 3,
            "expires_in_hours": 24,
            "password": "letmein",
            "message": "Draft for the client"
        })),
    )
    .await;
    assert_eq!(link["requires_password"], true);
    let token = link["token"].as_str().unwrap();

    let (status, body) = send(&app.router, Method::GET, &format!("/preview/{token}"), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["state"], "passwordRequired");

    let (status, _) = send(
        &app.router,
        Method::GET,
        &format!("/preview/{token}?password=nope"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app.router,
        Method::GET,
        &format!("/preview/{token}?password=letmein"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Draft for the client");
}

#[tokio::test]
async fn past_expiry_is_rejected_on_issue() {
    let app = build_test_app();
    let editor = token_for(2, "editor");
    seed_entry(&app.store, service(), json!({ "title": "T" })).await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/admin/preview-links",
        Some(&editor),
        Some(json!({
            "content_type": "service",
            "content_id": 3,
            "expires_at": (Utc::now() - Duration::minutes(1)).to_rfc3339()
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["type"], "validationError");
    assert!(app.store.list_links(service()).await.unwrap().is_empty());
}

#[tokio::test]
async fn oversized_lifetime_is_rejected_on_issue() {
    let app = build_test_app();
    let editor = token_for(2, "editor");
    seed_entry(&app.store, service(), json!({ "title": "T" })).await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/admin/preview-links",
        Some(&editor),
        Some(json!({
            "content_type": "service",
            "content_id": 3,
            "expires_in_hours": 9_000_000_000_000_000_000_i64
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["type"], "validationError");
    assert!(app.store.list_links(service()).await.unwrap().is_empty());
}

#[tokio::test]
async fn deactivated_link_is_gone_and_unknown_token_not_found() {
    let app = build_test_app();
    let editor = token_for(2, "editor");
    seed_entry(&app.store, service(), json!({ "title": "T" })).await;

    let (_, link) = send(
        &app.router,
        Method::POST,
        "/admin/preview-links",
        Some(&editor),
        Some(json!({ "content_type": "service", "content_id": 3 })),
    )
    .await;
    let id = link["id"].as_str().unwrap();
    let token = link["token"].as_str().unwrap();

    let (status, deactivated) = send(
        &app.router,
        Method::POST,
        &format!("/admin/preview-links/{id}/deactivate"),
        Some(&editor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deactivated["state"], "deactivated");

    let (status, body) = send(&app.router, Method::GET, &format!("/preview/{token}"), None, None).await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["state"], "expired");

    let (status, body) = send(&app.router, Method::GET, "/preview/does-not-exist", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["state"], "notFound");
}

#[tokio::test]
async fn revocation_is_admin_only() {
    let app = build_test_app();
    let editor = token_for(2, "editor");
    let admin = token_for(1, "admin");
    seed_entry(&app.store, service(), json!({ "title": "T" })).await;

    let (_, link) = send(
        &app.router,
        Method::POST,
        "/admin/preview-links",
        Some(&editor),
        Some(json!({ "content_type": "service", "content_id": 3 })),
    )
    .await;
    let id = link["id"].as_str().unwrap();

    let (status, _) = send(&app.router, Method::DELETE, &format!("/admin/preview-links/{id}"), Some(&editor), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app.router, Method::DELETE, &format!("/admin/preview-links/{id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let id: Uuid = id.parse().unwrap();
    assert!(app.store.find_link(id).await.unwrap().is_none());
}

#[tokio::test]
async fn issuing_for_missing_content_is_not_found() {
    let app = build_test_app();
    let editor = token_for(2, "editor");
    let (status, _) = send(
        &app.router,
        Method::POST,
        "/admin/preview-links",
        Some(&editor),
        Some(json!({ "content_type": "page", "content_id": 77 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
