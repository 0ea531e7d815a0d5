#![allow(dead_code)]

use std::sync::Arc;

use agency_cms_api::auth::Claims;
use agency_cms_api::config::AppConfig;
use agency_cms_api::routes;
use agency_cms_api::state::AppState;
use agency_cms_core::cache::ContentCache;
use agency_cms_core::content::{ContentEntry, ContentRef, FieldMap};
use agency_cms_core::events::EventBus;
use agency_cms_core::store::{ContentRepository, MemoryStore};
use axum::body::{to_bytes, Body};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test-secret";

pub fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: String::new(),
        db_max_connections: 1,
        db_min_connections: 1,
        jwt_secret: JWT_SECRET.to_string(),
        event_bus_capacity: 64,
        log_level: "debug".to_string(),
        public_base_url: "https://studio.test".to_string(),
        preview_default_ttl_hours: 72,
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub cache: ContentCache,
}

/// Router over a fresh in-memory store, mirroring `main.rs` minus Postgres.
pub fn build_test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let bus = EventBus::new(64);
    let cache = ContentCache::new();
    cache.spawn_invalidation(&bus);
    let state = AppState::new(store.clone(), test_config(), bus, cache.clone());
    TestApp {
        router: routes::build_router(state),
        store,
        cache,
    }
}

pub async fn seed_entry(store: &MemoryStore, content: ContentRef, fields: Value) -> ContentEntry {
    let fields: FieldMap = fields.as_object().cloned().unwrap();
    let entry = ContentEntry::new(content, fields, Utc::now());
    store.save_entry(&entry).await.unwrap();
    entry
}

pub fn token_for(user_id: i64, role: &str) -> String {
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        exp: Utc::now().timestamp() + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
