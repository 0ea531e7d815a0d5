use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

/// CORS for the admin UI and public pages. Bearer tokens travel in a
/// header, so no credentials mode is needed.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
