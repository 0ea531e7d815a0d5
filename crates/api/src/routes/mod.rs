pub mod content;
pub mod health;
pub mod preview;
pub mod preview_links;
pub mod versions;

use axum::Router;

use crate::state::AppState;

/// Assemble the full router with all route groups.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(versions::routes())
        .merge(preview_links::routes())
        .merge(preview::routes())
        .merge(content::routes())
        .with_state(state)
}
