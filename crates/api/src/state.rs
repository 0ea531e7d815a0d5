use std::sync::Arc;

use agency_cms_core::cache::ContentCache;
use agency_cms_core::events::EventBus;
use agency_cms_core::preview::PreviewLinkIssuer;
use agency_cms_core::store::{ContentRepository, PreviewLinkRepository, SnapshotRepository};
use agency_cms_core::version::VersioningService;

use crate::config::AppConfig;

/// Shared application state, passed to all handlers via Axum's `State` extractor.
/// Wrapped in `Arc` so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    config: AppConfig,
    event_bus: EventBus,
    content: Arc<dyn ContentRepository>,
    versioning: VersioningService,
    previews: PreviewLinkIssuer,
    cache: ContentCache,
}

impl AppState {
    /// Wire the services over a single storage backend.
    pub fn new<S>(store: Arc<S>, config: AppConfig, event_bus: EventBus, cache: ContentCache) -> Self
    where
        S: ContentRepository + SnapshotRepository + PreviewLinkRepository + 'static,
    {
        let versioning = VersioningService::new(store.clone(), store.clone(), event_bus.clone())
            .with_cache(cache.clone());
        let previews = PreviewLinkIssuer::new(store.clone(), store.clone(), event_bus.clone());
        Self {
            inner: Arc::new(InnerState {
                config,
                event_bus,
                content: store,
                versioning,
                previews,
                cache,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.event_bus
    }

    pub fn content(&self) -> &dyn ContentRepository {
        self.inner.content.as_ref()
    }

    pub fn versioning(&self) -> &VersioningService {
        &self.inner.versioning
    }

    pub fn previews(&self) -> &PreviewLinkIssuer {
        &self.inner.previews
    }

    pub fn cache(&self) -> &ContentCache {
        &self.inner.cache
    }
}
