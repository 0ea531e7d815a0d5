//! Read-through cache of published entries for the public content routes.
//!
//! Writers evict through [`ContentCache::supersede`] before they return,
//! which also records the entry's `updated_at` as a floor: a reader that
//! loaded an older row cannot put it back. The [`EventBus`] subscription
//! evicts on saves and restores from any other source.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;

use crate::content::{ContentEntry, ContentRef};
use crate::events::EventBus;

#[derive(Debug, Clone, Default)]
pub struct ContentCache {
    slots: Arc<RwLock<Slots>>,
}

#[derive(Debug, Default)]
struct Slots {
    entries: HashMap<ContentRef, Arc<ContentEntry>>,
    floors: HashMap<ContentRef, DateTime<Utc>>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, content: ContentRef) -> Option<Arc<ContentEntry>> {
        self.slots.read().await.entries.get(&content).cloned()
    }

    /// Cache `entry` unless it is older than what the cache already knows.
    /// Returns the entry the cache now holds, or `entry` itself if it was
    /// refused.
    pub async fn insert(&self, entry: ContentEntry) -> Arc<ContentEntry> {
        let entry = Arc::new(entry);
        let mut slots = self.slots.write().await;

        let below_floor = slots
            .floors
            .get(&entry.content)
            .is_some_and(|floor| entry.updated_at < *floor);
        if below_floor {
            tracing::debug!(content = %entry.content, "stale read not cached");
            return entry;
        }

        match slots.entries.get(&entry.content) {
            Some(cached) if cached.updated_at > entry.updated_at => Arc::clone(cached),
            _ => {
                slots.entries.insert(entry.content, Arc::clone(&entry));
                entry
            }
        }
    }

    pub async fn invalidate(&self, content: ContentRef) -> bool {
        self.slots.write().await.entries.remove(&content).is_some()
    }

    /// Evict `content` and refuse later inserts older than `updated_at`.
    pub async fn supersede(&self, content: ContentRef, updated_at: DateTime<Utc>) -> bool {
        let mut slots = self.slots.write().await;
        let floor = slots.floors.entry(content).or_insert(updated_at);
        if *floor < updated_at {
            *floor = updated_at;
        }
        slots.entries.remove(&content).is_some()
    }

    pub async fn clear(&self) {
        self.slots.write().await.entries.clear();
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.entries.is_empty()
    }

    /// Evict entries as content events arrive. Runs until the bus closes.
    pub fn spawn_invalidation(&self, bus: &EventBus) -> JoinHandle<()> {
        let cache = self.clone();
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let Some(content) = event.invalidates() {
                            if cache.invalidate(content).await {
                                tracing::debug!(%content, "content cache entry evicted");
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "content cache fell behind, clearing");
                        cache.clear().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
