use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{ContentRepository, PreviewLinkRepository, SnapshotRepository};
use crate::content::{ContentEntry, ContentRef};
use crate::error::CoreResult;
use crate::preview::PreviewLink;
use crate::version::{ContentSnapshot, NewSnapshot};

/// In-process backend. One lock guards every table, so each trait method
/// is trivially atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    entries: HashMap<ContentRef, ContentEntry>,
    snapshots: Vec<ContentSnapshot>,
    links: Vec<PreviewLink>,
}

impl Tables {
    fn clear_current(&mut self, subject: ContentRef) -> u64 {
        let mut changed = 0;
        for snapshot in self
            .snapshots
            .iter_mut()
            .filter(|s| s.subject == subject && s.is_current)
        {
            snapshot.is_current = false;
            changed += 1;
        }
        changed
    }

    fn push_snapshot(&mut self, new: NewSnapshot) -> ContentSnapshot {
        let next = self
            .snapshots
            .iter()
            .filter(|s| s.subject == new.subject)
            .map(|s| s.version_number)
            .max()
            .unwrap_or(0)
            + 1;

        if new.is_current {
            self.clear_current(new.subject);
        }

        let snapshot = new.into_snapshot(Uuid::now_v7(), next, Utc::now());
        self.snapshots.push(snapshot.clone());
        snapshot
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delete a live entry, leaving its snapshots behind.
    pub async fn remove_entry(&self, content: ContentRef) -> Option<ContentEntry> {
        self.inner.lock().await.entries.remove(&content)
    }
}

#[async_trait]
impl ContentRepository for MemoryStore {
    async fn find_entry(&self, content: ContentRef) -> CoreResult<Option<ContentEntry>> {
        Ok(self.inner.lock().await.entries.get(&content).cloned())
    }

    async fn save_entry(&self, entry: &ContentEntry) -> CoreResult<()> {
        self.inner
            .lock()
            .await
            .entries
            .insert(entry.content, entry.clone());
        Ok(())
    }

    async fn ping(&self) -> CoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl SnapshotRepository for MemoryStore {
    async fn insert_snapshot(&self, new: NewSnapshot) -> CoreResult<ContentSnapshot> {
        Ok(self.inner.lock().await.push_snapshot(new))
    }

    async fn find_snapshot(&self, id: Uuid) -> CoreResult<Option<ContentSnapshot>> {
        let tables = self.inner.lock().await;
        Ok(tables.snapshots.iter().find(|s| s.id == id).cloned())
    }

    async fn find_by_version(
        &self,
        subject: ContentRef,
        version_number: i32,
    ) -> CoreResult<Option<ContentSnapshot>> {
        let tables = self.inner.lock().await;
        Ok(tables
            .snapshots
            .iter()
            .find(|s| s.subject == subject && s.version_number == version_number)
            .cloned())
    }

    async fn list_snapshots(&self, subject: ContentRef) -> CoreResult<Vec<ContentSnapshot>> {
        let tables = self.inner.lock().await;
        let mut snapshots: Vec<_> = tables
            .snapshots
            .iter()
            .filter(|s| s.subject == subject)
            .cloned()
            .collect();
        snapshots.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        Ok(snapshots)
    }

    async fn mark_all_non_current(&self, subject: ContentRef) -> CoreResult<u64> {
        Ok(self.inner.lock().await.clear_current(subject))
    }

    async fn restore_entry(&self, entry: &ContentEntry, snapshot_id: Uuid) -> CoreResult<bool> {
        let mut tables = self.inner.lock().await;
        let known_snapshot = tables
            .snapshots
            .iter()
            .any(|s| s.id == snapshot_id && s.subject == entry.content);
        if !known_snapshot || !tables.entries.contains_key(&entry.content) {
            return Ok(false);
        }

        tables.entries.insert(entry.content, entry.clone());
        tables.clear_current(entry.content);
        if let Some(snapshot) = tables.snapshots.iter_mut().find(|s| s.id == snapshot_id) {
            snapshot.is_current = true;
        }
        Ok(true)
    }

    async fn publish_entry(
        &self,
        entry: &ContentEntry,
        new: NewSnapshot,
    ) -> CoreResult<ContentSnapshot> {
        let mut tables = self.inner.lock().await;
        tables.entries.insert(entry.content, entry.clone());
        Ok(tables.push_snapshot(new))
    }
}

#[async_trait]
impl PreviewLinkRepository for MemoryStore {
    async fn insert_link(&self, link: &PreviewLink) -> CoreResult<()> {
        self.inner.lock().await.links.push(link.clone());
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> CoreResult<Option<PreviewLink>> {
        let tables = self.inner.lock().await;
        Ok(tables.links.iter().find(|l| l.token == token).cloned())
    }

    async fn find_link(&self, id: Uuid) -> CoreResult<Option<PreviewLink>> {
        let tables = self.inner.lock().await;
        Ok(tables.links.iter().find(|l| l.id == id).cloned())
    }

    async fn list_links(&self, content: ContentRef) -> CoreResult<Vec<PreviewLink>> {
        let tables = self.inner.lock().await;
        let mut links: Vec<_> = tables
            .links
            .iter()
            .filter(|l| l.content == content)
            .cloned()
            .collect();
        links.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(links)
    }

    async fn record_view(&self, id: Uuid) -> CoreResult<Option<i64>> {
        let mut tables = self.inner.lock().await;
        Ok(tables.links.iter_mut().find(|l| l.id == id).map(|link| {
            link.view_count += 1;
            link.view_count
        }))
    }

    async fn deactivate_link(&self, id: Uuid) -> CoreResult<bool> {
        let mut tables = self.inner.lock().await;
        match tables.links.iter_mut().find(|l| l.id == id) {
            Some(link) => {
                link.is_active = false;
                link.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_link(&self, id: Uuid) -> CoreResult<bool> {
        let mut tables = self.inner.lock().await;
        let before = tables.links.len();
        tables.links.retain(|l| l.id != id);
        Ok(tables.links.len() < before)
    }
}
