use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::diff::{self, FieldDiff, TextChange, INITIAL_VERSION_SUMMARY};
use super::model::{ContentSnapshot, NewSnapshot};
use crate::cache::ContentCache;
use crate::content::validate::{normalize_text, validate_patch, validate_summary, ValidationError};
use crate::content::{ContentEntry, ContentRef, Versionable};
use crate::error::{CoreError, CoreResult};
use crate::events::{ContentEvent, EventBus};
use crate::store::{ContentRepository, SnapshotRepository};
use crate::UserId;

/// Attempts at claiming a version number before giving up on a conflict.
pub const MAX_VERSION_ATTEMPTS: usize = 3;

/// Field diff between two versions plus line diffs for text fields.
#[derive(Debug, Clone, Serialize)]
pub struct VersionComparison {
    pub subject: ContentRef,
    pub from: i32,
    pub to: i32,
    pub changes: FieldDiff,
    pub text: BTreeMap<String, Vec<TextChange>>,
}

/// Snapshot history, diff, restore and draft operations.
#[derive(Clone)]
pub struct VersioningService {
    snapshots: Arc<dyn SnapshotRepository>,
    content: Arc<dyn ContentRepository>,
    events: EventBus,
    cache: Option<ContentCache>,
}

impl VersioningService {
    pub fn new(
        snapshots: Arc<dyn SnapshotRepository>,
        content: Arc<dyn ContentRepository>,
        events: EventBus,
    ) -> Self {
        Self {
            snapshots,
            content,
            events,
            cache: None,
        }
    }

    /// Evict entries from `cache` before any write returns.
    pub fn with_cache(mut self, cache: ContentCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Record the entity's current fields as the new current version.
    ///
    /// Never mutates `entity`. Fails with [`CoreError::Authorship`] when no
    /// author is given.
    pub async fn create_snapshot<E>(
        &self,
        entity: &E,
        author_id: Option<UserId>,
        change_summary: Option<String>,
        change_notes: Option<String>,
    ) -> CoreResult<ContentSnapshot>
    where
        E: Versionable + Sync + ?Sized,
    {
        let new = prepare_snapshot(entity, author_id, change_summary, change_notes)?;
        let snapshot = self.insert_with_retry(new, None).await?;
        self.snapshot_recorded(&snapshot);
        Ok(snapshot)
    }

    /// Snapshot the stored live entry for `subject`.
    pub async fn snapshot_entry(
        &self,
        subject: ContentRef,
        author_id: Option<UserId>,
        change_summary: Option<String>,
        change_notes: Option<String>,
    ) -> CoreResult<ContentSnapshot> {
        let entry = self.require_entry(subject).await?;
        self.create_snapshot(&entry, author_id, change_summary, change_notes)
            .await
    }

    /// Persist a new draft: the entity's fields overlaid with `patch`.
    ///
    /// The draft takes the next version number but is neither current nor
    /// published. The live entry is not touched.
    pub async fn create_draft<E>(
        &self,
        entity: &E,
        patch: &Value,
        author_id: Option<UserId>,
        change_notes: Option<String>,
    ) -> CoreResult<ContentSnapshot>
    where
        E: Versionable + Sync + ?Sized,
    {
        let author_id = author_id.ok_or(CoreError::Authorship)?;
        let patch = validate_patch(patch)?;

        let new = NewSnapshot {
            subject: entity.content_ref(),
            content_data: entity.merged_fields(patch),
            author_id,
            change_summary: None,
            change_notes: normalize_text(change_notes),
            is_published: false,
            is_current: false,
            published_at: None,
        };

        let draft = self.insert_with_retry(new, None).await?;
        tracing::info!(content = %draft.subject, version = draft.version_number, "draft created");
        self.events.emit(ContentEvent::DraftCreated {
            content: draft.subject,
            snapshot_id: draft.id,
            version_number: draft.version_number,
        });
        Ok(draft)
    }

    /// Draft against the stored live entry for `subject`.
    pub async fn draft_entry(
        &self,
        subject: ContentRef,
        patch: &Value,
        author_id: Option<UserId>,
        change_notes: Option<String>,
    ) -> CoreResult<ContentSnapshot> {
        let entry = self.require_entry(subject).await?;
        self.create_draft(&entry, patch, author_id, change_notes).await
    }

    pub async fn list_versions(&self, subject: ContentRef) -> CoreResult<Vec<ContentSnapshot>> {
        self.snapshots.list_snapshots(subject).await
    }

    pub async fn find_version(&self, id: Uuid) -> CoreResult<Option<ContentSnapshot>> {
        self.snapshots.find_snapshot(id).await
    }

    pub async fn get_version(
        &self,
        subject: ContentRef,
        version_number: i32,
    ) -> CoreResult<ContentSnapshot> {
        self.snapshots
            .find_by_version(subject, version_number)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("version {version_number} of {subject}")))
    }

    /// Field differences with `a` as the new side and `b` as the old side.
    pub fn diff(&self, a: &ContentSnapshot, b: &ContentSnapshot) -> CoreResult<FieldDiff> {
        if a.subject != b.subject {
            return Err(ValidationError::SubjectMismatch.into());
        }
        Ok(diff::diff(&a.content_data, &b.content_data))
    }

    /// Compare version `from` (old) with version `to` (new).
    pub async fn compare(
        &self,
        subject: ContentRef,
        from: i32,
        to: i32,
    ) -> CoreResult<VersionComparison> {
        let old = self.get_version(subject, from).await?;
        let new = self.get_version(subject, to).await?;
        let changes = self.diff(&new, &old)?;
        let text = changes
            .iter()
            .filter_map(|(field, change)| {
                diff::text_changes(change).map(|lines| (field.clone(), lines))
            })
            .collect();

        Ok(VersionComparison {
            subject,
            from,
            to,
            changes,
            text,
        })
    }

    /// Human-readable description of what a snapshot changed.
    ///
    /// An explicit summary wins. Otherwise the snapshot is diffed against
    /// version `n - 1`; without one it is the initial version.
    pub async fn summarize(&self, snapshot: &ContentSnapshot) -> CoreResult<String> {
        if let Some(summary) = &snapshot.change_summary {
            return Ok(summary.clone());
        }

        let previous = match snapshot.version_number {
            n if n > 1 => {
                self.snapshots
                    .find_by_version(snapshot.subject, n - 1)
                    .await?
            }
            _ => None,
        };

        Ok(match previous {
            None => INITIAL_VERSION_SUMMARY.to_string(),
            Some(previous) => {
                diff::summarize_changes(&diff::diff(&snapshot.content_data, &previous.content_data))
            }
        })
    }

    /// Make `snapshot` the live state of its entry.
    ///
    /// The entry goes through its normal save path and the snapshot becomes
    /// current. No new version is created. Returns `false` when the entry
    /// no longer exists.
    pub async fn restore(&self, snapshot: &ContentSnapshot) -> CoreResult<bool> {
        let Some(mut entry) = self.content.find_entry(snapshot.subject).await? else {
            tracing::warn!(content = %snapshot.subject, version = snapshot.version_number, "restore target is gone");
            return Ok(false);
        };

        entry.replace_fields(snapshot.content_data.clone(), Utc::now());
        if !self.snapshots.restore_entry(&entry, snapshot.id).await? {
            tracing::warn!(content = %snapshot.subject, version = snapshot.version_number, "restore target vanished mid-flight");
            return Ok(false);
        }
        self.evict(&entry).await;

        tracing::info!(content = %snapshot.subject, version = snapshot.version_number, "version restored");
        self.events.emit(ContentEvent::EntrySaved {
            content: snapshot.subject,
        });
        self.events.emit(ContentEvent::VersionRestored {
            content: snapshot.subject,
            snapshot_id: snapshot.id,
            version_number: snapshot.version_number,
        });
        Ok(true)
    }

    /// Put a version live and published, recording the result as a new
    /// current version.
    ///
    /// The entry write and the snapshot insert share one transaction: on
    /// failure the live entry is left as it was.
    pub async fn publish(
        &self,
        subject: ContentRef,
        version_number: i32,
        author_id: Option<UserId>,
    ) -> CoreResult<ContentSnapshot> {
        let author_id = author_id.ok_or(CoreError::Authorship)?;
        let source = self.get_version(subject, version_number).await?;
        let mut entry = self.require_entry(subject).await?;

        let now = Utc::now();
        entry.replace_fields(source.content_data.clone(), now);
        entry.publish(now);

        let new = prepare_snapshot(
            &entry,
            Some(author_id),
            Some(format!("Published version {version_number}")),
            None,
        )?;
        let snapshot = self.insert_with_retry(new, Some(&entry)).await?;
        self.evict(&entry).await;

        self.events.emit(ContentEvent::EntrySaved {
            content: entry.content,
        });
        self.snapshot_recorded(&snapshot);
        Ok(snapshot)
    }

    /// Normal save path for a live entry: re-slug, persist, bust caches.
    pub async fn save_entry(&self, entry: &mut ContentEntry) -> CoreResult<()> {
        entry.touch(Utc::now());
        self.content.save_entry(entry).await?;
        self.evict(entry).await;
        self.events.emit(ContentEvent::EntrySaved {
            content: entry.content,
        });
        Ok(())
    }

    async fn evict(&self, entry: &ContentEntry) {
        if let Some(cache) = &self.cache {
            cache.supersede(entry.content, entry.updated_at).await;
        }
    }

    fn snapshot_recorded(&self, snapshot: &ContentSnapshot) {
        tracing::info!(
            content = %snapshot.subject,
            version = snapshot.version_number,
            author = snapshot.author_id,
            "snapshot created"
        );
        self.events.emit(ContentEvent::SnapshotCreated {
            content: snapshot.subject,
            snapshot_id: snapshot.id,
            version_number: snapshot.version_number,
        });
    }

    async fn require_entry(&self, subject: ContentRef) -> CoreResult<ContentEntry> {
        self.content
            .find_entry(subject)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("content {subject}")))
    }

    /// Insert `new`, retrying lost version-number races. With `entry`, the
    /// live entry is written in the same transaction.
    async fn insert_with_retry(
        &self,
        new: NewSnapshot,
        entry: Option<&ContentEntry>,
    ) -> CoreResult<ContentSnapshot> {
        let mut attempt = 1;
        loop {
            let result = match entry {
                Some(entry) => self.snapshots.publish_entry(entry, new.clone()).await,
                None => self.snapshots.insert_snapshot(new.clone()).await,
            };
            match result {
                Err(CoreError::VersionConflict { subject }) if attempt < MAX_VERSION_ATTEMPTS => {
                    tracing::warn!(%subject, attempt, "version number taken, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

/// Build the insert payload for a current snapshot of `entity`.
fn prepare_snapshot<E>(
    entity: &E,
    author_id: Option<UserId>,
    change_summary: Option<String>,
    change_notes: Option<String>,
) -> CoreResult<NewSnapshot>
where
    E: Versionable + ?Sized,
{
    let author_id = author_id.ok_or(CoreError::Authorship)?;
    let change_summary = normalize_text(change_summary);
    validate_summary(change_summary.as_deref())?;

    let is_published = entity.is_published();
    let published_at = match entity.published_at() {
        None if is_published => Some(Utc::now()),
        existing => existing,
    };

    Ok(NewSnapshot {
        subject: entity.content_ref(),
        content_data: entity.fields(),
        author_id,
        change_summary,
        change_notes: normalize_text(change_notes),
        is_published,
        is_current: true,
        published_at,
    })
}
