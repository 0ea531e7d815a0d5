//! Storage seams for content entries, snapshots and preview links.
//!
//! Each backend implements all three traits over one connection so that
//! operations touching several tables (restore, publish) can share a
//! transaction.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::content::{ContentEntry, ContentRef};
use crate::error::CoreResult;
use crate::preview::PreviewLink;
use crate::version::{ContentSnapshot, NewSnapshot};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn find_entry(&self, content: ContentRef) -> CoreResult<Option<ContentEntry>>;

    /// Insert or update the live entry.
    async fn save_entry(&self, entry: &ContentEntry) -> CoreResult<()>;

    /// Connectivity check for health endpoints.
    async fn ping(&self) -> CoreResult<()>;
}

#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Persist a snapshot with the next version number for its subject.
    ///
    /// Numbering, clearing the previous current flag (when `new.is_current`)
    /// and the insert happen atomically. A lost race on the version number
    /// surfaces as [`CoreError::VersionConflict`](crate::CoreError::VersionConflict).
    async fn insert_snapshot(&self, new: NewSnapshot) -> CoreResult<ContentSnapshot>;

    async fn find_snapshot(&self, id: Uuid) -> CoreResult<Option<ContentSnapshot>>;

    async fn find_by_version(
        &self,
        subject: ContentRef,
        version_number: i32,
    ) -> CoreResult<Option<ContentSnapshot>>;

    /// All snapshots of a subject, newest first.
    async fn list_snapshots(&self, subject: ContentRef) -> CoreResult<Vec<ContentSnapshot>>;

    /// Clear the current flag on every snapshot of `subject`. Returns the
    /// number of rows changed.
    async fn mark_all_non_current(&self, subject: ContentRef) -> CoreResult<u64>;

    /// Overwrite the live entry and make `snapshot_id` the current version
    /// in one transaction. Returns `false` without writing anything when the
    /// entry no longer exists.
    async fn restore_entry(&self, entry: &ContentEntry, snapshot_id: Uuid) -> CoreResult<bool>;

    /// Upsert the live entry and insert `new` as its next version in one
    /// transaction. Nothing is written when the insert fails.
    async fn publish_entry(
        &self,
        entry: &ContentEntry,
        new: NewSnapshot,
    ) -> CoreResult<ContentSnapshot>;
}

#[async_trait]
pub trait PreviewLinkRepository: Send + Sync {
    async fn insert_link(&self, link: &PreviewLink) -> CoreResult<()>;

    async fn find_by_token(&self, token: &str) -> CoreResult<Option<PreviewLink>>;

    async fn find_link(&self, id: Uuid) -> CoreResult<Option<PreviewLink>>;

    /// Links issued for `content`, newest first.
    async fn list_links(&self, content: ContentRef) -> CoreResult<Vec<PreviewLink>>;

    /// Atomically increment the view counter. Returns the new count, or
    /// `None` if the link is gone.
    async fn record_view(&self, id: Uuid) -> CoreResult<Option<i64>>;

    async fn deactivate_link(&self, id: Uuid) -> CoreResult<bool>;

    async fn delete_link(&self, id: Uuid) -> CoreResult<bool>;
}
