use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::{ContentRef, FieldMap};
use crate::UserId;

/// Immutable record of a content entry's fields at a point in time.
/// Maps to the `content_versions` PostgreSQL table.
///
/// Only `is_current` ever changes after the row is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSnapshot {
    pub id: Uuid,
    pub subject: ContentRef,
    pub version_number: i32,
    pub content_data: FieldMap,
    pub author_id: UserId,
    pub change_summary: Option<String>,
    pub change_notes: Option<String>,
    pub is_published: bool,
    pub is_current: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Input for a snapshot insert. The store assigns `id`, `version_number`
/// and `created_at`.
#[derive(Debug, Clone)]
pub struct NewSnapshot {
    pub subject: ContentRef,
    pub content_data: FieldMap,
    pub author_id: UserId,
    pub change_summary: Option<String>,
    pub change_notes: Option<String>,
    pub is_published: bool,
    pub is_current: bool,
    pub published_at: Option<DateTime<Utc>>,
}

impl NewSnapshot {
    pub fn into_snapshot(self, id: Uuid, version_number: i32, created_at: DateTime<Utc>) -> ContentSnapshot {
        ContentSnapshot {
            id,
            subject: self.subject,
            version_number,
            content_data: self.content_data,
            author_id: self.author_id,
            change_summary: self.change_summary,
            change_notes: self.change_notes,
            is_published: self.is_published,
            is_current: self.is_current,
            published_at: self.published_at,
            created_at,
        }
    }
}
