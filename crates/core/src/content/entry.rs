use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::reference::ContentRef;

/// Open-ended field bag stored for a content entry and copied into snapshots.
pub type FieldMap = serde_json::Map<String, Value>;

/// Anything that can be placed under version control.
pub trait Versionable {
    fn content_ref(&self) -> ContentRef;

    /// Full serialization of the record's editable fields.
    fn fields(&self) -> FieldMap;

    fn is_published(&self) -> bool;

    fn published_at(&self) -> Option<DateTime<Utc>>;

    /// Current fields overlaid with `patch`. Does not modify the record.
    fn merged_fields(&self, patch: FieldMap) -> FieldMap {
        let mut merged = self.fields();
        merged.extend(patch);
        merged
    }
}

/// Live content record. Maps to the `content_entries` PostgreSQL table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntry {
    #[serde(flatten)]
    pub content: ContentRef,
    pub fields: FieldMap,
    pub slug: Option<String>,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentEntry {
    pub fn new(content: ContentRef, fields: FieldMap, now: DateTime<Utc>) -> Self {
        let mut entry = Self {
            content,
            fields,
            slug: None,
            is_published: false,
            published_at: None,
            created_at: now,
            updated_at: now,
        };
        entry.touch(now);
        entry
    }

    /// Overwrite every field with `fields` and run the save-path hooks.
    pub fn replace_fields(&mut self, fields: FieldMap, now: DateTime<Utc>) {
        self.fields = fields;
        self.touch(now);
    }

    /// Mark the entry published. An existing `published_at` is kept.
    pub fn publish(&mut self, now: DateTime<Utc>) {
        self.is_published = true;
        if self.published_at.is_none() {
            self.published_at = Some(now);
        }
        self.touch(now);
    }

    /// Save-path hook: re-derive the slug and bump `updated_at`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.slug = self.derive_slug();
        self.updated_at = now;
    }

    fn derive_slug(&self) -> Option<String> {
        let explicit = self
            .fields
            .get("slug")
            .and_then(Value::as_str)
            .map(slugify)
            .filter(|s| !s.is_empty());
        explicit.or_else(|| {
            self.fields
                .get("title")
                .and_then(Value::as_str)
                .map(slugify)
                .filter(|s| !s.is_empty())
        })
    }
}

impl Versionable for ContentEntry {
    fn content_ref(&self) -> ContentRef {
        self.content
    }

    fn fields(&self) -> FieldMap {
        self.fields.clone()
    }

    fn is_published(&self) -> bool {
        self.is_published
    }

    fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }
}

/// Lowercase ASCII slug: alphanumerics kept, every other run collapsed to `-`.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
