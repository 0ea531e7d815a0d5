use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::{ContentEntry, ContentRef};
use crate::UserId;

/// Token-addressed, time-limited public view of a content entry.
/// Maps to the `preview_links` PostgreSQL table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewLink {
    pub id: Uuid,
    pub content: ContentRef,
    pub token: String,
    /// Argon2id PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub message: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub view_count: i64,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Active,
    Expired,
    Deactivated,
}

impl PreviewLink {
    pub fn requires_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Expiry wins over deactivation; both are terminal.
    pub fn state_at(&self, now: DateTime<Utc>) -> LinkState {
        if self.expires_at <= now {
            LinkState::Expired
        } else if !self.is_active {
            LinkState::Deactivated
        } else {
            LinkState::Active
        }
    }

    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) == LinkState::Active
    }
}

/// Request to mint a preview link.
#[derive(Debug, Clone)]
pub struct IssuePreviewLink {
    pub content: ContentRef,
    pub expires_at: DateTime<Utc>,
    pub password: Option<String>,
    pub message: Option<String>,
    pub issuer_id: Option<UserId>,
}

/// Result of resolving a token. Every variant is an ordinary outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewOutcome {
    Content {
        link: PreviewLink,
        entry: ContentEntry,
    },
    /// Past expiry or manually deactivated.
    Expired,
    NotFound,
    PasswordRequired,
}
