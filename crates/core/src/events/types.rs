use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::ContentRef;

/// Events emitted after successful writes, consumed by the content cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentEvent {
    /// The live entry was persisted through its save path.
    EntrySaved { content: ContentRef },
    #[serde(rename_all = "camelCase")]
    SnapshotCreated {
        content: ContentRef,
        snapshot_id: Uuid,
        version_number: i32,
    },
    #[serde(rename_all = "camelCase")]
    VersionRestored {
        content: ContentRef,
        snapshot_id: Uuid,
        version_number: i32,
    },
    #[serde(rename_all = "camelCase")]
    DraftCreated {
        content: ContentRef,
        snapshot_id: Uuid,
        version_number: i32,
    },
    #[serde(rename_all = "camelCase")]
    PreviewLinkIssued { content: ContentRef, link_id: Uuid },
    #[serde(rename_all = "camelCase")]
    PreviewLinkRevoked { link_id: Uuid },
}

impl ContentEvent {
    /// Content whose rendered form is stale after this event, if any.
    pub fn invalidates(&self) -> Option<ContentRef> {
        match self {
            ContentEvent::EntrySaved { content } | ContentEvent::VersionRestored { content, .. } => {
                Some(*content)
            }
            _ => None,
        }
    }
}
