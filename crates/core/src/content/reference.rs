/// Polymorphic content references.
///
/// Every versioned or previewable record is addressed by a kind tag and a
/// numeric id. The text form is `{kind}:{id}`, e.g. `insight:42`.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("unknown content kind: {0}")]
    UnknownKind(String),
    #[error("malformed content reference: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Page,
    Service,
    Project,
    Insight,
    TeamMember,
}

impl ContentKind {
    pub const ALL: [ContentKind; 5] = [
        ContentKind::Page,
        ContentKind::Service,
        ContentKind::Project,
        ContentKind::Insight,
        ContentKind::TeamMember,
    ];

    /// Stable tag stored in `subject_type` / `content_type` columns.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Page => "page",
            ContentKind::Service => "service",
            ContentKind::Project => "project",
            ContentKind::Insight => "insight",
            ContentKind::TeamMember => "team_member",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ReferenceError::UnknownKind(s.to_string()))
    }
}

/// Address of a single content record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentRef {
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub id: i64,
}

impl ContentRef {
    pub fn new(kind: ContentKind, id: i64) -> Self {
        Self { kind, id }
    }

    /// Build a reference from the raw column pair stored in the database.
    pub fn from_columns(kind: &str, id: i64) -> Result<Self, ReferenceError> {
        Ok(Self {
            kind: kind.parse()?,
            id,
        })
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for ContentRef {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| ReferenceError::Malformed(s.to_string()))?;
        let id = id
            .parse::<i64>()
            .map_err(|_| ReferenceError::Malformed(s.to_string()))?;
        Ok(Self {
            kind: kind.parse()?,
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reference() {
        let reference: ContentRef = "insight:42".parse().unwrap();
        assert_eq!(reference, ContentRef::new(ContentKind::Insight, 42));
        assert_eq!(reference.to_string(), "insight:42");
    }

    #[test]
    fn parse_snake_case_kind() {
        let reference: ContentRef = "team_member:7".parse().unwrap();
        assert_eq!(reference.kind, ContentKind::TeamMember);
    }

    #[test]
    fn reject_unknown_kind() {
        let err = "widget:1".parse::<ContentRef>().unwrap_err();
        assert_eq!(err, ReferenceError::UnknownKind("widget".to_string()));
    }

    #[test]
    fn reject_missing_id() {
        assert!(matches!(
            "insight".parse::<ContentRef>(),
            Err(ReferenceError::Malformed(_))
        ));
        assert!(matches!(
            "insight:abc".parse::<ContentRef>(),
            Err(ReferenceError::Malformed(_))
        ));
    }

    #[test]
    fn serde_uses_type_and_id() {
        let value = serde_json::to_value(ContentRef::new(ContentKind::TeamMember, 3)).unwrap();
        assert_eq!(value, serde_json::json!({ "type": "team_member", "id": 3 }));
    }
}
