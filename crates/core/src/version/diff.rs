//! Field-level comparison of snapshot data.
//!
//! [`diff`] is symmetric up to swapping `old` and `new`: both directions
//! report the same set of field names.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use similar::{ChangeTag, TextDiff};

use crate::content::FieldMap;

pub const INITIAL_VERSION_SUMMARY: &str = "Initial version";
pub const NO_CHANGES_SUMMARY: &str = "No changes detected";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: Value,
    pub new: Value,
}

/// Changed fields keyed by name. Key order carries no meaning.
pub type FieldDiff = BTreeMap<String, FieldChange>;

/// Compare `current` against `other`.
///
/// Fields of `current` that are absent from or different in `other` are
/// reported as `{old: other[field] or null, new: current[field]}`; fields
/// only in `other` as `{old: other[field], new: null}`. Values compare
/// structurally.
pub fn diff(current: &FieldMap, other: &FieldMap) -> FieldDiff {
    let mut changes = FieldDiff::new();

    for (field, value) in current {
        match other.get(field) {
            Some(previous) if previous == value => {}
            previous => {
                changes.insert(
                    field.clone(),
                    FieldChange {
                        old: previous.cloned().unwrap_or(Value::Null),
                        new: value.clone(),
                    },
                );
            }
        }
    }

    for (field, value) in other {
        if !current.contains_key(field) {
            changes.insert(
                field.clone(),
                FieldChange {
                    old: value.clone(),
                    new: Value::Null,
                },
            );
        }
    }

    changes
}

/// Render a diff as `"Added x, Updated y, Removed z"`.
pub fn summarize_changes(changes: &FieldDiff) -> String {
    if changes.is_empty() {
        return NO_CHANGES_SUMMARY.to_string();
    }

    changes
        .iter()
        .map(|(field, change)| {
            if change.old.is_null() {
                format!("Added {field}")
            } else if change.new.is_null() {
                format!("Removed {field}")
            } else {
                format!("Updated {field}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineTag {
    Equal,
    Insert,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChange {
    pub tag: LineTag,
    pub line: String,
}

/// Line diff for a change whose old and new values are both strings.
pub fn text_changes(change: &FieldChange) -> Option<Vec<TextChange>> {
    let (old, new) = match (&change.old, &change.new) {
        (Value::String(old), Value::String(new)) => (old, new),
        _ => return None,
    };

    let diff = TextDiff::from_lines(old.as_str(), new.as_str());
    let lines = diff
        .iter_all_changes()
        .map(|change| TextChange {
            tag: match change.tag() {
                ChangeTag::Equal => LineTag::Equal,
                ChangeTag::Insert => LineTag::Insert,
                ChangeTag::Delete => LineTag::Delete,
            },
            line: change.value().trim_end_matches('\n').to_string(),
        })
        .collect();
    Some(lines)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn diff_reports_changed_added_and_removed() {
        let v2 = fields(json!({ "title": "New Title", "body": "same", "tags": ["a"] }));
        let v1 = fields(json!({ "title": "Old Title", "body": "same", "excerpt": "gone" }));

        let changes = diff(&v2, &v1);

        assert_eq!(changes.len(), 3);
        assert_eq!(
            changes["title"],
            FieldChange { old: json!("Old Title"), new: json!("New Title") }
        );
        assert_eq!(changes["tags"], FieldChange { old: Value::Null, new: json!(["a"]) });
        assert_eq!(changes["excerpt"], FieldChange { old: json!("gone"), new: Value::Null });
        assert!(!changes.contains_key("body"));
    }

    #[test]
    fn diff_compares_structurally() {
        let a = fields(json!({ "meta": { "x": 1, "y": [1, 2] } }));
        let b = fields(json!({ "meta": { "y": [1, 2], "x": 1 } }));
        assert!(diff(&a, &b).is_empty());

        let c = fields(json!({ "meta": { "x": 1, "y": [2, 1] } }));
        assert_eq!(diff(&a, &c).len(), 1);
    }

    #[test]
    fn diff_is_symmetric() {
        let a = fields(json!({ "title": "A", "only_a": 1, "shared": true, "nulled": null }));
        let b = fields(json!({ "title": "B", "only_b": 2, "shared": true }));

        let forward = diff(&a, &b);
        let backward = diff(&b, &a);

        let forward_keys: BTreeSet<_> = forward.keys().collect();
        let backward_keys: BTreeSet<_> = backward.keys().collect();
        assert_eq!(forward_keys, backward_keys);

        for (field, change) in &forward {
            let mirrored = &backward[field];
            assert_eq!(change.old, mirrored.new, "field {field}");
            assert_eq!(change.new, mirrored.old, "field {field}");
        }
    }

    #[test]
    fn summary_clauses() {
        let v2 = fields(json!({ "title": "New", "subtitle": "Added" }));
        let v1 = fields(json!({ "title": "Old", "legacy": "x" }));
        assert_eq!(
            summarize_changes(&diff(&v2, &v1)),
            "Removed legacy, Added subtitle, Updated title"
        );
    }

    #[test]
    fn summary_without_changes() {
        let v = fields(json!({ "title": "Same" }));
        assert_eq!(summarize_changes(&diff(&v, &v)), NO_CHANGES_SUMMARY);
    }

    #[test]
    fn text_changes_for_strings_only() {
        let change = FieldChange {
            old: json!("line one\nline two\n"),
            new: json!("line one\nline 2\n"),
        };
        let lines = text_changes(&change).unwrap();
        assert_eq!(
            lines,
            vec![
                TextChange { tag: LineTag::Equal, line: "line one".into() },
                TextChange { tag: LineTag::Delete, line: "line two".into() },
                TextChange { tag: LineTag::Insert, line: "line 2".into() },
            ]
        );

        let numeric = FieldChange { old: json!(1), new: json!(2) };
        assert!(text_changes(&numeric).is_none());
    }
}
