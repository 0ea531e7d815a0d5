/// Input validation for drafts and preview links.
///
/// Every check here runs before any write, so a rejected request leaves no
/// partial state behind.
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use super::entry::FieldMap;

pub const MAX_PREVIEW_PASSWORD_LEN: usize = 128;
pub const MAX_PREVIEW_MESSAGE_LEN: usize = 1000;
pub const MAX_CHANGE_SUMMARY_LEN: usize = 255;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("draft patch must be a JSON object")]
    PatchNotObject,
    #[error("draft patch contains an empty field name")]
    EmptyFieldName,
    #[error("preview link expiry must be in the future")]
    ExpiryNotInFuture,
    #[error("preview password cannot exceed {MAX_PREVIEW_PASSWORD_LEN} characters")]
    PasswordTooLong,
    #[error("preview message cannot exceed {MAX_PREVIEW_MESSAGE_LEN} characters")]
    MessageTooLong,
    #[error("change summary cannot exceed {MAX_CHANGE_SUMMARY_LEN} characters")]
    SummaryTooLong,
    #[error("versions belong to different content entries")]
    SubjectMismatch,
}

/// Validate a draft patch and return it as a field map.
pub fn validate_patch(patch: &Value) -> Result<FieldMap, ValidationError> {
    let map = patch.as_object().ok_or(ValidationError::PatchNotObject)?;
    if map.keys().any(|key| key.trim().is_empty()) {
        return Err(ValidationError::EmptyFieldName);
    }
    Ok(map.clone())
}

pub fn validate_expiry(
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if expires_at <= now {
        return Err(ValidationError::ExpiryNotInFuture);
    }
    Ok(())
}

pub fn validate_preview_secrets(
    password: Option<&str>,
    message: Option<&str>,
) -> Result<(), ValidationError> {
    if password.is_some_and(|p| p.chars().count() > MAX_PREVIEW_PASSWORD_LEN) {
        return Err(ValidationError::PasswordTooLong);
    }
    if message.is_some_and(|m| m.chars().count() > MAX_PREVIEW_MESSAGE_LEN) {
        return Err(ValidationError::MessageTooLong);
    }
    Ok(())
}

pub fn validate_summary(summary: Option<&str>) -> Result<(), ValidationError> {
    match summary {
        Some(s) if s.chars().count() > MAX_CHANGE_SUMMARY_LEN => {
            Err(ValidationError::SummaryTooLong)
        }
        _ => Ok(()),
    }
}

/// Trim optional free text; blank strings become `None`.
pub fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
