use thiserror::Error;

use crate::content::reference::ReferenceError;
use crate::content::validate::ValidationError;

/// Errors raised by the versioning and preview services.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No acting user was supplied for an operation that records authorship.
    #[error("no acting user could be resolved for this operation")]
    Authorship,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error("not found: {0}")]
    NotFound(String),

    /// Another writer took the version number first. Safe to retry.
    #[error("version number conflict for {subject}")]
    VersionConflict { subject: String },

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        CoreError::NotFound(what.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
