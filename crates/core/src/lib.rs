//! Content versioning and preview-link engine for the agency CMS.
//!
//! The crate owns the snapshot history of content entries, the diff and
//! restore machinery built on top of it, and the token-addressed preview
//! links handed out to reviewers. Storage is abstracted behind the traits in
//! [`store`], with a PostgreSQL backend for production and an in-memory
//! backend for tests.

pub mod cache;
pub mod content;
pub mod error;
pub mod events;
pub mod preview;
pub mod store;
pub mod version;

pub use error::{CoreError, CoreResult};

/// Identifier of a CMS user (author of snapshots, issuer of preview links).
pub type UserId = i64;
