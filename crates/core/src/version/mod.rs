pub mod diff;
pub mod model;
pub mod service;

pub use diff::{diff, summarize_changes, text_changes, FieldChange, FieldDiff, LineTag, TextChange};
pub use model::{ContentSnapshot, NewSnapshot};
pub use service::{VersionComparison, VersioningService, MAX_VERSION_ATTEMPTS};
