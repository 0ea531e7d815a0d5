pub mod entry;
pub mod reference;
pub mod validate;

pub use entry::{slugify, ContentEntry, FieldMap, Versionable};
pub use reference::{ContentKind, ContentRef};
