pub mod model;
pub mod service;
pub mod token;

pub use model::{IssuePreviewLink, LinkState, PreviewLink, PreviewOutcome};
pub use service::PreviewLinkIssuer;
