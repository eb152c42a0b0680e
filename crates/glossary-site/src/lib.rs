pub mod handlers;
pub mod rate_limit;
pub mod tracker;

pub use handlers::{AppState, MAX_LINKIFY_LEN, MAX_TRACKED_TERMS, router};
pub use tracker::{ArchiveError, Platform, PostArchive};
