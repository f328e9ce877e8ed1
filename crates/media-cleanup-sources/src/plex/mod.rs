mod api;
mod index;

pub use api::{PlexClient, PlexMetadata, PlexSection, TagKind};
pub use index::{normalize_title, PlexLibraryIndex};
pub(crate) use api::section_type_for;
