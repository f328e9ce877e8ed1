pub mod backend;
pub mod catalogs;
pub mod error;
pub mod factory;
pub mod http;
pub mod justwatch;
pub mod mdblist;
pub mod plex;
pub mod seerr;
pub mod servarr;
pub mod tautulli;
#[cfg(test)]
mod test_server;
pub mod traits;
pub mod trakt;

pub use backend::MediaServerBackend;
pub use catalogs::{AvailabilityLookup, ListCatalog, MediaRequest, Requester, RequestTracker, TitleQuery};
pub use error::SourceError;
pub use factory::{Catalogs, SourceSet};
pub use http::build_client;
pub use traits::{DiskSpaceSource, LibraryInventory, MutationSink, RescanTrigger, WatchHistorySource};
