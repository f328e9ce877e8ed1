//! Build the collaborator set for a run from configuration.
//!
//! Catalogs that need credentials are only constructed when their global section is
//! present, so an absent section disables that provider's rules. JustWatch needs no
//! credentials and is always available.

use media_cleanup_config::Config;
use std::sync::Arc;
use tracing::debug;
use crate::backend::MediaServerBackend;
use crate::catalogs::{AvailabilityLookup, ListCatalog, RequestTracker};
use crate::http::build_client;
use crate::justwatch::JustWatchClient;
use crate::mdblist::MdblistClient;
use crate::seerr::SeerrClient;
use crate::traits::{DiskSpaceSource, LibraryInventory, MutationSink, RescanTrigger, WatchHistorySource};
use crate::trakt::TraktClient;
use crate::SourceError;

/// External catalogs consulted by provider exclusion rules
#[derive(Clone, Default)]
pub struct Catalogs {
    pub trakt: Option<Arc<dyn ListCatalog>>,
    pub mdblist: Option<Arc<dyn ListCatalog>>,
    pub justwatch: Option<Arc<dyn AvailabilityLookup>>,
    pub seerr: Option<Arc<dyn RequestTracker>>,
}

#[derive(Clone)]
pub struct SourceSet {
    pub inventory: Arc<dyn LibraryInventory>,
    pub history: Arc<dyn WatchHistorySource>,
    pub disk: Arc<dyn DiskSpaceSource>,
    pub mutations: Arc<dyn MutationSink>,
    pub rescan: Arc<dyn RescanTrigger>,
    pub catalogs: Catalogs,
}

impl SourceSet {
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let client = build_client(config.request_timeout, config.ssl_verify)?;
        let backend = Arc::new(MediaServerBackend::new(client.clone(), config));

        let catalogs = Catalogs {
            trakt: config
                .trakt
                .as_ref()
                .map(|c| Arc::new(TraktClient::new(client.clone(), c)) as Arc<dyn ListCatalog>),
            mdblist: config
                .mdblist
                .as_ref()
                .map(|c| Arc::new(MdblistClient::new(client.clone(), c)) as Arc<dyn ListCatalog>),
            justwatch: Some(Arc::new(JustWatchClient::new(client.clone())) as Arc<dyn AvailabilityLookup>),
            seerr: config
                .seerr
                .as_ref()
                .map(|c| Arc::new(SeerrClient::new(client.clone(), c)) as Arc<dyn RequestTracker>),
        };
        debug!(
            trakt = catalogs.trakt.is_some(),
            mdblist = catalogs.mdblist.is_some(),
            justwatch = catalogs.justwatch.is_some(),
            seerr = catalogs.seerr.is_some(),
            "Configured provider catalogs"
        );

        Ok(Self {
            inventory: backend.clone(),
            history: backend.clone(),
            disk: backend.clone(),
            mutations: backend.clone(),
            rescan: backend,
            catalogs,
        })
    }
}
