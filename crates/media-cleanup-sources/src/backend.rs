use async_trait::async_trait;
use media_cleanup_config::{Config, LibraryPolicy, ManagerRef};
use media_cleanup_models::{MediaItem, MediaKind, ServerRef, WatchRecord};
use reqwest::Client;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use crate::plex::{PlexClient, PlexLibraryIndex, PlexMetadata, PlexSection, TagKind};
use crate::servarr::{RadarrClient, SonarrClient};
use crate::tautulli::TautulliClient;
use crate::traits::{DiskSpaceSource, LibraryInventory, MutationSink, RescanTrigger, WatchHistorySource};
use crate::SourceError;

/// Plex, Tautulli and the configured Radarr/Sonarr instances behind the collaborator traits
pub struct MediaServerBackend {
    plex: PlexClient,
    tautulli: TautulliClient,
    radarr: HashMap<String, RadarrClient>,
    sonarr: HashMap<String, SonarrClient>,
    sections: Mutex<HashMap<String, PlexSection>>,
}

impl MediaServerBackend {
    pub fn new(client: Client, config: &Config) -> Self {
        let radarr = config
            .radarr
            .iter()
            .map(|instance| (instance.name.clone(), RadarrClient::new(client.clone(), instance)))
            .collect();
        let sonarr = config
            .sonarr
            .iter()
            .map(|instance| (instance.name.clone(), SonarrClient::new(client.clone(), instance)))
            .collect();

        Self {
            plex: PlexClient::new(client.clone(), &config.plex),
            tautulli: TautulliClient::new(client, &config.tautulli),
            radarr,
            sonarr,
            sections: Mutex::new(HashMap::new()),
        }
    }

    async fn section(&self, library: &str) -> Result<PlexSection, SourceError> {
        let mut sections = self.sections.lock().await;
        if let Some(section) = sections.get(library) {
            return Ok(section.clone());
        }
        let section = self.plex.section(library).await?;
        sections.insert(library.to_string(), section.clone());
        Ok(section)
    }

    fn radarr(&self, name: &str) -> Result<&RadarrClient, SourceError> {
        self.radarr
            .get(name)
            .ok_or_else(|| SourceError::NotFound(format!("radarr instance '{}'", name)))
    }

    fn sonarr(&self, name: &str) -> Result<&SonarrClient, SourceError> {
        self.sonarr
            .get(name)
            .ok_or_else(|| SourceError::NotFound(format!("sonarr instance '{}'", name)))
    }

    fn manager<'a>(&self, library: &'a LibraryPolicy) -> Result<ManagerRef<'a>, SourceError> {
        library.manager().ok_or_else(|| {
            SourceError::new(format!("library '{}' has no library manager configured", library.name))
        })
    }

    async fn edit_tag(&self, item: &MediaItem, kind: TagKind, value: &str, add: bool) -> Result<(), SourceError> {
        let server = item.server.as_ref().ok_or_else(|| {
            SourceError::new(format!("'{}' is not linked to a Plex item", item))
        })?;
        let section = section_ref(server, item.kind);
        let existing = match kind {
            TagKind::Label => &item.metadata.labels,
            TagKind::Collection => &item.metadata.collections,
        };
        self.plex
            .edit_tag(&section, &server.rating_key, kind, existing, value, add)
            .await
    }
}

/// Edit endpoints only need the section key and type
fn section_ref(server: &ServerRef, kind: MediaKind) -> PlexSection {
    PlexSection {
        key: server.section_id.clone(),
        title: String::new(),
        type_: crate::plex::section_type_for(kind).to_string(),
    }
}

/// Attach Plex metadata to a manager item. Returns None when Plex does not know the item.
fn merge_with_server(mut item: MediaItem, section: &PlexSection, index: &PlexLibraryIndex) -> Option<MediaItem> {
    let plex: &PlexMetadata = index.find(&item)?;
    item.metadata = plex.metadata.clone();
    item.added_at = plex.added_at.or(item.added_at);
    item.rating = item.rating.or(plex.rating);
    if item.year.is_none() {
        item.year = plex.year;
    }
    if item.ids.tmdb_id.is_none() {
        item.ids.tmdb_id = plex.ids.tmdb_id;
    }
    if item.ids.tvdb_id.is_none() {
        item.ids.tvdb_id = plex.ids.tvdb_id;
    }
    if item.ids.imdb_id.is_none() {
        item.ids.imdb_id = plex.ids.imdb_id.clone();
    }
    item.server = Some(ServerRef {
        section_id: section.key.clone(),
        rating_key: plex.rating_key.clone(),
        guid: plex.guid.clone(),
    });
    Some(item)
}

#[async_trait]
impl LibraryInventory for MediaServerBackend {
    async fn list_items(&self, library: &LibraryPolicy) -> Result<Vec<MediaItem>, SourceError> {
        let manager_items = match self.manager(library)? {
            ManagerRef::Radarr(name) => self.radarr(name)?.movies().await?,
            ManagerRef::Sonarr(name) => self.sonarr(name)?.series().await?,
        };

        let section = self.section(&library.name).await?;
        let index = PlexLibraryIndex::new(self.plex.section_items(&section).await?);

        let mut items = Vec::with_capacity(manager_items.len());
        let mut unmatched = 0usize;
        for item in manager_items {
            let has_files = item.size_on_disk > 0;
            let label = item.to_string();
            match merge_with_server(item, &section, &index) {
                Some(merged) => items.push(merged),
                None if has_files => {
                    warn!(library = %library.name, title = %label, "Item not found in Plex, skipping");
                    unmatched += 1;
                }
                None => debug!(library = %library.name, title = %label, "Item has no files and is not in Plex, skipping"),
            }
        }

        info!(
            library = %library.name,
            items = items.len(),
            plex_items = index.len(),
            unmatched,
            "Loaded library inventory"
        );
        Ok(items)
    }
}

#[async_trait]
impl WatchHistorySource for MediaServerBackend {
    async fn watch_history(&self, library: &LibraryPolicy) -> Result<Vec<WatchRecord>, SourceError> {
        let section = self.section(&library.name).await?;
        self.tautulli.history(&section.key).await
    }
}

#[async_trait]
impl DiskSpaceSource for MediaServerBackend {
    async fn free_bytes(&self, library: &LibraryPolicy, path: &str) -> Result<u64, SourceError> {
        match self.manager(library)? {
            ManagerRef::Radarr(name) => self.radarr(name)?.api().free_bytes(path).await,
            ManagerRef::Sonarr(name) => self.sonarr(name)?.api().free_bytes(path).await,
        }
    }
}

#[async_trait]
impl MutationSink for MediaServerBackend {
    async fn delete(&self, library: &LibraryPolicy, item: &MediaItem) -> Result<(), SourceError> {
        match self.manager(library)? {
            ManagerRef::Radarr(name) => self.radarr(name)?.delete_movie(item.id).await,
            ManagerRef::Sonarr(name) => self.sonarr(name)?.delete_series(item.id).await,
        }
    }

    async fn add_list_exclusion(&self, library: &LibraryPolicy, item: &MediaItem) -> Result<(), SourceError> {
        match self.manager(library)? {
            ManagerRef::Radarr(name) => self.radarr(name)?.add_exclusion(item).await,
            ManagerRef::Sonarr(name) => self.sonarr(name)?.add_exclusion(item).await,
        }
    }

    async fn set_tag(&self, item: &MediaItem, label: &str) -> Result<(), SourceError> {
        if item.metadata.has_label(label) {
            return Ok(());
        }
        self.edit_tag(item, TagKind::Label, label, true).await
    }

    async fn clear_tag(&self, item: &MediaItem, label: &str) -> Result<(), SourceError> {
        if !item.metadata.has_label(label) {
            return Ok(());
        }
        self.edit_tag(item, TagKind::Label, label, false).await
    }

    async fn add_to_collection(&self, item: &MediaItem, name: &str) -> Result<(), SourceError> {
        if item.metadata.in_collection(name) {
            return Ok(());
        }
        self.edit_tag(item, TagKind::Collection, name, true).await
    }

    async fn remove_from_collection(&self, item: &MediaItem, name: &str) -> Result<(), SourceError> {
        if !item.metadata.in_collection(name) {
            return Ok(());
        }
        self.edit_tag(item, TagKind::Collection, name, false).await
    }

    async fn promote_collection(
        &self,
        library: &LibraryPolicy,
        name: &str,
        home: bool,
        shared: bool,
    ) -> Result<(), SourceError> {
        let section = self.section(&library.name).await?;
        let Some(key) = self.plex.collection_key(&section, name).await? else {
            debug!(library = %library.name, collection = name, "Collection not found in Plex, skipping visibility");
            return Ok(());
        };
        self.plex.set_collection_visibility(&section, &key, home, shared).await
    }
}

#[async_trait]
impl RescanTrigger for MediaServerBackend {
    async fn trigger_rescan(&self, library: &LibraryPolicy) -> Result<(), SourceError> {
        let section = self.section(&library.name).await?;
        let plex = self.plex.refresh_section(&section).await;
        let tautulli = self.tautulli.refresh_library(&section.key).await;
        plex.and(tautulli)
    }
}
