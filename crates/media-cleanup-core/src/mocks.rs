//! In-memory collaborators for engine tests.
//!
//! `MockServer` keeps library contents in shared state, so deletions and tag edits made
//! by one run are visible to the next run against the same mock.

use async_trait::async_trait;
use media_cleanup_config::LibraryPolicy;
use media_cleanup_models::{eq_ignore_case, MediaItem, MediaKind, WatchRecord};
use media_cleanup_sources::{
    AvailabilityLookup, Catalogs, DiskSpaceSource, LibraryInventory, ListCatalog, MediaRequest,
    MutationSink, RequestTracker, RescanTrigger, SourceError, SourceSet, TitleQuery, WatchHistorySource,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

fn http_error(service: &str) -> SourceError {
    SourceError::Http {
        service: service.to_string(),
        status: 500,
        body: "mock failure".to_string(),
    }
}

// ============================================================================
// Mock media server / library manager
// ============================================================================

#[derive(Default)]
struct ServerState {
    items: HashMap<String, Vec<MediaItem>>,
    history: HashMap<String, Vec<WatchRecord>>,
    free_space: HashMap<String, u64>,
    failing_inventory: HashSet<String>,
    failing_deletes: HashSet<u64>,
    failing_tags: HashSet<u64>,
    calls: Vec<String>,
}

impl ServerState {
    fn find_item(&mut self, id: u64) -> Option<&mut MediaItem> {
        self.items.values_mut().flat_map(|items| items.iter_mut()).find(|i| i.id == id)
    }

    fn edit(&mut self, call: String, item: &MediaItem, edit: impl FnOnce(&mut MediaItem)) -> Result<(), SourceError> {
        self.calls.push(call);
        if self.failing_tags.contains(&item.id) {
            return Err(http_error("plex"));
        }
        let stored = self
            .find_item(item.id)
            .ok_or_else(|| SourceError::NotFound(item.title.clone()))?;
        edit(stored);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MockServer {
    state: Arc<Mutex<ServerState>>,
}

impl MockServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_items(&self, library: &str, items: Vec<MediaItem>) {
        self.state.lock().unwrap().items.entry(library.to_string()).or_default().extend(items);
    }

    pub fn set_history(&self, library: &str, records: Vec<WatchRecord>) {
        self.state.lock().unwrap().history.insert(library.to_string(), records);
    }

    pub fn set_free_space(&self, path: &str, bytes: u64) {
        self.state.lock().unwrap().free_space.insert(path.to_string(), bytes);
    }

    pub fn fail_inventory(&self, library: &str) {
        self.state.lock().unwrap().failing_inventory.insert(library.to_string());
    }

    pub fn fail_delete(&self, id: u64) {
        self.state.lock().unwrap().failing_deletes.insert(id);
    }

    pub fn fail_tags(&self, id: u64) {
        self.state.lock().unwrap().failing_tags.insert(id);
    }

    pub fn items(&self, library: &str) -> Vec<MediaItem> {
        self.state.lock().unwrap().items.get(library).cloned().unwrap_or_default()
    }

    pub fn item(&self, id: u64) -> Option<MediaItem> {
        self.state.lock().unwrap().find_item(id).cloned()
    }

    /// Every call received, as `action:title[:value]`
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls().into_iter().filter(|c| c.starts_with(prefix)).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Wire this server and the given catalogs into a source set
    pub fn source_set(&self, catalogs: Catalogs) -> SourceSet {
        let shared = Arc::new(self.clone());
        SourceSet {
            inventory: shared.clone(),
            history: shared.clone(),
            disk: shared.clone(),
            mutations: shared.clone(),
            rescan: shared,
            catalogs,
        }
    }
}

#[async_trait]
impl LibraryInventory for MockServer {
    async fn list_items(&self, library: &LibraryPolicy) -> Result<Vec<MediaItem>, SourceError> {
        let state = self.state.lock().unwrap();
        if state.failing_inventory.contains(&library.name) {
            return Err(SourceError::Timeout { service: "radarr".into() });
        }
        Ok(state.items.get(&library.name).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl WatchHistorySource for MockServer {
    async fn watch_history(&self, library: &LibraryPolicy) -> Result<Vec<WatchRecord>, SourceError> {
        Ok(self.state.lock().unwrap().history.get(&library.name).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl DiskSpaceSource for MockServer {
    async fn free_bytes(&self, _library: &LibraryPolicy, path: &str) -> Result<u64, SourceError> {
        self.state
            .lock()
            .unwrap()
            .free_space
            .get(path)
            .copied()
            .ok_or_else(|| SourceError::NotFound(format!("disk path {}", path)))
    }
}

#[async_trait]
impl MutationSink for MockServer {
    async fn delete(&self, library: &LibraryPolicy, item: &MediaItem) -> Result<(), SourceError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete:{}", item.title));
        if state.failing_deletes.contains(&item.id) {
            return Err(http_error("radarr"));
        }
        let items = state.items.entry(library.name.clone()).or_default();
        let before = items.len();
        items.retain(|i| i.id != item.id);
        if items.len() == before {
            return Err(SourceError::NotFound(item.title.clone()));
        }
        Ok(())
    }

    async fn add_list_exclusion(&self, _library: &LibraryPolicy, item: &MediaItem) -> Result<(), SourceError> {
        self.state.lock().unwrap().calls.push(format!("exclusion:{}", item.title));
        Ok(())
    }

    async fn set_tag(&self, item: &MediaItem, label: &str) -> Result<(), SourceError> {
        self.state.lock().unwrap().edit(format!("set_tag:{}:{}", item.title, label), item, |stored| {
            if !stored.metadata.has_label(label) {
                stored.metadata.labels.push(label.to_string());
            }
        })
    }

    async fn clear_tag(&self, item: &MediaItem, label: &str) -> Result<(), SourceError> {
        self.state.lock().unwrap().edit(format!("clear_tag:{}:{}", item.title, label), item, |stored| {
            stored.metadata.labels.retain(|l| !eq_ignore_case(l, label));
        })
    }

    async fn add_to_collection(&self, item: &MediaItem, name: &str) -> Result<(), SourceError> {
        self.state.lock().unwrap().edit(format!("add_collection:{}:{}", item.title, name), item, |stored| {
            if !stored.metadata.in_collection(name) {
                stored.metadata.collections.push(name.to_string());
            }
        })
    }

    async fn remove_from_collection(&self, item: &MediaItem, name: &str) -> Result<(), SourceError> {
        self.state.lock().unwrap().edit(format!("remove_collection:{}:{}", item.title, name), item, |stored| {
            stored.metadata.collections.retain(|c| !eq_ignore_case(c, name));
        })
    }

    async fn promote_collection(
        &self,
        library: &LibraryPolicy,
        name: &str,
        home: bool,
        shared: bool,
    ) -> Result<(), SourceError> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(format!("promote_collection:{}:{}:{}:{}", library.name, name, home, shared));
        Ok(())
    }
}

#[async_trait]
impl RescanTrigger for MockServer {
    async fn trigger_rescan(&self, library: &LibraryPolicy) -> Result<(), SourceError> {
        self.state.lock().unwrap().calls.push(format!("rescan:{}", library.name));
        Ok(())
    }
}

// ============================================================================
// Mock list catalog (Trakt, MDBList)
// ============================================================================

#[derive(Clone)]
pub struct MockListCatalog {
    name: &'static str,
    lists: Arc<Mutex<HashMap<String, HashSet<u32>>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    fetches: Arc<Mutex<usize>>,
}

impl MockListCatalog {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            lists: Arc::default(),
            failing: Arc::default(),
            fetches: Arc::default(),
        }
    }

    pub fn set_list(&self, url: &str, ids: impl IntoIterator<Item = u32>) {
        self.lists.lock().unwrap().insert(url.to_string(), ids.into_iter().collect());
    }

    pub fn fail_list(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl ListCatalog for MockListCatalog {
    fn provider_name(&self) -> &'static str {
        self.name
    }

    async fn fetch_list(&self, list_url: &str, _kind: MediaKind, limit: usize) -> Result<HashSet<u32>, SourceError> {
        *self.fetches.lock().unwrap() += 1;
        if self.failing.lock().unwrap().contains(list_url) {
            return Err(SourceError::Timeout { service: self.name.to_string() });
        }
        let lists = self.lists.lock().unwrap();
        let ids = lists
            .get(list_url)
            .ok_or_else(|| SourceError::NotFound(list_url.to_string()))?;
        Ok(ids.iter().copied().take(limit).collect())
    }
}

// ============================================================================
// Mock streaming availability
// ============================================================================

#[derive(Clone, Default)]
pub struct MockAvailability {
    offers: Arc<Mutex<HashMap<String, Option<Vec<String>>>>>,
}

impl MockAvailability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers for a title. Titles never set are unknown to the lookup.
    pub fn set_offers(&self, title: &str, offers: Option<Vec<String>>) {
        self.offers.lock().unwrap().insert(title.to_string(), offers);
    }
}

#[async_trait]
impl AvailabilityLookup for MockAvailability {
    async fn offers(&self, query: &TitleQuery) -> Result<Option<Vec<String>>, SourceError> {
        Ok(self.offers.lock().unwrap().get(&query.title).cloned().flatten())
    }
}

// ============================================================================
// Mock request tracker
// ============================================================================

#[derive(Clone, Default)]
pub struct MockRequestTracker {
    requests: Arc<Mutex<Vec<MediaRequest>>>,
    request_calls: Arc<Mutex<usize>>,
    resets: Arc<Mutex<Vec<u32>>>,
}

impl MockRequestTracker {
    pub fn new(requests: Vec<MediaRequest>) -> Self {
        Self {
            requests: Arc::new(Mutex::new(requests)),
            ..Self::default()
        }
    }

    pub fn request_calls(&self) -> usize {
        *self.request_calls.lock().unwrap()
    }

    pub fn resets(&self) -> Vec<u32> {
        self.resets.lock().unwrap().clone()
    }
}

#[async_trait]
impl RequestTracker for MockRequestTracker {
    async fn requests(&self) -> Result<Vec<MediaRequest>, SourceError> {
        *self.request_calls.lock().unwrap() += 1;
        Ok(self.requests.lock().unwrap().clone())
    }

    async fn reset_media(&self, tmdb_id: u32, _kind: MediaKind) -> Result<bool, SourceError> {
        self.resets.lock().unwrap().push(tmdb_id);
        Ok(true)
    }
}
