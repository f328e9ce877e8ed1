use async_trait::async_trait;
use media_cleanup_config::LibraryPolicy;
use media_cleanup_models::{MediaItem, WatchRecord};
use crate::SourceError;

/// Current library contents, merged from the library manager and the media server
#[async_trait]
pub trait LibraryInventory: Send + Sync {
    async fn list_items(&self, library: &LibraryPolicy) -> Result<Vec<MediaItem>, SourceError>;
}

/// Playback history for one library
#[async_trait]
pub trait WatchHistorySource: Send + Sync {
    async fn watch_history(&self, library: &LibraryPolicy) -> Result<Vec<WatchRecord>, SourceError>;
}

#[async_trait]
pub trait DiskSpaceSource: Send + Sync {
    /// Free bytes on `path` as seen by the library's manager
    async fn free_bytes(&self, library: &LibraryPolicy, path: &str) -> Result<u64, SourceError>;
}

/// Destructive and tagging calls. Each call is one atomic external operation.
///
/// Tag and collection edits must succeed as no-ops when the item is already in the
/// requested state.
#[async_trait]
pub trait MutationSink: Send + Sync {
    async fn delete(&self, library: &LibraryPolicy, item: &MediaItem) -> Result<(), SourceError>;
    async fn add_list_exclusion(&self, library: &LibraryPolicy, item: &MediaItem) -> Result<(), SourceError>;
    async fn set_tag(&self, item: &MediaItem, label: &str) -> Result<(), SourceError>;
    async fn clear_tag(&self, item: &MediaItem, label: &str) -> Result<(), SourceError>;
    async fn add_to_collection(&self, item: &MediaItem, name: &str) -> Result<(), SourceError>;
    async fn remove_from_collection(&self, item: &MediaItem, name: &str) -> Result<(), SourceError>;
    /// Show a library collection on the recommended row and the home screens
    async fn promote_collection(
        &self,
        library: &LibraryPolicy,
        name: &str,
        home: bool,
        shared: bool,
    ) -> Result<(), SourceError>;
}

#[async_trait]
pub trait RescanTrigger: Send + Sync {
    async fn trigger_rescan(&self, library: &LibraryPolicy) -> Result<(), SourceError>;
}
