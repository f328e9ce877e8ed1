use chrono::{DateTime, Utc};
use media_cleanup_config::{format_bytes, LibraryPolicy, WatchStatus};
use media_cleanup_models::{eq_ignore_case, MediaItem, WatchRecord};
use media_cleanup_sources::{DiskSpaceSource, SourceError};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, trace};
use crate::history::apply_watch_history;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskGate {
    Proceed,
    /// A configured path still has at least its threshold free
    Skip {
        path: String,
        free_bytes: u64,
        threshold_bytes: u64,
    },
}

/// Check every configured disk threshold. The library only runs when all paths are
/// below their thresholds.
pub async fn check_disk_gate(library: &LibraryPolicy, disk: &dyn DiskSpaceSource) -> Result<DiskGate, SourceError> {
    for gate in &library.disk_size_threshold {
        let free_bytes = disk.free_bytes(library, &gate.path).await?;
        let threshold_bytes = gate.threshold.bytes();
        debug!(
            library = %library.name,
            path = %gate.path,
            free = %format_bytes(free_bytes),
            threshold = %format_bytes(threshold_bytes),
            "Disk threshold check"
        );
        if free_bytes >= threshold_bytes {
            info!(
                operation = "disk_gate",
                library = %library.name,
                path = %gate.path,
                free = %format_bytes(free_bytes),
                threshold = %format_bytes(threshold_bytes),
                "Enough free space, skipping library"
            );
            return Ok(DiskGate::Skip {
                path: gate.path.clone(),
                free_bytes,
                threshold_bytes,
            });
        }
    }
    Ok(DiskGate::Proceed)
}

/// Join watch history and keep the items that pass every policy filter, in inventory order.
pub fn eligible_candidates(
    mut items: Vec<MediaItem>,
    history: &[WatchRecord],
    library: &LibraryPolicy,
    now: DateTime<Utc>,
) -> Vec<MediaItem> {
    apply_watch_history(&mut items, history);

    let protected_collections = if library.apply_last_watch_threshold_to_collections {
        recently_watched_collections(&items, library, now)
    } else {
        HashSet::new()
    };

    let total = items.len();
    let candidates: Vec<MediaItem> = items
        .into_iter()
        .filter(|item| passes_watch_status(item, library))
        .filter(|item| passes_last_watched(item, library, now, &protected_collections))
        .filter(|item| passes_added_at(item, library, now))
        .filter(|item| passes_series_type(item, library))
        .collect();

    debug!(
        library = %library.name,
        total,
        eligible = candidates.len(),
        "Eligibility filter applied"
    );
    candidates
}

fn passes_watch_status(item: &MediaItem, library: &LibraryPolicy) -> bool {
    match library.watch_status {
        Some(WatchStatus::Watched) => item.is_watched(),
        Some(WatchStatus::Unwatched) => !item.is_watched(),
        None => true,
    }
}

fn within_threshold(item: &MediaItem, library: &LibraryPolicy, now: DateTime<Utc>) -> bool {
    match (library.last_watched_threshold, item.last_watched) {
        (Some(threshold), Some(watched)) => now - watched >= threshold.as_duration(),
        _ => true,
    }
}

fn passes_last_watched(
    item: &MediaItem,
    library: &LibraryPolicy,
    now: DateTime<Utc>,
    protected_collections: &HashSet<String>,
) -> bool {
    if !within_threshold(item, library, now) {
        trace!(title = %item, "Watched too recently");
        return false;
    }
    let protected = item
        .metadata
        .collections
        .iter()
        .find(|c| protected_collections.contains(&c.to_lowercase()));
    if let Some(collection) = protected {
        debug!(title = %item, collection = %collection, "Collection has a recently watched member");
        return false;
    }
    true
}

/// Collections (lowercased) in which any member was watched within the threshold.
///
/// The leaving-soon collection is not a real grouping and never protects its members.
fn recently_watched_collections(items: &[MediaItem], library: &LibraryPolicy, now: DateTime<Utc>) -> HashSet<String> {
    let leaving_soon = library.leaving_soon.as_ref().and_then(|l| l.collection.as_deref());
    let mut any_recent: HashMap<String, bool> = HashMap::new();
    for item in items {
        let recent = !within_threshold(item, library, now);
        let collections = item
            .metadata
            .collections
            .iter()
            .filter(|c| !leaving_soon.is_some_and(|name| eq_ignore_case(c, name)));
        for collection in collections {
            *any_recent.entry(collection.to_lowercase()).or_default() |= recent;
        }
    }
    any_recent
        .into_iter()
        .filter_map(|(collection, recent)| recent.then_some(collection))
        .collect()
}

/// Items without an added date never pass an added-at threshold
fn passes_added_at(item: &MediaItem, library: &LibraryPolicy, now: DateTime<Utc>) -> bool {
    match library.added_at_threshold {
        Some(threshold) => item.added_at.is_some_and(|added| now - added >= threshold.as_duration()),
        None => true,
    }
}

fn passes_series_type(item: &MediaItem, library: &LibraryPolicy) -> bool {
    match library.effective_series_type() {
        Some(expected) => item.series_type().unwrap_or_default() == expected,
        None => true,
    }
}
