//! Two-phase tag-then-delete planning.
//!
//! There is no local state: an item counts as tagged when it carries any configured
//! leaving-soon label or sits in the leaving-soon collection on the media server.

use media_cleanup_config::{LeavingSoonConfig, LibraryPolicy};
use media_cleanup_models::MediaItem;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "name", rename_all = "lowercase")]
pub enum Mark {
    Label(String),
    Collection(String),
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mark::Label(name) => write!(f, "label '{}'", name),
            Mark::Collection(name) => write!(f, "collection '{}'", name),
        }
    }
}

/// The configured leaving-soon markers
pub struct LeavingSoonMarks<'a> {
    config: &'a LeavingSoonConfig,
}

impl<'a> LeavingSoonMarks<'a> {
    pub fn new(config: &'a LeavingSoonConfig) -> Self {
        Self { config }
    }

    fn all(&self) -> impl Iterator<Item = Mark> + '_ {
        self.config
            .collection
            .iter()
            .map(|c| Mark::Collection(c.clone()))
            .chain(self.config.labels.iter().map(|l| Mark::Label(l.clone())))
    }

    fn carries(item: &MediaItem, mark: &Mark) -> bool {
        match mark {
            Mark::Label(label) => item.metadata.has_label(label),
            Mark::Collection(name) => item.metadata.in_collection(name),
        }
    }

    pub fn present(&self, item: &MediaItem) -> Vec<Mark> {
        self.all().filter(|m| Self::carries(item, m)).collect()
    }

    pub fn missing(&self, item: &MediaItem) -> Vec<Mark> {
        self.all().filter(|m| !Self::carries(item, m)).collect()
    }

    /// Either signal is enough
    pub fn is_tagged(&self, item: &MediaItem) -> bool {
        self.all().any(|m| Self::carries(item, &m))
    }
}

/// Marks to add to or remove from one item
#[derive(Debug, Clone, Serialize)]
pub struct MarkChange {
    pub item: MediaItem,
    pub marks: Vec<Mark>,
}

/// What a run will do to one library, in execution order
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActionPlan {
    pub deletions: Vec<MediaItem>,
    pub tags: Vec<MarkChange>,
    pub untags: Vec<MarkChange>,
}

impl ActionPlan {
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.tags.is_empty() && self.untags.is_empty()
    }
}

/// Split sorted, non-excluded candidates into deletions, new tags and rescues.
///
/// `inventory` is the full library, used to find tagged items that stopped qualifying.
pub fn plan_actions(candidates: Vec<MediaItem>, inventory: &[MediaItem], library: &LibraryPolicy) -> ActionPlan {
    let max_actions = library.max_actions_per_run;

    let config = match &library.leaving_soon {
        Some(config) if library.leaving_soon_enabled() => config,
        _ => {
            let deletions: Vec<MediaItem> = candidates.into_iter().take(max_actions).collect();
            debug!(library = %library.name, deletions = deletions.len(), "Direct delete plan");
            return ActionPlan {
                deletions,
                ..ActionPlan::default()
            };
        }
    };
    let marks = LeavingSoonMarks::new(config);

    let candidate_ids: HashSet<u64> = candidates.iter().map(|c| c.id).collect();
    let mut deletions = Vec::new();
    let mut remaining = Vec::new();
    for item in candidates {
        if deletions.len() < max_actions && marks.is_tagged(&item) {
            deletions.push(item);
        } else {
            remaining.push(item);
        }
    }

    let mut tags = Vec::new();
    for (position, item) in remaining.into_iter().enumerate() {
        let tagged = marks.is_tagged(&item);
        if !tagged && position >= library.preview_count() {
            continue;
        }
        // tagged items left over past the deletion cap only get their missing marks repaired
        let missing = marks.missing(&item);
        if !missing.is_empty() {
            tags.push(MarkChange { item, marks: missing });
        }
    }

    let untags: Vec<MarkChange> = inventory
        .iter()
        .filter(|item| !candidate_ids.contains(&item.id))
        .filter_map(|item| {
            let present = marks.present(item);
            (!present.is_empty()).then(|| MarkChange {
                item: item.clone(),
                marks: present,
            })
        })
        .collect();

    debug!(
        library = %library.name,
        deletions = deletions.len(),
        tags = tags.len(),
        untags = untags.len(),
        "Leaving-soon plan"
    );
    ActionPlan { deletions, tags, untags }
}
