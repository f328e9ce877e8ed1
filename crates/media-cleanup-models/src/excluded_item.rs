use serde::{Deserialize, Serialize};
use crate::MediaKind;

/// An eligible item that an exclusion rule protected during a run.
///
/// Written to the dry-run report so users can see which rule saved what.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcludedItem {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    pub kind: MediaKind,
    pub library: String,
    /// Rule family that matched, e.g. "genre" or "trakt"
    pub rule: String,
    pub reason: String,
}
