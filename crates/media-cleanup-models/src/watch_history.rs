use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One playback session reported by the watch-history service.
///
/// For series the record is already resolved to the show, not the episode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchRecord {
    pub rating_key: Option<String>,
    pub guid: Option<String>,
    pub title: String,
    pub year: Option<u32>,
    pub stopped: DateTime<Utc>,
}
