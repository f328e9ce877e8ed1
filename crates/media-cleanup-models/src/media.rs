use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::{eq_ignore_case, SeriesStatus, SeriesType};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "series",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External identifiers used to join inventory, catalogs and watch history
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaIds {
    pub tmdb_id: Option<u32>,
    pub tvdb_id: Option<u32>,
    pub imdb_id: Option<String>,
}

impl MediaIds {
    /// True when any identifier present on both sides is equal
    pub fn shares_any(&self, other: &MediaIds) -> bool {
        let tmdb = matches!((self.tmdb_id, other.tmdb_id), (Some(a), Some(b)) if a == b);
        let tvdb = matches!((self.tvdb_id, other.tvdb_id), (Some(a), Some(b)) if a == b);
        let imdb = matches!((&self.imdb_id, &other.imdb_id), (Some(a), Some(b)) if a == b);
        tmdb || tvdb || imdb
    }

    pub fn is_empty(&self) -> bool {
        self.tmdb_id.is_none() && self.tvdb_id.is_none() && self.imdb_id.is_none()
    }
}

/// Media-server metadata. All values compare case-insensitively.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MediaMetadata {
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default)]
    pub actors: Vec<String>,
    #[serde(default)]
    pub directors: Vec<String>,
    #[serde(default)]
    pub writers: Vec<String>,
    #[serde(default)]
    pub producers: Vec<String>,
    #[serde(default)]
    pub studios: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl MediaMetadata {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| eq_ignore_case(l, label))
    }

    pub fn in_collection(&self, collection: &str) -> bool {
        self.collections.iter().any(|c| eq_ignore_case(c, collection))
    }
}

/// Library-manager (Radarr/Sonarr) metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ManagerMetadata {
    #[serde(default)]
    pub tags: Vec<String>,
    pub quality_profile: Option<String>,
    pub monitored: bool,
    pub status: Option<SeriesStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SeriesDetails {
    pub season_count: u32,
    pub episode_count: u32,
    pub series_type: SeriesType,
}

/// Where the item lives on the media server, needed for label and collection edits
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerRef {
    pub section_id: String,
    pub rating_key: String,
    pub guid: Option<String>,
}

/// One movie or one series, merged from the library manager and the media server.
///
/// Items are read fresh every run and never written back locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaItem {
    /// Library-manager id
    pub id: u64,
    pub kind: MediaKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_title: Option<String>,
    pub year: Option<u32>,
    #[serde(default)]
    pub ids: MediaIds,
    pub last_watched: Option<DateTime<Utc>>,
    pub added_at: Option<DateTime<Utc>>,
    pub size_on_disk: u64,
    pub path: String,
    pub runtime_minutes: Option<u32>,
    pub rating: Option<f64>,
    #[serde(default)]
    pub metadata: MediaMetadata,
    #[serde(default)]
    pub manager: ManagerMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<SeriesDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerRef>,
}

impl MediaItem {
    pub fn new(id: u64, kind: MediaKind, title: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            title: title.into(),
            sort_title: None,
            year: None,
            ids: MediaIds::default(),
            last_watched: None,
            added_at: None,
            size_on_disk: 0,
            path: String::new(),
            runtime_minutes: None,
            rating: None,
            metadata: MediaMetadata::default(),
            manager: ManagerMetadata::default(),
            series: None,
            server: None,
        }
    }

    pub fn is_watched(&self) -> bool {
        self.last_watched.is_some()
    }

    pub fn series_type(&self) -> Option<SeriesType> {
        self.series.as_ref().map(|s| s.series_type)
    }

    /// Title used for ordering, falling back to the display title
    pub fn sort_key_title(&self) -> &str {
        self.sort_title.as_deref().unwrap_or(&self.title)
    }
}

impl fmt::Display for MediaItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year {
            Some(year) => write!(f, "{} ({})", self.title, year),
            None => f.write_str(&self.title),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shares_any_requires_same_id_on_both_sides() {
        let a = MediaIds { tmdb_id: Some(603), tvdb_id: None, imdb_id: Some("tt0133093".into()) };
        let b = MediaIds { tmdb_id: None, tvdb_id: Some(1), imdb_id: Some("tt0133093".into()) };
        let c = MediaIds { tmdb_id: Some(604), ..MediaIds::default() };

        assert!(a.shares_any(&b));
        assert!(!a.shares_any(&c));
        assert!(!MediaIds::default().shares_any(&MediaIds::default()));
    }

    #[test]
    fn test_display_includes_year_when_known() {
        let mut item = MediaItem::new(1, MediaKind::Movie, "The Matrix");
        assert_eq!(item.to_string(), "The Matrix");
        item.year = Some(1999);
        assert_eq!(item.to_string(), "The Matrix (1999)");
    }

    #[test]
    fn test_metadata_lookups_ignore_case() {
        let metadata = MediaMetadata {
            labels: vec!["Leaving Soon".into()],
            collections: vec!["Leaving Soon".into()],
            ..MediaMetadata::default()
        };
        assert!(metadata.has_label("leaving soon"));
        assert!(metadata.in_collection("LEAVING SOON"));
        assert!(!metadata.has_label("keep"));

        let accented = MediaMetadata {
            labels: vec!["Départ Bientôt".into()],
            collections: vec!["Dernière Chance".into()],
            ..MediaMetadata::default()
        };
        assert!(accented.has_label("DÉPART BIENTÔT"));
        assert!(accented.in_collection("dernière chance"));
    }
}
