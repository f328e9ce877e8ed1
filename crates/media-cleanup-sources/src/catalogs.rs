use async_trait::async_trait;
use chrono::{DateTime, Utc};
use media_cleanup_config::RequestStatus;
use media_cleanup_models::{eq_ignore_case, MediaKind};
use std::collections::HashSet;
use crate::SourceError;

/// A remote list of titles (Trakt, MDBList)
#[async_trait]
pub trait ListCatalog: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Ids on the list: tmdb ids for movies, tvdb ids for series
    async fn fetch_list(&self, list_url: &str, kind: MediaKind, limit: usize) -> Result<HashSet<u32>, SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TitleQuery {
    pub title: String,
    pub year: Option<u32>,
    pub kind: MediaKind,
    pub country: String,
    pub language: String,
}

/// Streaming availability lookups (JustWatch)
#[async_trait]
pub trait AvailabilityLookup: Send + Sync {
    /// Technical provider names offering the title, or None when the title is unknown
    async fn offers(&self, query: &TitleQuery) -> Result<Option<Vec<String>>, SourceError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requester {
    pub username: Option<String>,
    pub email: Option<String>,
    pub plex_username: Option<String>,
}

impl Requester {
    pub fn matches_any(&self, users: &[String]) -> bool {
        [&self.username, &self.email, &self.plex_username]
            .into_iter()
            .flatten()
            .any(|name| users.iter().any(|u| eq_ignore_case(u, name)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaRequest {
    pub id: u64,
    pub tmdb_id: Option<u32>,
    pub status: Option<RequestStatus>,
    pub kind: MediaKind,
    pub created_at: Option<DateTime<Utc>>,
    pub requested_by: Requester,
    /// Request tracker's own media id
    pub media_id: Option<u64>,
}

/// Media request tracking (Seerr / Overseerr / Jellyseerr)
#[async_trait]
pub trait RequestTracker: Send + Sync {
    async fn requests(&self) -> Result<Vec<MediaRequest>, SourceError>;

    /// Reset the tracker's media entry so the title can be requested again.
    /// Returns false when the tracker does not know the title.
    async fn reset_media(&self, tmdb_id: u32, kind: MediaKind) -> Result<bool, SourceError>;
}
