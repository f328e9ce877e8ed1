use async_trait::async_trait;
use chrono::{DateTime, Utc};
use media_cleanup_config::{RequestStatus, SeerrConfig};
use media_cleanup_models::MediaKind;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info};
use crate::catalogs::{MediaRequest, RequestTracker, Requester};
use crate::http::{ensure_success, read_json, send_error};
use crate::SourceError;

const SERVICE: &str = "seerr";
const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestPage {
    #[serde(default)]
    page_info: PageInfo,
    #[serde(default)]
    results: Vec<RequestResource>,
}

#[derive(Debug, Default, Deserialize)]
struct PageInfo {
    #[serde(default)]
    pages: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestResource {
    id: u64,
    status: Option<u8>,
    #[serde(rename = "type")]
    media_type: Option<String>,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    requested_by: Option<UserResource>,
    #[serde(default)]
    media: Option<MediaResource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserResource {
    username: Option<String>,
    email: Option<String>,
    plex_username: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaResource {
    id: Option<u64>,
    tmdb_id: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaDetails {
    media_info: Option<MediaResource>,
}

/// Seerr, Overseerr and Jellyseerr share this API
pub struct SeerrClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SeerrClient {
    pub fn new(client: Client, config: &SeerrConfig) -> Self {
        Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, SourceError> {
        let response = self
            .client
            .get(self.url(path))
            .header("X-Api-Key", &self.api_key)
            .query(query)
            .send()
            .await
            .map_err(send_error(SERVICE))?;
        read_json(SERVICE, response).await
    }

    async fn media_id(&self, tmdb_id: u32, kind: MediaKind) -> Result<Option<u64>, SourceError> {
        let known = self
            .requests()
            .await?
            .into_iter()
            .find(|r| r.tmdb_id == Some(tmdb_id))
            .and_then(|r| r.media_id);
        if known.is_some() {
            return Ok(known);
        }

        let path = match kind {
            MediaKind::Movie => format!("/movie/{}", tmdb_id),
            MediaKind::Series => format!("/tv/{}", tmdb_id),
        };
        match self.get::<MediaDetails>(&path, &[]).await {
            Ok(details) => Ok(details.media_info.and_then(|m| m.id)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl RequestTracker for SeerrClient {
    async fn requests(&self) -> Result<Vec<MediaRequest>, SourceError> {
        let mut requests = Vec::new();
        let mut seen = HashSet::new();
        let mut page = 0;
        loop {
            let result: RequestPage = self
                .get(
                    "/request",
                    &[
                        ("take", PAGE_SIZE.to_string()),
                        ("skip", (page * PAGE_SIZE).to_string()),
                        ("filter", "all".to_string()),
                    ],
                )
                .await?;
            if result.results.is_empty() {
                break;
            }
            for resource in result.results {
                let request = to_request(resource);
                // Keep the first request per title
                if let Some(tmdb_id) = request.tmdb_id {
                    if seen.insert(tmdb_id) {
                        requests.push(request);
                    }
                }
            }
            page += 1;
            if page >= result.page_info.pages {
                break;
            }
        }
        debug!(count = requests.len(), "Fetched Seerr requests");
        Ok(requests)
    }

    async fn reset_media(&self, tmdb_id: u32, kind: MediaKind) -> Result<bool, SourceError> {
        let Some(media_id) = self.media_id(tmdb_id, kind).await? else {
            debug!(tmdb_id, "Title unknown to Seerr, nothing to reset");
            return Ok(false);
        };

        let response = self
            .client
            .delete(self.url(&format!("/media/{}", media_id)))
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(send_error(SERVICE))?;
        ensure_success(SERVICE, response).await?;
        info!(tmdb_id, media_id, "Reset Seerr media entry");
        Ok(true)
    }
}

fn to_request(resource: RequestResource) -> MediaRequest {
    let kind = match resource.media_type.as_deref() {
        Some("tv") => MediaKind::Series,
        _ => MediaKind::Movie,
    };
    let requested_by = resource
        .requested_by
        .map(|u| Requester {
            username: u.username,
            email: u.email,
            plex_username: u.plex_username,
        })
        .unwrap_or_default();
    let (tmdb_id, media_id) = resource
        .media
        .map(|m| (m.tmdb_id, m.id))
        .unwrap_or((None, None));

    MediaRequest {
        id: resource.id,
        tmdb_id,
        status: resource.status.and_then(RequestStatus::from_code),
        kind,
        created_at: resource.created_at,
        requested_by,
        media_id,
    }
}
