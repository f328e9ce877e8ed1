use chrono::{DateTime, Utc};
use media_cleanup_config::ArrInstance;
use media_cleanup_models::{ManagerMetadata, MediaIds, MediaItem, MediaKind};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::info;
use super::client::{resolve_tags, ArrClient};
use crate::SourceError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RadarrMovie {
    id: u64,
    title: String,
    sort_title: Option<String>,
    year: Option<u32>,
    tmdb_id: Option<u32>,
    imdb_id: Option<String>,
    path: Option<String>,
    #[serde(default)]
    size_on_disk: u64,
    #[serde(default)]
    monitored: bool,
    quality_profile_id: Option<u32>,
    #[serde(default)]
    tags: Vec<u32>,
    added: Option<DateTime<Utc>>,
    runtime: Option<u32>,
    #[serde(default)]
    ratings: RadarrRatings,
}

#[derive(Debug, Default, Deserialize)]
struct RadarrRatings {
    imdb: Option<RatingValue>,
    tmdb: Option<RatingValue>,
}

#[derive(Debug, Deserialize)]
struct RatingValue {
    value: f64,
}

pub struct RadarrClient {
    api: ArrClient,
}

impl RadarrClient {
    pub fn new(client: Client, instance: &ArrInstance) -> Self {
        Self {
            api: ArrClient::new(client, instance, "radarr"),
        }
    }

    pub fn api(&self) -> &ArrClient {
        &self.api
    }

    pub async fn movies(&self) -> Result<Vec<MediaItem>, SourceError> {
        let tags = self.api.tag_labels().await?;
        let profiles = self.api.quality_profiles().await?;
        let movies: Vec<RadarrMovie> = self.api.get("movie", &[]).await?;
        Ok(movies
            .into_iter()
            .map(|movie| movie_to_item(movie, &tags, &profiles))
            .collect())
    }

    pub async fn delete_movie(&self, id: u64) -> Result<(), SourceError> {
        self.api
            .delete(
                &format!("movie/{}", id),
                &[
                    ("deleteFiles", "true".to_string()),
                    ("addImportExclusion", "false".to_string()),
                ],
            )
            .await?;
        info!(service = %self.api.service(), movie_id = id, "Deleted movie");
        Ok(())
    }

    pub async fn add_exclusion(&self, item: &MediaItem) -> Result<(), SourceError> {
        let tmdb_id = item.ids.tmdb_id.ok_or_else(|| {
            SourceError::new(format!("cannot exclude '{}' from import lists: no tmdb id", item))
        })?;
        let body = json!({
            "tmdbId": tmdb_id,
            "movieTitle": item.title,
            "movieYear": item.year.unwrap_or(0),
        });
        self.api.post("exclusions", &body).await
    }
}

fn movie_to_item(
    movie: RadarrMovie,
    tags: &HashMap<u32, String>,
    profiles: &HashMap<u32, String>,
) -> MediaItem {
    let rating = movie
        .ratings
        .imdb
        .or(movie.ratings.tmdb)
        .map(|r| r.value)
        .filter(|v| *v > 0.0);

    let mut item = MediaItem::new(movie.id, MediaKind::Movie, movie.title);
    item.sort_title = movie.sort_title;
    item.year = movie.year.filter(|y| *y > 0);
    item.ids = MediaIds {
        tmdb_id: movie.tmdb_id.filter(|id| *id > 0),
        tvdb_id: None,
        imdb_id: movie.imdb_id.filter(|id| !id.is_empty()),
    };
    item.added_at = movie.added;
    item.size_on_disk = movie.size_on_disk;
    item.path = movie.path.unwrap_or_default();
    item.runtime_minutes = movie.runtime.filter(|r| *r > 0);
    item.rating = rating;
    item.manager = ManagerMetadata {
        tags: resolve_tags(&movie.tags, tags),
        quality_profile: movie.quality_profile_id.and_then(|id| profiles.get(&id).cloned()),
        monitored: movie.monitored,
        status: None,
    };
    item
}
