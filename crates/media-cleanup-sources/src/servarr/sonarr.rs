use chrono::{DateTime, Utc};
use media_cleanup_config::ArrInstance;
use media_cleanup_models::{ManagerMetadata, MediaIds, MediaItem, MediaKind, SeriesDetails};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use super::client::{resolve_tags, ArrClient};
use crate::SourceError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SonarrSeries {
    id: u64,
    title: String,
    sort_title: Option<String>,
    year: Option<u32>,
    tvdb_id: Option<u32>,
    tmdb_id: Option<u32>,
    imdb_id: Option<String>,
    path: Option<String>,
    #[serde(default)]
    monitored: bool,
    quality_profile_id: Option<u32>,
    #[serde(default)]
    tags: Vec<u32>,
    added: Option<DateTime<Utc>>,
    runtime: Option<u32>,
    ratings: Option<SonarrRating>,
    status: Option<String>,
    series_type: Option<String>,
    #[serde(default)]
    statistics: SonarrStatistics,
}

#[derive(Debug, Deserialize)]
struct SonarrRating {
    value: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SonarrStatistics {
    #[serde(default)]
    season_count: u32,
    #[serde(default)]
    episode_file_count: u32,
    #[serde(default)]
    size_on_disk: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SonarrEpisode {
    id: u64,
    #[serde(default)]
    episode_file_id: u64,
}

pub struct SonarrClient {
    api: ArrClient,
}

impl SonarrClient {
    pub fn new(client: Client, instance: &ArrInstance) -> Self {
        Self {
            api: ArrClient::new(client, instance, "sonarr"),
        }
    }

    pub fn api(&self) -> &ArrClient {
        &self.api
    }

    pub async fn series(&self) -> Result<Vec<MediaItem>, SourceError> {
        let tags = self.api.tag_labels().await?;
        let profiles = self.api.quality_profiles().await?;
        let series: Vec<SonarrSeries> = self.api.get("series", &[]).await?;
        Ok(series
            .into_iter()
            .map(|s| series_to_item(s, &tags, &profiles))
            .collect())
    }

    /// Unmonitor every episode, remove episode files, then remove the series with its folder
    pub async fn delete_series(&self, id: u64) -> Result<(), SourceError> {
        let episodes: Vec<SonarrEpisode> = self
            .api
            .get("episode", &[("seriesId", id.to_string())])
            .await?;

        if !episodes.is_empty() {
            let episode_ids: Vec<u64> = episodes.iter().map(|e| e.id).collect();
            self.api
                .put("episode/monitor", &json!({ "episodeIds": episode_ids, "monitored": false }))
                .await?;
        }

        let mut file_ids: Vec<u64> = episodes
            .iter()
            .map(|e| e.episode_file_id)
            .filter(|id| *id > 0)
            .collect();
        file_ids.sort_unstable();
        file_ids.dedup();

        for file_id in file_ids {
            match self.api.delete(&format!("episodefile/{}", file_id), &[]).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    debug!(series_id = id, file_id, "Episode file already gone");
                }
                Err(e) => {
                    warn!(series_id = id, file_id, error = %e, "Failed to delete episode file");
                    return Err(e);
                }
            }
        }

        self.api
            .delete(
                &format!("series/{}", id),
                &[
                    ("deleteFiles", "true".to_string()),
                    ("addImportListExclusion", "false".to_string()),
                ],
            )
            .await?;
        info!(service = %self.api.service(), series_id = id, "Deleted series");
        Ok(())
    }

    pub async fn add_exclusion(&self, item: &MediaItem) -> Result<(), SourceError> {
        let tvdb_id = item.ids.tvdb_id.ok_or_else(|| {
            SourceError::new(format!("cannot exclude '{}' from import lists: no tvdb id", item))
        })?;
        let body = json!({ "tvdbId": tvdb_id, "title": item.title });
        self.api.post("importlistexclusion", &body).await
    }
}

fn series_to_item(
    series: SonarrSeries,
    tags: &HashMap<u32, String>,
    profiles: &HashMap<u32, String>,
) -> MediaItem {
    let mut item = MediaItem::new(series.id, MediaKind::Series, series.title);
    item.sort_title = series.sort_title;
    item.year = series.year.filter(|y| *y > 0);
    item.ids = MediaIds {
        tmdb_id: series.tmdb_id.filter(|id| *id > 0),
        tvdb_id: series.tvdb_id.filter(|id| *id > 0),
        imdb_id: series.imdb_id.filter(|id| !id.is_empty()),
    };
    item.added_at = series.added;
    item.size_on_disk = series.statistics.size_on_disk;
    item.path = series.path.unwrap_or_default();
    item.runtime_minutes = series.runtime.filter(|r| *r > 0);
    item.rating = series.ratings.map(|r| r.value).filter(|v| *v > 0.0);
    item.manager = ManagerMetadata {
        tags: resolve_tags(&series.tags, tags),
        quality_profile: series.quality_profile_id.and_then(|id| profiles.get(&id).cloned()),
        monitored: series.monitored,
        status: series.status.as_deref().and_then(|s| s.parse().ok()),
    };
    item.series = Some(SeriesDetails {
        season_count: series.statistics.season_count,
        episode_count: series.statistics.episode_file_count,
        series_type: series
            .series_type
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or_default(),
    });
    item
}
