use chrono::{TimeZone, Utc};
use media_cleanup_config::TautulliConfig;
use media_cleanup_models::WatchRecord;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info};
use crate::http::{read_json, send_error};
use crate::SourceError;

const SERVICE: &str = "tautulli";
const HISTORY_PAGE_SIZE: usize = 1000;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: ResponseBody<T>,
}

#[derive(Debug, Deserialize)]
struct ResponseBody<T> {
    result: String,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct HistoryPage {
    #[serde(default)]
    data: Vec<HistoryRow>,
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    #[serde(default, deserialize_with = "loose_key")]
    rating_key: Option<String>,
    #[serde(default, deserialize_with = "loose_key")]
    grandparent_rating_key: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    grandparent_title: Option<String>,
    #[serde(default)]
    guid: Option<String>,
    #[serde(default)]
    year: Option<Value>,
    #[serde(default)]
    media_type: Option<String>,
    stopped: Option<i64>,
}

/// Tautulli encodes keys as numbers, numeric strings, or empty strings
fn loose_key<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}

pub struct TautulliClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TautulliClient {
    pub fn new(client: Client, config: &TautulliConfig) -> Self {
        Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    async fn command<T: serde::de::DeserializeOwned>(
        &self,
        cmd: &str,
        params: &[(&str, String)],
    ) -> Result<Option<T>, SourceError> {
        let url = format!("{}/api/v2", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("apikey", self.api_key.as_str()), ("cmd", cmd)])
            .query(params)
            .send()
            .await
            .map_err(send_error(SERVICE))?;
        let envelope: Envelope<T> = read_json(SERVICE, response).await?;
        if envelope.response.result != "success" {
            return Err(SourceError::payload(
                SERVICE,
                format!(
                    "{} failed: {}",
                    cmd,
                    envelope.response.message.unwrap_or_else(|| "unknown error".to_string())
                ),
            ));
        }
        Ok(envelope.response.data)
    }

    /// Full playback history of one Plex section, oldest first
    pub async fn history(&self, section_id: &str) -> Result<Vec<WatchRecord>, SourceError> {
        let mut records = Vec::new();
        let mut start = 0;
        loop {
            let page: Option<HistoryPage> = self
                .command(
                    "get_history",
                    &[
                        ("section_id", section_id.to_string()),
                        ("order_column", "date".to_string()),
                        ("order_direction", "asc".to_string()),
                        ("start", start.to_string()),
                        ("length", HISTORY_PAGE_SIZE.to_string()),
                    ],
                )
                .await?;
            let rows = page.map(|p| p.data).unwrap_or_default();
            let fetched = rows.len();
            records.extend(rows.into_iter().filter_map(row_to_record));
            start += fetched;
            if fetched < HISTORY_PAGE_SIZE {
                break;
            }
        }
        debug!(section_id, records = records.len(), "Fetched Tautulli history");
        Ok(records)
    }

    pub async fn refresh_library(&self, section_id: &str) -> Result<(), SourceError> {
        self.command::<Value>(
            "get_library_media_info",
            &[
                ("section_id", section_id.to_string()),
                ("refresh", "true".to_string()),
            ],
        )
        .await?;
        info!(section_id, "Refreshed Tautulli library");
        Ok(())
    }
}

/// Episodes resolve to their show so series see the latest play of any episode
fn row_to_record(row: HistoryRow) -> Option<WatchRecord> {
    let stopped = row.stopped.and_then(|ts| Utc.timestamp_opt(ts, 0).single())?;
    let is_episode = row.media_type.as_deref() == Some("episode");
    let (rating_key, title) = if is_episode {
        (row.grandparent_rating_key, row.grandparent_title)
    } else {
        (row.rating_key, row.title)
    };
    let year = match row.year {
        Some(Value::Number(n)) => n.as_u64().and_then(|y| u32::try_from(y).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|y| *y > 0);

    Some(WatchRecord {
        rating_key,
        guid: if is_episode { None } else { row.guid },
        title: title.unwrap_or_default(),
        year,
        stopped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_movie_row_keeps_own_key() {
        let row: HistoryRow = serde_json::from_value(json!({
            "rating_key": 5012,
            "grandparent_rating_key": "",
            "title": "The Matrix",
            "guid": "plex://movie/abc",
            "year": 1999,
            "media_type": "movie",
            "stopped": 1_700_000_000
        }))
        .unwrap();
        let record = row_to_record(row).unwrap();
        assert_eq!(record.rating_key.as_deref(), Some("5012"));
        assert_eq!(record.title, "The Matrix");
        assert_eq!(record.year, Some(1999));
        assert_eq!(record.guid.as_deref(), Some("plex://movie/abc"));
    }

    #[test]
    fn test_episode_row_resolves_to_show() {
        let row: HistoryRow = serde_json::from_value(json!({
            "rating_key": "9001",
            "grandparent_rating_key": "77",
            "title": "Pilot",
            "grandparent_title": "Severance",
            "year": "2022",
            "media_type": "episode",
            "stopped": 1_650_000_000
        }))
        .unwrap();
        let record = row_to_record(row).unwrap();
        assert_eq!(record.rating_key.as_deref(), Some("77"));
        assert_eq!(record.title, "Severance");
        assert_eq!(record.year, Some(2022));
    }

    #[test]
    fn test_row_without_stop_time_is_dropped() {
        let row: HistoryRow = serde_json::from_value(json!({
            "rating_key": 1,
            "title": "Still playing",
            "media_type": "movie",
            "stopped": null
        }))
        .unwrap();
        assert!(row_to_record(row).is_none());
    }
}
