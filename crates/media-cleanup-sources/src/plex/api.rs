use chrono::{DateTime, TimeZone, Utc};
use media_cleanup_config::PlexConfig;
use media_cleanup_models::{eq_ignore_case, MediaIds, MediaKind, MediaMetadata};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};
use crate::http::{ensure_success, read_json, send_error};
use crate::SourceError;

const SERVICE: &str = "plex";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlexSection {
    pub key: String,
    pub title: String,
    pub type_: String,
}

impl PlexSection {
    /// Plex metadata type number used by section edit endpoints
    fn metadata_type(&self) -> u8 {
        if self.type_ == "show" {
            2
        } else {
            1
        }
    }
}

/// One top-level item (movie or show) in a Plex library section
#[derive(Debug, Clone, PartialEq)]
pub struct PlexMetadata {
    pub rating_key: String,
    pub guid: Option<String>,
    pub title: String,
    pub year: Option<u32>,
    pub ids: MediaIds,
    pub metadata: MediaMetadata,
    pub added_at: Option<DateTime<Utc>>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Label,
    Collection,
}

impl TagKind {
    fn field(&self) -> &'static str {
        match self {
            TagKind::Label => "label",
            TagKind::Collection => "collection",
        }
    }
}

pub struct PlexClient {
    client: Client,
    base_url: String,
    token: String,
}

impl PlexClient {
    pub fn new(client: Client, config: &PlexConfig) -> Self {
        Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(path, "Plex GET");
        let response = self
            .client
            .get(&url)
            .header("X-Plex-Token", &self.token)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await
            .map_err(send_error(SERVICE))?;
        read_json(SERVICE, response).await
    }

    pub async fn sections(&self) -> Result<Vec<PlexSection>, SourceError> {
        let json = self.get_json("/library/sections", &[]).await?;
        let directories = json
            .get("MediaContainer")
            .and_then(|c| c.get("Directory"))
            .and_then(|d| d.as_array())
            .cloned()
            .unwrap_or_default();

        Ok(directories
            .iter()
            .filter_map(|dir| {
                Some(PlexSection {
                    key: dir.get("key")?.as_str()?.to_string(),
                    title: dir.get("title")?.as_str()?.to_string(),
                    type_: dir.get("type").and_then(|t| t.as_str()).unwrap_or("").to_string(),
                })
            })
            .collect())
    }

    pub async fn section(&self, name: &str) -> Result<PlexSection, SourceError> {
        self.sections()
            .await?
            .into_iter()
            .find(|s| s.title == name)
            .ok_or_else(|| SourceError::NotFound(format!("Plex library '{}'", name)))
    }

    pub async fn section_items(&self, section: &PlexSection) -> Result<Vec<PlexMetadata>, SourceError> {
        let path = format!("/library/sections/{}/all", section.key);
        let json = self
            .get_json(&path, &[("includeGuids", "1".to_string())])
            .await?;

        let entries = json
            .get("MediaContainer")
            .and_then(|c| c.get("Metadata"))
            .and_then(|m| m.as_array())
            .cloned()
            .unwrap_or_default();

        let mut items = Vec::with_capacity(entries.len());
        let mut skipped = 0;
        for entry in &entries {
            match parse_metadata(entry) {
                Some(item) => items.push(item),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!(section = %section.title, skipped, "Skipped Plex items without rating key or title");
        }
        debug!(section = %section.title, count = items.len(), "Loaded Plex section");
        Ok(items)
    }

    /// Add or remove one label or collection on an item. Locks the field so Plex
    /// agents do not overwrite it on the next metadata refresh.
    ///
    /// Plex replaces the whole tag list on an indexed add, so `existing` (the item's
    /// current values for this field) is re-sent ahead of the new value.
    pub async fn edit_tag(
        &self,
        section: &PlexSection,
        rating_key: &str,
        kind: TagKind,
        existing: &[String],
        value: &str,
        add: bool,
    ) -> Result<(), SourceError> {
        let field = kind.field();
        let url = format!("{}/library/sections/{}/all", self.base_url, section.key);
        let query = tag_edit_query(section, rating_key, kind, existing, value, add);

        let response = self
            .client
            .put(&url)
            .header("X-Plex-Token", &self.token)
            .query(&query)
            .send()
            .await
            .map_err(send_error(SERVICE))?;
        ensure_success(SERVICE, response).await?;
        debug!(rating_key, field, value, add, "Edited Plex tag");
        Ok(())
    }

    /// Rating key of the named collection in a section, if it exists
    pub async fn collection_key(&self, section: &PlexSection, name: &str) -> Result<Option<String>, SourceError> {
        let path = format!("/library/sections/{}/collections", section.key);
        let json = self.get_json(&path, &[]).await?;
        let found = json
            .get("MediaContainer")
            .and_then(|c| c.get("Metadata"))
            .and_then(|m| m.as_array())
            .and_then(|entries| {
                entries.iter().find(|entry| {
                    entry
                        .get("title")
                        .and_then(|t| t.as_str())
                        .is_some_and(|title| eq_ignore_case(title, name))
                })
            })
            .and_then(|entry| match entry.get("ratingKey")? {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });
        Ok(found)
    }

    /// Pin a collection to the library's recommended row and optionally to the
    /// owner's and shared users' home screens
    pub async fn set_collection_visibility(
        &self,
        section: &PlexSection,
        collection_key: &str,
        home: bool,
        shared: bool,
    ) -> Result<(), SourceError> {
        let manage = format!("/hubs/sections/{}/manage", section.key);
        let hubs = self
            .get_json(&manage, &[("metadataItemId", collection_key.to_string())])
            .await?;
        let existing = hubs
            .get("MediaContainer")
            .and_then(|c| c.get("Hub"))
            .and_then(|h| h.as_array())
            .and_then(|h| h.first())
            .and_then(|hub| hub.get("identifier"))
            .and_then(|i| i.as_str())
            .map(str::to_string);

        let flag = |on: bool| if on { "1" } else { "0" }.to_string();
        let mut query = vec![
            ("promotedToRecommended", "1".to_string()),
            ("promotedToOwnHome", flag(home)),
            ("promotedToSharedHome", flag(shared)),
        ];
        let request = match &existing {
            Some(identifier) => self
                .client
                .put(format!("{}{}/{}", self.base_url, manage, identifier)),
            None => {
                query.insert(0, ("metadataItemId", collection_key.to_string()));
                self.client.post(format!("{}{}", self.base_url, manage))
            }
        };
        let response = request
            .header("X-Plex-Token", &self.token)
            .query(&query)
            .send()
            .await
            .map_err(send_error(SERVICE))?;
        ensure_success(SERVICE, response).await?;
        debug!(collection_key, home, shared, updated = existing.is_some(), "Set Plex collection visibility");
        Ok(())
    }

    pub async fn refresh_section(&self, section: &PlexSection) -> Result<(), SourceError> {
        let url = format!("{}/library/sections/{}/refresh", self.base_url, section.key);
        let response = self
            .client
            .get(&url)
            .header("X-Plex-Token", &self.token)
            .send()
            .await
            .map_err(send_error(SERVICE))?;
        ensure_success(SERVICE, response).await?;
        info!(section = %section.title, "Requested Plex library scan");
        Ok(())
    }
}

fn tag_edit_query(
    section: &PlexSection,
    rating_key: &str,
    kind: TagKind,
    existing: &[String],
    value: &str,
    add: bool,
) -> Vec<(String, String)> {
    let field = kind.field();
    let mut query = vec![
        ("type".to_string(), section.metadata_type().to_string()),
        ("id".to_string(), rating_key.to_string()),
        (format!("{}.locked", field), "1".to_string()),
    ];
    if add {
        let kept = existing.iter().filter(|tag| !eq_ignore_case(tag, value));
        for (index, tag) in kept.map(String::as_str).chain([value]).enumerate() {
            query.push((format!("{}[{}].tag.tag", field, index), tag.to_string()));
        }
    } else {
        query.push((format!("{}[].tag.tag-", field), value.to_string()));
    }
    query
}

fn parse_metadata(item: &Value) -> Option<PlexMetadata> {
    let rating_key = match item.get("ratingKey")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let title = item.get("title")?.as_str()?.to_string();
    let year = item.get("year").and_then(|y| y.as_u64()).map(|y| y as u32);
    let guid = item.get("guid").and_then(|g| g.as_str()).map(str::to_string);
    let added_at = parse_timestamp(item.get("addedAt"));
    let rating = item
        .get("audienceRating")
        .or_else(|| item.get("rating"))
        .and_then(|r| r.as_f64());

    let metadata = MediaMetadata {
        genres: tag_values(item, "Genre"),
        collections: tag_values(item, "Collection"),
        actors: tag_values(item, "Role"),
        directors: tag_values(item, "Director"),
        writers: tag_values(item, "Writer"),
        producers: tag_values(item, "Producer"),
        studios: item
            .get("studio")
            .and_then(|s| s.as_str())
            .map(|s| vec![s.to_string()])
            .unwrap_or_default(),
        labels: tag_values(item, "Label"),
    };

    Some(PlexMetadata {
        rating_key,
        guid,
        title,
        year,
        ids: parse_guid_ids(item.get("Guid").unwrap_or(&Value::Null)),
        metadata,
        added_at,
        rating,
    })
}

fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(|t| t.as_i64())
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
}

fn tag_values(item: &Value, key: &str) -> Vec<String> {
    item.get(key)
        .and_then(|v| v.as_array())
        .map(|tags| {
            tags.iter()
                .filter_map(|t| t.get("tag").and_then(|v| v.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Extract external ids from Plex `Guid` entries such as `tmdb://603`
fn parse_guid_ids(guids: &Value) -> MediaIds {
    let mut ids = MediaIds::default();
    let Some(entries) = guids.as_array() else {
        return ids;
    };
    for entry in entries {
        let Some(id) = entry.get("id").and_then(|i| i.as_str()).or_else(|| entry.as_str()) else {
            continue;
        };
        if let Some(tmdb) = id.strip_prefix("tmdb://") {
            ids.tmdb_id = tmdb.parse().ok();
        } else if let Some(tvdb) = id.strip_prefix("tvdb://") {
            ids.tvdb_id = tvdb.parse().ok();
        } else if let Some(imdb) = id.strip_prefix("imdb://") {
            ids.imdb_id = Some(imdb.to_string());
        }
    }
    ids
}

/// Section type Plex uses for a media kind
pub(crate) fn section_type_for(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Movie => "movie",
        MediaKind::Series => "show",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_metadata_reads_tags_and_guids() {
        let entry = json!({
            "ratingKey": "5012",
            "guid": "plex://movie/5d776825880197001ec967c2",
            "title": "The Matrix",
            "year": 1999,
            "addedAt": 1_700_000_000,
            "audienceRating": 8.7,
            "studio": "Warner Bros.",
            "Genre": [{ "tag": "Action" }, { "tag": "Science Fiction" }],
            "Collection": [{ "tag": "Leaving Soon" }],
            "Label": [{ "tag": "leaving-soon" }],
            "Role": [{ "tag": "Keanu Reeves" }],
            "Director": [{ "tag": "Lana Wachowski" }],
            "Guid": [{ "id": "imdb://tt0133093" }, { "id": "tmdb://603" }, { "id": "tvdb://169" }]
        });

        let item = parse_metadata(&entry).unwrap();
        assert_eq!(item.rating_key, "5012");
        assert_eq!(item.year, Some(1999));
        assert_eq!(item.ids.tmdb_id, Some(603));
        assert_eq!(item.ids.imdb_id.as_deref(), Some("tt0133093"));
        assert_eq!(item.metadata.genres, vec!["Action", "Science Fiction"]);
        assert_eq!(item.metadata.studios, vec!["Warner Bros."]);
        assert!(item.metadata.has_label("Leaving-Soon"));
        assert!(item.metadata.in_collection("leaving soon"));
        assert_eq!(item.added_at.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(item.rating, Some(8.7));
    }

    #[test]
    fn test_parse_metadata_requires_key_and_title() {
        assert!(parse_metadata(&json!({ "title": "No key" })).is_none());
        assert!(parse_metadata(&json!({ "ratingKey": "1" })).is_none());
        let numeric = parse_metadata(&json!({ "ratingKey": 42, "title": "Numeric" })).unwrap();
        assert_eq!(numeric.rating_key, "42");
        assert!(numeric.ids.is_empty());
    }

    #[test]
    fn test_tag_add_resends_existing_values_once() {
        let section = PlexSection { key: "1".into(), title: "Movies".into(), type_: "movie".into() };
        let existing = vec!["Kids".to_string(), "LEAVING-SOON".to_string()];
        let query = tag_edit_query(&section, "77", TagKind::Label, &existing, "leaving-soon", true);
        let tags: Vec<_> = query
            .iter()
            .filter(|(key, _)| key.starts_with("label["))
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        assert_eq!(tags, vec!["label[0].tag.tag=Kids", "label[1].tag.tag=leaving-soon"]);

        let removal = tag_edit_query(&section, "77", TagKind::Collection, &existing, "Old", false);
        assert_eq!(removal.last().unwrap(), &("collection[].tag.tag-".to_string(), "Old".to_string()));
        assert_eq!(removal.len(), 4);
    }

    #[test]
    fn test_section_metadata_type() {
        let show = PlexSection { key: "2".into(), title: "TV".into(), type_: "show".into() };
        let movie = PlexSection { key: "1".into(), title: "Movies".into(), type_: "movie".into() };
        assert_eq!(show.metadata_type(), 2);
        assert_eq!(movie.metadata_type(), 1);
        assert_eq!(section_type_for(MediaKind::Series), "show");
    }
}
