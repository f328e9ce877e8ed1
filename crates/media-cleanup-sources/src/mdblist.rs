use async_trait::async_trait;
use media_cleanup_config::MdblistConfig;
use media_cleanup_models::MediaKind;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;
use crate::catalogs::ListCatalog;
use crate::http::{ensure_success, json_u32, send_error};
use crate::SourceError;

const API_BASE: &str = "https://api.mdblist.com";
const SERVICE: &str = "mdblist";
const PAGE_SIZE: usize = 1000;

pub struct MdblistClient {
    client: Client,
    api_key: String,
}

impl MdblistClient {
    pub fn new(client: Client, config: &MdblistConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
        }
    }

    async fn fetch_page(&self, list_path: &str, offset: usize) -> Result<(Vec<Value>, bool), SourceError> {
        let url = format!("{}/lists/{}/items", API_BASE, list_path);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("apikey", self.api_key.clone()),
                ("limit", PAGE_SIZE.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await
            .map_err(send_error(SERVICE))?;
        let response = ensure_success(SERVICE, response).await?;

        let has_more = response
            .headers()
            .get("X-Has-More")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("true"));
        let body: Value = response
            .json()
            .await
            .map_err(send_error(SERVICE))?;
        let entries = page_entries(body);
        let more = has_more.unwrap_or(entries.len() >= PAGE_SIZE);
        Ok((entries, more))
    }
}

#[async_trait]
impl ListCatalog for MdblistClient {
    fn provider_name(&self) -> &'static str {
        "mdblist"
    }

    async fn fetch_list(&self, list_url: &str, kind: MediaKind, limit: usize) -> Result<HashSet<u32>, SourceError> {
        let list_path = extract_list_path(list_url)
            .ok_or_else(|| SourceError::new(format!("unrecognized MDBList URL '{}'", list_url)))?;

        let mut entries = Vec::new();
        let mut offset = 0;
        while entries.len() < limit {
            let (page, more) = self.fetch_page(&list_path, offset).await?;
            let fetched = page.len();
            entries.extend(page);
            offset += fetched;
            if fetched < PAGE_SIZE || !more {
                break;
            }
        }
        entries.truncate(limit);

        let ids: HashSet<u32> = entries.iter().filter_map(|e| entry_id(e, kind)).collect();
        debug!(list_url, kind = %kind, count = ids.len(), "Loaded MDBList list");
        Ok(ids)
    }
}

/// `https://mdblist.com/lists/<user>/<slug>` to `<user>/<slug>`
pub fn extract_list_path(url: &str) -> Option<String> {
    let rest = url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.")
        .strip_prefix("mdblist.com/lists/")?;
    let path = rest.split(['?', '#']).next()?.trim_end_matches('/');
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

/// The items endpoint answers with either a bare array or `{movies, shows}`
fn page_entries(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let mut items = Vec::new();
            for key in ["movies", "shows"] {
                if let Some(Value::Array(list)) = map.remove(key) {
                    items.extend(list);
                }
            }
            items
        }
        _ => Vec::new(),
    }
}

fn entry_id(entry: &Value, kind: MediaKind) -> Option<u32> {
    match kind {
        MediaKind::Movie => json_u32(entry.get("tmdbid")).or_else(|| json_u32(entry.get("id"))),
        MediaKind::Series => json_u32(entry.get("tvdbid")),
    }
}
