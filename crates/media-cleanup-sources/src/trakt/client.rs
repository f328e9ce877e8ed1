use async_trait::async_trait;
use media_cleanup_config::TraktConfig;
use media_cleanup_models::MediaKind;
use reqwest::Client;
use std::collections::HashSet;
use tracing::debug;
use super::api::{fetch_list_ids, parse_list_url};
use crate::catalogs::ListCatalog;
use crate::SourceError;

/// Public Trakt lists, read with the application's client id only
pub struct TraktClient {
    client: Client,
    client_id: String,
}

impl TraktClient {
    pub fn new(client: Client, config: &TraktConfig) -> Self {
        Self {
            client,
            client_id: config.client_id.clone(),
        }
    }
}

#[async_trait]
impl ListCatalog for TraktClient {
    fn provider_name(&self) -> &'static str {
        "trakt"
    }

    async fn fetch_list(&self, list_url: &str, kind: MediaKind, limit: usize) -> Result<HashSet<u32>, SourceError> {
        let list = parse_list_url(list_url)?;
        let ids = fetch_list_ids(&self.client, &self.client_id, &list, kind, limit).await?;
        debug!(list_url, kind = %kind, count = ids.len(), "Loaded Trakt list");
        Ok(ids)
    }
}
