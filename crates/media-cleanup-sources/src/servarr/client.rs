use media_cleanup_config::ArrInstance;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use crate::http::{ensure_success, read_json, send_error};
use crate::SourceError;

/// Thin v3 API client shared by Radarr and Sonarr
pub struct ArrClient {
    client: Client,
    base_url: String,
    api_key: String,
    service: String,
}

#[derive(Debug, Deserialize)]
struct TagResource {
    id: u32,
    label: String,
}

#[derive(Debug, Deserialize)]
struct QualityProfileResource {
    id: u32,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiskSpaceResource {
    path: String,
    free_space: u64,
}

impl ArrClient {
    pub fn new(client: Client, instance: &ArrInstance, kind: &str) -> Self {
        Self {
            client,
            base_url: instance.url.trim_end_matches('/').to_string(),
            api_key: instance.api_key.clone(),
            service: format!("{} '{}'", kind, instance.name),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v3/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, SourceError> {
        debug!(service = %self.service, path, "GET");
        let response = self
            .client
            .get(self.url(path))
            .header("X-Api-Key", &self.api_key)
            .query(query)
            .send()
            .await
            .map_err(send_error(&self.service))?;
        read_json(&self.service, response).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), SourceError> {
        debug!(service = %self.service, path, "POST");
        let response = self
            .client
            .post(self.url(path))
            .header("X-Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(send_error(&self.service))?;
        ensure_success(&self.service, response).await?;
        Ok(())
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), SourceError> {
        debug!(service = %self.service, path, "PUT");
        let response = self
            .client
            .put(self.url(path))
            .header("X-Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(send_error(&self.service))?;
        ensure_success(&self.service, response).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str, query: &[(&str, String)]) -> Result<(), SourceError> {
        debug!(service = %self.service, path, "DELETE");
        let response = self
            .client
            .delete(self.url(path))
            .header("X-Api-Key", &self.api_key)
            .query(query)
            .send()
            .await
            .map_err(send_error(&self.service))?;
        ensure_success(&self.service, response).await?;
        Ok(())
    }

    /// Tag id to label
    pub async fn tag_labels(&self) -> Result<HashMap<u32, String>, SourceError> {
        let tags: Vec<TagResource> = self.get("tag", &[]).await?;
        Ok(tags.into_iter().map(|t| (t.id, t.label)).collect())
    }

    /// Quality profile id to name
    pub async fn quality_profiles(&self) -> Result<HashMap<u32, String>, SourceError> {
        let profiles: Vec<QualityProfileResource> = self.get("qualityprofile", &[]).await?;
        Ok(profiles.into_iter().map(|p| (p.id, p.name)).collect())
    }

    pub async fn free_bytes(&self, path: &str) -> Result<u64, SourceError> {
        let disks: Vec<DiskSpaceResource> = self.get("diskspace", &[]).await?;
        find_free_space(&disks, path).ok_or_else(|| {
            SourceError::NotFound(format!("disk path '{}' on {}", path, self.service))
        })
    }
}

fn find_free_space(disks: &[DiskSpaceResource], path: &str) -> Option<u64> {
    let wanted = normalize_path(path);
    disks
        .iter()
        .find(|d| normalize_path(&d.path) == wanted)
        .map(|d| d.free_space)
}

fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

/// Resolve tag ids to labels, dropping ids the manager no longer knows
pub(crate) fn resolve_tags(ids: &[u32], labels: &HashMap<u32, String>) -> Vec<String> {
    ids.iter().filter_map(|id| labels.get(id).cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk(path: &str, free: u64) -> DiskSpaceResource {
        DiskSpaceResource { path: path.to_string(), free_space: free }
    }

    #[test]
    fn test_find_free_space_ignores_trailing_slash() {
        let disks = vec![disk("/", 10), disk("/data/media/", 500)];
        assert_eq!(find_free_space(&disks, "/data/media"), Some(500));
        assert_eq!(find_free_space(&disks, "/"), Some(10));
        assert_eq!(find_free_space(&disks, "/missing"), None);
    }

    #[test]
    fn test_resolve_tags() {
        let labels = HashMap::from([(1, "keep".to_string()), (2, "4k".to_string())]);
        assert_eq!(resolve_tags(&[2, 9, 1], &labels), vec!["4k".to_string(), "keep".to_string()]);
    }
}
