use chrono::{DateTime, Utc};
use media_cleanup_sources::{MediaRequest, TitleQuery};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};
use crate::CleanupError;

/// Fetched list contents, or None when the fetch failed this run
pub type CachedList = Option<Arc<HashSet<u32>>>;

/// State that lives for exactly one run.
///
/// A daemon creates a fresh context per tick so provider caches and warning
/// suppression never leak from one run into the next.
#[derive(Debug)]
pub struct RunContext {
    now: DateTime<Utc>,
    lists: HashMap<String, CachedList>,
    availability: HashMap<TitleQuery, Option<Vec<String>>>,
    requests: Option<Option<Arc<Vec<MediaRequest>>>>,
    warned: HashSet<String>,
}

impl RunContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            lists: HashMap::new(),
            availability: HashMap::new(),
            requests: None,
            warned: HashSet::new(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Cache key for a provider list: `provider:list-identity`
    pub fn list_key(provider: &str, list: &str, kind: impl std::fmt::Display) -> String {
        format!("{}:{}:{}", provider, list, kind)
    }

    pub fn cached_list(&self, key: &str) -> Option<CachedList> {
        self.lists.get(key).cloned()
    }

    pub fn store_list(&mut self, key: String, list: CachedList) {
        self.lists.insert(key, list);
    }

    pub fn cached_offers(&self, query: &TitleQuery) -> Option<Option<Vec<String>>> {
        self.availability.get(query).cloned()
    }

    pub fn store_offers(&mut self, query: TitleQuery, offers: Option<Vec<String>>) {
        self.availability.insert(query, offers);
    }

    pub fn cached_requests(&self) -> Option<Option<Arc<Vec<MediaRequest>>>> {
        self.requests.clone()
    }

    pub fn store_requests(&mut self, requests: Option<Arc<Vec<MediaRequest>>>) {
        self.requests = Some(requests);
    }

    /// Log a provider failure. Warns the first time per provider, debug afterwards.
    pub fn report_provider_error(&mut self, error: &CleanupError) {
        let provider = match error {
            CleanupError::ProviderFetch { provider, .. } => provider.clone(),
            other => other.to_string(),
        };
        if self.warned.insert(provider.clone()) {
            warn!(
                operation = "provider_error",
                provider = %provider,
                error = %error,
                "Exclusion provider failed, treating its rules as not matching for this run"
            );
        } else {
            debug!(provider = %provider, error = %error, "Exclusion provider failed again");
        }
    }

    pub fn provider_warned(&self, provider: &str) -> bool {
        self.warned.contains(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_cleanup_sources::SourceError;

    #[test]
    fn test_provider_errors_warn_once_per_provider() {
        let mut ctx = RunContext::new(Utc::now());
        let err = CleanupError::provider("trakt", SourceError::Timeout { service: "trakt".into() });
        assert!(!ctx.provider_warned("trakt"));
        ctx.report_provider_error(&err);
        ctx.report_provider_error(&err);
        assert!(ctx.provider_warned("trakt"));
        assert!(!ctx.provider_warned("mdblist"));
    }

    #[test]
    fn test_list_cache_remembers_failures() {
        let mut ctx = RunContext::new(Utc::now());
        let key = RunContext::list_key("mdblist", "u/list", "movie");
        assert_eq!(key, "mdblist:u/list:movie");
        assert!(ctx.cached_list(&key).is_none());

        ctx.store_list(key.clone(), None);
        assert_eq!(ctx.cached_list(&key), Some(None));

        let ids: HashSet<u32> = [1, 2].into_iter().collect();
        ctx.store_list(key.clone(), Some(Arc::new(ids)));
        assert_eq!(ctx.cached_list(&key).flatten().unwrap().len(), 2);
    }
}
