//! External-catalog exclusion rules.
//!
//! The set of providers is closed: each variant owns the catalog client it needs and
//! the library's rule block for it. Fetched lists are cached in the `RunContext`, so a
//! list is requested at most once per run however many items are checked against it.

use chrono::{DateTime, Utc};
use media_cleanup_config::{
    Config, JustWatchExclusions, LibraryPolicy, MdblistExclusions, RequestStatus, SeerrExclusions,
    SeerrMode, TraktExclusions,
};
use media_cleanup_models::{MediaItem, MediaKind};
use media_cleanup_sources::{
    AvailabilityLookup, Catalogs, ListCatalog, MediaRequest, RequestTracker, SourceError, TitleQuery,
};
use std::sync::Arc;
use tracing::{debug, trace};
use crate::{CleanupError, RunContext};

pub enum ExclusionProvider {
    Trakt {
        catalog: Arc<dyn ListCatalog>,
        rules: TraktExclusions,
    },
    Mdblist {
        catalog: Arc<dyn ListCatalog>,
        rules: MdblistExclusions,
    },
    JustWatch {
        lookup: Arc<dyn AvailabilityLookup>,
        rules: JustWatchExclusions,
        country: String,
        language: String,
    },
    SeerrRequests {
        tracker: Arc<dyn RequestTracker>,
        rules: SeerrExclusions,
    },
}

impl ExclusionProvider {
    /// Providers configured for a library, in evaluation order
    pub fn for_library(library: &LibraryPolicy, catalogs: &Catalogs, config: &Config) -> Vec<ExclusionProvider> {
        let exclude = &library.exclude;
        let mut providers = Vec::new();

        if let (Some(rules), Some(catalog)) = (&exclude.trakt, &catalogs.trakt) {
            if !rules.lists.is_empty() {
                providers.push(ExclusionProvider::Trakt {
                    catalog: catalog.clone(),
                    rules: rules.clone(),
                });
            }
        }
        if let (Some(rules), Some(catalog)) = (&exclude.mdblist, &catalogs.mdblist) {
            if !rules.lists.is_empty() {
                providers.push(ExclusionProvider::Mdblist {
                    catalog: catalog.clone(),
                    rules: rules.clone(),
                });
            }
        }
        if let (Some(rules), Some(lookup)) = (&exclude.justwatch, &catalogs.justwatch) {
            if let Some(country) = config.justwatch_country(rules) {
                providers.push(ExclusionProvider::JustWatch {
                    lookup: lookup.clone(),
                    rules: rules.clone(),
                    country,
                    language: config.justwatch_language(rules),
                });
            }
        }
        if let (Some(rules), Some(tracker)) = (&exclude.seerr, &catalogs.seerr) {
            providers.push(ExclusionProvider::SeerrRequests {
                tracker: tracker.clone(),
                rules: rules.clone(),
            });
        }

        debug!(
            library = %library.name,
            providers = ?providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            "Resolved exclusion providers"
        );
        providers
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExclusionProvider::Trakt { .. } => "trakt",
            ExclusionProvider::Mdblist { .. } => "mdblist",
            ExclusionProvider::JustWatch { .. } => "justwatch",
            ExclusionProvider::SeerrRequests { .. } => "seerr",
        }
    }

    /// Returns the matched value (list URL, provider name, request description) when the
    /// rule protects the item.
    pub async fn matches(&self, item: &MediaItem, ctx: &mut RunContext) -> Result<Option<String>, CleanupError> {
        match self {
            ExclusionProvider::Trakt { catalog, rules } => {
                match_lists(catalog.as_ref(), &rules.lists, rules.max_items_per_list, item, ctx).await
            }
            ExclusionProvider::Mdblist { catalog, rules } => {
                match_lists(catalog.as_ref(), &rules.lists, rules.max_items_per_list, item, ctx).await
            }
            ExclusionProvider::JustWatch { lookup, rules, country, language } => {
                match_availability(lookup.as_ref(), rules, country, language, item, ctx).await
            }
            ExclusionProvider::SeerrRequests { tracker, rules } => {
                match_requests(tracker.as_ref(), rules, item, ctx).await
            }
        }
    }
}

/// Id a list would carry for this item: tmdb for movies, tvdb for series
fn list_id(item: &MediaItem) -> Option<u32> {
    match item.kind {
        MediaKind::Movie => item.ids.tmdb_id,
        MediaKind::Series => item.ids.tvdb_id,
    }
}

async fn match_lists(
    catalog: &dyn ListCatalog,
    lists: &[String],
    limit: usize,
    item: &MediaItem,
    ctx: &mut RunContext,
) -> Result<Option<String>, CleanupError> {
    let Some(id) = list_id(item) else {
        trace!(title = %item, provider = catalog.provider_name(), "No list id on item");
        return Ok(None);
    };

    let mut first_error = None;
    for list in lists {
        let key = RunContext::list_key(catalog.provider_name(), list, item.kind);
        let ids = match ctx.cached_list(&key) {
            Some(cached) => cached,
            None => {
                let fetched = match catalog.fetch_list(list, item.kind, limit).await {
                    Ok(ids) => Some(Arc::new(ids)),
                    Err(e) => {
                        ctx.report_provider_error(&CleanupError::provider(catalog.provider_name(), e));
                        None
                    }
                };
                ctx.store_list(key, fetched.clone());
                fetched
            }
        };

        match ids {
            Some(ids) if ids.contains(&id) => return Ok(Some(list.clone())),
            Some(_) => {}
            None => {
                first_error.get_or_insert_with(|| {
                    CleanupError::provider(
                        catalog.provider_name(),
                        SourceError::new(format!("list '{}' unavailable this run", list)),
                    )
                });
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(None),
    }
}

async fn match_availability(
    lookup: &dyn AvailabilityLookup,
    rules: &JustWatchExclusions,
    country: &str,
    language: &str,
    item: &MediaItem,
    ctx: &mut RunContext,
) -> Result<Option<String>, CleanupError> {
    let query = TitleQuery {
        title: item.title.clone(),
        year: item.year,
        kind: item.kind,
        country: country.to_string(),
        language: language.to_string(),
    };

    let offers = match ctx.cached_offers(&query) {
        Some(offers) => offers,
        None => {
            let offers = lookup
                .offers(&query)
                .await
                .map_err(|e| CleanupError::provider("justwatch", e))?;
            ctx.store_offers(query, offers.clone());
            offers
        }
    };

    // A title JustWatch does not know never matches, in either mode
    let Some(offers) = offers else {
        return Ok(None);
    };

    if !rules.available_on.is_empty() {
        Ok(first_offered(&offers, &rules.available_on).map(|p| format!("available on {}", p)))
    } else if !rules.not_available_on.is_empty() {
        match first_offered(&offers, &rules.not_available_on) {
            Some(_) => Ok(None),
            None => Ok(Some(format!("not available on {}", rules.not_available_on.join(", ")))),
        }
    } else {
        Ok(None)
    }
}

/// First configured provider that offers the title. `any` matches any offer.
fn first_offered(offers: &[String], providers: &[String]) -> Option<String> {
    providers
        .iter()
        .find(|p| {
            if p.eq_ignore_ascii_case("any") {
                !offers.is_empty()
            } else {
                offers.iter().any(|o| o.eq_ignore_ascii_case(p))
            }
        })
        .cloned()
}

async fn match_requests(
    tracker: &dyn RequestTracker,
    rules: &SeerrExclusions,
    item: &MediaItem,
    ctx: &mut RunContext,
) -> Result<Option<String>, CleanupError> {
    let Some(tmdb_id) = item.ids.tmdb_id else {
        debug!(title = %item, "No tmdb id, request rules do not apply");
        return Ok(None);
    };

    let requests = match ctx.cached_requests() {
        Some(Some(requests)) => requests,
        Some(None) => {
            return Err(CleanupError::provider(
                "seerr",
                SourceError::new("requests unavailable this run"),
            ))
        }
        None => match tracker.requests().await {
            Ok(requests) => {
                let requests = Arc::new(requests);
                ctx.store_requests(Some(requests.clone()));
                requests
            }
            Err(e) => {
                ctx.store_requests(None);
                return Err(CleanupError::provider("seerr", e));
            }
        },
    };

    let request = requests
        .iter()
        .find(|r| r.tmdb_id == Some(tmdb_id) && r.kind == item.kind);
    let requested = request.is_some_and(|r| request_counts(r, rules, ctx.now()));

    match (rules.mode, requested) {
        (SeerrMode::Exclude, true) => Ok(Some("requested".to_string())),
        (SeerrMode::IncludeOnly, false) => Ok(Some("not requested".to_string())),
        _ => Ok(None),
    }
}

/// Whether a request passes the configured user, status and age filters
fn request_counts(request: &MediaRequest, rules: &SeerrExclusions, now: DateTime<Utc>) -> bool {
    if !rules.include_pending && request.status == Some(RequestStatus::Pending) {
        return false;
    }
    if !rules.users.is_empty() && !request.requested_by.matches_any(&rules.users) {
        return false;
    }
    if !rules.request_status.is_empty()
        && !request.status.is_some_and(|s| rules.request_status.contains(&s))
    {
        return false;
    }
    if let (Some(min_days), Some(created)) = (rules.min_request_age_days, request.created_at) {
        if (now - created).num_days() < i64::from(min_days) {
            return false;
        }
    }
    true
}
