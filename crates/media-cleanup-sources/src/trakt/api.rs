use media_cleanup_models::MediaKind;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;
use crate::http::{read_json, send_error};
use crate::SourceError;

const API_BASE: &str = "https://api.trakt.tv";
const SERVICE: &str = "trakt";

const CHART_CATEGORIES: [&str; 4] = ["trending", "popular", "anticipated", "boxoffice"];
const PERIOD_CATEGORIES: [&str; 3] = ["favorited", "watched", "collected"];
const PERIODS: [&str; 4] = ["daily", "weekly", "monthly", "yearly"];

/// The kinds of Trakt list URL users can reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraktList {
    Watchlist { user: String },
    Favorites { user: String },
    UserList { user: String, slug: String },
    Chart { category: String },
    Period { category: String, period: String },
}

#[derive(Debug, Default, Deserialize)]
pub struct TraktIds {
    pub tmdb: Option<u32>,
    pub tvdb: Option<u32>,
}

/// Parse a trakt.tv URL into the list it names
pub fn parse_list_url(url: &str) -> Result<TraktList, SourceError> {
    let invalid = || SourceError::new(format!("unrecognized Trakt list URL '{}'", url));

    let path = url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.")
        .strip_prefix("trakt.tv/")
        .ok_or_else(invalid)?;
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        ["users", user, "watchlist", ..] => Ok(TraktList::Watchlist { user: user.to_string() }),
        ["users", user, "favorites", ..] => Ok(TraktList::Favorites { user: user.to_string() }),
        ["users", user, "lists", slug, ..] => Ok(TraktList::UserList {
            user: user.to_string(),
            slug: slug.to_string(),
        }),
        [media, category, period, ..]
            if is_media_segment(media)
                && PERIOD_CATEGORIES.contains(category)
                && PERIODS.contains(period) =>
        {
            Ok(TraktList::Period {
                category: category.to_string(),
                period: period.to_string(),
            })
        }
        [media, category, ..] if is_media_segment(media) && CHART_CATEGORIES.contains(category) => {
            Ok(TraktList::Chart { category: category.to_string() })
        }
        _ => Err(invalid()),
    }
}

fn is_media_segment(segment: &str) -> bool {
    segment == "movies" || segment == "shows"
}

/// API path for a list, for one media kind
pub fn list_endpoint(list: &TraktList, kind: MediaKind) -> String {
    let plural = match kind {
        MediaKind::Movie => "movies",
        MediaKind::Series => "shows",
    };
    let singular = match kind {
        MediaKind::Movie => "movie",
        MediaKind::Series => "show",
    };
    match list {
        TraktList::Watchlist { user } => format!("/users/{}/watchlist/{}", urlencoding::encode(user), plural),
        TraktList::Favorites { user } => format!("/users/{}/favorites/{}", urlencoding::encode(user), plural),
        TraktList::UserList { user, slug } => format!(
            "/users/{}/lists/{}/items/{}",
            urlencoding::encode(user),
            urlencoding::encode(slug),
            singular
        ),
        TraktList::Chart { category } => format!("/{}/{}", plural, category),
        TraktList::Period { category, period } => format!("/{}/{}/{}", plural, category, period),
    }
}

/// Fetch up to `limit` entries of a list and collect tmdb ids (movies) or tvdb ids (shows)
pub async fn fetch_list_ids(
    client: &Client,
    client_id: &str,
    list: &TraktList,
    kind: MediaKind,
    limit: usize,
) -> Result<HashSet<u32>, SourceError> {
    let url = format!("{}{}", API_BASE, list_endpoint(list, kind));
    debug!(url = %url, limit, "Fetching Trakt list");

    let response = client
        .get(&url)
        .header("Content-Type", "application/json")
        .header("trakt-api-version", "2")
        .header("trakt-api-key", client_id)
        .query(&[("limit", limit.to_string()), ("page", "1".to_string())])
        .send()
        .await
        .map_err(send_error(SERVICE))?;

    let entries: Vec<Value> = read_json(SERVICE, response).await?;
    Ok(entries
        .iter()
        .take(limit)
        .filter_map(|entry| entry_id(entry, kind))
        .collect())
}

/// List entries either wrap the media object (`{"movie": {...}}`) or are the object itself
fn entry_id(entry: &Value, kind: MediaKind) -> Option<u32> {
    let key = match kind {
        MediaKind::Movie => "movie",
        MediaKind::Series => "show",
    };
    let media = entry.get(key).unwrap_or(entry);
    let ids: TraktIds = serde_json::from_value(media.get("ids")?.clone()).ok()?;
    match kind {
        MediaKind::Movie => ids.tmdb,
        MediaKind::Series => ids.tvdb,
    }
}
