use async_trait::async_trait;
use media_cleanup_models::{eq_ignore_case, MediaKind};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use crate::catalogs::{AvailabilityLookup, TitleQuery};
use crate::http::{read_json, send_error};
use crate::SourceError;

const GRAPHQL_URL: &str = "https://apis.justwatch.com/graphql";
const SERVICE: &str = "justwatch";
const MAX_RESULTS: u32 = 5;

const SEARCH_QUERY: &str = r#"
query GetSearchTitles($searchTitlesFilter: TitleFilter!, $country: Country!, $language: Language!, $first: Int!) {
  popularTitles(country: $country, filter: $searchTitlesFilter, first: $first) {
    edges {
      node {
        objectType
        content(country: $country, language: $language) {
          title
          originalReleaseYear
        }
        offers(country: $country, platform: WEB) {
          monetizationType
          package {
            technicalName
          }
        }
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<SearchData>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchData {
    popular_titles: Connection,
}

#[derive(Debug, Deserialize)]
struct Connection {
    #[serde(default)]
    edges: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
struct Edge {
    node: TitleNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TitleNode {
    object_type: String,
    content: TitleContent,
    #[serde(default)]
    offers: Vec<Offer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TitleContent {
    title: String,
    original_release_year: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Offer {
    package: OfferPackage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfferPackage {
    technical_name: String,
}

pub struct JustWatchClient {
    client: Client,
}

impl JustWatchClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AvailabilityLookup for JustWatchClient {
    async fn offers(&self, query: &TitleQuery) -> Result<Option<Vec<String>>, SourceError> {
        let body = json!({
            "operationName": "GetSearchTitles",
            "query": SEARCH_QUERY,
            "variables": {
                "searchTitlesFilter": { "searchQuery": query.title },
                "country": query.country.to_uppercase(),
                "language": query.language.to_lowercase(),
                "first": MAX_RESULTS,
            }
        });

        let response = self
            .client
            .post(GRAPHQL_URL)
            .json(&body)
            .send()
            .await
            .map_err(send_error(SERVICE))?;
        let parsed: GraphqlResponse = read_json(SERVICE, response).await?;

        if let Some(err) = parsed.errors.first() {
            return Err(SourceError::payload(SERVICE, err.message.clone()));
        }
        let nodes = parsed
            .data
            .map(|d| d.popular_titles.edges.into_iter().map(|e| e.node).collect())
            .unwrap_or_default();

        let offers = select_offers(nodes, query);
        if offers.is_none() {
            debug!(title = %query.title, year = ?query.year, "No JustWatch result for title");
        }
        Ok(offers)
    }
}

fn object_type(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Movie => "MOVIE",
        MediaKind::Series => "SHOW",
    }
}

/// Offers of the first result with the same type, title and release year
fn select_offers(nodes: Vec<TitleNode>, query: &TitleQuery) -> Option<Vec<String>> {
    let wanted_type = object_type(query.kind);
    nodes
        .into_iter()
        .find(|node| {
            node.object_type == wanted_type
                && eq_ignore_case(&node.content.title, &query.title)
                && match (query.year, node.content.original_release_year) {
                    (Some(a), Some(b)) => a == b,
                    _ => true,
                }
        })
        .map(|node| {
            let mut names: Vec<String> = node
                .offers
                .into_iter()
                .map(|o| o.package.technical_name.to_lowercase())
                .collect();
            names.sort();
            names.dedup();
            names
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(title: &str, year: Option<u32>, kind: MediaKind) -> TitleQuery {
        TitleQuery {
            title: title.to_string(),
            year,
            kind,
            country: "US".to_string(),
            language: "en".to_string(),
        }
    }

    fn nodes() -> Vec<TitleNode> {
        let payload = serde_json::json!({
            "data": { "popularTitles": { "edges": [
                { "node": {
                    "objectType": "SHOW",
                    "content": { "title": "Better Call Saul", "originalReleaseYear": 2015 },
                    "offers": [
                        { "monetizationType": "FLATRATE", "package": { "technicalName": "netflix" } },
                        { "monetizationType": "FLATRATE", "package": { "technicalName": "netflix" } },
                        { "monetizationType": "BUY", "package": { "technicalName": "itunes" } }
                    ]
                }},
                { "node": {
                    "objectType": "MOVIE",
                    "content": { "title": "Better Call Saul", "originalReleaseYear": 2015 },
                    "offers": []
                }}
            ]}}
        });
        let parsed: GraphqlResponse = serde_json::from_value(payload).unwrap();
        parsed.data.unwrap().popular_titles.edges.into_iter().map(|e| e.node).collect()
    }

    #[test]
    fn test_select_offers_matches_type_title_and_year() {
        let offers = select_offers(nodes(), &query("better call saul", Some(2015), MediaKind::Series)).unwrap();
        assert_eq!(offers, vec!["itunes", "netflix"]);

        let movie = select_offers(nodes(), &query("Better Call Saul", Some(2015), MediaKind::Movie)).unwrap();
        assert!(movie.is_empty());
    }

    #[test]
    fn test_select_offers_returns_none_when_not_found() {
        assert!(select_offers(nodes(), &query("Better Call Saul", Some(2016), MediaKind::Series)).is_none());
        assert!(select_offers(nodes(), &query("Breaking Bad", None, MediaKind::Series)).is_none());
    }
}
