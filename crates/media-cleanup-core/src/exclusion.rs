use chrono::{DateTime, Datelike, Utc};
use media_cleanup_config::{ExcludeConfig, ManagerExclusions};
use media_cleanup_models::{eq_ignore_case, ExcludedItem, MediaItem, MediaKind};
use serde::Serialize;
use std::fmt;
use tracing::{debug, trace};
use crate::providers::ExclusionProvider;
use crate::RunContext;

/// Which rule protected an item, and the value that matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExclusionReason {
    pub rule: String,
    pub value: String,
}

impl ExclusionReason {
    fn new(rule: &str, value: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            value: value.into(),
        }
    }

    pub fn to_excluded_item(&self, item: &MediaItem, library: &str) -> ExcludedItem {
        ExcludedItem {
            title: item.title.clone(),
            year: item.year,
            kind: item.kind,
            library: library.to_string(),
            rule: self.rule.clone(),
            reason: self.to_string(),
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rule matched '{}'", self.rule, self.value)
    }
}

/// Evaluates every exclusion rule configured for one library.
///
/// Rules are OR-ed: the first match protects the item. Metadata rules run first, then
/// library-manager rules, then external providers in configuration order.
pub struct ExclusionEvaluator {
    rules: ExcludeConfig,
    providers: Vec<ExclusionProvider>,
}

impl ExclusionEvaluator {
    pub fn new(rules: ExcludeConfig, providers: Vec<ExclusionProvider>) -> Self {
        Self { rules, providers }
    }

    pub async fn check(&self, item: &MediaItem, ctx: &mut RunContext) -> Option<ExclusionReason> {
        if let Some(reason) = self.metadata_match(item, ctx.now()) {
            return Some(reason);
        }
        if let Some(reason) = self.manager_match(item) {
            return Some(reason);
        }

        for provider in &self.providers {
            match provider.matches(item, ctx).await {
                Ok(Some(value)) => return Some(ExclusionReason::new(provider.name(), value)),
                Ok(None) => trace!(provider = provider.name(), title = %item, "No provider match"),
                Err(e) => ctx.report_provider_error(&e),
            }
        }
        None
    }

    pub async fn is_excluded(&self, item: &MediaItem, ctx: &mut RunContext) -> bool {
        self.check(item, ctx).await.is_some()
    }

    pub fn metadata_match(&self, item: &MediaItem, now: DateTime<Utc>) -> Option<ExclusionReason> {
        let rules = &self.rules;
        let metadata = &item.metadata;

        if let Some(title) = rules.titles.iter().find(|t| eq_ignore_case(t, &item.title)) {
            return Some(ExclusionReason::new("title", title.as_str()));
        }

        let families: [(&str, &[String], &[String]); 8] = [
            ("genre", &rules.genres, &metadata.genres),
            ("collection", &rules.collections, &metadata.collections),
            ("actor", &rules.actors, &metadata.actors),
            ("director", &rules.directors, &metadata.directors),
            ("writer", &rules.writers, &metadata.writers),
            ("producer", &rules.producers, &metadata.producers),
            ("studio", &rules.studios, &metadata.studios),
            ("label", &rules.labels, &metadata.labels),
        ];
        for (rule, configured, values) in families {
            if let Some(value) = first_shared(configured, values) {
                return Some(ExclusionReason::new(rule, value));
            }
        }

        if let (Some(years), Some(year)) = (rules.release_years, item.year) {
            let age = i64::from(now.year()) - i64::from(year);
            if age < i64::from(years) {
                return Some(ExclusionReason::new("release_year", year.to_string()));
            }
        }
        None
    }

    pub fn manager_match(&self, item: &MediaItem) -> Option<ExclusionReason> {
        let rules = self.rules.manager_rules(item.kind)?;
        let reason = manager_rule_match(rules, item);
        if let Some(reason) = &reason {
            debug!(title = %item, rule = %reason.rule, "Library manager rule matched");
        }
        reason
    }
}

fn manager_rule_match(rules: &ManagerExclusions, item: &MediaItem) -> Option<ExclusionReason> {
    let manager = &item.manager;

    if let Some(tag) = first_shared(&rules.tags, &manager.tags) {
        return Some(ExclusionReason::new("tag", tag));
    }
    if let Some(profile) = &manager.quality_profile {
        if rules.quality_profiles.iter().any(|p| p == profile) {
            return Some(ExclusionReason::new("quality_profile", profile.as_str()));
        }
    }
    if let Some(path) = rules.paths.iter().find(|p| !p.is_empty() && item.path.contains(p.as_str())) {
        return Some(ExclusionReason::new("path", path.as_str()));
    }
    if let Some(monitored) = rules.monitored {
        if manager.monitored == monitored {
            return Some(ExclusionReason::new("monitored", monitored.to_string()));
        }
    }
    if item.kind == MediaKind::Series {
        if let Some(status) = manager.status.filter(|s| rules.status.contains(s)) {
            return Some(ExclusionReason::new("status", status.to_string()));
        }
    }
    None
}

/// First configured value that also appears among the item's values, ignoring case
fn first_shared<'a>(configured: &'a [String], values: &[String]) -> Option<&'a str> {
    configured
        .iter()
        .find(|c| values.iter().any(|v| eq_ignore_case(v, c)))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{MockListCatalog, MockRequestTracker};
    use chrono::TimeZone;
    use media_cleanup_config::{SeerrExclusions, SeerrMode, TraktExclusions};
    use media_cleanup_models::SeriesStatus;
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn heat() -> MediaItem {
        let mut item = MediaItem::new(1, MediaKind::Movie, "Heat");
        item.year = Some(1995);
        item.ids.tmdb_id = Some(949);
        item.path = "/media/movies/Heat (1995)".into();
        item.metadata.genres = vec!["Crime".into(), "Drama".into()];
        item.metadata.actors = vec!["Al Pacino".into(), "Robert De Niro".into()];
        item.metadata.directors = vec!["Michael Mann".into()];
        item.manager.tags = vec!["keep".into()];
        item.manager.quality_profile = Some("HD-1080p".into());
        item.manager.monitored = true;
        item
    }

    #[test]
    fn test_metadata_rules_ignore_case() {
        let rules = ExcludeConfig {
            genres: vec!["crime".into()],
            ..ExcludeConfig::default()
        };
        let reason = ExclusionEvaluator::new(rules, vec![]).metadata_match(&heat(), now()).unwrap();
        assert_eq!(reason.rule, "genre");
        assert_eq!(reason.to_string(), "genre rule matched 'crime'");

        let rules = ExcludeConfig {
            titles: vec!["HEAT".into()],
            ..ExcludeConfig::default()
        };
        assert_eq!(ExclusionEvaluator::new(rules, vec![]).metadata_match(&heat(), now()).unwrap().rule, "title");

        let rules = ExcludeConfig {
            actors: vec!["Val Kilmer".into()],
            studios: vec!["Warner".into()],
            ..ExcludeConfig::default()
        };
        assert!(ExclusionEvaluator::new(rules, vec![]).metadata_match(&heat(), now()).is_none());
    }

    #[test]
    fn test_metadata_rules_fold_non_ascii_case() {
        let mut item = MediaItem::new(3, MediaKind::Movie, "Amélie");
        item.metadata.genres = vec!["Comédie".into()];

        let titles = ExcludeConfig {
            titles: vec!["AMÉLIE".into()],
            ..ExcludeConfig::default()
        };
        let reason = ExclusionEvaluator::new(titles, vec![]).metadata_match(&item, now()).unwrap();
        assert_eq!(reason.rule, "title");

        let genres = ExcludeConfig {
            genres: vec!["COMÉDIE".into()],
            ..ExcludeConfig::default()
        };
        let reason = ExclusionEvaluator::new(genres, vec![]).metadata_match(&item, now()).unwrap();
        assert_eq!(reason.rule, "genre");
        assert_eq!(reason.value, "COMÉDIE");
    }

    #[test]
    fn test_release_year_recency() {
        let rules = ExcludeConfig {
            release_years: Some(2),
            ..ExcludeConfig::default()
        };
        let evaluator = ExclusionEvaluator::new(rules, vec![]);
        let mut item = heat();

        item.year = Some(2023);
        assert!(evaluator.metadata_match(&item, now()).is_some());
        item.year = Some(2022);
        assert!(evaluator.metadata_match(&item, now()).is_none());
        item.year = None;
        assert!(evaluator.metadata_match(&item, now()).is_none());
    }

    #[test]
    fn test_manager_rules() {
        let exclusions = |m: ManagerExclusions| ExcludeConfig {
            radarr: Some(m),
            ..ExcludeConfig::default()
        };
        let item = heat();

        let tag = ExclusionEvaluator::new(exclusions(ManagerExclusions { tags: vec!["KEEP".into()], ..Default::default() }), vec![]);
        assert_eq!(tag.manager_match(&item).unwrap().rule, "tag");

        let profile = ExclusionEvaluator::new(
            exclusions(ManagerExclusions { quality_profiles: vec!["hd-1080p".into()], ..Default::default() }),
            vec![],
        );
        assert!(profile.manager_match(&item).is_none(), "quality profiles compare exactly");

        let path = ExclusionEvaluator::new(exclusions(ManagerExclusions { paths: vec!["/media/movies".into()], ..Default::default() }), vec![]);
        assert_eq!(path.manager_match(&item).unwrap().rule, "path");

        let unmonitored = ExclusionEvaluator::new(exclusions(ManagerExclusions { monitored: Some(false), ..Default::default() }), vec![]);
        assert!(unmonitored.manager_match(&item).is_none());

        // sonarr rules never apply to movies
        let series_rules = ExcludeConfig {
            sonarr: Some(ManagerExclusions { tags: vec!["keep".into()], ..Default::default() }),
            ..ExcludeConfig::default()
        };
        assert!(ExclusionEvaluator::new(series_rules, vec![]).manager_match(&item).is_none());
    }

    #[test]
    fn test_series_status_rule() {
        let rules = ExcludeConfig {
            sonarr: Some(ManagerExclusions { status: vec![SeriesStatus::Continuing], ..Default::default() }),
            ..ExcludeConfig::default()
        };
        let evaluator = ExclusionEvaluator::new(rules, vec![]);
        let mut show = MediaItem::new(2, MediaKind::Series, "Severance");
        show.manager.status = Some(SeriesStatus::Continuing);
        assert_eq!(evaluator.manager_match(&show).unwrap().value, "continuing");
        show.manager.status = Some(SeriesStatus::Ended);
        assert!(evaluator.manager_match(&show).is_none());
    }

    #[tokio::test]
    async fn test_match_wins_even_when_another_provider_fails() {
        let broken = MockListCatalog::new("trakt");
        broken.fail_list("https://trakt.tv/movies/trending");
        let tracker = MockRequestTracker::new(vec![]);
        let providers = vec![
            ExclusionProvider::Trakt {
                catalog: Arc::new(broken),
                rules: TraktExclusions { lists: vec!["https://trakt.tv/movies/trending".into()], max_items_per_list: 100 },
            },
            ExclusionProvider::SeerrRequests {
                tracker: Arc::new(tracker),
                rules: SeerrExclusions {
                    mode: SeerrMode::IncludeOnly,
                    users: vec![],
                    include_pending: true,
                    request_status: vec![],
                    min_request_age_days: None,
                    update_status: false,
                },
            },
        ];
        let evaluator = ExclusionEvaluator::new(ExcludeConfig::default(), providers);
        let mut ctx = RunContext::new(now());

        let reason = evaluator.check(&heat(), &mut ctx).await.unwrap();
        assert_eq!(reason.rule, "seerr");
        assert!(ctx.provider_warned("trakt"));
    }

    #[tokio::test]
    async fn test_provider_failure_is_not_a_match() {
        let broken = MockListCatalog::new("trakt");
        broken.fail_list("https://trakt.tv/movies/trending");
        let providers = vec![ExclusionProvider::Trakt {
            catalog: Arc::new(broken),
            rules: TraktExclusions { lists: vec!["https://trakt.tv/movies/trending".into()], max_items_per_list: 100 },
        }];
        let evaluator = ExclusionEvaluator::new(ExcludeConfig::default(), providers);
        let mut ctx = RunContext::new(now());
        assert!(!evaluator.is_excluded(&heat(), &mut ctx).await);
    }

    #[test]
    fn test_no_rules_never_match() {
        let evaluator = ExclusionEvaluator::new(ExcludeConfig::default(), vec![]);
        assert!(evaluator.metadata_match(&heat(), now()).is_none());
        assert!(evaluator.manager_match(&heat()).is_none());
    }
}
