use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use crate::{ConfigError, LibraryPolicy, ManagerRef};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log every mutation instead of performing it
    #[serde(default = "default_true")]
    pub dry_run: bool,
    /// Seconds to wait between destructive actions
    #[serde(default = "default_action_delay")]
    pub action_delay: u64,
    #[serde(default = "default_true")]
    pub ssl_verify: bool,
    /// Per-request timeout in seconds for every outbound call
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default)]
    pub rescan_after_run: bool,
    pub plex: PlexConfig,
    pub tautulli: TautulliConfig,
    #[serde(default)]
    pub radarr: Vec<ArrInstance>,
    #[serde(default)]
    pub sonarr: Vec<ArrInstance>,
    #[serde(default)]
    pub trakt: Option<TraktConfig>,
    #[serde(default)]
    pub mdblist: Option<MdblistConfig>,
    #[serde(default)]
    pub justwatch: Option<JustWatchConfig>,
    #[serde(default)]
    pub seerr: Option<SeerrConfig>,
    #[serde(default)]
    pub scheduler: Option<SchedulerConfig>,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub libraries: Vec<LibraryPolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlexConfig {
    pub url: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TautulliConfig {
    pub url: String,
    pub api_key: String,
}

/// A named Radarr or Sonarr instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrInstance {
    pub name: String,
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraktConfig {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MdblistConfig {
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JustWatchConfig {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeerrConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Preset (hourly, daily, weekly, monthly) or a 5-field cron expression
    #[serde(default = "default_schedule")]
    pub schedule: String,
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub json: Option<bool>,
}

fn default_true() -> bool {
    true
}

fn default_action_delay() -> u64 {
    25
}

fn default_request_timeout() -> u64 {
    120
}

fn default_language() -> String {
    "en".to_string()
}

fn default_schedule() -> String {
    "weekly".to_string()
}

pub fn default_scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        schedule: default_schedule(),
        run_on_startup: default_true(),
    }
}

const SCHEDULE_PRESETS: [(&str, &str); 4] = [
    ("hourly", "0 * * * *"),
    ("daily", "0 3 * * *"),
    ("weekly", "0 3 * * 0"),
    ("monthly", "0 3 1 * *"),
];

/// Resolve a preset name or validate a 5-field cron expression
pub fn resolve_schedule(schedule: &str) -> Result<String, ConfigError> {
    let trimmed = schedule.trim();
    if let Some((_, cron)) = SCHEDULE_PRESETS
        .iter()
        .find(|(preset, _)| preset.eq_ignore_ascii_case(trimmed))
    {
        return Ok(cron.to_string());
    }

    if trimmed.split_whitespace().count() != 5 {
        return Err(ConfigError::invalid(format!(
            "invalid schedule '{}': use hourly, daily, weekly, monthly or a 5-field cron expression",
            schedule
        )));
    }
    Ok(trimmed.split_whitespace().collect::<Vec<_>>().join(" "))
}

impl SchedulerConfig {
    pub fn cron_expression(&self) -> Result<String, ConfigError> {
        resolve_schedule(&self.schedule)
    }
}

impl Config {
    /// Load, parse and validate a config file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), libraries = config.libraries.len(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn radarr_instance(&self, name: &str) -> Option<&ArrInstance> {
        self.radarr.iter().find(|i| i.name == name)
    }

    pub fn sonarr_instance(&self, name: &str) -> Option<&ArrInstance> {
        self.sonarr.iter().find(|i| i.name == name)
    }

    pub fn library(&self, name: &str) -> Option<&LibraryPolicy> {
        self.libraries.iter().find(|l| l.name == name)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require("plex.url", &self.plex.url)?;
        require("plex.token", &self.plex.token)?;
        require("tautulli.url", &self.tautulli.url)?;
        require("tautulli.api_key", &self.tautulli.api_key)?;

        for instance in self.radarr.iter().chain(self.sonarr.iter()) {
            require(&format!("{}.url", instance.name), &instance.url)?;
            require(&format!("{}.api_key", instance.name), &instance.api_key)?;
        }
        unique_names("radarr", self.radarr.iter().map(|i| i.name.as_str()))?;
        unique_names("sonarr", self.sonarr.iter().map(|i| i.name.as_str()))?;
        unique_names("libraries", self.libraries.iter().map(|l| l.name.as_str()))?;

        if let Some(trakt) = &self.trakt {
            require("trakt.client_id", &trakt.client_id)?;
        }
        if let Some(mdblist) = &self.mdblist {
            require("mdblist.api_key", &mdblist.api_key)?;
        }
        if let Some(seerr) = &self.seerr {
            require("seerr.url", &seerr.url)?;
            require("seerr.api_key", &seerr.api_key)?;
        }
        if let Some(scheduler) = &self.scheduler {
            scheduler.cron_expression()?;
        }

        for library in &self.libraries {
            self.validate_library(library)?;
        }
        Ok(())
    }

    fn validate_library(&self, library: &LibraryPolicy) -> Result<(), ConfigError> {
        let name = library.name.as_str();
        let fail = |message: &str| Err(ConfigError::library(name, message));

        if library.action_mode != "delete" {
            return Err(ConfigError::library(
                name,
                format!("action_mode '{}' is not supported, use 'delete'", library.action_mode),
            ));
        }

        match library.manager() {
            Some(ManagerRef::Radarr(instance)) => {
                if self.radarr_instance(instance).is_none() {
                    return Err(ConfigError::library(
                        name,
                        format!("radarr instance '{}' is not configured", instance),
                    ));
                }
            }
            Some(ManagerRef::Sonarr(instance)) => {
                if self.sonarr_instance(instance).is_none() {
                    return Err(ConfigError::library(
                        name,
                        format!("sonarr instance '{}' is not configured", instance),
                    ));
                }
            }
            None => return fail("exactly one of 'radarr' or 'sonarr' must be set"),
        }

        if library.watch_status.is_some() && library.apply_last_watch_threshold_to_collections {
            return fail("'watch_status' and 'apply_last_watch_threshold_to_collections' cannot both be set");
        }
        if library.series_type.is_some() && library.radarr.is_some() {
            return fail("'series_type' only applies to sonarr libraries");
        }

        library.sort.keys().map_err(|e| ConfigError::library(name, e.to_string()))?;

        if let Some(leaving_soon) = &library.leaving_soon {
            if leaving_soon.collection.is_none() && leaving_soon.labels.is_empty() {
                return fail("leaving_soon needs a 'collection' or at least one label");
            }
        }

        let exclude = &library.exclude;
        if exclude.radarr.is_some() && library.radarr.is_none() {
            return fail("'exclude.radarr' requires a radarr library");
        }
        if exclude.sonarr.is_some() && library.sonarr.is_none() {
            return fail("'exclude.sonarr' requires a sonarr library");
        }
        if exclude.radarr.as_ref().is_some_and(|r| !r.status.is_empty()) {
            return fail("'exclude.radarr.status' is only supported for series");
        }
        if exclude.trakt.is_some() && self.trakt.is_none() {
            return fail("trakt exclusions require a [trakt] section");
        }
        if exclude.mdblist.is_some() && self.mdblist.is_none() {
            return fail("mdblist exclusions require a [mdblist] section");
        }
        if exclude.seerr.is_some() && self.seerr.is_none() {
            return fail("seerr exclusions require a [seerr] section");
        }

        if let Some(justwatch) = &exclude.justwatch {
            match (justwatch.available_on.is_empty(), justwatch.not_available_on.is_empty()) {
                (false, false) => {
                    return fail("justwatch 'available_on' and 'not_available_on' are mutually exclusive")
                }
                (true, true) => {
                    return fail("justwatch exclusions need 'available_on' or 'not_available_on'")
                }
                _ => {}
            }
            if self.justwatch_country(justwatch).is_none() {
                return fail("justwatch exclusions need a country (library or [justwatch] section)");
            }
        }

        Ok(())
    }

    /// Country for a library's streaming lookups, falling back to the global section
    pub fn justwatch_country(&self, exclusions: &crate::JustWatchExclusions) -> Option<String> {
        exclusions
            .country
            .clone()
            .or_else(|| self.justwatch.as_ref().and_then(|j| j.country.clone()))
            .filter(|c| !c.trim().is_empty())
    }

    pub fn justwatch_language(&self, exclusions: &crate::JustWatchExclusions) -> String {
        exclusions
            .language
            .clone()
            .or_else(|| self.justwatch.as_ref().map(|j| j.language.clone()))
            .unwrap_or_else(default_language)
    }
}

fn require(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(format!("'{}' is required", field)));
    }
    Ok(())
}

fn unique_names<'a>(section: &str, names: impl Iterator<Item = &'a str>) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ConfigError::invalid(format!("duplicate name '{}' in {}", name, section)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SeerrMode, SortField, WatchStatus};
    use media_cleanup_models::SeriesStatus;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASE: &str = r#"
        [plex]
        url = "http://plex:32400"
        token = "plex-token"

        [tautulli]
        url = "http://tautulli:8181"
        api_key = "tautulli-key"

        [[radarr]]
        name = "Radarr"
        url = "http://radarr:7878"
        api_key = "radarr-key"

        [[sonarr]]
        name = "Sonarr"
        url = "http://sonarr:8989"
        api_key = "sonarr-key"
    "#;

    fn with_libraries(libraries: &str) -> String {
        format!("{}\n{}", BASE, libraries)
    }

    #[test]
    fn test_full_config_parses() {
        let toml = with_libraries(
            r#"
            [trakt]
            client_id = "trakt-id"

            [seerr]
            url = "http://seerr:5055"
            api_key = "seerr-key"

            [justwatch]
            country = "US"

            [[libraries]]
            name = "Movies"
            radarr = "Radarr"
            last_watched_threshold = 90
            added_at_threshold = "180d"
            max_actions_per_run = 5
            preview_next = 2
            add_list_exclusion_on_delete = true

            [[libraries.disk_size_threshold]]
            path = "/data/media"
            threshold = "1TB"

            [libraries.sort]
            field = "last_watched,size"
            order = "desc"

            [libraries.leaving_soon]
            collection = "Leaving Soon"
            labels = ["leaving-soon"]

            [libraries.exclude]
            genres = ["Horror"]
            release_years = 2

            [libraries.exclude.radarr]
            tags = ["keep"]
            monitored = true

            [libraries.exclude.trakt]
            lists = ["https://trakt.tv/movies/trending"]

            [libraries.exclude.justwatch]
            available_on = ["netflix"]

            [libraries.exclude.seerr]
            mode = "include_only"
            request_status = ["approved"]

            [[libraries]]
            name = "TV Shows"
            sonarr = "Sonarr"
            series_type = "anime"
            watch_status = "watched"

            [libraries.exclude.sonarr]
            status = ["continuing"]
            "#,
        );

        let config = Config::from_toml(&toml).unwrap();
        assert!(config.dry_run);
        assert_eq!(config.action_delay, 25);
        assert_eq!(config.libraries.len(), 2);

        let movies = config.library("Movies").unwrap();
        assert_eq!(movies.last_watched_threshold.unwrap().days(), 90);
        assert_eq!(movies.added_at_threshold.unwrap().days(), 180);
        assert_eq!(movies.disk_size_threshold[0].threshold.bytes(), 1_099_511_627_776);
        assert_eq!(movies.preview_count(), 2);
        assert_eq!(movies.sort.keys().unwrap()[1].field, SortField::Size);
        assert_eq!(movies.exclude.radarr.as_ref().unwrap().monitored, Some(true));
        assert_eq!(movies.exclude.seerr.as_ref().unwrap().mode, SeerrMode::IncludeOnly);
        assert!(movies.exclude.seerr.as_ref().unwrap().include_pending);
        assert_eq!(config.justwatch_country(movies.exclude.justwatch.as_ref().unwrap()).as_deref(), Some("US"));

        let shows = config.library("TV Shows").unwrap();
        assert_eq!(shows.watch_status, Some(WatchStatus::Watched));
        assert_eq!(shows.exclude.sonarr.as_ref().unwrap().status, vec![SeriesStatus::Continuing]);
    }

    #[test]
    fn test_config_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        let toml = format!(
            "dry_run = false\n{}\n{}",
            BASE,
            r#"
            [[libraries]]
            name = "Movies"
            radarr = "Radarr"
            [[libraries.disk_size_threshold]]
            path = "/data"
            threshold = "500GB"
            "#
        );
        file.write_all(toml.as_bytes()).unwrap();

        let loaded = Config::load_from_file(file.path()).unwrap();
        assert!(!loaded.dry_run);
        assert_eq!(loaded.libraries[0].disk_size_threshold[0].threshold.bytes(), 536_870_912_000);
        assert_eq!(loaded.radarr[0].api_key, "radarr-key");
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = Config::load_from_file(Path::new("/nonexistent/prunarr.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_malformed_threshold_is_config_error() {
        let toml = with_libraries(
            r#"
            [[libraries]]
            name = "Movies"
            radarr = "Radarr"
            [[libraries.disk_size_threshold]]
            path = "/data"
            threshold = "500XB"
            "#,
        );
        assert!(matches!(Config::from_toml(&toml), Err(ConfigError::Parse(_))));
    }

    fn assert_library_error(libraries: &str, needle: &str) {
        match Config::from_toml(&with_libraries(libraries)) {
            Err(ConfigError::Library { message, .. }) => {
                assert!(message.contains(needle), "unexpected message: {}", message)
            }
            other => panic!("expected library error containing '{}', got {:?}", needle, other),
        }
    }

    #[test]
    fn test_library_needs_exactly_one_manager() {
        assert_library_error("[[libraries]]\nname = \"Movies\"", "exactly one");
        assert_library_error(
            "[[libraries]]\nname = \"Movies\"\nradarr = \"Radarr\"\nsonarr = \"Sonarr\"",
            "exactly one",
        );
        assert_library_error("[[libraries]]\nname = \"Movies\"\nradarr = \"Other\"", "not configured");
    }

    #[test]
    fn test_mutually_exclusive_fields() {
        assert_library_error(
            r#"
            [[libraries]]
            name = "Movies"
            radarr = "Radarr"
            watch_status = "unwatched"
            apply_last_watch_threshold_to_collections = true
            "#,
            "cannot both be set",
        );

        assert_library_error(
            r#"
            [justwatch]
            country = "US"

            [[libraries]]
            name = "Movies"
            radarr = "Radarr"
            [libraries.exclude.justwatch]
            available_on = ["netflix"]
            not_available_on = ["hulu"]
            "#,
            "mutually exclusive",
        );
    }

    #[test]
    fn test_justwatch_requires_country() {
        assert_library_error(
            r#"
            [[libraries]]
            name = "Movies"
            radarr = "Radarr"
            [libraries.exclude.justwatch]
            available_on = ["any"]
            "#,
            "country",
        );
    }

    #[test]
    fn test_provider_rules_require_provider_section() {
        assert_library_error(
            r#"
            [[libraries]]
            name = "Movies"
            radarr = "Radarr"
            [libraries.exclude.trakt]
            lists = ["https://trakt.tv/movies/popular"]
            "#,
            "[trakt]",
        );
        assert_library_error(
            r#"
            [[libraries]]
            name = "Movies"
            radarr = "Radarr"
            [libraries.exclude.sonarr]
            tags = ["keep"]
            "#,
            "requires a sonarr library",
        );
    }

    #[test]
    fn test_unsupported_action_mode_and_empty_leaving_soon() {
        assert_library_error(
            "[[libraries]]\nname = \"Movies\"\nradarr = \"Radarr\"\naction_mode = \"archive\"",
            "not supported",
        );
        assert_library_error(
            "[[libraries]]\nname = \"Movies\"\nradarr = \"Radarr\"\n[libraries.leaving_soon]\n",
            "leaving_soon",
        );
    }

    #[test]
    fn test_invalid_watch_status_rejected_at_parse() {
        let toml = with_libraries(
            "[[libraries]]\nname = \"Movies\"\nradarr = \"Radarr\"\nwatch_status = \"sometimes\"",
        );
        assert!(matches!(Config::from_toml(&toml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_connection_settings() {
        let toml = BASE.replace("token = \"plex-token\"", "token = \"\"");
        assert!(matches!(Config::from_toml(&toml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_schedule_presets() {
        assert_eq!(resolve_schedule("weekly").unwrap(), "0 3 * * 0");
        assert_eq!(resolve_schedule("Daily").unwrap(), "0 3 * * *");
        assert_eq!(resolve_schedule("*/30  * * * *").unwrap(), "*/30 * * * *");
        assert!(resolve_schedule("every tuesday").is_err());
        assert!(default_scheduler_config().run_on_startup);
    }
}
