use media_cleanup_models::{MediaKind, SeriesStatus, SeriesType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::{ByteSize, ConfigError, DayCount};

/// Cleanup policy for one media-server library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryPolicy {
    /// Must match the library name on the media server
    pub name: String,
    #[serde(default = "default_action_mode")]
    pub action_mode: String,
    /// Name of the Radarr instance backing this library
    #[serde(default)]
    pub radarr: Option<String>,
    /// Name of the Sonarr instance backing this library
    #[serde(default)]
    pub sonarr: Option<String>,
    #[serde(default)]
    pub series_type: Option<SeriesType>,
    #[serde(default)]
    pub last_watched_threshold: Option<DayCount>,
    #[serde(default)]
    pub added_at_threshold: Option<DayCount>,
    #[serde(default)]
    pub watch_status: Option<WatchStatus>,
    #[serde(default)]
    pub apply_last_watch_threshold_to_collections: bool,
    #[serde(default = "default_max_actions_per_run")]
    pub max_actions_per_run: usize,
    /// Defaults to `max_actions_per_run`; 0 disables the leaving-soon phase
    #[serde(default)]
    pub preview_next: Option<usize>,
    #[serde(default)]
    pub add_list_exclusion_on_delete: bool,
    #[serde(default)]
    pub disk_size_threshold: Vec<DiskThreshold>,
    #[serde(default)]
    pub sort: SortConfig,
    #[serde(default)]
    pub exclude: ExcludeConfig,
    #[serde(default)]
    pub leaving_soon: Option<LeavingSoonConfig>,
}

fn default_action_mode() -> String {
    "delete".to_string()
}

fn default_max_actions_per_run() -> usize {
    10
}

/// Which library manager backs a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerRef<'a> {
    Radarr(&'a str),
    Sonarr(&'a str),
}

impl ManagerRef<'_> {
    pub fn instance(&self) -> &str {
        match self {
            ManagerRef::Radarr(name) | ManagerRef::Sonarr(name) => name,
        }
    }
}

impl LibraryPolicy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action_mode: default_action_mode(),
            radarr: None,
            sonarr: None,
            series_type: None,
            last_watched_threshold: None,
            added_at_threshold: None,
            watch_status: None,
            apply_last_watch_threshold_to_collections: false,
            max_actions_per_run: default_max_actions_per_run(),
            preview_next: None,
            add_list_exclusion_on_delete: false,
            disk_size_threshold: Vec::new(),
            sort: SortConfig::default(),
            exclude: ExcludeConfig::default(),
            leaving_soon: None,
        }
    }

    /// The backing manager, or None when the policy is misconfigured
    pub fn manager(&self) -> Option<ManagerRef<'_>> {
        match (&self.radarr, &self.sonarr) {
            (Some(radarr), None) => Some(ManagerRef::Radarr(radarr)),
            (None, Some(sonarr)) => Some(ManagerRef::Sonarr(sonarr)),
            _ => None,
        }
    }

    pub fn kind(&self) -> MediaKind {
        if self.sonarr.is_some() {
            MediaKind::Series
        } else {
            MediaKind::Movie
        }
    }

    /// Series libraries filter on `standard` unless told otherwise
    pub fn effective_series_type(&self) -> Option<SeriesType> {
        match self.kind() {
            MediaKind::Series => Some(self.series_type.unwrap_or_default()),
            MediaKind::Movie => None,
        }
    }

    pub fn preview_count(&self) -> usize {
        self.preview_next.unwrap_or(self.max_actions_per_run)
    }

    pub fn leaving_soon_enabled(&self) -> bool {
        self.leaving_soon.is_some() && self.preview_count() > 0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WatchStatus {
    Watched,
    Unwatched,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskThreshold {
    pub path: String,
    pub threshold: ByteSize,
}

/// Leaving-soon markers. Either marker present means "tagged".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeavingSoonConfig {
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Show the collection on the server owner's home screen
    #[serde(default = "default_true")]
    pub promote_home: bool,
    /// Show the collection on shared users' home screens
    #[serde(default = "default_true")]
    pub promote_shared: bool,
}

impl Default for LeavingSoonConfig {
    fn default() -> Self {
        Self {
            collection: None,
            labels: Vec::new(),
            promote_home: true,
            promote_shared: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortConfig {
    /// Comma-separated field list, primary first
    #[serde(default = "default_sort_field")]
    pub field: String,
    /// Comma-separated orders; the last one repeats for remaining fields
    #[serde(default = "default_sort_order")]
    pub order: String,
}

fn default_sort_field() -> String {
    "title".to_string()
}

fn default_sort_order() -> String {
    "asc".to_string()
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            field: default_sort_field(),
            order: default_sort_order(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Title,
    Size,
    ReleaseYear,
    Runtime,
    AddedDate,
    Rating,
    Seasons,
    Episodes,
    LastWatched,
}

impl FromStr for SortField {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "title" => Ok(SortField::Title),
            "size" => Ok(SortField::Size),
            "release_year" => Ok(SortField::ReleaseYear),
            "runtime" => Ok(SortField::Runtime),
            "added_date" => Ok(SortField::AddedDate),
            "rating" => Ok(SortField::Rating),
            "seasons" => Ok(SortField::Seasons),
            "episodes" => Ok(SortField::Episodes),
            "last_watched" => Ok(SortField::LastWatched),
            other => Err(ConfigError::invalid(format!("unknown sort field '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(ConfigError::invalid(format!("unknown sort order '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub order: SortOrder,
}

impl SortConfig {
    pub fn keys(&self) -> Result<Vec<SortKey>, ConfigError> {
        let fields = split_list(&self.field)
            .map(str::parse::<SortField>)
            .collect::<Result<Vec<_>, _>>()?;
        let orders = split_list(&self.order)
            .map(str::parse::<SortOrder>)
            .collect::<Result<Vec<_>, _>>()?;

        if fields.is_empty() {
            return Err(ConfigError::invalid("sort.field must name at least one field"));
        }
        let last = orders.last().copied().unwrap_or(SortOrder::Asc);

        Ok(fields
            .into_iter()
            .enumerate()
            .map(|(i, field)| SortKey {
                field,
                order: orders.get(i).copied().unwrap_or(last),
            })
            .collect())
    }
}

fn split_list(s: &str) -> impl Iterator<Item = &str> {
    s.split(',').map(str::trim).filter(|part| !part.is_empty())
}

/// All exclusion rules for a library. Any single match protects the item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeConfig {
    #[serde(default)]
    pub titles: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default)]
    pub actors: Vec<String>,
    #[serde(default)]
    pub directors: Vec<String>,
    #[serde(default)]
    pub writers: Vec<String>,
    #[serde(default)]
    pub producers: Vec<String>,
    #[serde(default)]
    pub studios: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Protect anything released within this many years
    #[serde(default)]
    pub release_years: Option<u32>,
    #[serde(default)]
    pub radarr: Option<ManagerExclusions>,
    #[serde(default)]
    pub sonarr: Option<ManagerExclusions>,
    #[serde(default)]
    pub trakt: Option<TraktExclusions>,
    #[serde(default)]
    pub mdblist: Option<MdblistExclusions>,
    #[serde(default)]
    pub justwatch: Option<JustWatchExclusions>,
    #[serde(default)]
    pub seerr: Option<SeerrExclusions>,
}

impl ExcludeConfig {
    pub fn manager_rules(&self, kind: MediaKind) -> Option<&ManagerExclusions> {
        match kind {
            MediaKind::Movie => self.radarr.as_ref(),
            MediaKind::Series => self.sonarr.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagerExclusions {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub quality_profiles: Vec<String>,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub monitored: Option<bool>,
    /// Series only
    #[serde(default)]
    pub status: Vec<SeriesStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraktExclusions {
    #[serde(default)]
    pub lists: Vec<String>,
    #[serde(default = "default_max_items_per_list")]
    pub max_items_per_list: usize,
}

fn default_max_items_per_list() -> usize {
    100
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MdblistExclusions {
    #[serde(default)]
    pub lists: Vec<String>,
    #[serde(default = "default_mdblist_max_items")]
    pub max_items_per_list: usize,
}

fn default_mdblist_max_items() -> usize {
    1000
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JustWatchExclusions {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub available_on: Vec<String>,
    #[serde(default)]
    pub not_available_on: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SeerrMode {
    /// Protect items that have a matching request
    #[default]
    Exclude,
    /// Protect items that do NOT have a matching request
    IncludeOnly,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Declined,
}

impl RequestStatus {
    /// Map the request tracker's numeric status code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(RequestStatus::Pending),
            2 => Some(RequestStatus::Approved),
            3 => Some(RequestStatus::Declined),
            _ => None,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Declined => "declined",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeerrExclusions {
    #[serde(default)]
    pub mode: SeerrMode,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default = "default_true")]
    pub include_pending: bool,
    #[serde(default)]
    pub request_status: Vec<RequestStatus>,
    #[serde(default)]
    pub min_request_age_days: Option<u32>,
    /// Reset the request tracker's media entry after a deletion
    #[serde(default)]
    pub update_status: bool,
}

fn default_true() -> bool {
    true
}
