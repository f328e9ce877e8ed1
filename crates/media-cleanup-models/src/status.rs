use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Airing status reported by the series manager
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SeriesStatus {
    Continuing,
    Ended,
    Upcoming,
    Deleted,
}

impl SeriesStatus {
    pub const ALL: [SeriesStatus; 4] = [
        SeriesStatus::Continuing,
        SeriesStatus::Ended,
        SeriesStatus::Upcoming,
        SeriesStatus::Deleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesStatus::Continuing => "continuing",
            SeriesStatus::Ended => "ended",
            SeriesStatus::Upcoming => "upcoming",
            SeriesStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for SeriesStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeriesStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SeriesStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown series status '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SeriesType {
    #[default]
    Standard,
    Anime,
    Daily,
}

impl SeriesType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesType::Standard => "standard",
            SeriesType::Anime => "anime",
            SeriesType::Daily => "daily",
        }
    }
}

impl fmt::Display for SeriesType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeriesType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(SeriesType::Standard),
            "anime" => Ok(SeriesType::Anime),
            "daily" => Ok(SeriesType::Daily),
            other => Err(format!("unknown series type '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_status_parse_is_case_insensitive() {
        assert_eq!("Ended".parse::<SeriesStatus>().unwrap(), SeriesStatus::Ended);
        assert_eq!(" continuing ".parse::<SeriesStatus>().unwrap(), SeriesStatus::Continuing);
        assert!("cancelled".parse::<SeriesStatus>().is_err());
    }

    #[test]
    fn test_series_type_defaults_to_standard() {
        assert_eq!(SeriesType::default(), SeriesType::Standard);
        assert_eq!("ANIME".parse::<SeriesType>().unwrap(), SeriesType::Anime);
    }
}
