mod client;
mod radarr;
mod sonarr;

pub use client::ArrClient;
pub use radarr::RadarrClient;
pub use sonarr::SonarrClient;
