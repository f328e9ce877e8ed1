pub mod config;
pub mod daemon;
pub mod lock;
pub mod run;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use media_cleanup_config::{Config, PathManager};
use std::path::{Path, PathBuf};

/// `--config` if given, otherwise the standard location
pub fn config_path(explicit: Option<&Path>, paths: &PathManager) -> PathBuf {
    explicit.map(Path::to_path_buf).unwrap_or_else(|| paths.config_file())
}

/// Load and validate. Any error here ends the process before a run starts.
pub fn load_config(explicit: Option<&Path>, paths: &PathManager) -> Result<Config> {
    let path = config_path(explicit, paths);
    Config::load_from_file(&path).wrap_err_with(|| format!("Failed to load config from {}", path.display()))
}

/// Reject library names that are not in the config
pub fn check_libraries(config: &Config, requested: &[String]) -> Result<()> {
    let unknown: Vec<&str> = requested
        .iter()
        .filter(|name| config.library(name).is_none())
        .map(String::as_str)
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(color_eyre::eyre::eyre!("Unknown library: {}", unknown.join(", ")))
    }
}
