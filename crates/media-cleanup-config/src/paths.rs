use anyhow::Result;
use std::path::PathBuf;

/// Container base path from `PRUNARR_BASE_PATH`, defaulting to "/config"
pub fn container_base_path() -> PathBuf {
    std::env::var("PRUNARR_BASE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/config"))
}

pub struct PathManager {
    config_dir: PathBuf,
    data_dir: PathBuf,
    log_dir: PathBuf,
}

impl PathManager {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("prunarr");
        Ok(Self::with_base(base_dir))
    }

    /// Container layout: config at the base, data and logs in subdirectories
    pub fn from_container_env() -> Self {
        Self::with_base(container_base_path())
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self {
            data_dir: base.join("data"),
            log_dir: base.join("logs"),
            config_dir: base,
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Dry-run plans land here, one directory per library
    pub fn report_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }

    pub fn lock_file(&self) -> PathBuf {
        self.data_dir.join("prunarr.lock")
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        std::fs::create_dir_all(self.report_dir())?;
        Ok(())
    }
}

impl Default for PathManager {
    fn default() -> Self {
        // The container image creates the base path, so its presence means we run in a container
        let base = container_base_path();
        if base.exists() {
            return Self::from_container_env();
        }
        Self::new().unwrap_or_else(|_| Self::from_container_env())
    }
}
