use anyhow::{anyhow, Result};
use media_cleanup_config::PathManager;
use media_cleanup_models::ExcludedItem;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use crate::leaving_soon::ActionPlan;

/// Writes dry-run plans as JSON, one directory per library. Never read back.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    report_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(path_manager: &PathManager) -> Self {
        Self::with_dir(path_manager.report_dir())
    }

    pub fn with_dir(report_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
        }
    }

    pub fn library_dir(&self, library: &str) -> PathBuf {
        self.report_dir.join(sanitize(library))
    }

    pub fn write_plan(&self, library: &str, plan: &ActionPlan) -> Result<PathBuf> {
        let path = self.library_dir(library).join("plan.json");
        write_json(&path, plan)?;
        debug!(
            library,
            deletions = plan.deletions.len(),
            tags = plan.tags.len(),
            untags = plan.untags.len(),
            "Plan report saved"
        );
        Ok(path)
    }

    pub fn write_excluded(&self, library: &str, excluded: &[ExcludedItem]) -> Result<PathBuf> {
        let path = self.library_dir(library).join("excluded.json");
        write_json(&path, excluded)?;
        debug!(library, excluded = excluded.len(), "Exclusion report saved");
        Ok(path)
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(data).map_err(|e| {
        warn!("Failed to serialize report {}: {}", path.display(), e);
        anyhow!("Failed to serialize report: {}", e)
    })?;
    std::fs::write(path, json).map_err(|e| {
        warn!("Failed to write report {}: {}", path.display(), e);
        anyhow!("Failed to write report: {}", e)
    })
}

/// Library names become directory names
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' || c == ' ' { c } else { '_' })
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_cleanup_models::{MediaItem, MediaKind};

    #[test]
    fn test_reports_land_under_library_dir() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::with_dir(dir.path());

        let plan = ActionPlan {
            deletions: vec![MediaItem::new(1, MediaKind::Movie, "Heat")],
            ..ActionPlan::default()
        };
        let plan_path = writer.write_plan("Movies/4K", &plan).unwrap();
        assert_eq!(plan_path, dir.path().join("Movies_4K").join("plan.json"));

        let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&plan_path).unwrap()).unwrap();
        assert_eq!(saved["deletions"][0]["title"], "Heat");

        let excluded = vec![ExcludedItem {
            title: "Alien".into(),
            year: Some(1979),
            kind: MediaKind::Movie,
            library: "Movies/4K".into(),
            rule: "genre".into(),
            reason: "genre rule matched 'Horror'".into(),
        }];
        let excluded_path = writer.write_excluded("Movies/4K", &excluded).unwrap();
        let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(excluded_path).unwrap()).unwrap();
        assert_eq!(saved[0]["rule"], "genre");
    }
}
