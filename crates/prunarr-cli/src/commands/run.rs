use super::{check_libraries, load_config, lock};
use crate::output::Output;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use media_cleanup_config::PathManager;
use media_cleanup_core::{CleanupOrchestrator, ReportWriter};
use media_cleanup_sources::SourceSet;
use std::path::Path;

/// `--dry-run` and `--live` override the config; neither means the config decides
pub fn resolve_dry_run(configured: bool, dry_run: bool, live: bool) -> bool {
    if live {
        false
    } else {
        dry_run || configured
    }
}

pub async fn run_once(
    config_path: Option<&Path>,
    dry_run: bool,
    live: bool,
    libraries: Vec<String>,
    output: &Output,
) -> Result<()> {
    tracing::debug!("Run command started");
    let paths = PathManager::default();
    let config = load_config(config_path, &paths)?;
    check_libraries(&config, &libraries)?;

    paths
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create prunarr directories: {:#}", e))?;
    let _lock = lock::acquire(&paths.lock_file())?;

    let dry_run = resolve_dry_run(config.dry_run, dry_run, live);
    if dry_run {
        output.info("Dry run: mutations are logged, not performed");
    }

    let sources = SourceSet::from_config(&config).wrap_err("Failed to create media clients")?;
    let orchestrator = CleanupOrchestrator::new(&config, sources)
        .with_dry_run(dry_run)
        .with_libraries(libraries)
        .with_report_writer(ReportWriter::new(&paths));

    let summary = orchestrator.run().await;
    output.summary(&summary);

    if summary.dry_run && output.is_human() {
        output.info(format!("Plans written to {}", paths.report_dir().display()));
    }
    Ok(())
}
