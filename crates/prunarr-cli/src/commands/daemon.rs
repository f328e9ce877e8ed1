use super::{load_config, lock};
use crate::output::Output;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use media_cleanup_config::{default_scheduler_config, resolve_schedule, PathManager};
use media_cleanup_core::{CleanupOrchestrator, ReportWriter};
use media_cleanup_sources::SourceSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

/// Convert a 5-field cron expression into the scheduler's 6-field form.
///
/// The scheduler wants a leading seconds field and counts weekdays from 1 (Sunday),
/// where standard cron counts from 0.
pub fn to_job_schedule(cron: &str) -> Result<String> {
    let fields: Vec<&str> = cron.split_whitespace().collect();
    let [minute, hour, day, month, weekday] = fields[..] else {
        return Err(eyre!("expected 5 cron fields, got '{}'", cron));
    };
    Ok(format!("0 {} {} {} {} {}", minute, hour, day, month, shift_weekdays(weekday)?))
}

fn shift_weekdays(field: &str) -> Result<String> {
    if !field.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '-') {
        // `*`, steps and day names already mean the same thing
        return Ok(field.to_string());
    }
    let shift = |n: &str| -> Result<String> {
        let day: u8 = n.parse().map_err(|_| eyre!("invalid weekday '{}'", n))?;
        match day {
            0..=6 => Ok((day + 1).to_string()),
            7 => Ok("1".to_string()),
            _ => Err(eyre!("weekday {} is out of range", day)),
        }
    };
    field
        .split(',')
        .map(|part| match part.split_once('-') {
            Some((from, to)) => Ok(format!("{}-{}", shift(from)?, shift(to)?)),
            None => shift(part),
        })
        .collect::<Result<Vec<_>>>()
        .map(|parts| parts.join(","))
}

/// One scheduled run. A tick that arrives while a run is still going is skipped.
async fn run_tick(orchestrator: Arc<CleanupOrchestrator>, running: Arc<Mutex<()>>, trigger: &'static str) {
    let Ok(_guard) = running.try_lock() else {
        warn!(operation = "run_skipped", trigger, "Previous run is still in progress, skipping this tick");
        return;
    };

    info!(operation = "scheduled_run_start", trigger, "Starting scheduled cleanup");
    let summary = orchestrator.run().await;
    if summary.has_failures() {
        error!(
            operation = "scheduled_run_complete",
            trigger,
            failed_actions = summary.failed_actions,
            failed_libraries = summary.failed_libraries,
            "Scheduled cleanup finished with failures"
        );
    } else {
        info!(
            operation = "scheduled_run_complete",
            trigger,
            deleted = summary.deleted,
            tagged = summary.tagged,
            freed = %summary.freed,
            "Scheduled cleanup finished"
        );
    }
}

pub async fn run_daemon(
    config_path: Option<&Path>,
    schedule_override: Option<String>,
    no_startup_run: bool,
    output: &Output,
) -> Result<()> {
    let paths = PathManager::default();
    let config = load_config(config_path, &paths)?;
    paths
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create prunarr directories: {:#}", e))?;
    let _lock = lock::acquire(&paths.lock_file())?;

    let scheduler_config = config.scheduler.clone().unwrap_or_else(default_scheduler_config);
    let schedule = schedule_override.unwrap_or_else(|| scheduler_config.schedule.clone());
    let cron = resolve_schedule(&schedule)?;
    let job_schedule = to_job_schedule(&cron)?;
    let run_on_startup = scheduler_config.run_on_startup && !no_startup_run;

    let sources = SourceSet::from_config(&config).wrap_err("Failed to create media clients")?;
    let orchestrator = Arc::new(
        CleanupOrchestrator::new(&config, sources).with_report_writer(ReportWriter::new(&paths)),
    );
    let running = Arc::new(Mutex::new(()));

    let mut scheduler = JobScheduler::new()
        .await
        .map_err(|e| eyre!("Failed to create scheduler: {:?}", e))?;

    let job_orchestrator = orchestrator.clone();
    let job_running = running.clone();
    let job = Job::new_async(job_schedule.as_str(), move |_uuid, _scheduler| {
        let orchestrator = job_orchestrator.clone();
        let running = job_running.clone();
        Box::pin(async move {
            run_tick(orchestrator, running, "schedule").await;
        })
    })
    .map_err(|e| eyre!("Invalid schedule '{}': {:?}", schedule, e))?;
    scheduler
        .add(job)
        .await
        .map_err(|e| eyre!("Failed to register scheduled job: {:?}", e))?;

    info!(
        operation = "scheduler_started",
        schedule = %schedule,
        cron = %cron,
        timezone = "UTC",
        dry_run = orchestrator.is_dry_run(),
        run_on_startup,
        "Scheduler started"
    );
    output.info(format!("Daemon running on schedule '{}' ({} UTC). Press Ctrl+C to stop.", schedule, cron));

    if run_on_startup {
        info!(operation = "scheduler_startup", "Running initial cleanup on startup");
        run_tick(orchestrator.clone(), running.clone(), "startup").await;
    }

    scheduler
        .start()
        .await
        .map_err(|e| eyre!("Failed to start scheduler: {:?}", e))?;

    tokio::signal::ctrl_c().await?;
    info!(operation = "scheduler_stopping", "Shutdown requested");
    if let Err(e) = scheduler.shutdown().await {
        warn!(error = ?e, "Scheduler did not shut down cleanly");
    }
    output.success("Daemon stopped");
    Ok(())
}
