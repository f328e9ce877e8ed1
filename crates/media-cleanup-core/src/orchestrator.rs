use chrono::{DateTime, Utc};
use media_cleanup_config::{format_bytes, Config, LibraryPolicy};
use media_cleanup_models::{ExcludedItem, MediaItem};
use media_cleanup_sources::{SourceError, SourceSet};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use crate::eligibility::{check_disk_gate, eligible_candidates, DiskGate};
use crate::exclusion::ExclusionEvaluator;
use crate::leaving_soon::{plan_actions, ActionPlan, Mark, MarkChange};
use crate::providers::ExclusionProvider;
use crate::report::ReportWriter;
use crate::sort::sort_items;
use crate::{CleanupError, RunContext};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LibraryOutcome {
    Completed,
    SkippedDiskGate { path: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct LibrarySummary {
    pub name: String,
    #[serde(flatten)]
    pub outcome: LibraryOutcome,
    pub candidates: usize,
    pub excluded: usize,
    pub deleted: usize,
    pub tagged: usize,
    pub untagged: usize,
    pub failed_actions: usize,
    pub freed_bytes: u64,
}

impl LibrarySummary {
    fn new(name: &str, outcome: LibraryOutcome) -> Self {
        Self {
            name: name.to_string(),
            outcome,
            candidates: 0,
            excluded: 0,
            deleted: 0,
            tagged: 0,
            untagged: 0,
            failed_actions: 0,
            freed_bytes: 0,
        }
    }
}

/// End-of-run totals. In dry-run mode the counts are what would have happened.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub dry_run: bool,
    pub deleted: usize,
    pub tagged: usize,
    pub untagged: usize,
    pub excluded: usize,
    pub skipped_libraries: usize,
    pub failed_libraries: usize,
    pub failed_actions: usize,
    pub freed_bytes: u64,
    pub freed: String,
    pub duration_secs: f64,
    pub libraries: Vec<LibrarySummary>,
}

impl RunSummary {
    fn record(&mut self, library: LibrarySummary) {
        self.deleted += library.deleted;
        self.tagged += library.tagged;
        self.untagged += library.untagged;
        self.excluded += library.excluded;
        self.failed_actions += library.failed_actions;
        self.freed_bytes += library.freed_bytes;
        match library.outcome {
            LibraryOutcome::Completed => {}
            LibraryOutcome::SkippedDiskGate { .. } => self.skipped_libraries += 1,
            LibraryOutcome::Failed { .. } => self.failed_libraries += 1,
        }
        self.libraries.push(library);
    }

    pub fn has_failures(&self) -> bool {
        self.failed_libraries > 0 || self.failed_actions > 0
    }
}

/// Runs the cleanup pipeline over every configured library, one at a time
pub struct CleanupOrchestrator {
    config: Config,
    sources: SourceSet,
    dry_run: bool,
    only_libraries: Vec<String>,
    reports: Option<ReportWriter>,
    action_delay: Duration,
    clock: Option<DateTime<Utc>>,
}

impl CleanupOrchestrator {
    pub fn new(config: &Config, sources: SourceSet) -> Self {
        Self {
            dry_run: config.dry_run,
            action_delay: Duration::from_secs(config.action_delay),
            config: config.clone(),
            sources,
            only_libraries: Vec::new(),
            reports: None,
            clock: None,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Restrict the run to these libraries. Empty means all.
    pub fn with_libraries(mut self, libraries: Vec<String>) -> Self {
        self.only_libraries = libraries;
        self
    }

    pub fn with_report_writer(mut self, reports: ReportWriter) -> Self {
        self.reports = Some(reports);
        self
    }

    pub fn with_action_delay(mut self, delay: Duration) -> Self {
        self.action_delay = delay;
        self
    }

    /// Pin "now" for threshold arithmetic
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.clock = Some(now);
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn selected_libraries(&self) -> Vec<&LibraryPolicy> {
        for name in &self.only_libraries {
            if self.config.library(name).is_none() {
                warn!(library = %name, "Requested library is not configured");
            }
        }
        self.config
            .libraries
            .iter()
            .filter(|l| self.only_libraries.is_empty() || self.only_libraries.contains(&l.name))
            .collect()
    }

    #[instrument(skip(self), fields(dry_run = self.dry_run))]
    pub async fn run(&self) -> RunSummary {
        let start = Instant::now();
        let mut ctx = RunContext::new(self.clock.unwrap_or_else(Utc::now));
        let libraries = self.selected_libraries();

        info!(
            operation = "run_start",
            dry_run = self.dry_run,
            libraries = ?libraries.iter().map(|l| l.name.as_str()).collect::<Vec<_>>(),
            "Starting cleanup run"
        );

        let mut summary = RunSummary {
            dry_run: self.dry_run,
            ..RunSummary::default()
        };
        let mut completed = Vec::new();

        for library in libraries {
            let result = match self.run_library(library, &mut ctx).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(
                        operation = "library_failed",
                        library = %library.name,
                        error = %e,
                        "Library run aborted"
                    );
                    LibrarySummary::new(&library.name, LibraryOutcome::Failed { reason: e.to_string() })
                }
            };
            if result.outcome == LibraryOutcome::Completed {
                completed.push(library);
            }
            summary.record(result);
        }

        if self.config.rescan_after_run {
            for library in completed {
                self.rescan(library).await;
            }
        }

        summary.freed = format_bytes(summary.freed_bytes);
        summary.duration_secs = start.elapsed().as_secs_f64();
        info!(
            operation = "run_complete",
            deleted = summary.deleted,
            tagged = summary.tagged,
            untagged = summary.untagged,
            excluded = summary.excluded,
            failed_actions = summary.failed_actions,
            freed = %summary.freed,
            duration_secs = summary.duration_secs,
            "Cleanup run finished"
        );
        summary
    }

    #[instrument(skip(self, library, ctx), fields(library = %library.name))]
    async fn run_library(&self, library: &LibraryPolicy, ctx: &mut RunContext) -> Result<LibrarySummary, CleanupError> {
        let now = ctx.now();

        let gate = check_disk_gate(library, self.sources.disk.as_ref())
            .await
            .map_err(|e| CleanupError::inventory(&library.name, e))?;
        if let DiskGate::Skip { path, .. } = gate {
            return Ok(LibrarySummary::new(&library.name, LibraryOutcome::SkippedDiskGate { path }));
        }

        let inventory = self
            .sources
            .inventory
            .list_items(library)
            .await
            .map_err(|e| CleanupError::inventory(&library.name, e))?;
        let history = self
            .sources
            .history
            .watch_history(library)
            .await
            .map_err(|e| CleanupError::inventory(&library.name, e))?;
        debug!(items = inventory.len(), history = history.len(), "Library data loaded");

        let eligible = eligible_candidates(inventory.clone(), &history, library, now);

        let providers = ExclusionProvider::for_library(library, &self.sources.catalogs, &self.config);
        let evaluator = ExclusionEvaluator::new(library.exclude.clone(), providers);
        let mut candidates = Vec::with_capacity(eligible.len());
        let mut excluded: Vec<ExcludedItem> = Vec::new();
        for item in eligible {
            match evaluator.check(&item, ctx).await {
                Some(reason) => {
                    debug!(title = %item, reason = %reason, "Item excluded");
                    excluded.push(reason.to_excluded_item(&item, &library.name));
                }
                None => candidates.push(item),
            }
        }

        let keys = library.sort.keys()?;
        sort_items(&mut candidates, &keys, now);

        let mut result = LibrarySummary::new(&library.name, LibraryOutcome::Completed);
        result.candidates = candidates.len();
        result.excluded = excluded.len();

        let plan = plan_actions(candidates, &inventory, library);
        info!(
            operation = "plan",
            candidates = result.candidates,
            excluded = result.excluded,
            deletions = plan.deletions.len(),
            tags = plan.tags.len(),
            untags = plan.untags.len(),
            "Action plan ready"
        );

        if self.dry_run {
            self.write_reports(library, &plan, &excluded);
        }
        self.execute(library, &plan, &mut result).await;
        self.promote_leaving_soon(library).await;
        Ok(result)
    }

    fn write_reports(&self, library: &LibraryPolicy, plan: &ActionPlan, excluded: &[ExcludedItem]) {
        let Some(reports) = &self.reports else {
            return;
        };
        if let Err(e) = reports.write_plan(&library.name, plan) {
            warn!(library = %library.name, error = %e, "Failed to write plan report");
        }
        if let Err(e) = reports.write_excluded(&library.name, excluded) {
            warn!(library = %library.name, error = %e, "Failed to write exclusion report");
        }
    }

    /// Deletions first, then new tags, then rescues. One failed call costs one item.
    async fn execute(&self, library: &LibraryPolicy, plan: &ActionPlan, result: &mut LibrarySummary) {
        let total = plan.deletions.len();
        for (index, item) in plan.deletions.iter().enumerate() {
            match self.delete_item(library, item).await {
                Ok(()) => {
                    result.deleted += 1;
                    result.freed_bytes += item.size_on_disk;
                }
                Err(e) => {
                    warn!(operation = "delete", title = %item, error = %e, "Deletion failed, skipping item");
                    result.failed_actions += 1;
                }
            }
            // a failed request may still have reached the manager
            if !self.dry_run && index + 1 < total && !self.action_delay.is_zero() {
                debug!(delay_secs = self.action_delay.as_secs(), "Waiting before next action");
                tokio::time::sleep(self.action_delay).await;
            }
        }

        for change in &plan.tags {
            match self.apply_marks(change, true).await {
                Ok(()) => result.tagged += 1,
                Err(e) => {
                    warn!(operation = "tag", title = %change.item, error = %e, "Tagging failed, skipping item");
                    result.failed_actions += 1;
                }
            }
        }

        for change in &plan.untags {
            match self.apply_marks(change, false).await {
                Ok(()) => result.untagged += 1,
                Err(e) => {
                    warn!(operation = "untag", title = %change.item, error = %e, "Untagging failed, skipping item");
                    result.failed_actions += 1;
                }
            }
        }
    }

    async fn delete_item(&self, library: &LibraryPolicy, item: &MediaItem) -> Result<(), CleanupError> {
        if self.dry_run {
            info!(
                operation = "dry_run",
                action = "delete",
                title = %item,
                size = %format_bytes(item.size_on_disk),
                "Would delete"
            );
            return Ok(());
        }

        self.sources
            .mutations
            .delete(library, item)
            .await
            .map_err(|e| CleanupError::mutation("delete", item.to_string(), e))?;
        info!(
            operation = "delete",
            library = %library.name,
            title = %item,
            size = %format_bytes(item.size_on_disk),
            "Deleted"
        );

        // Follow-ups are best effort: the deletion already happened
        if library.add_list_exclusion_on_delete {
            if let Err(e) = self.sources.mutations.add_list_exclusion(library, item).await {
                warn!(operation = "list_exclusion", title = %item, error = %e, "Failed to add list exclusion");
            }
        }
        if let Err(e) = self.reset_request(library, item).await {
            warn!(operation = "request_reset", title = %item, error = %e, "Failed to reset request status");
        }
        Ok(())
    }

    async fn reset_request(&self, library: &LibraryPolicy, item: &MediaItem) -> Result<(), SourceError> {
        let update = library.exclude.seerr.as_ref().is_some_and(|s| s.update_status);
        let (Some(tracker), Some(tmdb_id), true) = (&self.sources.catalogs.seerr, item.ids.tmdb_id, update) else {
            return Ok(());
        };
        if tracker.reset_media(tmdb_id, item.kind).await? {
            debug!(title = %item, "Request status reset");
        } else {
            debug!(title = %item, "Request tracker does not know this title");
        }
        Ok(())
    }

    async fn apply_marks(&self, change: &MarkChange, add: bool) -> Result<(), CleanupError> {
        let action = if add { "tag" } else { "untag" };
        for mark in &change.marks {
            if self.dry_run {
                info!(operation = "dry_run", action, title = %change.item, mark = %mark, "Would {}", action);
                continue;
            }
            let mutations = &self.sources.mutations;
            let outcome = match (mark, add) {
                (Mark::Label(label), true) => mutations.set_tag(&change.item, label).await,
                (Mark::Label(label), false) => mutations.clear_tag(&change.item, label).await,
                (Mark::Collection(name), true) => mutations.add_to_collection(&change.item, name).await,
                (Mark::Collection(name), false) => mutations.remove_from_collection(&change.item, name).await,
            };
            outcome.map_err(|e| CleanupError::mutation(action, change.item.to_string(), e))?;
            info!(operation = action, title = %change.item, mark = %mark, "Leaving-soon {} applied", action);
        }
        Ok(())
    }

    /// Pin the leaving-soon collection after its members were updated. Best effort.
    async fn promote_leaving_soon(&self, library: &LibraryPolicy) {
        if !library.leaving_soon_enabled() {
            return;
        }
        let Some(config) = &library.leaving_soon else {
            return;
        };
        let Some(collection) = &config.collection else {
            return;
        };
        let (home, shared) = (config.promote_home, config.promote_shared);
        if self.dry_run {
            info!(operation = "dry_run", action = "promote", collection = %collection, home, shared, "Would set collection visibility");
            return;
        }
        match self
            .sources
            .mutations
            .promote_collection(library, collection, home, shared)
            .await
        {
            Ok(()) => info!(operation = "promote", collection = %collection, home, shared, "Collection visibility updated"),
            Err(e) => warn!(operation = "promote", collection = %collection, error = %e, "Failed to set collection visibility"),
        }
    }

    async fn rescan(&self, library: &LibraryPolicy) {
        if self.dry_run {
            info!(operation = "dry_run", action = "rescan", library = %library.name, "Would trigger rescan");
            return;
        }
        match self.sources.rescan.trigger_rescan(library).await {
            Ok(()) => info!(operation = "rescan", library = %library.name, "Rescan triggered"),
            Err(e) => warn!(operation = "rescan", library = %library.name, error = %e, "Rescan failed"),
        }
    }
}
