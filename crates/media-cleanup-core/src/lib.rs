pub mod context;
pub mod eligibility;
pub mod error;
pub mod exclusion;
pub mod history;
pub mod leaving_soon;
pub mod orchestrator;
pub mod providers;
pub mod report;
pub mod sort;

#[cfg(test)]
pub(crate) mod mocks;

pub use context::RunContext;
pub use eligibility::{check_disk_gate, eligible_candidates, DiskGate};
pub use error::CleanupError;
pub use exclusion::{ExclusionEvaluator, ExclusionReason};
pub use history::apply_watch_history;
pub use leaving_soon::{plan_actions, ActionPlan, LeavingSoonMarks, Mark, MarkChange};
pub use orchestrator::{CleanupOrchestrator, LibraryOutcome, LibrarySummary, RunSummary};
pub use providers::ExclusionProvider;
pub use report::ReportWriter;
pub use sort::sort_items;
