use clap::ValueEnum;
use comfy_table::{presets, Attribute, Cell, Color, Table};
use media_cleanup_config::format_bytes;
use media_cleanup_core::{LibraryOutcome, RunSummary};
use owo_colors::OwoColorize;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    #[value(name = "json-pretty")]
    JsonPretty,
}

pub struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    pub fn is_human(&self) -> bool {
        self.format == OutputFormat::Human
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        self.message("success", "✓".green().to_string(), msg.as_ref());
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Human => println!("{}", msg.as_ref()),
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&json!({ "type": "info", "message": msg.as_ref() }))
            }
        }
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.message("warning", "⚠".yellow().to_string(), msg.as_ref());
    }

    /// Shown even in quiet mode
    pub fn error(&self, msg: impl AsRef<str>) {
        match self.format {
            OutputFormat::Human => eprintln!("{} {}", "✗".red(), msg.as_ref()),
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&json!({ "type": "error", "message": msg.as_ref() }))
            }
        }
    }

    fn message(&self, kind: &str, glyph: String, msg: &str) {
        if self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Human => println!("{} {}", glyph, msg),
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&json!({ "type": kind, "message": msg }))
            }
        }
    }

    pub fn json(&self, data: &serde_json::Value) {
        if self.quiet && self.format != OutputFormat::Human {
            return;
        }
        self.print_json(data);
    }

    fn print_json(&self, data: &serde_json::Value) {
        match self.format {
            OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(data).unwrap_or_default()),
            OutputFormat::Json | OutputFormat::Human => println!("{}", serde_json::to_string(data).unwrap_or_default()),
        }
    }

    pub fn table(&self, table: &Table) {
        if !self.quiet {
            println!("{}", table);
        }
    }

    /// End-of-run summary: a table per library in human mode, the summary object otherwise
    pub fn summary(&self, summary: &RunSummary) {
        if !self.is_human() {
            let value = serde_json::to_value(summary).unwrap_or_else(|e| json!({ "error": e.to_string() }));
            self.json(&json!({ "type": "summary", "summary": value }));
            return;
        }
        if self.quiet {
            return;
        }

        let title = if summary.dry_run { "Dry run (nothing was changed)" } else { "Cleanup run" };
        println!("{}", title.bold());
        self.table(&summary_table(summary));

        let totals = format!(
            "{} deleted, {} tagged, {} untagged, {} excluded, {} freed in {:.1}s",
            summary.deleted, summary.tagged, summary.untagged, summary.excluded, summary.freed, summary.duration_secs
        );
        if summary.has_failures() {
            self.warn(format!(
                "{} ({} failed actions, {} failed libraries)",
                totals, summary.failed_actions, summary.failed_libraries
            ));
        } else {
            self.success(totals);
        }
    }
}

fn outcome_cell(outcome: &LibraryOutcome) -> Cell {
    match outcome {
        LibraryOutcome::Completed => Cell::new("✓ completed").fg(Color::Green),
        LibraryOutcome::SkippedDiskGate { path } => Cell::new(format!("- skipped ({} has space)", path)).fg(Color::Yellow),
        LibraryOutcome::Failed { reason } => Cell::new(format!("✗ {}", reason)).fg(Color::Red),
    }
}

pub fn summary_table(summary: &RunSummary) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table.set_header(
        ["Library", "Status", "Candidates", "Excluded", "Deleted", "Tagged", "Untagged", "Failed", "Freed"]
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
    );

    for library in &summary.libraries {
        table.add_row(vec![
            Cell::new(&library.name),
            outcome_cell(&library.outcome),
            Cell::new(library.candidates),
            Cell::new(library.excluded),
            Cell::new(library.deleted),
            Cell::new(library.tagged),
            Cell::new(library.untagged),
            Cell::new(library.failed_actions),
            Cell::new(format_bytes(library.freed_bytes)),
        ]);
    }
    table
}
