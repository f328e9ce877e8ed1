use super::{config_path, load_config};
use crate::output::Output;
use color_eyre::Result;
use comfy_table::{presets, Attribute, Cell, Color, Table};
use media_cleanup_config::{Config, LibraryPolicy, ManagerRef, PathManager};
use serde_json::json;
use std::path::Path;

pub fn run_check(explicit: Option<&Path>, output: &Output) -> Result<()> {
    let paths = PathManager::default();
    let config = load_config(explicit, &paths)?;
    let path = config_path(explicit, &paths);

    if output.is_human() {
        output.success(format!("Configuration is valid: {}", path.display()));
        output.table(&libraries_table(&config));
    } else {
        let libraries: Vec<_> = config.libraries.iter().map(library_json).collect();
        output.json(&json!({
            "type": "config_check",
            "path": path.display().to_string(),
            "dry_run": config.dry_run,
            "libraries": libraries,
        }));
    }
    Ok(())
}

pub fn run_path(explicit: Option<&Path>, output: &Output) -> Result<()> {
    let path = config_path(explicit, &PathManager::default());
    if output.is_human() {
        output.info(path.display().to_string());
    } else {
        output.json(&json!({ "type": "config_path", "path": path.display().to_string() }));
    }
    Ok(())
}

fn manager_label(library: &LibraryPolicy) -> String {
    match library.manager() {
        Some(ManagerRef::Radarr(name)) => format!("radarr: {}", name),
        Some(ManagerRef::Sonarr(name)) => format!("sonarr: {}", name),
        None => "-".to_string(),
    }
}

fn days(value: Option<media_cleanup_config::DayCount>) -> String {
    value.map(|d| format!("{}d", d.days())).unwrap_or_else(|| "-".to_string())
}

fn leaving_soon_label(library: &LibraryPolicy) -> String {
    match &library.leaving_soon {
        Some(marks) if library.leaving_soon_enabled() => {
            let mut parts: Vec<String> = marks.collection.iter().map(|c| format!("collection '{}'", c)).collect();
            parts.extend(marks.labels.iter().map(|l| format!("label '{}'", l)));
            format!("{} (preview {})", parts.join(", "), library.preview_count())
        }
        _ => "off (direct delete)".to_string(),
    }
}

fn libraries_table(config: &Config) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table.set_header(
        ["Library", "Manager", "Last watched", "Added", "Max actions", "Leaving soon", "Sort"]
            .into_iter()
            .map(|h| Cell::new(h).fg(Color::Cyan).add_attribute(Attribute::Bold)),
    );
    for library in &config.libraries {
        table.add_row(vec![
            Cell::new(&library.name),
            Cell::new(manager_label(library)),
            Cell::new(days(library.last_watched_threshold)),
            Cell::new(days(library.added_at_threshold)),
            Cell::new(library.max_actions_per_run),
            Cell::new(leaving_soon_label(library)),
            Cell::new(format!("{} ({})", library.sort.field, library.sort.order)),
        ]);
    }
    table
}

fn library_json(library: &LibraryPolicy) -> serde_json::Value {
    json!({
        "name": library.name,
        "manager": manager_label(library),
        "kind": library.kind(),
        "last_watched_threshold": library.last_watched_threshold.map(|d| d.days()),
        "added_at_threshold": library.added_at_threshold.map(|d| d.days()),
        "max_actions_per_run": library.max_actions_per_run,
        "leaving_soon": leaving_soon_label(library),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_cleanup_config::{DayCount, LeavingSoonConfig};

    #[test]
    fn test_library_labels() {
        let mut library = LibraryPolicy::new("Movies");
        library.radarr = Some("4k".into());
        library.last_watched_threshold = Some(DayCount::new(90));
        assert_eq!(manager_label(&library), "radarr: 4k");
        assert_eq!(days(library.last_watched_threshold), "90d");
        assert_eq!(days(None), "-");
        assert_eq!(leaving_soon_label(&library), "off (direct delete)");

        library.leaving_soon = Some(LeavingSoonConfig {
            collection: Some("Leaving Soon".into()),
            labels: vec!["bye".into()],
            ..LeavingSoonConfig::default()
        });
        library.preview_next = Some(3);
        assert_eq!(
            leaving_soon_label(&library),
            "collection 'Leaving Soon', label 'bye' (preview 3)"
        );
        assert_eq!(library_json(&library)["kind"], "movie");
    }
}
