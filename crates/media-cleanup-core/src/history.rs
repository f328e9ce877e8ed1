use chrono::{DateTime, Utc};
use media_cleanup_models::{MediaItem, WatchRecord};
use media_cleanup_sources::plex::normalize_title;
use std::collections::HashMap;

/// Title matches allow the release year to drift by this much
const YEAR_TOLERANCE: u32 = 1;

/// Set `last_watched` on each item from the library's playback history.
///
/// Records join by server rating key or GUID first, then by normalized title and year.
/// The newest stop time wins.
pub fn apply_watch_history(items: &mut [MediaItem], history: &[WatchRecord]) {
    let mut by_key: HashMap<&str, DateTime<Utc>> = HashMap::new();
    let mut by_title: HashMap<String, Vec<(Option<u32>, DateTime<Utc>)>> = HashMap::new();

    for record in history {
        for key in [record.rating_key.as_deref(), record.guid.as_deref()].into_iter().flatten() {
            let entry = by_key.entry(key).or_insert(record.stopped);
            if record.stopped > *entry {
                *entry = record.stopped;
            }
        }
        by_title
            .entry(normalize_title(&record.title))
            .or_default()
            .push((record.year, record.stopped));
    }

    for item in items.iter_mut() {
        let keyed = item.server.as_ref().and_then(|server| {
            let by_rating_key = by_key.get(server.rating_key.as_str()).copied();
            let by_guid = server.guid.as_deref().and_then(|g| by_key.get(g).copied());
            by_rating_key.max(by_guid)
        });

        let titled = by_title.get(&normalize_title(&item.title)).and_then(|records| {
            records
                .iter()
                .filter(|(year, _)| years_match(item.year, *year))
                .map(|(_, stopped)| *stopped)
                .max()
        });

        let latest = keyed.max(titled);
        if latest.is_some() {
            item.last_watched = item.last_watched.max(latest);
        }
    }
}

fn years_match(a: Option<u32>, b: Option<u32>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.abs_diff(b) <= YEAR_TOLERANCE,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use media_cleanup_models::{MediaKind, ServerRef};

    fn record(key: Option<&str>, title: &str, year: Option<u32>, stopped: DateTime<Utc>) -> WatchRecord {
        WatchRecord {
            rating_key: key.map(String::from),
            guid: None,
            title: title.to_string(),
            year,
            stopped,
        }
    }

    #[test]
    fn test_newest_record_wins_by_rating_key() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut item = MediaItem::new(1, MediaKind::Movie, "Some Renamed Title");
        item.server = Some(ServerRef { section_id: "1".into(), rating_key: "42".into(), guid: None });

        let history = vec![
            record(Some("42"), "Original Title", None, t0),
            record(Some("42"), "Original Title", None, t0 + Duration::days(3)),
            record(Some("7"), "Other", None, t0 + Duration::days(9)),
        ];
        let mut items = vec![item];
        apply_watch_history(&mut items, &history);
        assert_eq!(items[0].last_watched, Some(t0 + Duration::days(3)));
    }

    #[test]
    fn test_title_fallback_respects_year_tolerance() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut close = MediaItem::new(1, MediaKind::Movie, "Dune");
        close.year = Some(2021);
        let mut remake = MediaItem::new(2, MediaKind::Movie, "Dune");
        remake.year = Some(1984);

        let history = vec![record(None, "DUNE", Some(2020), t0)];
        let mut items = vec![close, remake];
        apply_watch_history(&mut items, &history);
        assert_eq!(items[0].last_watched, Some(t0));
        assert_eq!(items[1].last_watched, None);
    }

    #[test]
    fn test_unmatched_items_stay_unwatched() {
        let mut items = vec![MediaItem::new(1, MediaKind::Series, "The Wire")];
        apply_watch_history(&mut items, &[record(Some("9"), "The Sopranos", Some(1999), Utc::now())]);
        assert!(!items[0].is_watched());
    }
}
