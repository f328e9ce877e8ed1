use chrono::{DateTime, Utc};
use media_cleanup_config::{SortField, SortKey, SortOrder};
use media_cleanup_models::MediaItem;
use std::cmp::Ordering;

/// Stable multi-key sort. The first key is primary, later keys break ties.
///
/// Missing values go last within their tier whatever the direction. For `last_watched`
/// every never-watched item comes first, and the order only applies among watched items,
/// keyed by time elapsed since the last watch.
pub fn sort_items(items: &mut [MediaItem], keys: &[SortKey], now: DateTime<Utc>) {
    items.sort_by(|a, b| {
        keys.iter()
            .map(|key| compare(a, b, key, now))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

fn compare(a: &MediaItem, b: &MediaItem, key: &SortKey, now: DateTime<Utc>) -> Ordering {
    match key.field {
        SortField::LastWatched => match (a.last_watched, b.last_watched) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => directed(now - x, now - y, key.order),
        },
        SortField::Title => directed(
            a.sort_key_title().to_lowercase(),
            b.sort_key_title().to_lowercase(),
            key.order,
        ),
        SortField::Size => directed(a.size_on_disk, b.size_on_disk, key.order),
        SortField::ReleaseYear => optional(a.year, b.year, key.order),
        SortField::Runtime => optional(a.runtime_minutes, b.runtime_minutes, key.order),
        SortField::AddedDate => optional(a.added_at, b.added_at, key.order),
        SortField::Rating => match (a.rating, b.rating) {
            (Some(x), Some(y)) => apply_order(x.total_cmp(&y), key.order),
            (x, y) => missing_last(x.is_some(), y.is_some()),
        },
        SortField::Seasons => optional(
            a.series.as_ref().map(|s| s.season_count),
            b.series.as_ref().map(|s| s.season_count),
            key.order,
        ),
        SortField::Episodes => optional(
            a.series.as_ref().map(|s| s.episode_count),
            b.series.as_ref().map(|s| s.episode_count),
            key.order,
        ),
    }
}

fn directed<T: Ord>(a: T, b: T, order: SortOrder) -> Ordering {
    apply_order(a.cmp(&b), order)
}

fn optional<T: Ord>(a: Option<T>, b: Option<T>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => directed(x, y, order),
        (x, y) => missing_last(x.is_some(), y.is_some()),
    }
}

fn missing_last(a_present: bool, b_present: bool) -> Ordering {
    b_present.cmp(&a_present)
}

fn apply_order(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}
