use media_cleanup_models::MediaItem;
use std::collections::HashMap;
use super::PlexMetadata;

/// Largest release-year difference accepted when matching by title
const YEAR_TOLERANCE: u32 = 2;

/// Lookup over one Plex section, used to attach media-server data to manager items
pub struct PlexLibraryIndex {
    items: Vec<PlexMetadata>,
    by_tmdb: HashMap<u32, usize>,
    by_tvdb: HashMap<u32, usize>,
    by_imdb: HashMap<String, usize>,
    by_title: HashMap<String, Vec<usize>>,
}

impl PlexLibraryIndex {
    pub fn new(items: Vec<PlexMetadata>) -> Self {
        let mut by_tmdb = HashMap::new();
        let mut by_tvdb = HashMap::new();
        let mut by_imdb = HashMap::new();
        let mut by_title: HashMap<String, Vec<usize>> = HashMap::new();

        for (idx, item) in items.iter().enumerate() {
            if let Some(id) = item.ids.tmdb_id {
                by_tmdb.entry(id).or_insert(idx);
            }
            if let Some(id) = item.ids.tvdb_id {
                by_tvdb.entry(id).or_insert(idx);
            }
            if let Some(id) = &item.ids.imdb_id {
                by_imdb.entry(id.clone()).or_insert(idx);
            }
            by_title.entry(normalize_title(&item.title)).or_default().push(idx);
        }

        Self { items, by_tmdb, by_tvdb, by_imdb, by_title }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Match by external id first, then by normalized title and year
    pub fn find(&self, item: &MediaItem) -> Option<&PlexMetadata> {
        let by_id = item
            .ids
            .tmdb_id
            .and_then(|id| self.by_tmdb.get(&id))
            .or_else(|| item.ids.tvdb_id.and_then(|id| self.by_tvdb.get(&id)))
            .or_else(|| item.ids.imdb_id.as_ref().and_then(|id| self.by_imdb.get(id)));
        if let Some(idx) = by_id {
            return self.items.get(*idx);
        }

        let candidates = self.by_title.get(&normalize_title(&item.title))?;
        candidates
            .iter()
            .filter_map(|idx| self.items.get(*idx))
            .find(|plex| match (item.year, plex.year) {
                (Some(a), Some(b)) => a.abs_diff(b) <= YEAR_TOLERANCE,
                _ => true,
            })
    }
}

/// Lowercase and keep only alphanumerics so punctuation differences do not matter
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_cleanup_models::{MediaIds, MediaKind, MediaMetadata};

    fn plex(key: &str, title: &str, year: Option<u32>, ids: MediaIds) -> PlexMetadata {
        PlexMetadata {
            rating_key: key.to_string(),
            guid: None,
            title: title.to_string(),
            year,
            ids,
            metadata: MediaMetadata::default(),
            added_at: None,
            rating: None,
        }
    }

    #[test]
    fn test_find_prefers_external_ids() {
        let index = PlexLibraryIndex::new(vec![
            plex("1", "Dune", Some(1984), MediaIds { tmdb_id: Some(841), ..MediaIds::default() }),
            plex("2", "Dune", Some(2021), MediaIds { tmdb_id: Some(438631), ..MediaIds::default() }),
        ]);
        let mut item = MediaItem::new(10, MediaKind::Movie, "Dune");
        item.year = Some(1984);
        item.ids.tmdb_id = Some(438631);

        assert_eq!(index.find(&item).unwrap().rating_key, "2");
    }

    #[test]
    fn test_find_falls_back_to_title_and_year() {
        let index = PlexLibraryIndex::new(vec![
            plex("1", "Spider-Man: No Way Home", Some(2021), MediaIds::default()),
            plex("2", "Old Movie", Some(1950), MediaIds::default()),
        ]);

        let mut item = MediaItem::new(1, MediaKind::Movie, "Spider-Man No Way Home");
        item.year = Some(2022);
        assert_eq!(index.find(&item).unwrap().rating_key, "1");

        let mut far = MediaItem::new(2, MediaKind::Movie, "Old Movie");
        far.year = Some(1960);
        assert!(index.find(&far).is_none());
        assert_eq!(index.len(), 2);
    }
}
