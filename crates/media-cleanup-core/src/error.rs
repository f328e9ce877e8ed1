use media_cleanup_config::ConfigError;
use media_cleanup_sources::SourceError;
use thiserror::Error;

/// Errors raised while planning or executing a cleanup run.
///
/// Only `Config` is fatal. The other variants are absorbed by the orchestrator at the
/// level they describe: one provider rule, one item, or one library.
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("{provider} rule could not be evaluated: {source}")]
    ProviderFetch {
        provider: String,
        #[source]
        source: SourceError,
    },

    #[error("failed to {action} '{title}': {source}")]
    ItemMutation {
        action: String,
        title: String,
        #[source]
        source: SourceError,
    },

    #[error("failed to load library '{library}': {source}")]
    InventoryFetch {
        library: String,
        #[source]
        source: SourceError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CleanupError {
    pub fn provider(provider: &str, source: SourceError) -> Self {
        CleanupError::ProviderFetch {
            provider: provider.to_string(),
            source,
        }
    }

    pub fn mutation(action: &str, title: impl Into<String>, source: SourceError) -> Self {
        CleanupError::ItemMutation {
            action: action.to_string(),
            title: title.into(),
            source,
        }
    }

    pub fn inventory(library: &str, source: SourceError) -> Self {
        CleanupError::InventoryFetch {
            library: library.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_failing_part() {
        let err = CleanupError::mutation("delete", "Heat (1995)", SourceError::NotFound("movie 7".into()));
        assert_eq!(err.to_string(), "failed to delete 'Heat (1995)': movie 7 not found");

        let err = CleanupError::inventory("Movies", SourceError::Timeout { service: "plex".into() });
        assert_eq!(err.to_string(), "failed to load library 'Movies': plex request timed out");
    }
}
