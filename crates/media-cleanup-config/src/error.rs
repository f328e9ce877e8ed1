use std::path::PathBuf;
use thiserror::Error;

/// Fatal configuration problems. Any of these stops the process before a run starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid size '{value}': {reason}")]
    InvalidSize { value: String, reason: String },

    #[error("invalid day threshold '{value}': {reason}")]
    InvalidThreshold { value: String, reason: String },

    #[error("library '{library}': {message}")]
    Library { library: String, message: String },

    #[error("{0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn library(library: &str, message: impl Into<String>) -> Self {
        ConfigError::Library {
            library: library.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ConfigError::Invalid(message.into())
    }
}
