use thiserror::Error;

/// Failure talking to an external collaborator.
///
/// Every variant is recoverable from the engine's point of view: the caller decides
/// whether it costs an item, a provider rule, or a whole library.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{service} request timed out")]
    Timeout { service: String },

    #[error("{service} returned HTTP {status}: {body}")]
    Http {
        service: String,
        status: u16,
        body: String,
    },

    #[error("{service} request failed: {message}")]
    Transport { service: String, message: String },

    #[error("unexpected response from {service}: {message}")]
    Payload { service: String, message: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        SourceError::Other(message.into())
    }

    pub fn payload(service: &str, message: impl Into<String>) -> Self {
        SourceError::Payload {
            service: service.to_string(),
            message: message.into(),
        }
    }

    pub fn from_reqwest(service: &str, err: reqwest::Error) -> Self {
        let service = service.to_string();
        if err.is_timeout() {
            SourceError::Timeout { service }
        } else if err.is_decode() {
            SourceError::Payload {
                service,
                message: err.to_string(),
            }
        } else {
            SourceError::Transport {
                service,
                message: err.to_string(),
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SourceError::NotFound(_) | SourceError::Http { status: 404, .. }
        )
    }
}

impl From<anyhow::Error> for SourceError {
    fn from(err: anyhow::Error) -> Self {
        SourceError::Other(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        assert!(SourceError::NotFound("library 'Movies'".into()).is_not_found());
        let http = SourceError::Http { service: "sonarr".into(), status: 404, body: String::new() };
        assert!(http.is_not_found());
        let server = SourceError::Http { service: "sonarr".into(), status: 500, body: String::new() };
        assert!(!server.is_not_found());
    }

    #[test]
    fn test_display_names_service() {
        let err = SourceError::Timeout { service: "tautulli".into() };
        assert_eq!(err.to_string(), "tautulli request timed out");
    }
}
