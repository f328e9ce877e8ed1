use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use crate::SourceError;

/// Shared HTTP client. Every outbound call inherits the configured timeout.
pub fn build_client(timeout_secs: u64, ssl_verify: bool) -> Result<Client, SourceError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .danger_accept_invalid_certs(!ssl_verify)
        .user_agent(concat!("prunarr/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| SourceError::new(format!("failed to build HTTP client: {}", e)))
}

pub(crate) async fn ensure_success(service: &str, response: Response) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SourceError::Http {
        service: service.to_string(),
        status: status.as_u16(),
        body: truncate(&body, 200),
    })
}

pub(crate) async fn read_json<T: DeserializeOwned>(service: &str, response: Response) -> Result<T, SourceError> {
    let response = ensure_success(service, response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| SourceError::from_reqwest(service, e))
}

pub(crate) fn send_error(service: &str) -> impl Fn(reqwest::Error) -> SourceError + '_ {
    move |e| SourceError::from_reqwest(service, e)
}

fn truncate(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// Read a JSON id that may be encoded as a number or a numeric string
pub(crate) fn json_u32(value: Option<&serde_json::Value>) -> Option<u32> {
    match value? {
        serde_json::Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_u32_accepts_numbers_and_strings() {
        assert_eq!(json_u32(Some(&json!(603))), Some(603));
        assert_eq!(json_u32(Some(&json!("81189"))), Some(81189));
        assert_eq!(json_u32(Some(&json!(null))), None);
        assert_eq!(json_u32(Some(&json!(-1))), None);
        assert_eq!(json_u32(None), None);
    }

    #[test]
    fn test_truncate_long_bodies() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
