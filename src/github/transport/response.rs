//! Helpers for interpreting GitHub HTTP responses.

use std::time::Duration;

use http::HeaderMap;
use http::header::RETRY_AFTER;
use serde_json::Value;
use url::Url;

use crate::github::pagination::next_page_url;

/// Decoded body of a successful response plus its pagination link.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ApiPage {
    pub(crate) body: Value,
    pub(crate) next: Option<Url>,
}

impl ApiPage {
    pub(crate) fn from_parts(headers: &HeaderMap, text: &str) -> Result<Self, serde_json::Error> {
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(text)?
        };
        Ok(Self {
            body,
            next: next_page_url(headers),
        })
    }
}

/// Pulls the `message` field out of a GitHub error body.
pub(crate) fn extract_github_message(body: &str) -> Option<String> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return None;
    };
    value
        .get("message")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

/// Reads a `Retry-After` header expressed in whole seconds.
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Whether an error message reads like GitHub's secondary rate limit text.
pub(crate) fn mentions_rate_limit(message: &str) -> bool {
    message.to_lowercase().contains("rate limit")
}
