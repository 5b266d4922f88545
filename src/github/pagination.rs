//! Lazy traversal of paginated GitHub list endpoints.
//!
//! GitHub advertises the following page in the `Link` response header
//! (`<https://...&page=2>; rel="next"`). [`Pagination`] fetches a page only
//! when the caller has consumed every item of the previous one and stops as
//! soon as no `next` link is present.

use std::collections::VecDeque;

use http::HeaderMap;
use http::header::LINK;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::transport::{ApiPage, TransportClient, TransportError};

/// Extracts the `rel="next"` target from a `Link` header.
#[must_use]
pub fn next_page_url(headers: &HeaderMap) -> Option<Url> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(find_next_link)
}

fn find_next_link(header: &str) -> Option<Url> {
    header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| {
            let normalised = param.trim().replace(' ', "");
            normalised == r#"rel="next""# || normalised == "rel=next"
        });
        if !is_next {
            return None;
        }
        let inner = target.strip_prefix('<')?.strip_suffix('>')?;
        Url::parse(inner).ok()
    })
}

/// Lazy, single-pass sequence over every item of a paginated endpoint.
///
/// Items are yielded in server order across pages. After an error the
/// sequence is finished and yields nothing further.
#[derive(Debug)]
pub struct Pagination<'client> {
    client: &'client TransportClient,
    next: Option<Url>,
    pending_error: Option<TransportError>,
    items_field: Option<&'static str>,
    buffered: VecDeque<Value>,
    pages_fetched: u32,
}

impl<'client> Pagination<'client> {
    pub(crate) fn new(
        client: &'client TransportClient,
        first: Result<Url, TransportError>,
        items_field: Option<&'static str>,
    ) -> Self {
        let (next, pending_error) = match first {
            Ok(url) => (Some(url), None),
            Err(error) => (None, Some(error)),
        };
        Self {
            client,
            next,
            pending_error,
            items_field,
            buffered: VecDeque::new(),
            pages_fetched: 0,
        }
    }

    /// Number of pages requested so far.
    #[must_use]
    pub const fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Yields the next item, requesting another page only when needed.
    ///
    /// Returns `Ok(None)` once the final page has been drained.
    ///
    /// # Errors
    ///
    /// Returns the [`TransportError`] of the failing page request. The
    /// sequence is finished afterwards.
    pub async fn next_item(&mut self) -> Result<Option<Value>, TransportError> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Ok(Some(item));
            }
            if let Some(error) = self.pending_error.take() {
                self.next = None;
                return Err(error);
            }
            let Some(url) = self.next.take() else {
                return Ok(None);
            };

            let ApiPage { body, next } = self.client.get_page(&url).await?;
            self.pages_fetched = self.pages_fetched.saturating_add(1);
            let items = extract_items(body, self.items_field)?;
            self.next = next;
            debug!(
                page = self.pages_fetched,
                items = items.len(),
                has_next = self.next.is_some(),
                "fetched page"
            );
            self.buffered.extend(items);
        }
    }

    /// Drains the sequence into a vector.
    ///
    /// # Errors
    ///
    /// Returns the first [`TransportError`]; items collected before the
    /// failure are discarded.
    pub async fn try_collect(mut self) -> Result<Vec<Value>, TransportError> {
        let mut items = Vec::new();
        while let Some(item) = self.next_item().await? {
            items.push(item);
        }
        Ok(items)
    }
}

fn extract_items(body: Value, field: Option<&str>) -> Result<Vec<Value>, TransportError> {
    let list = match field {
        Some(name) => match body {
            Value::Object(mut object) => object.remove(name).unwrap_or(Value::Null),
            _ => Value::Null,
        },
        None => body,
    };
    match list {
        Value::Array(items) => Ok(items),
        Value::Null if field.is_none() => Ok(Vec::new()),
        other => Err(TransportError::Decode {
            message: format!(
                "expected a JSON array{}, found {}",
                field.map(|name| format!(" in `{name}`")).unwrap_or_default(),
                json_kind(&other)
            ),
        }),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
