//! Reqwest-backed routing backend adapter.
//!
//! This adapter owns transport details only: URL construction, timeout,
//! HTTP error mapping and JSON decoding into domain records. It implements
//! both the route and the suggestion ports against the same base URL.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap};
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use super::dto::{RouteResponseDto, SuggestionResponseDto};
use crate::domain::ports::{
    AddressSuggestion, AddressSuggestionSource, AddressSuggestionSourceError, RouteFetchClient,
    RouteFetchError,
};
use crate::domain::{RouteQuery, RouteResult, UnitSystem};

const ROUTE_PATH: [&str; 2] = ["api", "route"];
const SUGGESTION_PATH: [&str; 2] = ["api", "searchahead"];
const FORMAT_PREVIEW_CHAR_LIMIT: usize = 200;

/// HTTP client for the routing backend.
pub struct RoutingHttpClient {
    client: Client,
    base_url: Url,
}

impl RoutingHttpClient {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// ```rust,ignore
    /// let client = RoutingHttpClient::new(Url::parse("http://localhost:8000")?, timeout)?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }
}

/// Append `segments` to `base`, keeping any path prefix `base` already has.
fn endpoint(base: &Url, segments: &[&str]) -> Option<Url> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut().ok()?.pop_if_empty().extend(segments);
    Some(url)
}

fn route_url(base: &Url, query: &RouteQuery) -> Option<Url> {
    let mut url = endpoint(base, &ROUTE_PATH)?;
    url.query_pairs_mut()
        .append_pair("from_addr", query.origin_text())
        .append_pair("to", query.destination_text())
        .append_pair("units", query.unit_system().as_str())
        .append_pair("route_type", query.mode().as_str());
    Some(url)
}

fn suggestion_url(base: &Url, text: &str, max_results: usize) -> Option<Url> {
    let mut url = endpoint(base, &SUGGESTION_PATH)?;
    url.query_pairs_mut()
        .append_pair("q", text)
        .append_pair("maxResults", &max_results.to_string());
    Some(url)
}

fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

fn is_json(content_type: &str) -> bool {
    content_type.contains("application/json")
}

#[async_trait]
impl RouteFetchClient for RoutingHttpClient {
    async fn fetch(&self, query: &RouteQuery) -> Result<RouteResult, RouteFetchError> {
        let url = route_url(&self.base_url, query).ok_or_else(|| {
            RouteFetchError::validation(format!("backend URL {} cannot carry a path", self.base_url))
        })?;
        debug!(url = %url, "requesting route");
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let content_type = content_type(response.headers());
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, &content_type, body.as_ref()));
        }
        parse_route(&content_type, body.as_ref(), query.unit_system())
    }
}

#[async_trait]
impl AddressSuggestionSource for RoutingHttpClient {
    async fn suggest(
        &self,
        text: &str,
        max_results: usize,
    ) -> Result<Vec<AddressSuggestion>, AddressSuggestionSourceError> {
        let url = suggestion_url(&self.base_url, text, max_results).ok_or_else(|| {
            AddressSuggestionSourceError::transport(format!(
                "backend URL {} cannot carry a path",
                self.base_url
            ))
        })?;
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|error| AddressSuggestionSourceError::transport(error.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|error| AddressSuggestionSourceError::transport(error.to_string()))?;
        if !status.is_success() {
            return Err(AddressSuggestionSourceError::transport(format!(
                "status {}",
                status.as_u16()
            )));
        }
        parse_suggestions(body.as_ref(), max_results)
    }
}

fn parse_route(
    content_type: &str,
    body: &[u8],
    requested: UnitSystem,
) -> Result<RouteResult, RouteFetchError> {
    if !is_json(content_type) {
        let preview: String = String::from_utf8_lossy(body)
            .chars()
            .take(FORMAT_PREVIEW_CHAR_LIMIT)
            .collect();
        return Err(RouteFetchError::format(format!(
            "unexpected non-JSON response from backend: {preview}"
        )));
    }
    let decoded: RouteResponseDto = serde_json::from_slice(body).map_err(|error| {
        RouteFetchError::format(format!("invalid route JSON payload: {error}"))
    })?;
    Ok(decoded.into_domain(requested))
}

fn parse_suggestions(
    body: &[u8],
    max_results: usize,
) -> Result<Vec<AddressSuggestion>, AddressSuggestionSourceError> {
    let decoded: SuggestionResponseDto = serde_json::from_slice(body).map_err(|error| {
        AddressSuggestionSourceError::decode(format!("invalid suggestion JSON payload: {error}"))
    })?;
    Ok(decoded.into_domain(max_results))
}

fn map_transport_error(error: reqwest::Error) -> RouteFetchError {
    if error.is_timeout() {
        RouteFetchError::network(format!("request timed out: {error}"))
    } else {
        RouteFetchError::network(error.to_string())
    }
}

/// Pick the most helpful message from an error response.
///
/// JSON bodies yield their `detail` (verbatim when a string, serialised
/// otherwise) or the whole body; other bodies yield their text; empty
/// bodies fall back to the status text.
fn map_status_error(status: StatusCode, content_type: &str, body: &[u8]) -> RouteFetchError {
    let from_json = is_json(content_type)
        .then(|| serde_json::from_slice::<serde_json::Value>(body).ok())
        .flatten()
        .and_then(|value| match value.get("detail") {
            Some(serde_json::Value::String(detail)) => Some(detail.clone()),
            Some(serde_json::Value::Null) | None => match &value {
                serde_json::Value::Object(fields) if fields.is_empty() => None,
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            },
            Some(detail) => Some(detail.to_string()),
        });
    let message = from_json
        .filter(|message| !message.trim().is_empty())
        .or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_owned();
            (!text.is_empty()).then_some(text)
        })
        .or_else(|| status.canonical_reason().map(str::to_owned))
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    RouteFetchError::backend(status.as_u16(), message)
}
