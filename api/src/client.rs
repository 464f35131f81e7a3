use crate::MatchRecord;
use crate::normalize::Normalizer;
use async_trait::async_trait;
use log::debug;
use reqwest::header::CACHE_CONTROL;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const LIVE_PATH: &str = "/live";
const UPCOMING_PATH: &str = "/upcoming";

/// The proxy has been deployed under each of these prefixes. A 404 on one
/// moves on to the next; any other answer is final.
const ROUTE_PREFIXES: [&str; 3] = ["", "/api", "/v1"];

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("network error for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status {status} for {url}")]
    Status { url: String, status: StatusCode },

    /// HTTP 429 or a rate-limit marker in an otherwise successful body.
    #[error("rate limited by {url}")]
    RateLimited { url: String },

    #[error("upstream error from {url}: {message}")]
    Upstream { url: String, message: String },

    #[error("parse error for {url}: {source}")]
    Parsing {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ApiError::RateLimited { .. })
    }

    fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

/// Where a poll cycle gets its records from.
#[async_trait]
pub trait BoardSource: Send + Sync {
    async fn fetch_live(&self) -> ApiResult<Vec<MatchRecord>>;
    async fn fetch_upcoming(&self, hours: u32) -> ApiResult<Vec<MatchRecord>>;
}

/// Client for the match proxy.
#[derive(Debug, Clone)]
pub struct BoardApi {
    client: Client,
    base_url: String,
    normalizer: Normalizer,
}

impl BoardApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::builder()
                .user_agent(concat!("esports-board/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            normalizer: Normalizer::default(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Matches currently in progress.
    pub async fn fetch_live(&self) -> ApiResult<Vec<MatchRecord>> {
        let items = self.get_items(LIVE_PATH).await?;
        Ok(self.normalizer.normalize_batch(&items, true))
    }

    /// Matches starting within the next `hours`.
    pub async fn fetch_upcoming(&self, hours: u32) -> ApiResult<Vec<MatchRecord>> {
        let items = self
            .get_items(&format!("{UPCOMING_PATH}?hours={hours}"))
            .await?;
        Ok(self.normalizer.normalize_batch(&items, false))
    }

    async fn get_items(&self, path: &str) -> ApiResult<Vec<Value>> {
        let mut last_error = None;
        for prefix in ROUTE_PREFIXES {
            let url = format!("{}{prefix}{path}", self.base_url);
            match self.get(&url).await {
                Err(e) if e.is_not_found() => {
                    debug!("{url} not found, trying next route");
                    last_error = Some(e);
                }
                other => return other,
            }
        }
        Err(last_error.unwrap_or_else(|| ApiError::Status {
            url: format!("{}{path}", self.base_url),
            status: StatusCode::NOT_FOUND,
        }))
    }

    async fn get(&self, url: &str) -> ApiResult<Vec<Value>> {
        let response = self
            .client
            .get(url)
            .timeout(REQUEST_TIMEOUT)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| ApiError::Network { url: url.to_owned(), source: e })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited { url: url.to_owned() });
        }
        if !status.is_success() {
            return Err(ApiError::Status { url: url.to_owned(), status });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network { url: url.to_owned(), source: e })?;
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| ApiError::Parsing { url: url.to_owned(), source: e })?;
        decode_envelope(url, value)
    }
}

#[async_trait]
impl BoardSource for BoardApi {
    async fn fetch_live(&self) -> ApiResult<Vec<MatchRecord>> {
        BoardApi::fetch_live(self).await
    }

    async fn fetch_upcoming(&self, hours: u32) -> ApiResult<Vec<MatchRecord>> {
        BoardApi::fetch_upcoming(self, hours).await
    }
}

/// `RATE_LIMITED`, "Rate limit exceeded", "rate-limit" and "too many requests"
/// all count; any other message mentioning "rate" (generate, accurate) does not.
fn is_rate_limit_marker(message: &str) -> bool {
    let normalized: String = message
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    ["RATE_LIMIT", "RATELIMIT", "TOO_MANY_REQUESTS"]
        .iter()
        .any(|marker| normalized.contains(marker))
}

/// Pull the match array out of a response body.
///
/// Accepts `{ items: [...] }`, `{ data: [...] }` or a bare array. A non-null
/// `error` field turns the whole body into an error, even on HTTP 200.
fn decode_envelope(url: &str, value: Value) -> ApiResult<Vec<Value>> {
    if let Some(marker) = value.get("error")
        && !marker.is_null()
    {
        let message = marker
            .as_str()
            .map(str::to_owned)
            .unwrap_or_else(|| marker.to_string());
        if is_rate_limit_marker(&message) {
            return Err(ApiError::RateLimited { url: url.to_owned() });
        }
        return Err(ApiError::Upstream { url: url.to_owned(), message });
    }

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => items,
            _ => match map.remove("data") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
        },
        _ => Vec::new(),
    };
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[test]
    fn envelope_accepts_items_data_and_bare_arrays() {
        let items = decode_envelope("u", json!({ "items": [{ "id": 1 }] })).unwrap();
        assert_eq!(items.len(), 1);
        let items = decode_envelope("u", json!({ "data": [{ "id": 1 }, { "id": 2 }] })).unwrap();
        assert_eq!(items.len(), 2);
        let items = decode_envelope("u", json!([{ "id": 1 }])).unwrap();
        assert_eq!(items.len(), 1);
        let items = decode_envelope("u", json!({ "something": "else" })).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn envelope_error_markers() {
        let err = decode_envelope("u", json!({ "error": "RATE_LIMITED" })).unwrap_err();
        assert!(err.is_rate_limited());
        let err = decode_envelope("u", json!({ "error": "Rate limit exceeded", "items": [] })).unwrap_err();
        assert!(err.is_rate_limited());
        let err = decode_envelope("u", json!({ "error": "GRID_UNAVAILABLE" })).unwrap_err();
        assert!(matches!(err, ApiError::Upstream { ref message, .. } if message == "GRID_UNAVAILABLE"));
        assert!(decode_envelope("u", json!({ "error": null, "items": [] })).is_ok());

        for marker in ["rate-limited", "RateLimit reached", "Too Many Requests"] {
            assert!(decode_envelope("u", json!({ "error": marker })).unwrap_err().is_rate_limited(), "{marker}");
        }
        for message in ["Failed to generate response", "inaccurate data", "MODERATED"] {
            let err = decode_envelope("u", json!({ "error": message })).unwrap_err();
            assert!(!err.is_rate_limited(), "{message}");
        }
    }

    #[tokio::test]
    async fn upcoming_end_to_end() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/upcoming")
            .match_query(Matcher::UrlEncoded("hours".into(), "24".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"items":[{"id":"1","startTimeScheduled":"2024-01-01T00:00:00Z","format":{"id":3},"teams":[{"name":"A"},{"name":"B"}]}]}"#,
            )
            .create_async()
            .await;

        let api = BoardApi::new(server.url());
        let records = api.fetch_upcoming(24).await.unwrap();
        mock.assert_async().await;

        assert_eq!(records.len(), 1);
        let card = &records[0];
        assert_eq!(card.id, "1");
        assert_eq!(card.event_label(), "—");
        assert_eq!(card.format, "BO3");
        assert_eq!(card.home().name, "A");
        assert_eq!(card.away().name, "B");
        assert!(!card.live);
        assert!(card.scores.is_none());
        assert!(card.teams.iter().all(|t| t.display_score().is_none()));
    }

    #[tokio::test]
    async fn live_records_are_flagged_live() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/live")
            .with_status(200)
            .with_body(r#"{"items":[{"id":"7","teams":[{"name":"A","score":1},{"name":"B"}]}]}"#)
            .create_async()
            .await;

        let records = BoardApi::new(server.url()).fetch_live().await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].live);
        assert_eq!(records[0].home().display_score(), Some(1));
    }

    #[tokio::test]
    async fn falls_back_to_prefixed_routes_on_404() {
        let mut server = mockito::Server::new_async().await;
        let root = server.mock("GET", "/live").with_status(404).create_async().await;
        let api_prefixed = server
            .mock("GET", "/api/live")
            .with_status(200)
            .with_body(r#"{"data":[{"seriesId":"s1"}]}"#)
            .create_async()
            .await;

        let records = BoardApi::new(format!("{}/", server.url()))
            .fetch_live()
            .await
            .unwrap();
        root.assert_async().await;
        api_prefixed.assert_async().await;
        assert_eq!(records[0].id, "s1");
    }

    #[tokio::test]
    async fn other_statuses_do_not_fall_through() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/live").with_status(502).create_async().await;
        let prefixed = server
            .mock("GET", "/api/live")
            .with_status(200)
            .with_body("[]")
            .expect(0)
            .create_async()
            .await;

        let err = BoardApi::new(server.url()).fetch_live().await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status, .. } if status == StatusCode::BAD_GATEWAY));
        prefixed.assert_async().await;
    }

    #[tokio::test]
    async fn every_route_404_reports_not_found() {
        let mut server = mockito::Server::new_async().await;
        for path in ["/live", "/api/live", "/v1/live"] {
            server.mock("GET", path).with_status(404).create_async().await;
        }
        let err = BoardApi::new(server.url()).fetch_live().await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn http_429_is_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/live").with_status(429).create_async().await;
        let err = BoardApi::new(server.url()).fetch_live().await.unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn malformed_body_is_a_parse_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/live")
            .with_status(200)
            .with_body("<html>bad gateway</html>")
            .create_async()
            .await;
        let err = BoardApi::new(server.url()).fetch_live().await.unwrap_err();
        assert!(matches!(err, ApiError::Parsing { .. }));
    }
}
