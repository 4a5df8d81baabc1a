//! HTTP JSON search adapter.
//!
//! Talks to any endpoint of the form
//! `GET {endpoint}?q=<query>&limit=<n>` answering
//! `{ "results": [{ "title", "content" | "snippet", "url"?, "score"? }] }`.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Result, SourceError};
use crate::knowledge::RetrievedKnowledge;
use crate::source::{KnowledgeSource, SourceKind};

/// Seconds to wait when a 429 carries no usable `retry-after`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Knowledge source backed by an HTTP search endpoint.
pub struct HttpSource {
    /// Source name, used as the result label.
    name: String,

    /// Source category.
    kind: SourceKind,

    /// Search endpoint URL.
    endpoint: String,

    /// Optional bearer token.
    api_key: Option<String>,

    /// HTTP client.
    client: reqwest::Client,
}

impl HttpSource {
    /// Create a new HTTP source.
    pub fn new(name: impl Into<String>, kind: SourceKind, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            endpoint: endpoint.into(),
            api_key: None,
            client: reqwest::Client::new(),
        }
    }

    /// Set the API key sent as a bearer token.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Use a preconfigured HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// The search endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl std::fmt::Debug for HttpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSource")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("endpoint", &self.endpoint)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

#[async_trait]
impl KnowledgeSource for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        !self.endpoint.trim().is_empty()
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<RetrievedKnowledge>> {
        if !self.is_available() {
            return Err(SourceError::NotConfigured(format!(
                "{} has no endpoint",
                self.name
            )));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        debug!("Querying {} for {query:?} (limit {limit})", self.name);

        let limit_param = limit.to_string();
        let mut request = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("limit", limit_param.as_str())]);
        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = request.send().await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);

            return Err(SourceError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SourceError::ApiRequest(format!("{status}: {error_text}")));
        }

        let body = response.bytes().await?;
        let parsed: SearchResponse = serde_json::from_slice(&body)
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;

        let results = to_knowledge(&self.name, parsed.results, limit);
        info!("{} returned {} results", self.name, results.len());
        Ok(results)
    }
}

/// Convert wire hits into results, assigning rank-based scores where the
/// endpoint gave none.
fn to_knowledge(label: &str, hits: Vec<SearchHit>, limit: usize) -> Vec<RetrievedKnowledge> {
    let total = hits.len().min(limit);
    hits.into_iter()
        .take(limit)
        .enumerate()
        .map(|(rank, hit)| {
            let fallback = (total - rank) as f32 / total as f32;
            RetrievedKnowledge {
                source_label: label.to_string(),
                title: hit.title,
                content: hit.content.or(hit.snippet).unwrap_or_default(),
                relevance_score: hit.score.unwrap_or(fallback),
                url: hit.url,
            }
        })
        .collect()
}

/// Search endpoint response format.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    score: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(server: &MockServer) -> HttpSource {
        HttpSource::new(
            "swift-forums",
            SourceKind::Community,
            format!("{}/search", server.uri()),
        )
    }

    #[tokio::test]
    async fn test_fetch_parses_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "async let"))
            .and(query_param("limit", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    { "title": "Structured concurrency", "content": "Use async let", "url": "https://example.com/a", "score": 0.9 },
                    { "title": "Task groups", "snippet": "withTaskGroup", "score": 0.4 }
                ]
            })))
            .mount(&server)
            .await;

        let results = source(&server).fetch("async let", 3).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source_label, "swift-forums");
        assert_eq!(results[0].url.as_deref(), Some("https://example.com/a"));
        assert_eq!(results[0].relevance_score, 0.9);
        assert_eq!(results[1].content, "withTaskGroup");
        assert_eq!(results[1].url, None);
    }

    #[tokio::test]
    async fn test_missing_scores_are_rank_based() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    { "title": "one", "content": "" },
                    { "title": "two", "content": "" },
                    { "title": "three", "content": "" },
                    { "title": "four", "content": "" }
                ]
            })))
            .mount(&server)
            .await;

        let results = source(&server).fetch("anything", 2).await.unwrap();
        let scores: Vec<f32> = results.iter().map(|r| r.relevance_score).collect();
        assert_eq!(scores, vec![1.0, 0.5]);
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "results": [] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let results = source(&server)
            .with_api_key("secret")
            .fetch("q", 5)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "12"))
            .mount(&server)
            .await;

        let err = source(&server).fetch("q", 5).await.unwrap_err();
        assert!(matches!(
            err,
            SourceError::RateLimited {
                retry_after_secs: 12
            }
        ));
    }

    #[tokio::test]
    async fn test_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let err = source(&server).fetch("q", 5).await.unwrap_err();
        assert!(matches!(err, SourceError::ApiRequest(msg) if msg.contains("down")));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = source(&server).fetch("q", 5).await.unwrap_err();
        assert!(matches!(err, SourceError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_unconfigured_source() {
        let source = HttpSource::new("empty", SourceKind::PackageIndex, "  ");
        assert!(!source.is_available());
        assert!(matches!(
            source.fetch("q", 5).await,
            Err(SourceError::NotConfigured(_))
        ));
    }
}
