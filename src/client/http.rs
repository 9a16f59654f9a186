use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use playground_common::{
    ErrorBody, HealthResponse, Idea, IdeaFilters, IdeaPatch, IdeaRecord, IdeasResponse,
    MessageResponse, NewIdea, ReorderRequest, TitleValidation, ValidateTitleRequest,
};
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::cache::ResponseCache;
use crate::errors::ClientError;

/// Configuration for `PlaygroundClient`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server root, e.g. `http://127.0.0.1:8080`. No trailing slash needed.
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Typed client for the Idea Playground REST API.
///
/// Unfiltered idea lists and the dimensions registry are served from the
/// shared `ResponseCache` when present. Every successful mutation clears it.
#[derive(Clone)]
pub struct PlaygroundClient {
    base_url: String,
    base: Url,
    http: reqwest::Client,
    cache: Arc<ResponseCache>,
}

impl PlaygroundClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_config(ClientConfig {
            base_url: base_url.into(),
            ..Default::default()
        })
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, ClientError> {
        Self::with_cache(config, Arc::new(ResponseCache::new()))
    }

    /// Build a client around an existing cache, so several clients (or a
    /// test) can observe the same cache.
    pub fn with_cache(config: ClientConfig, cache: Arc<ResponseCache>) -> Result<Self, ClientError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let base = Url::parse(&base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ClientError::InvalidBaseUrl {
                url: base_url.clone(),
            })?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("idea-playground/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url,
            base,
            http,
            cache,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/api/ideas/{id}` with `id` percent-encoded as a single segment.
    fn idea_url(&self, id: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["api", "ideas", id]);
        }
        url
    }

    // ── Reads ─────────────────────────────────────────────────────────

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        send(self.http.get(self.url("/health"))).await
    }

    /// All ideas keyed by id, from the cache when available.
    pub async fn list_ideas(&self) -> Result<BTreeMap<String, Idea>, ClientError> {
        if let Some(ideas) = self.cache.ideas().await {
            debug!(count = ideas.len(), "Ideas served from cache");
            return Ok(ideas);
        }
        let response: IdeasResponse = send(self.http.get(self.url("/api/ideas"))).await?;
        self.cache.store_ideas(response.ideas.clone()).await;
        Ok(response.ideas)
    }

    /// Server-side filtered list. Never cached.
    pub async fn list_ideas_filtered(
        &self,
        filters: &IdeaFilters,
    ) -> Result<BTreeMap<String, Idea>, ClientError> {
        if filters.is_empty() {
            return self.list_ideas().await;
        }
        let response: IdeasResponse =
            send(self.http.get(self.url("/api/ideas")).query(filters)).await?;
        Ok(response.ideas)
    }

    pub async fn get_idea(&self, id: &str) -> Result<IdeaRecord, ClientError> {
        send(self.http.get(self.idea_url(id))).await
    }

    /// Dimensions registry, from the cache when available.
    pub async fn dimensions(&self) -> Result<Value, ClientError> {
        if let Some(registry) = self.cache.dimensions().await {
            return Ok(registry);
        }
        let registry: Value = send(self.http.get(self.url("/api/dimensions"))).await?;
        self.cache.store_dimensions(registry.clone()).await;
        Ok(registry)
    }

    pub async fn validate_title(
        &self,
        title: &str,
        exclude_id: Option<&str>,
    ) -> Result<TitleValidation, ClientError> {
        let body = ValidateTitleRequest {
            title: title.to_string(),
            exclude_id: exclude_id.map(str::to_string),
        };
        send(
            self.http
                .post(self.url("/api/ideas/validate-title"))
                .json(&body),
        )
        .await
    }

    // ── Mutations ─────────────────────────────────────────────────────

    pub async fn create_idea(&self, idea: &NewIdea) -> Result<IdeaRecord, ClientError> {
        let record: IdeaRecord = send(self.http.post(self.url("/api/ideas")).json(idea)).await?;
        self.cache.invalidate().await;
        Ok(record)
    }

    /// Partial update; returns the merged idea.
    pub async fn update_idea(&self, id: &str, patch: &IdeaPatch) -> Result<IdeaRecord, ClientError> {
        let record: IdeaRecord = send(
            self.http
                .put(self.idea_url(id))
                .json(patch),
        )
        .await?;
        self.cache.invalidate().await;
        Ok(record)
    }

    pub async fn delete_idea(&self, id: &str) -> Result<(), ClientError> {
        let _: MessageResponse =
            send(self.http.delete(self.idea_url(id))).await?;
        self.cache.invalidate().await;
        Ok(())
    }

    /// Batch reorder: `ids[i]` gets `order = i + 1`, all or nothing.
    pub async fn reorder(&self, ids: &[String]) -> Result<(), ClientError> {
        let body = ReorderRequest {
            reordered_ids: ids.to_vec(),
        };
        let _: MessageResponse =
            send(self.http.put(self.url("/api/ideas/reorder")).json(&body)).await?;
        self.cache.invalidate().await;
        Ok(())
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
    let response = request.send().await?;
    decode(response).await
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let bytes = response.bytes().await?;
    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorBody>(&bytes)
            .map(|body| body.error)
            .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }
    serde_json::from_slice(&bytes).map_err(ClientError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = PlaygroundClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.url("/health"), "http://localhost:8080/health");
    }

    #[test]
    fn test_idea_ids_are_encoded_as_one_segment() {
        let client = PlaygroundClient::new("http://localhost:8080").unwrap();
        assert_eq!(
            client.idea_url("abc-123").as_str(),
            "http://localhost:8080/api/ideas/abc-123"
        );
        assert_eq!(
            client.idea_url("a/b?c#d").as_str(),
            "http://localhost:8080/api/ideas/a%2Fb%3Fc%23d"
        );

        let prefixed = PlaygroundClient::new("http://localhost:8080/playground/").unwrap();
        assert_eq!(
            prefixed.idea_url("x").as_str(),
            "http://localhost:8080/playground/api/ideas/x"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let err = PlaygroundClient::new("not a url").err().unwrap();
        assert!(matches!(err, ClientError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn test_clients_can_share_a_cache() {
        let cache = Arc::new(ResponseCache::new());
        let a = PlaygroundClient::with_cache(ClientConfig::default(), cache.clone()).unwrap();
        let b = PlaygroundClient::with_cache(ClientConfig::default(), cache.clone()).unwrap();
        assert!(Arc::ptr_eq(a.cache(), b.cache()));
    }

    #[tokio::test]
    async fn test_cached_ideas_skip_the_network() {
        // Nothing listens on port 1; a network call would fail.
        let client = PlaygroundClient::new("http://127.0.0.1:1").unwrap();
        client.cache().store_ideas(BTreeMap::new()).await;
        let ideas = client.list_ideas().await.unwrap();
        assert!(ideas.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_http_error() {
        let client = PlaygroundClient::new("http://127.0.0.1:1").unwrap();
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, ClientError::Http(_)));
    }
}
