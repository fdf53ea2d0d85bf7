//! Rate-limited REST client shared by the resolver and every collector.
//!
//! The wire is abstracted behind [`Transport`] so collectors can be driven by
//! an in-memory fake in tests; [`ReqwestTransport`] is the production wire.

use crate::error::{PkgScoreError, Result};
use crate::types::config::{HttpConfig, ScorerConfig};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;

pub const GITHUB_JSON: &str = "application/vnd.github+json";
pub const GITHUB_RAW: &str = "application/vnd.github.raw+json";

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub accept: &'static str,
}

impl ApiRequest {
    #[cfg(test)]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(http: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(http.timeout())
            .user_agent(http.user_agent.clone())
            .build()
            .map_err(|e| PkgScoreError::Transport {
                url: "<client builder>".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut builder = self
            .client
            .get(&request.url)
            .query(&request.query)
            .header(reqwest::header::ACCEPT, request.accept);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        let transport_error = |e: reqwest::Error| PkgScoreError::Transport {
            url: request.url.clone(),
            reason: e.to_string(),
        };
        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;
        Ok(ApiResponse { status, body })
    }
}

pub struct RestClient {
    transport: Arc<dyn Transport>,
    github_api: String,
    npm_registry: String,
    npm_downloads: String,
    token: Option<String>,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RestClient {
    pub fn new(transport: Arc<dyn Transport>, config: &ScorerConfig, token: Option<String>) -> Self {
        Self {
            transport,
            github_api: config.github.api_base.trim_end_matches('/').to_string(),
            npm_registry: config.npm.registry_base.trim_end_matches('/').to_string(),
            npm_downloads: config.npm.downloads_base.trim_end_matches('/').to_string(),
            token,
            min_interval: config.http.min_request_interval(),
            last_request: Mutex::new(None),
        }
    }

    /// Spaces consecutive requests by at least `min_interval` across all tasks.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn fetch(&self, request: ApiRequest) -> Result<String> {
        self.throttle().await;
        debug!(url = %request.url, query = ?request.query, "GET");
        let url = request.url.clone();
        let response = self.transport.send(request).await?;
        if !(200..300).contains(&response.status) {
            return Err(PkgScoreError::HttpStatus {
                url,
                status: response.status,
            });
        }
        Ok(response.body)
    }

    async fn fetch_json(&self, request: ApiRequest) -> Result<Value> {
        let url = request.url.clone();
        let body = self.fetch(request).await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| PkgScoreError::malformed(&url, e.to_string()))
    }

    fn github_request(&self, path: &str, query: &[(&str, &str)], accept: &'static str) -> ApiRequest {
        ApiRequest {
            url: format!("{}{}", self.github_api, path),
            query: owned_query(query),
            bearer: self.token.clone(),
            accept,
        }
    }

    /// GET a GitHub API path (e.g. `/repos/o/r/commits`). Empty bodies such as
    /// `204 No Content` come back as `Value::Null`.
    pub async fn github_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        self.fetch_json(self.github_request(path, query, GITHUB_JSON))
            .await
    }

    /// GET a file body through the contents API's raw media type.
    pub async fn github_raw(&self, path: &str) -> Result<String> {
        self.fetch(self.github_request(path, &[], GITHUB_RAW)).await
    }

    pub async fn npm_package(&self, name: &str) -> Result<Value> {
        self.fetch_json(ApiRequest {
            url: format!("{}/{}", self.npm_registry, encode_package_name(name)),
            query: Vec::new(),
            bearer: None,
            accept: "application/json",
        })
        .await
    }

    pub async fn npm_downloads(&self, name: &str, period: &str) -> Result<Value> {
        self.fetch_json(ApiRequest {
            url: format!("{}/downloads/point/{}/{}", self.npm_downloads, period, name),
            query: Vec::new(),
            bearer: None,
            accept: "application/json",
        })
        .await
    }
}

fn owned_query(query: &[(&str, &str)]) -> Vec<(String, String)> {
    query
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Scoped names keep their `@` but encode the separating slash.
pub fn encode_package_name(name: &str) -> String {
    match name.strip_prefix('@') {
        Some(scoped) => format!("@{}", urlencoding::encode(scoped)),
        None => urlencoding::encode(name).into_owned(),
    }
}
