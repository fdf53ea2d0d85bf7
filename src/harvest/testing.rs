//! In-memory fakes for driving the harvester without network or git.

use super::client::{ApiRequest, ApiResponse, Transport};
use super::git::RepoCloner;
use crate::error::{PkgScoreError, Result};
use crate::types::config::ScorerConfig;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

pub fn test_config() -> ScorerConfig {
    let mut cfg = ScorerConfig::default();
    cfg.http.min_request_interval_ms = 0;
    cfg
}

struct FakeRoute {
    url: String,
    query: Vec<(String, String)>,
    status: u16,
    body: String,
}

/// Answers requests from a route table; unrouted requests get a 404.
/// When several routes match, the one pinning the most query pairs wins.
#[derive(Default)]
pub struct FakeTransport {
    routes: Vec<FakeRoute>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, query: &[(&str, &str)], status: u16, body: &str) -> Self {
        self.routes.push(FakeRoute {
            url: url.to_string(),
            query: query
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            status,
            body: body.to_string(),
        });
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().expect("request log lock").clone()
    }

    pub fn requests_to(&self, url: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.url == url)
            .collect()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.requests
            .lock()
            .expect("request log lock")
            .push(request.clone());

        let matched = self
            .routes
            .iter()
            .filter(|route| route.url == request.url)
            .filter(|route| {
                route
                    .query
                    .iter()
                    .all(|(key, value)| request.query_value(key) == Some(value.as_str()))
            })
            .max_by_key(|route| route.query.len());

        Ok(match matched {
            Some(route) => ApiResponse {
                status: route.status,
                body: route.body.clone(),
            },
            None => ApiResponse {
                status: 404,
                body: r#"{"message":"Not Found"}"#.to_string(),
            },
        })
    }
}

/// Builds a JSON array of `n` placeholder objects.
pub fn json_items(n: usize) -> String {
    let items = vec!["{}"; n];
    format!("[{}]", items.join(","))
}

/// "Clones" by writing a fixed set of files into the destination.
pub struct FakeCloner {
    files: Vec<(String, String)>,
    fail: bool,
    delay: Option<Duration>,
    clones: Mutex<Vec<(String, String, PathBuf)>>,
}

impl FakeCloner {
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(path, content)| (path.to_string(), content.to_string()))
                .collect(),
            fail: false,
            delay: None,
            clones: Mutex::new(Vec::new()),
        }
    }

    /// Creates the destination, then hangs for `delay` before writing files.
    pub fn stalling(delay: Duration) -> Self {
        Self {
            files: vec![("LICENSE".to_string(), "MIT".to_string())],
            fail: false,
            delay: Some(delay),
            clones: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            files: Vec::new(),
            fail: true,
            delay: None,
            clones: Mutex::new(Vec::new()),
        }
    }

    /// `(url, branch, dest)` of every clone attempt.
    pub fn clones(&self) -> Vec<(String, String, PathBuf)> {
        self.clones.lock().expect("clone log lock").clone()
    }
}

#[async_trait]
impl RepoCloner for FakeCloner {
    async fn shallow_clone(&self, url: &str, branch: &str, dest: &Path) -> Result<()> {
        self.clones
            .lock()
            .expect("clone log lock")
            .push((url.to_string(), branch.to_string(), dest.to_path_buf()));
        if self.fail {
            return Err(PkgScoreError::CloneFailed {
                url: url.to_string(),
                reason: "remote hung up".to_string(),
            });
        }
        std::fs::create_dir_all(dest)?;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        for (path, content) in &self.files {
            let target = dest.join(path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(target, content)?;
        }
        Ok(())
    }
}
