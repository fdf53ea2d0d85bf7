use crate::error::PkgScoreError;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScorerConfig {
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub npm: NpmConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_github_api")]
    pub api_base: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: default_github_api(),
            token_env: default_token_env(),
        }
    }
}

fn default_github_api() -> String {
    "https://api.github.com".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct NpmConfig {
    #[serde(default = "default_registry")]
    pub registry_base: String,
    #[serde(default = "default_downloads")]
    pub downloads_base: String,
}

impl Default for NpmConfig {
    fn default() -> Self {
        Self {
            registry_base: default_registry(),
            downloads_base: default_downloads(),
        }
    }
}

fn default_registry() -> String {
    "https://registry.npmjs.org".to_string()
}

fn default_downloads() -> String {
    "https://api.npmjs.org".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_clone_timeout_secs")]
    pub clone_timeout_secs: u64,
    #[serde(default = "default_min_interval_ms")]
    pub min_request_interval_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            clone_timeout_secs: default_clone_timeout_secs(),
            min_request_interval_ms: default_min_interval_ms(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_clone_timeout_secs() -> u64 {
    120
}

fn default_min_interval_ms() -> u64 {
    100
}

fn default_user_agent() -> String {
    format!("pkgscore/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    pub database: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            database: None,
        }
    }
}

fn default_concurrency() -> usize {
    4
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_timeout_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }
}

impl ScorerConfig {
    /// Reads the GitHub token from the configured environment variable.
    /// An unset or blank variable means unauthenticated requests.
    pub fn github_token(&self) -> Option<String> {
        std::env::var(&self.github.token_env)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }

    pub fn validate(&self) -> Result<(), PkgScoreError> {
        if self.run.concurrency == 0 {
            return Err(PkgScoreError::ConfigParse(
                "run.concurrency must be at least 1".to_string(),
            ));
        }
        if self.http.timeout_secs == 0 || self.http.clone_timeout_secs == 0 {
            return Err(PkgScoreError::ConfigParse(
                "http timeouts must be greater than zero".to_string(),
            ));
        }

        let bases = [
            ("github.api_base", &self.github.api_base),
            ("npm.registry_base", &self.npm.registry_base),
            ("npm.downloads_base", &self.npm.downloads_base),
        ];
        for (key, value) in bases {
            let parsed = url::Url::parse(value)
                .map_err(|e| PkgScoreError::ConfigParse(format!("{key}: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(PkgScoreError::ConfigParse(format!(
                    "{key} must be an http(s) URL (found {value})"
                )));
            }
        }

        Ok(())
    }
}
