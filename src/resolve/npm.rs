use super::parse_github_url;
use crate::error::{PkgScoreError, Result};
use crate::harvest::client::RestClient;
use crate::types::record::RepoCoords;
use serde_json::Value;
use tracing::debug;

pub async fn lookup(client: &RestClient, input: &str, name: &str) -> Result<RepoCoords> {
    let document = client.npm_package(name).await.map_err(|e| {
        PkgScoreError::resolution(input, format!("registry lookup for {name} failed: {e}"))
    })?;
    find_github_repo(&document).ok_or_else(|| {
        PkgScoreError::resolution(input, format!("no GitHub repository listed for {name}"))
    })
}

/// First candidate URL that normalizes to a GitHub repository.
pub fn find_github_repo(document: &Value) -> Option<RepoCoords> {
    candidate_urls(document).into_iter().find_map(|raw| {
        let normalized = normalize_repo_url(&raw);
        debug!(candidate = %raw, normalized = %normalized, "npm repository candidate");
        parse_github_url(&normalized)
    })
}

/// Repository, homepage and bug-tracker URLs, top-level first, then those of
/// the version `dist-tags.latest` points at.
pub fn candidate_urls(document: &Value) -> Vec<String> {
    let mut candidates = package_fields(document);
    let latest = document
        .get("dist-tags")
        .and_then(|tags| tags.get("latest"))
        .and_then(Value::as_str);
    if let Some(version) = latest.and_then(|latest| document.get("versions")?.get(latest)) {
        candidates.extend(package_fields(version));
    }
    candidates
}

fn package_fields(object: &Value) -> Vec<String> {
    [
        string_or_url(object.get("repository")),
        object
            .get("homepage")
            .and_then(Value::as_str)
            .map(str::to_string),
        string_or_url(object.get("bugs")),
    ]
    .into_iter()
    .flatten()
    .filter(|url| !url.trim().is_empty())
    .collect()
}

fn string_or_url(field: Option<&Value>) -> Option<String> {
    match field? {
        Value::String(url) => Some(url.clone()),
        Value::Object(map) => map.get("url").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

pub fn normalize_repo_url(raw: &str) -> String {
    let mut url = raw.trim();
    url = url.strip_prefix("git+").unwrap_or(url);
    url = url.strip_suffix(".git").unwrap_or(url);

    if let Some(rest) = url.strip_prefix("github:") {
        return format!("https://github.com/{rest}");
    }
    if let Some(rest) = url.strip_prefix("ssh://git@") {
        return format!("https://{rest}");
    }
    if let Some(rest) = url.strip_prefix("git@") {
        return format!("https://{}", rest.replacen(':', "/", 1));
    }
    if let Some(rest) = url.strip_prefix("git://") {
        return format!("https://{rest}");
    }
    if !url.contains("://") {
        return format!("https://{url}");
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::testing::{test_config, FakeTransport};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn normalize_handles_common_repository_spellings() {
        let cases = [
            ("git+https://github.com/o/r.git", "https://github.com/o/r"),
            ("git@github.com:o/r.git", "https://github.com/o/r"),
            ("git://github.com/o/r.git", "https://github.com/o/r"),
            ("git+ssh://git@github.com/o/r.git", "https://github.com/o/r"),
            ("github.com/o/r", "https://github.com/o/r"),
            ("github:o/r", "https://github.com/o/r"),
            ("https://github.com/o/r", "https://github.com/o/r"),
        ];
        for (raw, expected) in cases {
            assert_eq!(normalize_repo_url(raw), expected, "{raw}");
        }
    }

    #[test]
    fn repository_field_wins_over_homepage_and_bugs() {
        let document = json!({
            "repository": { "type": "git", "url": "git+https://github.com/first/repo.git" },
            "homepage": "https://github.com/second/repo#readme",
            "bugs": { "url": "https://github.com/third/repo/issues" }
        });
        assert_eq!(find_github_repo(&document), Some(RepoCoords::new("first", "repo")));
    }

    #[test]
    fn falls_through_homepage_then_bugs() {
        let homepage_only = json!({
            "repository": { "type": "git", "url": "https://gitlab.com/a/b.git" },
            "homepage": "https://github.com/home/page#readme",
            "bugs": { "url": "https://github.com/bug/tracker/issues" }
        });
        assert_eq!(
            find_github_repo(&homepage_only),
            Some(RepoCoords::new("home", "page"))
        );

        let bugs_only = json!({
            "homepage": "https://example.com",
            "bugs": { "url": "https://github.com/bug/tracker/issues" }
        });
        assert_eq!(
            find_github_repo(&bugs_only),
            Some(RepoCoords::new("bug", "tracker"))
        );
    }

    #[test]
    fn latest_version_fields_come_after_top_level_fields() {
        let document = json!({
            "dist-tags": { "latest": "2.0.0" },
            "versions": {
                "1.0.0": { "repository": "git://github.com/old/repo.git" },
                "2.0.0": {
                    "repository": { "url": "https://example.com/not-github" },
                    "homepage": "https://example.com",
                    "bugs": "https://github.com/latest/bugs/issues"
                }
            }
        });
        assert_eq!(
            candidate_urls(&document),
            vec![
                "https://example.com/not-github".to_string(),
                "https://example.com".to_string(),
                "https://github.com/latest/bugs/issues".to_string(),
            ]
        );
        assert_eq!(
            find_github_repo(&document),
            Some(RepoCoords::new("latest", "bugs"))
        );
    }

    #[test]
    fn no_github_candidate_yields_none() {
        let document = json!({ "homepage": "https://example.com" });
        assert_eq!(find_github_repo(&document), None);
    }

    #[tokio::test]
    async fn lookup_reports_resolution_failure_when_registry_misses() {
        let fake = Arc::new(FakeTransport::new());
        let client = RestClient::new(fake, &test_config(), None);

        let err = lookup(&client, "https://www.npmjs.com/package/ghost", "ghost")
            .await
            .expect_err("unknown package should fail");
        assert!(matches!(err, PkgScoreError::ResolutionFailed { .. }));
        assert!(err.to_string().contains("registry lookup"));
    }

    #[tokio::test]
    async fn lookup_reports_resolution_failure_without_github_candidate() {
        let fake = Arc::new(FakeTransport::new().route(
            "https://registry.npmjs.org/@scope%2Flocal",
            &[],
            200,
            r#"{"name":"@scope/local","homepage":"https://example.com"}"#,
        ));
        let client = RestClient::new(fake, &test_config(), None);

        let err = lookup(&client, "https://www.npmjs.com/package/@scope/local", "@scope/local")
            .await
            .expect_err("package without github link should fail");
        assert!(err.to_string().contains("no GitHub repository"));
    }
}
