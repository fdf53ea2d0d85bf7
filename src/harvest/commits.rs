use super::client::RestClient;
use super::paginate::{offset_all, PER_PAGE};
use super::window::HarvestWindow;
use crate::error::{PkgScoreError, Result};
use crate::types::record::RepoCoords;
use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

const TOP_CONTRIBUTORS: usize = 3;

#[derive(Debug, Deserialize)]
struct Contributor {
    login: Option<String>,
}

/// Logins of the first three contributors, in API order (most contributions
/// first). Anonymous entries have no login and are skipped.
pub async fn top_contributors(client: &RestClient, coords: &RepoCoords) -> Result<Vec<String>> {
    let path = format!("/repos/{}/{}/contributors", coords.owner, coords.repo);
    let per_page = PER_PAGE.to_string();
    let payload = client
        .github_json(&path, &[("per_page", per_page.as_str())])
        .await?;

    let contributors: Vec<Contributor> = match payload {
        Value::Null => Vec::new(),
        Value::Array(_) => serde_json::from_value(payload)
            .map_err(|e| PkgScoreError::malformed(&path, e.to_string()))?,
        _ => {
            return Err(PkgScoreError::malformed(
                &path,
                "expected a JSON array of contributors",
            ))
        }
    };

    Ok(contributors
        .into_iter()
        .filter_map(|contributor| contributor.login)
        .filter(|login| !login.is_empty())
        .take(TOP_CONTRIBUTORS)
        .collect())
}

/// Commits authored in the window by the top three contributors, summed.
pub async fn top3_commits(
    client: &RestClient,
    coords: &RepoCoords,
    window: &HarvestWindow,
) -> Result<u64> {
    let path = format!("/repos/{}/{}/commits", coords.owner, coords.repo);
    let since = window.since_param();
    let mut total = 0u64;

    for login in top_contributors(client, coords).await? {
        let commits: Vec<IgnoredAny> = offset_all(
            client,
            &path,
            &[("author", login.as_str()), ("since", since.as_str())],
        )
        .await?;
        debug!(repo = %coords, author = %login, commits = commits.len(), "contributor commits");
        total += commits.len() as u64;
    }

    Ok(total)
}

pub async fn commits_past_year(
    client: &RestClient,
    coords: &RepoCoords,
    window: &HarvestWindow,
) -> Result<u64> {
    let path = format!("/repos/{}/{}/commits", coords.owner, coords.repo);
    let since = window.since_param();
    let commits: Vec<IgnoredAny> =
        offset_all(client, &path, &[("since", since.as_str())]).await?;
    Ok(commits.len() as u64)
}
