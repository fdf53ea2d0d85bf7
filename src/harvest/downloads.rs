use super::client::RestClient;
use crate::error::{PkgScoreError, Result};
use crate::types::record::RepoCoords;
use serde_json::Value;
use tracing::warn;

/// npm downloads over the last year for the package whose `package.json`
/// sits at the repository root. Every failure degrades to zero.
pub async fn yearly_downloads(client: &RestClient, coords: &RepoCoords) -> u64 {
    match fetch_yearly_downloads(client, coords).await {
        Ok(downloads) => downloads,
        Err(e) => {
            warn!(repo = %coords, error = %e, "downloads unavailable, using 0");
            0
        }
    }
}

async fn fetch_yearly_downloads(client: &RestClient, coords: &RepoCoords) -> Result<u64> {
    let path = format!("/repos/{}/{}/contents/package.json", coords.owner, coords.repo);
    let raw = client.github_raw(&path).await?;
    let manifest: Value =
        serde_json::from_str(&raw).map_err(|e| PkgScoreError::malformed(&path, e.to_string()))?;
    let name = manifest
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| PkgScoreError::malformed(&path, "package.json has no name"))?;

    let point = client.npm_downloads(name, "last-year").await?;
    point
        .get("downloads")
        .and_then(Value::as_u64)
        .ok_or_else(|| PkgScoreError::malformed("downloads/point", "missing downloads count"))
}
