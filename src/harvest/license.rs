//! License detection by cloning the default branch and scanning the tree.

use super::client::RestClient;
use super::git::{clone_url, RepoCloner};
use crate::types::record::RepoCoords;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const LICENSE_FILE_NAMES: [&str; 6] = [
    "license",
    "license.txt",
    "license.md",
    "copying",
    "copying.txt",
    "unlicense",
];

pub const README_KEYWORDS: [&str; 15] = [
    "license",
    "licence",
    "mit license",
    "mit licence",
    "apache license",
    "apache licence",
    "gpl",
    "bsd license",
    "bsd licence",
    "lgpl",
    "mozilla public license",
    "mozilla public licence",
    "unlicense",
    "isc license",
    "isc licence",
];

const FALLBACK_BRANCH: &str = "main";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseEvidence {
    LicenseFile(PathBuf),
    ReadmeMention(PathBuf),
    PackageManifest(PathBuf),
}

/// First file in name order that confirms a license. `.git` is not walked.
pub fn scan_for_license(root: &Path) -> std::io::Result<Option<LicenseEvidence>> {
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git");

    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(evidence) = inspect_file(entry.path())? {
            return Ok(Some(evidence));
        }
    }
    Ok(None)
}

fn inspect_file(path: &Path) -> std::io::Result<Option<LicenseEvidence>> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if LICENSE_FILE_NAMES.contains(&name.as_str()) {
        if std::fs::metadata(path)?.len() > 0 {
            return Ok(Some(LicenseEvidence::LicenseFile(path.to_path_buf())));
        }
        return Ok(None);
    }

    if name == "readme" || name.starts_with("readme.") {
        let content = String::from_utf8_lossy(&std::fs::read(path)?).to_lowercase();
        if README_KEYWORDS.iter().any(|keyword| content.contains(keyword)) {
            return Ok(Some(LicenseEvidence::ReadmeMention(path.to_path_buf())));
        }
        return Ok(None);
    }

    if name == "package.json" {
        let raw = std::fs::read_to_string(path)?;
        let declared = match serde_json::from_str::<Value>(&raw) {
            Ok(manifest) => manifest_declares_license(&manifest),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping unparseable package.json");
                false
            }
        };
        if declared {
            return Ok(Some(LicenseEvidence::PackageManifest(path.to_path_buf())));
        }
    }

    Ok(None)
}

fn manifest_declares_license(manifest: &Value) -> bool {
    match manifest.get("license") {
        None | Some(Value::Null) => false,
        Some(Value::String(license)) => !license.trim().is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

pub async fn default_branch(client: &RestClient, coords: &RepoCoords) -> String {
    let path = format!("/repos/{}/{}", coords.owner, coords.repo);
    match client.github_json(&path, &[]).await {
        Ok(repo) => repo
            .get("default_branch")
            .and_then(Value::as_str)
            .filter(|branch| !branch.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| FALLBACK_BRANCH.to_string()),
        Err(e) => {
            debug!(repo = %coords, error = %e, "default branch lookup failed, assuming main");
            FALLBACK_BRANCH.to_string()
        }
    }
}

/// `true` when the default branch carries license evidence. Clone, timeout
/// and filesystem failures all count as no license. The scratch directory
/// is removed on every path.
pub async fn detect_license(
    client: &RestClient,
    cloner: &dyn RepoCloner,
    coords: &RepoCoords,
    clone_timeout: Duration,
) -> bool {
    let branch = default_branch(client, coords).await;

    let scratch = match tempfile::Builder::new().prefix("pkgscore-clone-").tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            warn!(repo = %coords, error = %e, "could not create clone directory, license 0");
            return false;
        }
    };
    let checkout = scratch.path().join("checkout");

    let url = clone_url(&coords.owner, &coords.repo);
    let cloned = tokio::time::timeout(clone_timeout, cloner.shallow_clone(&url, &branch, &checkout)).await;

    let found = match cloned {
        Ok(Ok(())) => {
            let root = checkout.clone();
            match tokio::task::spawn_blocking(move || scan_for_license(&root)).await {
                Ok(Ok(evidence)) => {
                    debug!(repo = %coords, evidence = ?evidence, "license scan finished");
                    evidence.is_some()
                }
                Ok(Err(e)) => {
                    warn!(repo = %coords, error = %e, "license scan failed, license 0");
                    false
                }
                Err(e) => {
                    warn!(repo = %coords, error = %e, "license scan task failed, license 0");
                    false
                }
            }
        }
        Ok(Err(e)) => {
            warn!(repo = %coords, error = %e, "clone failed, license 0");
            false
        }
        Err(_) => {
            warn!(repo = %coords, timeout_secs = clone_timeout.as_secs(), "clone timed out, license 0");
            false
        }
    };

    if let Err(e) = scratch.close() {
        warn!(repo = %coords, error = %e, "could not remove clone directory");
    }
    found
}
