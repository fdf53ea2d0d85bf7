pub mod npm;

use crate::error::{PkgScoreError, Result};
use crate::harvest::client::RestClient;
use crate::types::record::RepoCoords;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageUrl {
    GitHub(RepoCoords),
    Npm { name: String },
}

pub fn classify(input: &str) -> Result<PackageUrl> {
    if let Some(coords) = parse_github_url(input) {
        return Ok(PackageUrl::GitHub(coords));
    }
    if let Some(name) = parse_npm_url(input) {
        return Ok(PackageUrl::Npm { name });
    }
    Err(PkgScoreError::resolution(
        input,
        "not a GitHub repository or npm package URL",
    ))
}

/// Resolves any supported package URL to the GitHub repository behind it.
pub async fn resolve(client: &RestClient, input: &str) -> Result<RepoCoords> {
    match classify(input)? {
        PackageUrl::GitHub(coords) => Ok(coords),
        PackageUrl::Npm { name } => npm::lookup(client, input, &name).await,
    }
}

/// Extracts `{owner, repo}` from the first two path segments of a
/// `github.com` URL. Anything after them is ignored.
pub fn parse_github_url(input: &str) -> Option<RepoCoords> {
    let url = parse_loose(input)?;
    if !host_is(&url, "github.com") {
        return None;
    }
    let mut segments = url.path_segments()?.filter(|segment| !segment.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if repo.is_empty() {
        return None;
    }
    Some(RepoCoords::new(owner, repo))
}

/// Extracts the (possibly scoped) package name from an
/// `npmjs.com/package/<name>` URL.
pub fn parse_npm_url(input: &str) -> Option<String> {
    let url = parse_loose(input)?;
    if !host_is(&url, "npmjs.com") {
        return None;
    }
    let mut segments = url.path_segments()?.filter(|segment| !segment.is_empty());
    if segments.next()? != "package" {
        return None;
    }
    let first = decode_segment(segments.next()?)?;
    if first.starts_with('@') && !first.contains('/') {
        let second = decode_segment(segments.next()?)?;
        return Some(format!("{first}/{second}"));
    }
    Some(first)
}

fn parse_loose(input: &str) -> Option<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let parsed = Url::parse(&candidate).ok()?;
    matches!(parsed.scheme(), "http" | "https").then_some(parsed)
}

fn host_is(url: &Url, domain: &str) -> bool {
    url.host_str()
        .map(|host| host.strip_prefix("www.").unwrap_or(host))
        .map(|host| host.eq_ignore_ascii_case(domain))
        .unwrap_or(false)
}

fn decode_segment(segment: &str) -> Option<String> {
    urlencoding::decode(segment)
        .ok()
        .map(|decoded| decoded.into_owned())
        .filter(|decoded| !decoded.is_empty())
}
