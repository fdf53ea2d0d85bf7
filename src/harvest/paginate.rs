use super::client::RestClient;
use crate::error::{PkgScoreError, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

pub const PER_PAGE: usize = 100;
/// GitHub's search API never serves more than this many results per query.
pub const SEARCH_RESULT_CAP: usize = 1000;

#[derive(Debug)]
pub struct SearchResults<T> {
    pub total_count: u64,
    pub items: Vec<T>,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct SearchPage<T> {
    total_count: u64,
    #[serde(default)]
    items: Vec<T>,
}

/// Offset pagination: fetch `page=1,2,..` until a page comes back short or
/// empty. Anything other than a JSON array aborts the walk.
pub async fn offset_all<T: DeserializeOwned>(
    client: &RestClient,
    path: &str,
    query: &[(&str, &str)],
) -> Result<Vec<T>> {
    let per_page = PER_PAGE.to_string();
    let mut collected = Vec::new();
    let mut page = 1usize;

    loop {
        let page_number = page.to_string();
        let mut params = query.to_vec();
        params.push(("per_page", per_page.as_str()));
        params.push(("page", page_number.as_str()));

        let items = match client.github_json(path, &params).await? {
            Value::Array(items) => items,
            other => {
                return Err(PkgScoreError::malformed(
                    path,
                    format!("expected a JSON array on page {page}, got {}", kind(&other)),
                ))
            }
        };

        let received = items.len();
        for item in items {
            collected.push(
                serde_json::from_value(item)
                    .map_err(|e| PkgScoreError::malformed(path, e.to_string()))?,
            );
        }

        if received < PER_PAGE {
            break;
        }
        page += 1;
    }

    Ok(collected)
}

/// Search-API pagination: keep paging while fewer items than the reported
/// `total_count` have arrived, stopping early on an empty page or the cap.
pub async fn search_all<T: DeserializeOwned>(
    client: &RestClient,
    q: &str,
) -> Result<SearchResults<T>> {
    const SEARCH_PATH: &str = "/search/issues";
    let per_page = PER_PAGE.to_string();
    let mut items = Vec::new();
    let mut page = 1usize;

    loop {
        let page_number = page.to_string();
        let payload = client
            .github_json(
                SEARCH_PATH,
                &[
                    ("q", q),
                    ("per_page", per_page.as_str()),
                    ("page", page_number.as_str()),
                ],
            )
            .await?;
        let parsed: SearchPage<T> = serde_json::from_value(payload)
            .map_err(|e| PkgScoreError::malformed(SEARCH_PATH, e.to_string()))?;

        let total_count = parsed.total_count;
        let received = parsed.items.len();
        items.extend(parsed.items);

        if received == 0
            || items.len() as u64 >= total_count
            || items.len() >= SEARCH_RESULT_CAP
        {
            items.truncate(SEARCH_RESULT_CAP);
            return Ok(SearchResults { total_count, items });
        }
        page += 1;
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
