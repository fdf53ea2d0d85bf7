use super::client::RestClient;
use super::paginate::search_all;
use super::window::{search_date, HarvestWindow};
use crate::error::Result;
use crate::types::record::RepoCoords;
use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::Deserialize;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Deserialize)]
pub struct IssueTiming {
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl IssueTiming {
    /// Whole days from creation to close, rounded up. `None` while open.
    pub fn closure_days(&self) -> Option<i64> {
        let closed_at = self.closed_at?;
        let seconds = (closed_at - self.created_at).num_seconds() as f64;
        Some((seconds / SECONDS_PER_DAY).ceil() as i64)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClosureBuckets {
    pub within_3: u64,
    pub within_7: u64,
    pub within_14: u64,
    pub within_31: u64,
}

impl ClosureBuckets {
    pub fn add(&mut self, days: i64) {
        match days {
            i64::MIN..=3 => self.within_3 += 1,
            4..=7 => self.within_7 += 1,
            8..=14 => self.within_14 += 1,
            15..=31 => self.within_31 += 1,
            _ => {}
        }
    }
}

pub fn bucket_closures(issues: &[IssueTiming]) -> ClosureBuckets {
    let mut buckets = ClosureBuckets::default();
    for days in issues.iter().filter_map(IssueTiming::closure_days) {
        buckets.add(days);
    }
    buckets
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClosedIssueStats {
    pub buckets: ClosureBuckets,
    pub closed_6mth: u64,
    pub closed_yr: u64,
}

pub async fn closed_issue_stats(
    client: &RestClient,
    coords: &RepoCoords,
    window: &HarvestWindow,
) -> Result<ClosedIssueStats> {
    let recent = search_all::<IssueTiming>(client, &closed_since(coords, window.six_months_ago)).await?;
    let yearly = search_all::<IgnoredAny>(client, &closed_since(coords, window.one_year_ago)).await?;

    Ok(ClosedIssueStats {
        buckets: bucket_closures(&recent.items),
        closed_6mth: recent.total_count,
        closed_yr: yearly.total_count,
    })
}

pub async fn opened_issue_count(
    client: &RestClient,
    coords: &RepoCoords,
    window: &HarvestWindow,
) -> Result<u64> {
    let q = format!(
        "repo:{} is:issue created:>={}",
        coords.slug(),
        search_date(window.one_year_ago)
    );
    Ok(search_all::<IgnoredAny>(client, &q).await?.total_count)
}

fn closed_since(coords: &RepoCoords, since: DateTime<Utc>) -> String {
    format!(
        "repo:{} is:issue is:closed closed:>={}",
        coords.slug(),
        search_date(since)
    )
}
