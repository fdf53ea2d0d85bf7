pub mod client;
pub mod commits;
pub mod downloads;
pub mod git;
pub mod issues;
pub mod license;
pub mod paginate;
#[cfg(test)]
pub mod testing;
pub mod window;

use crate::error::Result;
use crate::resolve;
use crate::store::Store;
use crate::types::record::{signal, PackageRecord, RepoCoords, SignalTable};
use chrono::{DateTime, Utc};
use client::RestClient;
use git::RepoCloner;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use window::HarvestWindow;

/// Gathers the raw signals for one package and persists them.
pub struct Harvester {
    client: Arc<RestClient>,
    cloner: Arc<dyn RepoCloner>,
    store: Arc<Store>,
    clone_timeout: Duration,
}

impl Harvester {
    pub fn new(
        client: Arc<RestClient>,
        cloner: Arc<dyn RepoCloner>,
        store: Arc<Store>,
        clone_timeout: Duration,
    ) -> Self {
        Self {
            client,
            cloner,
            store,
            clone_timeout,
        }
    }

    pub async fn resolve(&self, input: &str) -> Result<RepoCoords> {
        resolve::resolve(&self.client, input).await
    }

    pub async fn collect(&self, coords: &RepoCoords, record: &PackageRecord) -> Result<SignalTable> {
        self.collect_at(coords, record, Utc::now()).await
    }

    /// Runs every collector against a window ending at `now`, in a fixed
    /// order, and writes the resulting table to the record.
    pub async fn collect_at(
        &self,
        coords: &RepoCoords,
        record: &PackageRecord,
        now: DateTime<Utc>,
    ) -> Result<SignalTable> {
        let window = HarvestWindow::ending_at(now);
        let client = self.client.as_ref();
        let mut signals = SignalTable::new();

        let top3 = commits::top3_commits(client, coords, &window).await?;
        signals.set(signal::TOP3, top3 as f64);

        let commits_yr = commits::commits_past_year(client, coords, &window).await?;
        signals.set(signal::COMMITS_YR, commits_yr as f64);

        let downloads = downloads::yearly_downloads(client, coords).await;
        signals.set(signal::DOWNLOADS, downloads as f64);

        let closed = issues::closed_issue_stats(client, coords, &window).await?;
        signals.set(signal::ISS3, closed.buckets.within_3 as f64);
        signals.set(signal::ISS7, closed.buckets.within_7 as f64);
        signals.set(signal::ISS14, closed.buckets.within_14 as f64);
        signals.set(signal::ISS31, closed.buckets.within_31 as f64);
        signals.set(signal::ISSUES_CLOSED_6MTH, closed.closed_6mth as f64);
        signals.set(signal::ISSUES_CLOSED_YR, closed.closed_yr as f64);

        let has_license =
            license::detect_license(client, self.cloner.as_ref(), coords, self.clone_timeout).await;
        signals.set(signal::LICENSE, if has_license { 1.0 } else { 0.0 });

        let opened = issues::opened_issue_count(client, coords, &window).await?;
        signals.set(signal::ISSUES_OPENED_YR, opened as f64);

        debug!(repo = %coords, signals = ?signals, "signals collected");
        self.store.write_signals(&record.url, &signals)?;
        info!(repo = %coords, id = record.id, "harvest complete");
        Ok(signals)
    }
}
