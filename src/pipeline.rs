//! Batch sequencing: one task per package, bounded by a semaphore, reporting
//! through a channel of pipeline events.

use crate::error::{PkgScoreError, Result};
use crate::harvest::client::{ReqwestTransport, RestClient};
use crate::harvest::git::GitCli;
use crate::harvest::Harvester;
use crate::report;
use crate::score::Scorer;
use crate::store::Store;
use crate::types::config::ScorerConfig;
use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Harvest,
    Score,
    Report,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Resolve => "resolve",
            Stage::Harvest => "harvest",
            Stage::Score => "score",
            Stage::Report => "report",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("{url}: {stage}: {source}")]
pub struct PackageFailure {
    pub url: String,
    pub stage: Stage,
    #[source]
    pub source: PkgScoreError,
}

#[derive(Debug)]
pub enum PipelineEvent {
    HarvestDone { id: i64, url: String },
    ScoreDone { id: i64, url: String },
    Failed(PackageFailure),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub records: usize,
    pub scored: usize,
    pub failed: usize,
}

/// Counts packages still in flight; the call that brings it to zero closes
/// storage.
struct CompletionCounter {
    remaining: AtomicUsize,
    store: Arc<Store>,
}

impl CompletionCounter {
    fn new(total: usize, store: Arc<Store>) -> Self {
        Self {
            remaining: AtomicUsize::new(total),
            store,
        }
    }

    fn finish_one(&self) -> Result<()> {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.store.close()?;
            info!("all packages finished, storage closed");
        }
        Ok(())
    }
}

struct PackageJob {
    harvester: Arc<Harvester>,
    scorer: Arc<Scorer>,
    store: Arc<Store>,
    id: i64,
    url: String,
}

impl PackageJob {
    fn fail(&self, stage: Stage, source: PkgScoreError) -> PackageFailure {
        PackageFailure {
            url: self.url.clone(),
            stage,
            source,
        }
    }

    async fn run(self, events: mpsc::UnboundedSender<PipelineEvent>) {
        let event = match self.score_package(&events).await {
            Ok(()) => PipelineEvent::ScoreDone {
                id: self.id,
                url: self.url.clone(),
            },
            Err(failure) => PipelineEvent::Failed(failure),
        };
        if events.send(event).is_err() {
            warn!(url = %self.url, "sequencer gone, dropping event");
        }
    }

    async fn score_package(
        &self,
        events: &mpsc::UnboundedSender<PipelineEvent>,
    ) -> std::result::Result<(), PackageFailure> {
        let coords = self
            .harvester
            .resolve(&self.url)
            .await
            .map_err(|e| self.fail(Stage::Resolve, e))?;
        info!(url = %self.url, repo = %coords, "resolved");

        let record = self
            .store
            .read_record(self.id)
            .map_err(|e| self.fail(Stage::Harvest, e))?;
        self.harvester
            .collect(&coords, &record)
            .await
            .map_err(|e| self.fail(Stage::Harvest, e))?;
        let harvested = PipelineEvent::HarvestDone {
            id: self.id,
            url: self.url.clone(),
        };
        if events.send(harvested).is_err() {
            warn!(url = %self.url, "sequencer gone, dropping harvest event");
        }

        self.scorer
            .compute(self.id)
            .map_err(|e| self.fail(Stage::Score, e))?;
        Ok(())
    }
}

pub struct Pipeline {
    harvester: Arc<Harvester>,
    scorer: Arc<Scorer>,
    store: Arc<Store>,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(harvester: Harvester, scorer: Scorer, store: Arc<Store>, concurrency: usize) -> Self {
        Self {
            harvester: Arc::new(harvester),
            scorer: Arc::new(scorer),
            store,
            concurrency: concurrency.max(1),
        }
    }

    /// Production wiring: reqwest transport, `git` CLI, SQLite storage.
    pub fn from_config(cfg: &ScorerConfig) -> Result<Self> {
        let store = Arc::new(match &cfg.run.database {
            Some(path) => Store::open(path)?,
            None => Store::open_in_memory()?,
        });

        let token = cfg.github_token();
        if token.is_none() {
            warn!(
                env = %cfg.github.token_env,
                "no GitHub token set, unauthenticated rate limits apply"
            );
        }
        let transport = Arc::new(ReqwestTransport::new(&cfg.http)?);
        let client = Arc::new(RestClient::new(transport, cfg, token));
        let harvester = Harvester::new(
            client,
            Arc::new(GitCli),
            store.clone(),
            cfg.http.clone_timeout(),
        );
        let scorer = Scorer::new(store.clone());
        Ok(Self::new(harvester, scorer, store, cfg.run.concurrency))
    }

    /// One record per distinct non-blank line, in input order.
    pub fn ingest(&self, input: &str) -> Result<Vec<(i64, String)>> {
        let mut records = Vec::new();
        for line in input.lines() {
            let url = line.trim();
            if url.is_empty() {
                continue;
            }
            let (id, created) = self.store.ingest(url)?;
            if created {
                records.push((id, url.to_string()));
            } else {
                debug!(url, "duplicate input line skipped");
            }
        }
        Ok(records)
    }

    /// Scores every package in `input`, writing report lines to `out` and
    /// per-package failures to `err`.
    pub async fn run<O: Write, E: Write>(&self, input: &str, out: &mut O, err: &mut E) -> Result<RunSummary> {
        let records = self.ingest(input)?;
        let mut summary = RunSummary {
            records: records.len(),
            ..RunSummary::default()
        };
        info!(records = summary.records, concurrency = self.concurrency, "run started");

        if records.is_empty() {
            self.store.close()?;
            return Ok(summary);
        }

        let counter = CompletionCounter::new(records.len(), self.store.clone());
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut handles = Vec::with_capacity(records.len());
        for (id, url) in records {
            let job = PackageJob {
                harvester: self.harvester.clone(),
                scorer: self.scorer.clone(),
                store: self.store.clone(),
                id,
                url,
            };
            let events = tx.clone();
            let semaphore = semaphore.clone();
            handles.push(tokio::spawn(async move {
                // The semaphore is never closed while jobs are queued.
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                job.run(events).await;
            }));
        }
        drop(tx);

        let mut fatal = None;
        while let Some(event) = rx.recv().await {
            if let Err(e) = self.sequence(event, out, err, &mut summary, &counter) {
                error!(error = %e, "sequencer stopped, draining remaining packages");
                fatal = Some(e);
                break;
            }
        }
        drop(rx);

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "package task aborted");
                summary.failed += 1;
            }
        }
        if !self.store.is_closed() {
            if let Err(e) = self.store.close() {
                error!(error = %e, "could not close storage");
                if fatal.is_none() {
                    fatal = Some(e);
                }
            }
        }
        if let Some(e) = fatal {
            return Err(e);
        }
        out.flush()?;

        info!(
            scored = summary.scored,
            failed = summary.failed,
            "run finished"
        );
        Ok(summary)
    }

    fn sequence<O: Write, E: Write>(
        &self,
        event: PipelineEvent,
        out: &mut O,
        err: &mut E,
        summary: &mut RunSummary,
        counter: &CompletionCounter,
    ) -> Result<()> {
        match event {
            PipelineEvent::HarvestDone { id, url } => {
                debug!(id, url = %url, "harvest done");
                Ok(())
            }
            PipelineEvent::ScoreDone { id, url } => {
                match self.store.read_record(id).and_then(|record| report::render_record(&record)) {
                    Ok(line) => {
                        writeln!(out, "{line}")?;
                        summary.scored += 1;
                    }
                    Err(e) => {
                        let failure = PackageFailure {
                            url,
                            stage: Stage::Report,
                            source: e,
                        };
                        report_failure(err, &failure)?;
                        summary.failed += 1;
                    }
                }
                counter.finish_one()
            }
            PipelineEvent::Failed(failure) => {
                report_failure(err, &failure)?;
                summary.failed += 1;
                counter.finish_one()
            }
        }
    }
}

fn report_failure<E: Write>(err: &mut E, failure: &PackageFailure) -> Result<()> {
    error!(url = %failure.url, stage = %failure.stage, error = %failure.source, "package failed");
    writeln!(err, "error: {failure}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::testing::{json_items, test_config, FakeCloner, FakeTransport};
    use std::time::Duration;

    const API: &str = "https://api.github.com";

    fn fake_github() -> FakeTransport {
        FakeTransport::new()
            .route(
                &format!("{API}/repos/o/r/contributors"),
                &[],
                200,
                r#"[{"login":"alice"}]"#,
            )
            .route(&format!("{API}/repos/o/r/commits"), &[], 200, &json_items(10))
            .route(
                &format!("{API}/repos/o/r/commits"),
                &[("author", "alice")],
                200,
                &json_items(1),
            )
            .route(&format!("{API}/repos/o/r/contents/package.json"), &[], 404, "")
            .route(
                &format!("{API}/search/issues"),
                &[],
                200,
                r#"{"total_count":1,"items":[{"created_at":"2024-05-01T00:00:00Z","closed_at":"2024-05-02T00:00:00Z"}]}"#,
            )
            .route(&format!("{API}/repos/o/r"), &[], 200, r#"{"default_branch":"main"}"#)
            .route(
                "https://registry.npmjs.org/widget",
                &[],
                200,
                r#"{"repository":"github:o/r"}"#,
            )
    }

    fn pipeline(transport: FakeTransport) -> (Pipeline, Arc<Store>) {
        let store = Arc::new(Store::open_in_memory().expect("store should open"));
        let client = Arc::new(RestClient::new(Arc::new(transport), &test_config(), None));
        let harvester = Harvester::new(
            client,
            Arc::new(FakeCloner::with_files(&[("LICENSE", "MIT")])),
            store.clone(),
            Duration::from_secs(5),
        );
        let scorer = Scorer::new(store.clone());
        (Pipeline::new(harvester, scorer, store.clone(), 2), store)
    }

    #[test]
    fn stage_names_are_lowercase() {
        assert_eq!(Stage::Resolve.to_string(), "resolve");
        assert_eq!(Stage::Report.to_string(), "report");
    }

    #[tokio::test]
    async fn blank_line_and_one_url_yield_one_record_and_one_line() {
        let (pipeline, store) = pipeline(fake_github());
        let mut out = Vec::new();
        let mut err = Vec::new();

        let summary = pipeline
            .run("\n   \nhttps://github.com/o/r\n", &mut out, &mut err)
            .await
            .expect("run should succeed");

        assert_eq!(
            summary,
            RunSummary {
                records: 1,
                scored: 1,
                failed: 0
            }
        );
        let stdout = String::from_utf8(out).expect("utf8");
        let lines: Vec<&str> = stdout.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("{\"URL\":\"https://github.com/o/r\",\"BusFactor\":0.900,"));
        assert!(err.is_empty());
        assert!(store.is_closed());
    }

    #[tokio::test]
    async fn failures_are_reported_and_the_batch_continues() {
        let (pipeline, store) = pipeline(fake_github());
        let mut out = Vec::new();
        let mut err = Vec::new();

        let summary = pipeline
            .run(
                "not-a-package\nhttps://www.npmjs.com/package/widget\n",
                &mut out,
                &mut err,
            )
            .await
            .expect("run should succeed");

        assert_eq!(summary.records, 2);
        assert_eq!(summary.scored, 1);
        assert_eq!(summary.failed, 1);
        let stderr = String::from_utf8(err).expect("utf8");
        assert!(stderr.starts_with("error: not-a-package: resolve:"));
        let stdout = String::from_utf8(out).expect("utf8");
        assert!(stdout.contains("\"URL\":\"https://www.npmjs.com/package/widget\""));
        assert!(store.is_closed());
    }

    #[tokio::test]
    async fn duplicate_urls_are_scored_once() {
        let (pipeline, _store) = pipeline(fake_github());
        let mut out = Vec::new();
        let mut err = Vec::new();

        let summary = pipeline
            .run(
                "https://github.com/o/r\nhttps://github.com/o/r\n",
                &mut out,
                &mut err,
            )
            .await
            .expect("run should succeed");
        assert_eq!(summary.records, 1);
        assert_eq!(String::from_utf8(out).expect("utf8").lines().count(), 1);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[tokio::test]
    async fn output_failure_still_drains_tasks_and_closes_storage() {
        let (pipeline, store) = pipeline(fake_github());
        let mut err = Vec::new();

        let result = pipeline
            .run(
                "https://github.com/o/r\nhttps://www.npmjs.com/package/widget\n",
                &mut BrokenPipe,
                &mut err,
            )
            .await;

        assert!(matches!(result, Err(PkgScoreError::Io(ref e)) if e.kind() == std::io::ErrorKind::BrokenPipe));
        assert!(store.is_closed(), "storage should close after an output failure");
    }

    #[tokio::test]
    async fn failure_output_error_is_returned_after_draining() {
        let (pipeline, store) = pipeline(fake_github());
        let mut out = Vec::new();

        let result = pipeline
            .run("not-a-package\nhttps://github.com/o/r\n", &mut out, &mut BrokenPipe)
            .await;

        assert!(matches!(result, Err(PkgScoreError::Io(_))));
        assert!(store.is_closed());
    }

    #[tokio::test]
    async fn empty_input_closes_storage_without_output() {
        let (pipeline, store) = pipeline(FakeTransport::new());
        let mut out = Vec::new();
        let mut err = Vec::new();

        let summary = pipeline
            .run("\n\n", &mut out, &mut err)
            .await
            .expect("run should succeed");
        assert_eq!(summary, RunSummary::default());
        assert!(out.is_empty());
        assert!(store.is_closed());
    }
}
