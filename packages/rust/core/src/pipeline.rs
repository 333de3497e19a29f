//! End-to-end sync run: list → fetch → normalize → diff → write → upload → log.
//!
//! A run moves through [`JobState`]s in order. Per-article work never aborts
//! the run: every article ends as an [`ItemOutcome`] and the run's
//! [`SyncStats`] are folded from those outcomes. Only setup and store errors
//! propagate, ending the run in [`JobState::Failed`].

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, instrument, warn};

use helpsync_markdown::Normalizer;
use helpsync_shared::{
    AppConfig, ArticleId, ArticleRef, Document, JobLogEntry, Result, SyncStats, UploadSummary,
    disambiguated_filename, resolve_api_key,
};
use helpsync_source::HelpCenterClient;
use helpsync_storage::{DocumentStore, FingerprintStore, JobLog, StatePaths, save_upload_summary};
use helpsync_upload::FilesClient;

use crate::detect::{ChangeStatus, classify};

// ---------------------------------------------------------------------------
// States and outcomes
// ---------------------------------------------------------------------------

/// Stage of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Init,
    Scraping,
    DiffingAndWriting,
    Uploading,
    Logging,
    Done,
    /// Terminal state after a setup or store error.
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Scraping => "scraping",
            Self::DiffingAndWriting => "diffing and writing",
            Self::Uploading => "uploading",
            Self::Logging => "logging",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an article produced no document this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Body request failed or returned no body.
    FetchFailed,
    /// Normalization produced nothing.
    EmptyContent,
    /// The document could not be written.
    Write(String),
    /// Another article this run already holds the filename.
    DuplicateKey(String),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FetchFailed => f.write_str("fetch failed"),
            Self::EmptyContent => f.write_str("empty content"),
            Self::Write(e) => write!(f, "write failed: {e}"),
            Self::DuplicateKey(key) => write!(f, "duplicate filename {key}"),
        }
    }
}

/// Why a document was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Added,
    Updated,
}

impl std::fmt::Display for WriteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Added => "added",
            Self::Updated => "updated",
        })
    }
}

/// Result of processing one listed article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Written { filename: String, change: WriteKind },
    /// Fingerprint matched, nothing written.
    Unchanged { filename: String },
    Failed { title: String, reason: FailureReason },
}

impl ItemOutcome {
    /// Stats contribution of this single outcome.
    pub fn stats(&self) -> SyncStats {
        match self {
            Self::Written { filename, change } => {
                let (added, updated) = match change {
                    WriteKind::Added => (1, 0),
                    WriteKind::Updated => (0, 1),
                };
                SyncStats {
                    added,
                    updated,
                    written: vec![filename.clone()],
                    ..SyncStats::default()
                }
            }
            Self::Unchanged { .. } => SyncStats {
                skipped: 1,
                ..SyncStats::default()
            },
            Self::Failed { .. } => SyncStats {
                failed: 1,
                ..SyncStats::default()
            },
        }
    }
}

/// Which stages a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Scrape, diff, write, upload changed documents, log.
    Full,
    /// Scrape, diff, write, log. No credential needed.
    ScrapeOnly,
}

/// Result of a completed run.
#[derive(Debug)]
pub struct RunReport {
    /// The entry appended to the job log.
    pub entry: JobLogEntry,
    /// One outcome per listed article, in listing order.
    pub outcomes: Vec<ItemOutcome>,
    /// Present when the upload stage ran.
    pub uploads: Option<UploadSummary>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn stats(&self) -> &SyncStats {
        &self.entry.stats
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting run status.
pub trait ProgressReporter {
    /// Called on every state transition.
    fn state(&self, state: JobState);
    /// Called after each article body fetch.
    fn article_fetched(&self, title: &str, current: usize, total: usize);
    /// Called after each article reaches its outcome.
    fn article_processed(&self, outcome: &ItemOutcome, current: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn state(&self, _state: JobState) {}
    fn article_fetched(&self, _title: &str, _current: usize, _total: usize) {}
    fn article_processed(&self, _outcome: &ItemOutcome, _current: usize, _total: usize) {}
    fn done(&self, _report: &RunReport) {}
}

// ---------------------------------------------------------------------------
// Sync job
// ---------------------------------------------------------------------------

/// Build an upload client, resolving the API key from the environment.
pub fn files_client(config: &AppConfig) -> Result<FilesClient> {
    let api_key = resolve_api_key(&config.upload)?;
    FilesClient::new(&config.upload, api_key)
}

/// A configured sync run.
pub struct SyncJob {
    config: AppConfig,
    source: HelpCenterClient,
    normalizer: Normalizer,
    uploader: Option<FilesClient>,
}

impl SyncJob {
    /// Prepare a run. [`RunMode::Full`] requires the API key up front, so a
    /// missing credential fails here before any network activity.
    pub fn new(config: &AppConfig, mode: RunMode) -> Result<Self> {
        let uploader = match mode {
            RunMode::Full => Some(files_client(config)?),
            RunMode::ScrapeOnly => None,
        };
        Self::with_uploader(config, uploader)
    }

    /// Prepare a run with an explicit upload client (or none).
    pub fn with_uploader(config: &AppConfig, uploader: Option<FilesClient>) -> Result<Self> {
        let source = HelpCenterClient::new(&config.source)?;
        let normalizer = Normalizer::new().with_base_url(source.base_url().clone());
        Ok(Self {
            config: config.clone(),
            source,
            normalizer,
            uploader,
        })
    }

    /// Execute the run, reporting `Init` first and `Done` or `Failed` last.
    pub async fn run(&self, progress: &dyn ProgressReporter) -> Result<RunReport> {
        progress.state(JobState::Init);
        match self.execute(progress).await {
            Ok(report) => {
                progress.state(JobState::Done);
                progress.done(&report);
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, "sync run failed");
                progress.state(JobState::Failed);
                Err(e)
            }
        }
    }

    #[instrument(skip_all, fields(base_url = %self.source.base_url(), upload = self.uploader.is_some()))]
    async fn execute(&self, progress: &dyn ProgressReporter) -> Result<RunReport> {
        let start = Instant::now();

        // --- Init: load stores ---
        let paths = StatePaths::new(&self.config.storage.state_dir);
        let mut fingerprints = FingerprintStore::load(&paths.fingerprints)?;
        let mut job_log = JobLog::load(&paths.job_log, self.config.storage.log_capacity)?;
        let documents = DocumentStore::new(&self.config.storage.data_dir);

        info!(
            fingerprints = fingerprints.len(),
            history = job_log.len(),
            "starting sync run"
        );

        // --- Scraping: list and fetch ---
        progress.state(JobState::Scraping);
        let articles = self
            .source
            .list_articles(self.config.source.max_articles)
            .await;
        let scraped = self.scrape(&articles, progress).await;

        // --- Diffing and writing ---
        progress.state(JobState::DiffingAndWriting);
        let total = scraped.len();
        let mut outcomes = Vec::with_capacity(total);
        let mut claimed = HashSet::with_capacity(total);
        for (i, item) in scraped.into_iter().enumerate() {
            let outcome = match item {
                Ok((id, doc)) => match claim_key(&id, &doc, &mut claimed) {
                    Ok(key) => apply_document(&key, &doc, &mut fingerprints, &documents),
                    Err(key) => {
                        warn!(%id, %key, "filename already used this run");
                        ItemOutcome::Failed {
                            title: doc.title,
                            reason: FailureReason::DuplicateKey(key),
                        }
                    }
                },
                Err((title, reason)) => ItemOutcome::Failed { title, reason },
            };
            progress.article_processed(&outcome, i + 1, total);
            outcomes.push(outcome);
        }

        let stats = outcomes
            .iter()
            .fold(SyncStats::default(), |acc, outcome| acc.merge(outcome.stats()));

        info!(
            added = stats.added,
            updated = stats.updated,
            skipped = stats.skipped,
            failed = stats.failed,
            "diff complete"
        );

        // --- Uploading ---
        let uploads = match &self.uploader {
            Some(uploader) => {
                progress.state(JobState::Uploading);
                let files: Vec<PathBuf> = stats
                    .written
                    .iter()
                    .map(|name| documents.path_for(name))
                    .collect();
                Some(uploader.upload_all(&files).await)
            }
            None => None,
        };
        let stats = match &uploads {
            Some(summary) => stats.with_uploads(summary),
            None => stats,
        };

        // --- Logging: persist stores ---
        progress.state(JobState::Logging);
        fingerprints.save()?;
        if let Some(summary) = &uploads {
            save_upload_summary(&paths.upload_summary, summary)?;
        }
        let entry = JobLogEntry::now(stats);
        job_log.append(entry.clone());
        job_log.save()?;

        let elapsed = start.elapsed();
        info!(
            run_id = %entry.run_id,
            elapsed_ms = elapsed.as_millis() as u64,
            "sync run complete"
        );

        Ok(RunReport {
            entry,
            outcomes,
            uploads,
            elapsed,
        })
    }

    /// Fetch and normalize every article, pausing between body requests.
    async fn scrape(
        &self,
        articles: &[ArticleRef],
        progress: &dyn ProgressReporter,
    ) -> Vec<std::result::Result<(ArticleId, Document), (String, FailureReason)>> {
        let delay = Duration::from_millis(self.config.source.article_delay_ms);
        let total = articles.len();
        let mut scraped = Vec::with_capacity(total);

        for (i, article) in articles.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let result = self
                .scrape_article(article)
                .await
                .map(|doc| (article.id.clone(), doc))
                .map_err(|reason| (article.title.clone(), reason));
            if let Err((title, reason)) = &result {
                warn!(id = %article.id, %title, %reason, "article skipped");
            }

            progress.article_fetched(&article.title, i + 1, total);
            scraped.push(result);
        }

        scraped
    }

    async fn scrape_article(
        &self,
        article: &ArticleRef,
    ) -> std::result::Result<Document, FailureReason> {
        let html = self
            .source
            .fetch_body(article)
            .await
            .ok_or(FailureReason::FetchFailed)?;

        let body = self.normalizer.normalize(&html);
        if body.is_empty() {
            return Err(FailureReason::EmptyContent);
        }

        debug!(id = %article.id, len = body.len(), "article normalized");
        Ok(Document {
            title: article.title.clone(),
            body,
        })
    }
}

/// Claim a filename for `doc` that no other article holds this run.
///
/// The title slug is tried first, then the slug suffixed with the article
/// id. Returns the slug filename as the error when both are taken.
fn claim_key(
    id: &ArticleId,
    doc: &Document,
    claimed: &mut HashSet<String>,
) -> std::result::Result<String, String> {
    let primary = doc.filename();
    if claimed.insert(primary.clone()) {
        return Ok(primary);
    }

    let fallback = disambiguated_filename(&doc.title, id);
    if claimed.insert(fallback.clone()) {
        debug!(%primary, %fallback, "title slug taken, using id suffix");
        Ok(fallback)
    } else {
        Err(primary)
    }
}

/// Classify `doc` under `filename`, write it when changed, then record its
/// fingerprint.
///
/// The fingerprint is recorded only after the write succeeded.
fn apply_document(
    filename: &str,
    doc: &Document,
    fingerprints: &mut FingerprintStore,
    documents: &DocumentStore,
) -> ItemOutcome {
    let classification = classify(filename, &doc.body, fingerprints);
    let change = match classification.status {
        ChangeStatus::Unchanged => {
            debug!(%filename, "unchanged");
            return ItemOutcome::Unchanged {
                filename: filename.to_string(),
            };
        }
        ChangeStatus::Added => WriteKind::Added,
        ChangeStatus::Updated => WriteKind::Updated,
    };

    match documents.write_as(filename, doc) {
        Ok(path) => {
            fingerprints.record(filename, classification.hash);
            info!(path = %path.display(), %change, "document written");
            ItemOutcome::Written {
                filename: filename.to_string(),
                change,
            }
        }
        Err(e) => {
            warn!(%filename, error = %e, "document write failed");
            ItemOutcome::Failed {
                title: doc.title.clone(),
                reason: FailureReason::Write(e.to_string()),
            }
        }
    }
}

/// Prepare and execute a run. Setup errors are reported as
/// [`JobState::Failed`].
pub async fn run_sync(
    config: &AppConfig,
    mode: RunMode,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    let job = match SyncJob::new(config, mode) {
        Ok(job) => job,
        Err(e) => {
            error!(error = %e, "sync setup failed");
            progress.state(JobState::Init);
            progress.state(JobState::Failed);
            return Err(e);
        }
    };
    job.run(progress).await
}

// ---------------------------------------------------------------------------
// Standalone upload
// ---------------------------------------------------------------------------

/// Which documents a standalone upload sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadSelection {
    /// Every `*.md` file in the data directory, regardless of fingerprints.
    All,
    /// The documents written by the most recent logged run.
    LastRun,
}

/// Upload documents from the data directory and persist the upload summary.
#[instrument(skip_all, fields(data_dir = %config.storage.data_dir.display(), ?selection))]
pub async fn upload_directory(
    config: &AppConfig,
    uploader: &FilesClient,
    selection: UploadSelection,
    progress: &dyn ProgressReporter,
) -> Result<UploadSummary> {
    progress.state(JobState::Init);
    let documents = DocumentStore::new(&config.storage.data_dir);
    let paths = StatePaths::new(&config.storage.state_dir);

    let files: Vec<PathBuf> = match selection {
        UploadSelection::All => documents.list_markdown_files()?,
        UploadSelection::LastRun => {
            let job_log = JobLog::load(&paths.job_log, config.storage.log_capacity)?;
            job_log
                .entries()
                .last()
                .map(|entry| {
                    entry
                        .stats
                        .written
                        .iter()
                        .map(|name| documents.path_for(name))
                        .collect()
                })
                .unwrap_or_default()
        }
    };
    info!(files = files.len(), "uploading documents");

    progress.state(JobState::Uploading);
    let summary = uploader.upload_all(&files).await;

    progress.state(JobState::Logging);
    save_upload_summary(&paths.upload_summary, &summary)?;

    progress.state(JobState::Done);
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
