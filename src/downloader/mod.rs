//! Core downloader implementation split into focused submodules.
//!
//! The `TrainerDownloader` struct and its methods are organized by domain:
//! - [`job`] - Per-job worker: state machine and chunked transfer
//! - [`naming`] - Save-name resolution, sanitization, collision handling
//! - [`rate`] - Progress throttling and rate formatting

mod job;
mod naming;
mod rate;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use naming::{resolve_save_name, sanitize_filename};
pub use rate::format_speed;

use crate::catalog::Catalog;
use crate::config::{Config, FileCollisionAction};
use crate::error::{Error, Result};
use crate::extractor;
use crate::fetcher::{Fetcher, rendered::PageRenderer};
use crate::translate::{NameTranslator, TranslationProgress};
use crate::types::{Event, JobId, JobStatus, SearchResult, VersionEntry};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

/// Per-download options
///
/// Everything here is optional; unset fields fall back to the configuration.
#[derive(Clone, Debug, Default)]
pub struct DownloadOptions {
    /// Save name override (e.g. from a save dialog); still sanitized and
    /// extension-corrected
    pub file_name: Option<String>,
    /// Target directory override
    pub target_dir: Option<PathBuf>,
    /// Collision handling override
    pub collision: Option<FileCollisionAction>,
}

/// The single live (or most recently finished) download job
struct ActiveJob {
    id: JobId,
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
    shared: Arc<job::JobShared>,
    started_at: DateTime<Utc>,
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
///
/// Supervises at most one active download job at a time: requesting a new
/// download while one is streaming cancels the current job, waits a bounded
/// interval for its worker to observe cancellation, then proceeds regardless.
/// All outcomes are delivered asynchronously over the broadcast channel
/// returned by [`subscribe`](TrainerDownloader::subscribe).
#[derive(Clone)]
pub struct TrainerDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    config: Arc<Config>,
    /// Plain HTTP fetcher; its client is shared with download workers
    fetcher: Fetcher,
    /// Headless-browser renderer for the dynamic detail page
    renderer: PageRenderer,
    /// Current search results and version entries
    catalog: Catalog,
    /// Event broadcast channel sender (multiple subscribers supported)
    event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Single-slot registry of the active download job
    active: Arc<tokio::sync::Mutex<Option<ActiveJob>>>,
    /// Monotonic job id source
    next_job_id: Arc<AtomicU64>,
    /// Flag cleared during shutdown so no new jobs are accepted
    accepting_new: Arc<AtomicBool>,
}

impl TrainerDownloader {
    /// Create a new TrainerDownloader instance
    ///
    /// Validates the configuration, creates the download directory, and sets
    /// up the shared HTTP client and event broadcast channel.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.download.download_dir)
            .await
            .map_err(|e| {
                Error::Filesystem(crate::error::FilesystemError::DirCreateFailed {
                    path: config.download.download_dir.clone(),
                    reason: e.to_string(),
                })
            })?;

        let config = Arc::new(config);
        let fetcher = Fetcher::new(config.clone())?;
        let renderer = PageRenderer::new(config.clone());

        // Buffered so a slow subscriber does not stall workers; a subscriber
        // lagging past the buffer receives RecvError::Lagged.
        let (event_tx, _rx) = tokio::sync::broadcast::channel(256);

        Ok(Self {
            config,
            fetcher,
            renderer,
            catalog: Catalog::new(),
            event_tx,
            active: Arc::new(tokio::sync::Mutex::new(None)),
            next_job_id: Arc::new(AtomicU64::new(0)),
            accepting_new: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Subscribe to download events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all
    /// events independently.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The catalog holding the current search results and version entries
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Search the site for trainers matching a term
    ///
    /// Network failures are absorbed: the fetch soft-fails into an empty
    /// document and this method returns an empty list, never an error. The
    /// catalog is rebuilt with whatever was found.
    pub async fn search(&self, term: &str) -> Vec<SearchResult> {
        let html = self.fetcher.fetch_search(term).await;
        let results = extractor::parse_search_results(&html);
        tracing::info!(term, count = results.len(), "search complete");
        self.catalog.replace_search_results(results.clone()).await;
        results
    }

    /// Search with a translation pass for non-English terms
    ///
    /// The translator resolves the term to an English game name first;
    /// when it yields nothing (or fails), the raw term is searched instead.
    pub async fn search_translated(
        &self,
        term: &str,
        translator: &dyn NameTranslator,
        on_progress: TranslationProgress<'_>,
    ) -> Vec<SearchResult> {
        let resolved = match translator.translate(term, on_progress).await {
            Ok(Some(name)) => {
                tracing::info!(
                    term,
                    resolved = %name,
                    translator = translator.name(),
                    "query translated"
                );
                name
            }
            Ok(None) => term.to_string(),
            Err(e) => {
                tracing::warn!(term, error = %e, "translation failed, searching raw term");
                term.to_string()
            }
        };
        self.search(&resolved).await
    }

    /// Fetch a trainer detail page and extract its version entries
    ///
    /// The page is rendered through headless Chrome when enabled (its
    /// download table is populated dynamically); any rendering failure falls
    /// back to the plain fetch path for the same URL. The catalog is rebuilt
    /// with the extracted entries.
    pub async fn trainer_page(&self, url: &str) -> Result<Vec<VersionEntry>> {
        let html = self.fetch_page(url).await?;
        let entries = extractor::parse_versions(&html);
        tracing::info!(url, count = entries.len(), "trainer page extracted");
        self.catalog.replace_versions(entries.clone()).await;
        Ok(entries)
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        if self.config.render.enabled {
            match self.renderer.render(url).await {
                Ok(html) => return Ok(html),
                Err(e) => {
                    tracing::warn!(url, error = %e, "rendered fetch failed, falling back to plain fetch");
                }
            }
        }
        Ok(self
            .fetcher
            .fetch(url, self.config.site.page_timeout)
            .await?)
    }

    /// Start downloading a version entry, superseding any active job
    ///
    /// If a job is currently live its token is cancelled and its worker given
    /// a bounded interval to exit; the new job is started regardless of
    /// whether the wait succeeded — a stale worker's only remaining side
    /// effect is deleting its own partial file, which is safe to race.
    ///
    /// Returns the new job's id. Events for it arrive on the broadcast
    /// channel; this method does not block on the transfer.
    pub async fn start_download(
        &self,
        entry: &VersionEntry,
        options: DownloadOptions,
    ) -> Result<JobId> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let parsed = url::Url::parse(&entry.download_url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", entry.download_url)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(format!(
                "{}: expected http(s) scheme",
                entry.download_url
            )));
        }

        let file_name = naming::resolve_save_name(entry, options.file_name.as_deref());
        let target_dir = options
            .target_dir
            .unwrap_or_else(|| self.config.download.download_dir.clone());
        let collision = options
            .collision
            .unwrap_or(self.config.download.file_collision);

        let mut slot = self.active.lock().await;
        if let Some(previous) = slot.take() {
            self.supersede(previous).await;
        }

        let id = JobId(self.next_job_id.fetch_add(1, Ordering::SeqCst) + 1);
        let cancel = CancellationToken::new();
        let shared = Arc::new(job::JobShared::new());

        tracing::info!(
            job_id = id.0,
            url = %entry.download_url,
            file_name = %file_name,
            "starting download"
        );

        let context = job::JobContext {
            id,
            url: entry.download_url.clone(),
            target_dir,
            file_name,
            collision,
            client: self.fetcher.client().clone(),
            event_tx: self.event_tx.clone(),
            cancel: cancel.clone(),
            shared: shared.clone(),
            progress_interval: self.config.download.progress_interval,
        };
        let handle = tokio::spawn(job::run(context));

        *slot = Some(ActiveJob {
            id,
            cancel,
            handle,
            shared,
            started_at: Utc::now(),
        });

        Ok(id)
    }

    /// Cancel the superseded job and wait a bounded interval for its worker
    async fn supersede(&self, previous: ActiveJob) {
        previous.cancel.cancel();
        let mut handle = previous.handle;
        let wait = self.config.download.replace_wait;
        if tokio::time::timeout(wait, &mut handle).await.is_err() {
            tracing::warn!(
                superseded = previous.id.0,
                wait_ms = wait.as_millis() as u64,
                "stale worker did not exit within the bounded wait, proceeding anyway"
            );
        }
    }

    /// Cancel the current download, if any
    ///
    /// Cancellation is cooperative: the worker observes the token between
    /// chunks, removes its partial file best-effort, and emits a terminal
    /// `Cancelled` event. A hung network read can delay — but not prevent —
    /// the cancellation taking effect.
    pub async fn cancel(&self) {
        let mut slot = self.active.lock().await;
        if let Some(job) = slot.take() {
            tracing::info!(job_id = job.id.0, "cancel requested");
            self.supersede(job).await;
        }
    }

    /// Snapshot of the current (or most recently finished) job, if any
    pub async fn current_status(&self) -> Option<JobStatus> {
        let slot = self.active.lock().await;
        slot.as_ref().map(|job| JobStatus {
            id: job.id,
            state: job.shared.state(),
            bytes_downloaded: job.shared.bytes_downloaded(),
            total_bytes: job.shared.total_bytes(),
            started_at: job.started_at,
        })
    }

    /// Stop accepting new downloads and cancel the active one
    pub async fn shutdown(&self) {
        self.accepting_new.store(false, Ordering::SeqCst);
        self.cancel().await;
        tracing::info!("trainer downloader shut down");
    }
}
