//! Per-job download worker
//!
//! One spawned task owns the whole transfer: it validates the target
//! directory, resolves collisions, streams the body in fixed 8 KiB chunks,
//! and drives the state machine `Preparing → Streaming → {Completed,
//! Cancelled, Failed}`. Cancellation is cooperative — the token is checked
//! before every chunk write — and the only side effect after cancellation is
//! best-effort deletion of the job's own partial file, which makes it safe
//! for the manager to start a replacement job without waiting for this
//! worker to fully unwind.

use crate::config::FileCollisionAction;
use crate::error::{Error, FilesystemError};
use crate::fetcher::classify_request_error;
use crate::types::{Event, JobId, JobState};
use futures::TryStreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

use super::rate::ProgressThrottle;

/// Transfer chunk size in bytes
pub(crate) const CHUNK_SIZE: usize = 8192;

/// State shared between a worker and the manager's status snapshots
///
/// Total size 0 doubles as "unknown": sources that report no length, or a
/// zero length, both render as indeterminate progress.
pub(crate) struct JobShared {
    state: AtomicU8,
    bytes_downloaded: AtomicU64,
    total_bytes: AtomicU64,
}

impl JobShared {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(JobState::Preparing.to_u8()),
            bytes_downloaded: AtomicU64::new(0),
            total_bytes: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> JobState {
        JobState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: JobState) {
        self.state.store(state.to_u8(), Ordering::Release);
    }

    pub fn bytes_downloaded(&self) -> u64 {
        self.bytes_downloaded.load(Ordering::Relaxed)
    }

    fn set_bytes_downloaded(&self, bytes: u64) {
        self.bytes_downloaded.store(bytes, Ordering::Relaxed);
    }

    pub fn total_bytes(&self) -> Option<u64> {
        match self.total_bytes.load(Ordering::Relaxed) {
            0 => None,
            total => Some(total),
        }
    }

    fn set_total_bytes(&self, total: u64) {
        self.total_bytes.store(total, Ordering::Relaxed);
    }
}

/// Everything a worker needs, captured at spawn time
pub(crate) struct JobContext {
    pub id: JobId,
    pub url: String,
    pub target_dir: PathBuf,
    pub file_name: String,
    pub collision: FileCollisionAction,
    pub client: reqwest::Client,
    pub event_tx: tokio::sync::broadcast::Sender<Event>,
    pub cancel: CancellationToken,
    pub shared: Arc<JobShared>,
    pub progress_interval: Duration,
}

impl JobContext {
    fn emit(&self, event: Event) {
        // send() errs when no subscriber is attached, which is fine.
        self.event_tx.send(event).ok();
    }

    fn transition(&self, state: JobState) {
        self.shared.set_state(state);
    }
}

enum StreamEnd {
    Completed,
    Cancelled,
}

/// Run a download job to a terminal state
pub(crate) async fn run(ctx: JobContext) {
    ctx.transition(JobState::Preparing);
    ctx.emit(Event::Preparing { id: ctx.id });

    let target = match prepare(&ctx).await {
        Ok(target) => target,
        Err(e) => {
            fail(&ctx, Error::Filesystem(e));
            return;
        }
    };

    match stream_to(&ctx, &target).await {
        Ok(StreamEnd::Completed) => {
            ctx.transition(JobState::Completed);
            tracing::info!(
                job_id = ctx.id.0,
                path = %target.display(),
                bytes = ctx.shared.bytes_downloaded(),
                "download complete"
            );
            ctx.emit(Event::Completed {
                id: ctx.id,
                path: target,
            });
        }
        Ok(StreamEnd::Cancelled) => {
            // Best-effort removal of the partial file; no further progress or
            // error events after cancellation is observed.
            if let Err(e) = tokio::fs::remove_file(&target).await {
                tracing::debug!(
                    job_id = ctx.id.0,
                    path = %target.display(),
                    error = %e,
                    "partial file removal failed"
                );
            }
            ctx.transition(JobState::Cancelled);
            tracing::info!(job_id = ctx.id.0, "download cancelled");
            ctx.emit(Event::Cancelled { id: ctx.id });
        }
        Err(e) => {
            // The partial file is left in place so the failure is inspectable.
            fail(&ctx, e);
        }
    }
}

fn fail(ctx: &JobContext, error: Error) {
    ctx.transition(JobState::Failed);
    tracing::error!(job_id = ctx.id.0, error = %error, "download failed");
    ctx.emit(Event::Failed {
        id: ctx.id,
        error: error.to_string(),
    });
}

/// Validate the target directory and resolve the final path
async fn prepare(ctx: &JobContext) -> Result<PathBuf, FilesystemError> {
    tokio::fs::create_dir_all(&ctx.target_dir)
        .await
        .map_err(|e| FilesystemError::DirCreateFailed {
            path: ctx.target_dir.clone(),
            reason: e.to_string(),
        })?;

    let desired = ctx.target_dir.join(&ctx.file_name);
    super::naming::unique_path(&desired, ctx.collision)
}

/// Perform the chunked transfer into the resolved target path
async fn stream_to(ctx: &JobContext, target: &Path) -> Result<StreamEnd, Error> {
    ctx.transition(JobState::Streaming);
    ctx.emit(Event::Streaming {
        id: ctx.id,
        path: target.to_path_buf(),
    });

    let response = ctx
        .client
        .get(&ctx.url)
        .send()
        .await
        .map_err(|e| classify_request_error(&ctx.url, e))?
        .error_for_status()
        .map_err(|e| classify_request_error(&ctx.url, e))?;

    // Absent or zero content length both mean "unknown total".
    let total = response.content_length().filter(|len| *len > 0);
    if let Some(total) = total {
        ctx.shared.set_total_bytes(total);
    }

    // Opening the sink doubles as the write-permission check.
    let mut file =
        tokio::fs::File::create(target)
            .await
            .map_err(|e| FilesystemError::NotWritable {
                path: target.to_path_buf(),
                reason: e.to_string(),
            })?;

    let body = response.bytes_stream().map_err(std::io::Error::other);
    let mut reader = StreamReader::new(body);
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut downloaded: u64 = 0;
    let mut throttle = ProgressThrottle::new(ctx.progress_interval);

    loop {
        let read = tokio::select! {
            read = reader.read(&mut buf) => {
                read.map_err(|e| crate::error::FetchError::ConnectionFailure {
                    url: ctx.url.clone(),
                    reason: e.to_string(),
                })?
            }
            _ = ctx.cancel.cancelled() => return Ok(StreamEnd::Cancelled),
        };
        if read == 0 {
            break;
        }

        // Cancellation is checked before writing each chunk.
        if ctx.cancel.is_cancelled() {
            return Ok(StreamEnd::Cancelled);
        }

        file.write_all(&buf[..read])
            .await
            .map_err(|e| FilesystemError::WriteFailed {
                path: target.to_path_buf(),
                reason: e.to_string(),
            })?;
        downloaded += read as u64;
        ctx.shared.set_bytes_downloaded(downloaded);

        if let Some(sample) = throttle.sample(downloaded, total, false) {
            ctx.emit(Event::Progress {
                id: ctx.id,
                percent: sample.percent,
                rate: sample.rate,
            });
        }
    }

    file.flush()
        .await
        .map_err(|e| FilesystemError::WriteFailed {
            path: target.to_path_buf(),
            reason: e.to_string(),
        })?;

    // The final sample of a known-length transfer is unconditional, so
    // subscribers always see 100%.
    if let Some(sample) = throttle.sample(downloaded, total, true) {
        ctx.emit(Event::Progress {
            id: ctx.id,
            percent: sample.percent,
            rate: sample.rate,
        });
    }

    Ok(StreamEnd::Completed)
}
