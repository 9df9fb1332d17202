//! Core types and events for trainer-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Progress sentinel meaning "total size unknown"
///
/// Consumers must render an indeterminate indicator when they see this value,
/// never treat it as a literal percentage.
pub const UNKNOWN_PERCENT: i32 = -1;

/// Unique identifier for a download job
///
/// Assigned monotonically by the manager. Because a new download supersedes
/// the previous one, the id is what lets a subscriber tell events of a stale,
/// cancelled job apart from the live one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl JobId {
    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// File type of a download candidate, derived from row markers or URL/name
/// heuristics during extraction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Windows executable (also covers auto-updating trainer rows)
    Exe,
    /// ZIP archive
    Zip,
    /// RAR archive
    Rar,
    /// Could not be determined from any marker
    #[default]
    Unknown,
}

impl FileType {
    /// The filename extension for this type, without the leading dot
    ///
    /// Returns `None` for [`FileType::Unknown`].
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            FileType::Exe => Some("exe"),
            FileType::Zip => Some("zip"),
            FileType::Rar => Some("rar"),
            FileType::Unknown => None,
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileType::Exe => write!(f, "exe"),
            FileType::Zip => write!(f, "zip"),
            FileType::Rar => write!(f, "rar"),
            FileType::Unknown => write!(f, "unknown"),
        }
    }
}

/// One entry of a search listing page
///
/// Immutable once produced; replaced wholesale on the next search cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Trainer title as shown in the listing heading
    pub title: String,
    /// Absolute HTTP(S) URL of the trainer detail page
    pub url: String,
    /// Listing date, day/month/year fragments joined with single spaces
    /// (empty when any fragment is missing)
    pub date: String,
}

/// One downloadable file entry extracted from a trainer detail page
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    /// Display filename; ends with `.{file_type}` whenever the type is known
    pub filename: String,
    /// Upload date column text (may be empty)
    pub date: String,
    /// File size column text (may be empty)
    pub size: String,
    /// Download count column text (may be empty)
    pub downloads: String,
    /// Absolute download URL; unique within one extraction result
    pub download_url: String,
    /// File type derived from row markers or URL/name heuristics
    pub file_type: FileType,
}

/// Download job state
///
/// `Preparing → Streaming → {Completed, Cancelled, Failed}`; terminal states
/// are entered exactly once. "Idle" is represented by the manager holding no
/// job at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Validating the target directory and resolving filename collisions
    Preparing,
    /// Performing the chunked transfer
    Streaming,
    /// Transfer finished and the file was flushed
    Completed,
    /// Cancellation observed; the partial file was removed best-effort
    Cancelled,
    /// An I/O or network failure aborted the transfer
    Failed,
}

impl JobState {
    /// Whether this state is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Cancelled | JobState::Failed
        )
    }

    /// Convert an integer state code to a JobState
    pub(crate) fn from_u8(state: u8) -> Self {
        match state {
            0 => JobState::Preparing,
            1 => JobState::Streaming,
            2 => JobState::Completed,
            3 => JobState::Cancelled,
            _ => JobState::Failed,
        }
    }

    /// Convert a JobState to its integer state code
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            JobState::Preparing => 0,
            JobState::Streaming => 1,
            JobState::Completed => 2,
            JobState::Cancelled => 3,
            JobState::Failed => 4,
        }
    }
}

/// Snapshot of the current (or most recent) download job
#[derive(Clone, Debug, Serialize)]
pub struct JobStatus {
    /// Job identifier
    pub id: JobId,
    /// Current state
    pub state: JobState,
    /// Bytes written so far
    pub bytes_downloaded: u64,
    /// Total size from the source, if it reported one
    pub total_bytes: Option<u64>,
    /// When the job was started
    pub started_at: DateTime<Utc>,
}

/// Event emitted during the download lifecycle
///
/// Delivered over the broadcast channel returned by
/// [`TrainerDownloader::subscribe`](crate::TrainerDownloader::subscribe).
/// Progress samples for a single job arrive in non-decreasing byte order,
/// and no sample for a cancelled or superseded job is delivered after its
/// cancellation was observed.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The job is validating its target directory and resolving collisions
    Preparing {
        /// Job identifier
        id: JobId,
    },

    /// The chunked transfer has started
    Streaming {
        /// Job identifier
        id: JobId,
        /// Resolved target path being written
        path: PathBuf,
    },

    /// Throttled progress sample
    Progress {
        /// Job identifier
        id: JobId,
        /// Percentage 0..=100, or [`UNKNOWN_PERCENT`] when the total size
        /// is unknown
        percent: i32,
        /// Windowed transfer rate, e.g. `"512.00 KB/s"`
        rate: String,
    },

    /// The transfer finished successfully
    Completed {
        /// Job identifier
        id: JobId,
        /// Final file path
        path: PathBuf,
    },

    /// Cancellation was observed and the partial file removed best-effort
    Cancelled {
        /// Job identifier
        id: JobId,
    },

    /// The transfer failed; the partial file is left in place for inspection
    Failed {
        /// Job identifier
        id: JobId,
        /// Underlying error message
        error: String,
    },
}
