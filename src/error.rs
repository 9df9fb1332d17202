//! Error types for trainer-dl
//!
//! This module provides the error taxonomy for the library:
//! - Domain-specific error types (Fetch, Render, Filesystem)
//! - Context information (URL, file path) carried on each variant
//!
//! Render errors never surface to callers — the downloader falls back to the
//! plain fetch path instead. Search fetch errors are absorbed into an empty
//! result document at the call site.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for trainer-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for trainer-dl
///
/// This is the primary error type used throughout the library. Each variant
/// includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "base_url")
        key: Option<String>,
    },

    /// Plain HTTP fetch failed
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Rendered-page fetch failed (internal — callers see the fallback path)
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// Filesystem operation failed during download preparation or streaming
    #[error("filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),

    /// The selected entry's download URL is not an absolute HTTP(S) URL
    #[error("invalid download URL: {0}")]
    InvalidUrl(String),

    /// Shutdown in progress - not accepting new downloads
    #[error("shutdown in progress: not accepting new downloads")]
    ShuttingDown,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Translation collaborator error
    #[error("translation error: {0}")]
    Translation(String),
}

/// Network fetch errors
///
/// Soft-failed into an empty result document for search fetches,
/// hard-propagated for detail-page and download fetches.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request did not complete within the configured timeout
    #[error("request to {url} timed out")]
    Timeout {
        /// The URL that timed out
        url: String,
    },

    /// The request failed for a reason other than a timeout
    /// (connection refused, DNS failure, non-success status, decode failure)
    #[error("request to {url} failed: {reason}")]
    ConnectionFailure {
        /// The URL that failed
        url: String,
        /// Underlying failure description
        reason: String,
    },
}

/// Rendered-page fetch errors
///
/// These never reach the caller: any render failure makes the downloader
/// fall back to the plain fetch path for the same URL.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Headless browser could not be launched
    #[error("failed to launch headless browser: {0}")]
    Launch(String),

    /// Navigation or content retrieval failed inside the browser
    #[error("rendering {url} failed: {reason}")]
    Navigation {
        /// The URL being rendered
        url: String,
        /// Underlying failure description
        reason: String,
    },

    /// Navigation did not complete within the outer render timeout
    #[error("rendering {url} timed out")]
    Timeout {
        /// The URL being rendered
        url: String,
    },
}

/// Filesystem errors raised by the download job
///
/// These abort the job with a user-facing message; there is no retry.
#[derive(Debug, Error)]
pub enum FilesystemError {
    /// The target directory could not be created
    #[error("failed to create directory {path}: {reason}")]
    DirCreateFailed {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying failure description
        reason: String,
    },

    /// The target file could not be opened for writing
    #[error("target {path} is not writable: {reason}")]
    NotWritable {
        /// Target file path
        path: PathBuf,
        /// Underlying failure description
        reason: String,
    },

    /// A write failed mid-transfer; the partial file is left in place
    #[error("write to {path} failed: {reason}")]
    WriteFailed {
        /// Target file path
        path: PathBuf,
        /// Underlying failure description
        reason: String,
    },

    /// The target path exists and the collision action refuses to touch it
    #[error("file collision at {path}: {reason}")]
    Collision {
        /// Colliding path
        path: PathBuf,
        /// Why the collision could not be resolved
        reason: String,
    },

    /// The target path has no usable stem or parent
    #[error("invalid path {path}: {reason}")]
    InvalidPath {
        /// Offending path
        path: PathBuf,
        /// What made the path unusable
        reason: String,
    },
}
