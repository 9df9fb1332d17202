//! # trainer-dl
//!
//! Backend library for downloading game trainers indexed by flingtrainer.com.
//!
//! ## Design Philosophy
//!
//! trainer-dl is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to download events, no polling required
//! - **Degrade, don't crash** - schema drift on the site tiers extraction down
//!   to an empty result; a failed search yields an empty list, never an error
//!
//! ## Quick Start
//!
//! ```no_run
//! use trainer_dl::{Config, DownloadOptions, TrainerDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = TrainerDownloader::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     // Search, open a result, download the first candidate
//!     let results = downloader.search("elden ring").await;
//!     if let Some(result) = results.first() {
//!         let versions = downloader.trainer_page(&result.url).await?;
//!         if let Some(entry) = versions.first() {
//!             downloader
//!                 .start_download(entry, DownloadOptions::default())
//!                 .await?;
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// In-memory catalog of the current search cycle
pub mod catalog;
/// Configuration types
pub mod config;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Tiered HTML extraction
pub mod extractor;
/// HTTP fetching (plain and rendered)
pub mod fetcher;
/// Pluggable query-name translation
pub mod translate;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use catalog::Catalog;
pub use config::{Config, DownloadConfig, FileCollisionAction, RenderConfig, SiteConfig};
pub use downloader::{
    DownloadOptions, TrainerDownloader, format_speed, resolve_save_name, sanitize_filename,
};
pub use error::{Error, FetchError, FilesystemError, RenderError, Result};
pub use extractor::{parse_search_results, parse_versions};
pub use translate::{NameTranslator, NoOpTranslator, TranslationProgress};
pub use types::{
    Event, FileType, JobId, JobState, JobStatus, SearchResult, UNKNOWN_PERCENT, VersionEntry,
};
