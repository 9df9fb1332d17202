//! Configuration types for trainer-dl

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Target site and plain-fetch configuration
///
/// Groups settings for the HTTP client side: origin, identification, and
/// per-endpoint timeouts. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site origin all root-relative URLs resolve against
    /// (default: `https://flingtrainer.com`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Browser-like User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for search requests (default: 10 seconds)
    ///
    /// Search fetches soft-fail into an empty document on timeout, so this
    /// bounds how long a search can appear to hang, not whether it errors.
    #[serde(default = "default_search_timeout", with = "duration_serde")]
    pub search_timeout: Duration,

    /// Timeout for plain detail-page requests (default: 15 seconds)
    #[serde(default = "default_page_timeout", with = "duration_serde")]
    pub page_timeout: Duration,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            search_timeout: default_search_timeout(),
            page_timeout: default_page_timeout(),
        }
    }
}

/// Rendered-page fetch configuration
///
/// The trainer detail page populates its download table dynamically, so it is
/// fetched through a headless browser first. Every failure here degrades to
/// the plain fetch path; disabling rendering skips the browser entirely.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Whether detail pages are rendered at all (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Outer timeout for navigation inside the browser (default: 15 seconds)
    #[serde(default = "default_nav_timeout", with = "duration_serde")]
    pub nav_timeout: Duration,

    /// Bounded wait for the download-table marker to appear (default: 5 seconds)
    ///
    /// Timing out here is not an error — the page content is returned
    /// best-effort without the marker.
    #[serde(default = "default_marker_timeout", with = "duration_serde")]
    pub marker_timeout: Duration,

    /// CSS selector whose appearance signals the download table is populated
    #[serde(default = "default_marker_selector")]
    pub marker_selector: String,

    /// URL patterns blocked during rendering to speed up page loads
    #[serde(default = "default_blocked_resources")]
    pub blocked_resources: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            nav_timeout: default_nav_timeout(),
            marker_timeout: default_marker_timeout(),
            marker_selector: default_marker_selector(),
            blocked_resources: default_blocked_resources(),
        }
    }
}

/// Download behavior configuration (directory, collisions, progress cadence)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Download directory (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Default file collision handling, overridable per download
    #[serde(default)]
    pub file_collision: FileCollisionAction,

    /// Bounded wait for a superseded worker to observe cancellation and exit
    /// (default: 1 second)
    ///
    /// A new job is started even if the wait elapses; the stale worker's only
    /// remaining side effect is deleting its own partial file.
    #[serde(default = "default_replace_wait", with = "duration_serde")]
    pub replace_wait: Duration,

    /// Minimum interval between progress samples (default: 500 ms)
    ///
    /// The only unconditional sample is the final one of a transfer whose
    /// total size is known.
    #[serde(default = "default_progress_interval", with = "duration_serde")]
    pub progress_interval: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            file_collision: FileCollisionAction::default(),
            replace_wait: default_replace_wait(),
            progress_interval: default_progress_interval(),
        }
    }
}

/// File collision handling strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCollisionAction {
    /// Append `_1`, `_2`, etc. before the extension (default)
    #[default]
    Rename,
    /// Overwrite the existing file
    Overwrite,
    /// Refuse the download, keep the existing file
    Skip,
}

/// Main configuration for [`TrainerDownloader`](crate::TrainerDownloader)
///
/// Fields are organized into logical sub-configs:
/// - [`site`](SiteConfig) — origin, User-Agent, fetch timeouts
/// - [`render`](RenderConfig) — headless-browser detail-page fetch
/// - [`download`](DownloadConfig) — target directory, collisions, progress
///
/// Sub-configs are flattened for serialization, so the JSON/TOML format stays
/// flat. Works out of the box with zero configuration via [`Default`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Target site and plain-fetch settings
    #[serde(flatten)]
    pub site: SiteConfig,

    /// Rendered-page fetch settings
    #[serde(flatten)]
    pub render: RenderConfig,

    /// Download behavior settings
    #[serde(flatten)]
    pub download: DownloadConfig,
}

// Convenience accessors for the most commonly read settings.
impl Config {
    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }

    /// Site origin
    pub fn base_url(&self) -> &str {
        &self.site.base_url
    }

    /// Validate the configuration
    ///
    /// Checks that the base URL is an absolute HTTP(S) URL and that the
    /// replacement wait and progress interval are non-zero.
    pub fn validate(&self) -> Result<(), Error> {
        let parsed = url::Url::parse(&self.site.base_url).map_err(|e| Error::Config {
            message: format!("base_url is not a valid URL: {e}"),
            key: Some("base_url".to_string()),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config {
                message: format!("base_url must be http(s), got {}", parsed.scheme()),
                key: Some("base_url".to_string()),
            });
        }
        if self.download.replace_wait.is_zero() {
            return Err(Error::Config {
                message: "replace_wait must be non-zero".to_string(),
                key: Some("replace_wait".to_string()),
            });
        }
        if self.download.progress_interval.is_zero() {
            return Err(Error::Config {
                message: "progress_interval must be non-zero".to_string(),
                key: Some("progress_interval".to_string()),
            });
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://flingtrainer.com".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36"
        .to_string()
}

fn default_search_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_page_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_nav_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_marker_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_marker_selector() -> String {
    "div.download-attachments".to_string()
}

fn default_blocked_resources() -> Vec<String> {
    ["*.png", "*.jpg", "*.jpeg", "*.gif", "*.css"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_replace_wait() -> Duration {
    Duration::from_secs(1)
}

fn default_progress_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_true() -> bool {
    true
}

/// Serialize/deserialize `Duration` as integer milliseconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
