//! HTTP fetching with per-endpoint timeouts and search soft-failure
//!
//! The plain fetcher performs HTTP GET with a browser-like User-Agent and
//! returns decoded document text. Search requests have a special soft-failure
//! mode: callers of search must always receive a parseable (possibly empty)
//! document, never an error, so any search fetch failure maps to
//! [`EMPTY_DOCUMENT`] at this call site. All other endpoints propagate a
//! [`FetchError`].

pub mod rendered;

use crate::config::Config;
use crate::error::{Error, FetchError};
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use std::time::Duration;

/// The empty-but-parseable document returned by soft-failing search fetches
pub const EMPTY_DOCUMENT: &str = "<html><body></body></html>";

/// Extensions treated as binary archives for the content-type warning
const BINARY_EXTENSIONS: [&str; 3] = [".zip", ".rar", ".7z"];

/// Plain HTTP fetcher over a shared client
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    config: Arc<Config>,
}

impl Fetcher {
    /// Create a fetcher with the configured User-Agent baked into the client
    pub fn new(config: Arc<Config>) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(&config.site.user_agent)
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to build HTTP client: {e}"),
                key: None,
            })?;
        Ok(Self { client, config })
    }

    /// The shared HTTP client, reused for streaming downloads
    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Build the search endpoint URL for a query term
    pub fn search_url(&self, term: &str) -> String {
        format!(
            "{}/?s={}",
            self.config.site.base_url.trim_end_matches('/'),
            urlencoding::encode(term)
        )
    }

    /// Fetch a URL and return its decoded text
    ///
    /// The response charset declared in the Content-Type header is preferred,
    /// falling back to UTF-8. A non-HTML content type on a URL that does not
    /// look like a binary archive is logged as a warning but not treated as
    /// fatal — the raw text is still returned.
    pub async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_request_error(url, e))?
            .error_for_status()
            .map_err(|e| classify_request_error(url, e))?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        if !content_type.contains("text/html") && !looks_like_binary(url) {
            tracing::warn!(url, content_type, "response is not HTML");
        }

        response
            .text()
            .await
            .map_err(|e| classify_request_error(url, e))
    }

    /// Fetch the search listing for a query term, soft-failing into an
    /// empty document
    ///
    /// Any timeout or network failure yields [`EMPTY_DOCUMENT`] so the
    /// extractor downstream produces an empty result list instead of the
    /// caller seeing an error.
    pub async fn fetch_search(&self, term: &str) -> String {
        let url = self.search_url(term);
        match self.fetch(&url, self.config.site.search_timeout).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "search fetch failed, returning empty document");
                EMPTY_DOCUMENT.to_string()
            }
        }
    }
}

/// Map a reqwest error to the fetch error taxonomy
pub(crate) fn classify_request_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::ConnectionFailure {
            url: url.to_string(),
            reason: error.to_string(),
        }
    }
}

fn looks_like_binary(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    BINARY_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}
