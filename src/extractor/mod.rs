//! Tiered HTML extraction
//!
//! Pure functions over HTML text — no I/O. Both entry points are tolerant of
//! malformed or empty input and return an empty sequence rather than failing;
//! schema drift on the site degrades the result, never crashes it.
//!
//! - [`parse_search_results`] reads the search listing page.
//! - [`parse_versions`] reads a trainer detail page through a three-tier
//!   fallback: typed rows inside the known download container, a heuristic
//!   scan of the remaining table rows, and (only when both found nothing) a
//!   whole-document anchor scan. The tiers are independent functions composed
//!   by a single merge-and-dedup step on the download URL.

mod search;
mod versions;


pub use search::parse_search_results;
pub use versions::parse_versions;

use scraper::{ElementRef, Selector};

/// Origin root-relative URLs resolve against
pub(crate) const SITE_ORIGIN: &str = "https://flingtrainer.com";

/// Parse a CSS selector, degrading to "no matches" on failure
///
/// The selectors in this module are static strings, but a parse failure must
/// still not panic — extraction returns an empty sequence instead.
pub(crate) fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            tracing::error!(css, error = %e.to_string(), "selector failed to parse");
            None
        }
    }
}

/// Rewrite root-relative URLs against the site origin; everything else
/// passes through unchanged
pub(crate) fn absolutize(url: &str) -> String {
    if url.starts_with('/') {
        format!("{SITE_ORIGIN}{url}")
    } else {
        url.to_string()
    }
}

/// Concatenated, trimmed text content of an element
pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
