//! Search listing extraction

use super::{absolutize, element_text, selector};
use crate::types::SearchResult;
use scraper::Html;

/// Parse the search listing page into an ordered list of results
///
/// Each listing entry is an `article.post`; the title and detail-page URL
/// come from the heading link, and the date from three separately-marked
/// day/month/year fragments joined with single spaces. Entries missing a
/// title or link are skipped, as are entries whose URL is not a well-formed
/// absolute HTTP(S) URL after normalization. Document order is preserved.
pub fn parse_search_results(html: &str) -> Vec<SearchResult> {
    let document = Html::parse_document(html);

    let Some(article_sel) = selector("article.post") else {
        return Vec::new();
    };
    let Some(title_sel) = selector("h2.post-title a") else {
        return Vec::new();
    };
    let Some(day_sel) = selector("div.post-details-day") else {
        return Vec::new();
    };
    let Some(month_sel) = selector("div.post-details-month") else {
        return Vec::new();
    };
    let Some(year_sel) = selector("div.post-details-year") else {
        return Vec::new();
    };

    let mut results = Vec::new();
    for article in document.select(&article_sel) {
        let Some(link) = article.select(&title_sel).next() else {
            continue;
        };
        let title = element_text(&link);
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if title.is_empty() {
            continue;
        }

        let url = absolutize(href);
        if !is_valid_http_url(&url) {
            tracing::debug!(url, "skipping search result with malformed URL");
            continue;
        }

        let day = article.select(&day_sel).next().map(|e| element_text(&e));
        let month = article.select(&month_sel).next().map(|e| element_text(&e));
        let year = article.select(&year_sel).next().map(|e| element_text(&e));
        let date = match (day, month, year) {
            (Some(day), Some(month), Some(year)) => format!("{day} {month} {year}"),
            _ => String::new(),
        };

        results.push(SearchResult { title, url, date });
    }

    results
}

fn is_valid_http_url(candidate: &str) -> bool {
    url::Url::parse(candidate)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}
