//! Three-tier version-entry extraction
//!
//! Tier 1 reads the rows the site marks with a type class inside the known
//! download container. Tier 2 heuristically scans the container's remaining
//! table rows for download-looking anchors. Tier 3 scans every anchor in the
//! document, independent of table structure, and only runs when the first
//! two tiers produced nothing. The union is deduplicated by download URL.

use super::{absolutize, element_text, selector};
use crate::types::{FileType, VersionEntry};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// Tokens in an anchor's href that mark it as a download link
const DOWNLOAD_MARKERS: [&str; 3] = ["download", "attachment", "file"];

/// Archive/executable extension tokens used by the download-URL heuristic
const ARCHIVE_TOKENS: [&str; 4] = [".zip", ".rar", ".7z", ".exe"];

/// Parse a trainer detail page into a deduplicated list of version entries
///
/// Returns entries in tier order (typed rows first), with the whole-document
/// scan engaged only when the table-based tiers found nothing. Malformed or
/// empty input yields an empty list.
pub fn parse_versions(html: &str) -> Vec<VersionEntry> {
    let document = Html::parse_document(html);

    let mut entries = tier_typed_rows(&document);
    entries.extend(tier_table_scan(&document));
    if entries.is_empty() {
        entries = tier_document_scan(&document);
    }

    dedup_by_url(entries)
}

/// Selector bundle shared by the table-based tiers
struct RowSelectors {
    area: Selector,
    row: Selector,
    cell: Selector,
    anchor: Selector,
}

impl RowSelectors {
    fn new() -> Option<Self> {
        Some(Self {
            area: selector("div.download-attachments")?,
            row: selector("tr")?,
            cell: selector("td")?,
            anchor: selector("a")?,
        })
    }
}

/// Tier 1: rows the site marks with an exe/zip/rar/autoupdate class
fn tier_typed_rows(document: &Html) -> Vec<VersionEntry> {
    let Some(sel) = RowSelectors::new() else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    for area in document.select(&sel.area) {
        for row in area.select(&sel.row) {
            let Some(file_type) = row_marker_type(&row) else {
                continue;
            };
            let cells: Vec<ElementRef<'_>> = row.select(&sel.cell).collect();
            let Some(first) = cells.first() else {
                continue;
            };
            let Some(link) = first.select(&sel.anchor).next() else {
                continue;
            };
            let Some(href) = link.value().attr("href") else {
                continue;
            };

            let filename = link_filename(&link, href);
            entries.push(finalize_entry(
                filename,
                cell_text(&cells, 1),
                cell_text(&cells, 2),
                cell_text(&cells, 3),
                href,
                file_type,
            ));
        }
    }
    entries
}

/// Tier 2: heuristic scan of the container's table rows Tier 1 left behind
///
/// Skips header rows and colspan label rows, then takes the first anchor
/// (scanning cells left to right) whose target looks like a download.
/// Date/size/downloads are read positionally only when that anchor sits in
/// the first cell; a link found elsewhere yields empty metadata rather than
/// misattributed columns.
fn tier_table_scan(document: &Html) -> Vec<VersionEntry> {
    let Some(sel) = RowSelectors::new() else {
        return Vec::new();
    };
    let Some(table_sel) = selector("table") else {
        return Vec::new();
    };
    let Some(header_sel) = selector("th") else {
        return Vec::new();
    };
    let Some(colspan_sel) = selector("td[colspan]") else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    for area in document.select(&sel.area) {
        for table in area.select(&table_sel) {
            for row in table.select(&sel.row) {
                if row_marker_type(&row).is_some() {
                    continue;
                }
                if row.select(&header_sel).next().is_some() {
                    continue;
                }
                if row.select(&colspan_sel).next().is_some() {
                    continue;
                }

                let cells: Vec<ElementRef<'_>> = row.select(&sel.cell).collect();
                let mut found = None;
                for (index, cell) in cells.iter().enumerate() {
                    if let Some(link) = cell.select(&sel.anchor).next()
                        && let Some(href) = link.value().attr("href")
                        && is_download_href(href)
                    {
                        found = Some((index, link, href));
                        break;
                    }
                }
                let Some((index, link, href)) = found else {
                    continue;
                };

                let (date, size, downloads) = if index == 0 {
                    (
                        cell_text(&cells, 1),
                        cell_text(&cells, 2),
                        cell_text(&cells, 3),
                    )
                } else {
                    (String::new(), String::new(), String::new())
                };

                let filename = link_filename(&link, href);
                let file_type = infer_type(href, &filename);
                entries.push(finalize_entry(filename, date, size, downloads, href, file_type));
            }
        }
    }
    entries
}

/// Tier 3: whole-document anchor scan, engaged only when the table tiers
/// produced nothing
fn tier_document_scan(document: &Html) -> Vec<VersionEntry> {
    let Some(anchor_sel) = selector("a[href]") else {
        return Vec::new();
    };
    let Some(cell_sel) = selector("td") else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    for link in document.select(&anchor_sel) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if !is_download_href(href) {
            continue;
        }

        let filename = link_filename(&link, href);

        let parent_row = enclosing_row(&link);
        let (date, size, downloads) = match &parent_row {
            Some(row) => {
                let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).collect();
                (
                    cell_text(&cells, 1),
                    cell_text(&cells, 2),
                    cell_text(&cells, 3),
                )
            }
            None => (String::new(), String::new(), String::new()),
        };

        // The enclosing row's class marker wins over URL/name inference.
        let file_type = parent_row
            .as_ref()
            .and_then(row_marker_type)
            .unwrap_or_else(|| infer_type(href, &filename));

        entries.push(finalize_entry(filename, date, size, downloads, href, file_type));
    }
    entries
}

/// File type from a row's class marker, if it carries one
///
/// `autoupdate` and `exe` markers both map to [`FileType::Exe`].
fn row_marker_type(row: &ElementRef<'_>) -> Option<FileType> {
    let classes = row.value().attr("class")?.to_ascii_lowercase();
    if classes.contains("autoupdate") || classes.contains("exe") {
        Some(FileType::Exe)
    } else if classes.contains("zip") {
        Some(FileType::Zip)
    } else if classes.contains("rar") {
        Some(FileType::Rar)
    } else {
        None
    }
}

/// Whether an anchor target looks like a download
///
/// Absolute URLs qualify by ending in an archive/executable extension;
/// any URL qualifies through the `/download.php` prefix or a
/// download/attachment/file marker substring.
fn is_download_href(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    let absolute = lower.starts_with("http://") || lower.starts_with("https://");
    (absolute && ARCHIVE_TOKENS.iter().any(|token| lower.ends_with(token)))
        || lower.starts_with("/download.php")
        || DOWNLOAD_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// File type inference for unmarked rows: URL extension, then the
/// auto-update token in the URL, then keywords in the filename
fn infer_type(href: &str, filename: &str) -> FileType {
    let url_lower = href.to_ascii_lowercase();
    if url_lower.ends_with(".exe") || url_lower.contains("autoupdate") {
        return FileType::Exe;
    }
    if url_lower.ends_with(".zip") {
        return FileType::Zip;
    }
    if url_lower.ends_with(".rar") {
        return FileType::Rar;
    }

    let name_lower = filename.to_ascii_lowercase();
    if name_lower.contains("exe") {
        FileType::Exe
    } else if name_lower.contains("zip") {
        FileType::Zip
    } else if name_lower.contains("rar") {
        FileType::Rar
    } else {
        FileType::Unknown
    }
}

/// Filename for a link: text content, then title attribute, then the last
/// path segment of the target
fn link_filename(link: &ElementRef<'_>, href: &str) -> String {
    let text = element_text(link);
    if !text.is_empty() {
        return text;
    }
    if let Some(title) = link.value().attr("title") {
        let title = title.trim();
        if !title.is_empty() {
            return title.to_string();
        }
    }
    href.rsplit('/').next().unwrap_or_default().to_string()
}

/// Nearest `tr` ancestor of an anchor, if any
fn enclosing_row<'a>(link: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    link.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "tr")
}

fn cell_text(cells: &[ElementRef<'_>], index: usize) -> String {
    cells
        .get(index)
        .map(element_text)
        .unwrap_or_default()
}

/// Apply the extension-correction invariant and URL normalization shared by
/// every tier
fn finalize_entry(
    mut filename: String,
    date: String,
    size: String,
    downloads: String,
    href: &str,
    file_type: FileType,
) -> VersionEntry {
    if let Some(ext) = file_type.extension() {
        let suffix = format!(".{ext}");
        if !filename.to_ascii_lowercase().ends_with(&suffix) {
            filename.push_str(&suffix);
        }
    }
    VersionEntry {
        filename,
        date,
        size,
        downloads,
        download_url: absolutize(href),
        file_type,
    }
}

/// Global dedup by download URL, preserving first-seen order
fn dedup_by_url(entries: Vec<VersionEntry>) -> Vec<VersionEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.download_url.clone()))
        .collect()
}
