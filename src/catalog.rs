//! In-memory catalog of the current search cycle
//!
//! Holds the search results and the version entries of the currently viewed
//! detail page. Contents are replaced wholesale on every successful
//! search/page-view; nothing is persisted.

use crate::types::{SearchResult, VersionEntry};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct CatalogState {
    search_results: Vec<SearchResult>,
    versions: Vec<VersionEntry>,
}

/// Cloneable handle to the current search results and version entries
#[derive(Clone, Default)]
pub struct Catalog {
    state: Arc<RwLock<CatalogState>>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the search results with a new cycle's output
    pub async fn replace_search_results(&self, results: Vec<SearchResult>) {
        let mut state = self.state.write().await;
        state.search_results = results;
    }

    /// Replace the version entries with the currently viewed page's output
    pub async fn replace_versions(&self, versions: Vec<VersionEntry>) {
        let mut state = self.state.write().await;
        state.versions = versions;
    }

    /// Snapshot of the current search results
    pub async fn search_results(&self) -> Vec<SearchResult> {
        self.state.read().await.search_results.clone()
    }

    /// Snapshot of the current page's version entries
    pub async fn versions(&self) -> Vec<VersionEntry> {
        self.state.read().await.versions.clone()
    }

    /// Version entry at the given index, if present
    pub async fn version(&self, index: usize) -> Option<VersionEntry> {
        self.state.read().await.versions.get(index).cloned()
    }

    /// Drop all held results
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.search_results.clear();
        state.versions.clear();
    }
}
