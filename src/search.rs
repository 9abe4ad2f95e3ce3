//! Keyword search over local records plus a pass-through remote search.
//!
//! The two result sets are kept apart. Local hits are scored and ranked
//! here, while remote hits come back in whatever order the API chose.
//!
//! ## Local scoring
//!
//! The query is split on whitespace and lowercased. Each keyword scores one
//! hit for a record when it equals a whole lowercase token of the title, or
//! equals one of the record's tags ignoring case. Substrings do not count:
//! `"sun"` does not match the title `"Sunset"`.
//!
//! Records with zero hits are dropped. The rest are sorted by hit count,
//! highest first. The sort is stable, so equal scores keep store order.

use crate::layout::Layout;
use crate::remote::{PhotoApi, PhotoSummary, RemoteError, SearchParams};
use crate::resolve::Descriptor;
use crate::store::{ImageRecord, MetadataStore, Records, StoreError};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Metadata store error: {0}")]
    Store(#[from] StoreError),
    #[error("Remote search failed: {0}")]
    Upstream(#[from] RemoteError),
}

/// Fixed parameters forwarded to the remote search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSearch {
    /// Maximum remote results kept.
    pub per_page: u32,
    pub safe_search: u8,
    pub extras: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalHit {
    pub descriptor: Descriptor,
    pub hits: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    pub query: String,
    pub local: Vec<LocalHit>,
    pub remote: Vec<PhotoSummary>,
}

/// Lowercase whitespace-separated keywords of `query`.
pub fn keywords(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_lowercase).collect()
}

/// Number of `keywords` matching `record`'s title tokens or tags.
pub fn score(keywords: &[String], record: &ImageRecord) -> usize {
    let title = record.title.to_lowercase();
    let title_tokens: Vec<&str> = title.split_whitespace().collect();
    keywords
        .iter()
        .filter(|kw| {
            title_tokens.contains(&kw.as_str())
                || record.tags.iter().any(|t| t.to_lowercase() == **kw)
        })
        .count()
}

/// Rank `records` against `query`.
pub fn search_local(records: &Records, layout: &Layout, query: &str) -> Vec<LocalHit> {
    let keywords = keywords(query);
    if keywords.is_empty() {
        return Vec::new();
    }
    let mut hits: Vec<LocalHit> = records
        .iter()
        .filter_map(|(id, record)| {
            let hits = score(&keywords, record);
            (hits > 0).then(|| LocalHit {
                descriptor: Descriptor::local(layout, id, record),
                hits,
            })
        })
        .collect();
    hits.sort_by(|a, b| b.hits.cmp(&a.hits));
    hits
}

/// Forward the raw query to the remote API and keep its top results.
pub fn search_remote(
    api: &dyn PhotoApi,
    options: &RemoteSearch,
    query: &str,
) -> Result<Vec<PhotoSummary>, RemoteError> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut results = api.search(&SearchParams {
        text: query.to_string(),
        per_page: options.per_page,
        safe_search: options.safe_search,
        extras: options.extras.clone(),
    })?;
    results.truncate(options.per_page as usize);
    Ok(results)
}

/// Run both searches. A remote failure fails the whole search.
pub fn search(
    store: &MetadataStore,
    api: &dyn PhotoApi,
    layout: &Layout,
    options: &RemoteSearch,
    query: &str,
) -> Result<SearchResults, SearchError> {
    let local = search_local(&store.load()?, layout, query);
    let remote = search_remote(api, options, query)?;
    debug!(query, local = local.len(), remote = remote.len(), "search complete");
    Ok(SearchResults {
        query: query.to_string(),
        local,
        remote,
    })
}
