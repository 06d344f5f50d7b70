//! Web search collaborator used for evidence retrieval.

mod google;

pub use google::GoogleSearchClient;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SearchResult;

/// A single search hit as returned by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResult {
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(rename = "displayLink", default)]
    pub display_link: String,
}

/// A web search capability restricted to an allow-list of domains.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search for `query`, restricted to `domains` when non-empty.
    async fn search(&self, query: &str, domains: &[String]) -> SearchResult<Vec<RawResult>>;
}

/// Shared search provider handle
pub type SharedSearchProvider = Arc<dyn SearchProvider>;

/// Append a `site:` filter for `domains` to `query`.
pub fn build_site_query(query: &str, domains: &[String]) -> String {
    if domains.is_empty() {
        return query.to_string();
    }
    let site_filter = domains
        .iter()
        .map(|d| format!("site:{}", d))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("{} ({})", query, site_filter)
}
