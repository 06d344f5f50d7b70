use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::SearchConfig;
use crate::error::{SearchError, SearchResult};
use crate::models::{Claim, Evidence, Perspective};
use crate::search::{RawResult, SharedSearchProvider};

/// Claim text beyond this many characters is dropped from the search query.
pub const MAX_QUERY_CHARS: usize = 100;

/// Allow-listed domains included per perspective query.
pub const MAX_DOMAINS_PER_QUERY: usize = 5;

/// Title of the placeholder evidence emitted when the search quota is spent.
pub const QUOTA_EXHAUSTED_TITLE: &str = "Search quota exhausted";

/// Fans evidence lookups out across perspectives with a concurrency ceiling.
///
/// The ceiling is a fresh semaphore per [`retrieve_evidence`] call. An
/// optional process-wide semaphore can be layered on top to cap lookups
/// across every job sharing this retriever.
///
/// [`retrieve_evidence`]: EvidenceRetriever::retrieve_evidence
#[derive(Clone)]
pub struct EvidenceRetriever {
    search: SharedSearchProvider,
    concurrency: usize,
    lookup_timeout: Duration,
    global_limit: Option<Arc<Semaphore>>,
}

impl EvidenceRetriever {
    /// Create a retriever with a per-call ceiling and per-lookup timeout.
    pub fn new(search: SharedSearchProvider, concurrency: usize, lookup_timeout: Duration) -> Self {
        Self {
            search,
            concurrency: concurrency.max(1),
            lookup_timeout,
            global_limit: None,
        }
    }

    /// Build from search configuration.
    pub fn from_config(search: SharedSearchProvider, config: &SearchConfig) -> Self {
        let retriever = Self::new(
            search,
            config.concurrency,
            Duration::from_millis(config.timeout_ms),
        );
        match config.global_concurrency {
            Some(permits) => retriever.with_global_limit(permits),
            None => retriever,
        }
    }

    /// Also cap lookups across all calls sharing this retriever.
    pub fn with_global_limit(mut self, permits: usize) -> Self {
        self.global_limit = Some(Arc::new(Semaphore::new(permits.max(1))));
        self
    }

    /// Retrieve evidence for `claim` from each of `perspectives`.
    ///
    /// The map always holds one entry per requested perspective. Timeouts,
    /// rate limits and transport errors degrade to an empty list; quota
    /// exhaustion degrades to a single placeholder entry. Only decode
    /// failures propagate.
    pub async fn retrieve_evidence(
        &self,
        claim: &Claim,
        perspectives: &[Perspective],
    ) -> SearchResult<HashMap<Perspective, Vec<Evidence>>> {
        let query = truncate_query(&claim.text);
        let limiter = Semaphore::new(self.concurrency);

        debug!(
            claim_id = %claim.id,
            perspectives = perspectives.len(),
            concurrency = self.concurrency,
            "Retrieving evidence"
        );

        let lookups = perspectives.iter().map(|&perspective| {
            let limiter = &limiter;
            let query = query.as_str();
            async move { (perspective, self.lookup(limiter, query, perspective).await) }
        });

        let mut evidence = HashMap::with_capacity(perspectives.len());
        for (perspective, outcome) in join_all(lookups).await {
            evidence.insert(perspective, outcome?);
        }

        info!(
            claim_id = %claim.id,
            total_evidence = evidence.values().map(Vec::len).sum::<usize>(),
            "Evidence retrieval completed"
        );

        Ok(evidence)
    }

    async fn lookup(
        &self,
        limiter: &Semaphore,
        query: &str,
        perspective: Perspective,
    ) -> SearchResult<Vec<Evidence>> {
        let _permit = limiter.acquire().await.map_err(closed)?;
        let _global_permit = match &self.global_limit {
            Some(global) => Some(global.acquire().await.map_err(closed)?),
            None => None,
        };

        let domains: Vec<String> = perspective
            .domains()
            .iter()
            .take(MAX_DOMAINS_PER_QUERY)
            .map(|d| d.to_string())
            .collect();

        let outcome = match tokio::time::timeout(
            self.lookup_timeout,
            self.search.search(query, &domains),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(SearchError::Timeout {
                timeout_ms: self.lookup_timeout.as_millis() as u64,
            }),
        };

        match outcome {
            Ok(results) => Ok(results
                .into_iter()
                .map(|raw| to_evidence(raw, perspective))
                .collect()),
            Err(SearchError::QuotaExhausted { message }) => {
                warn!(perspective = %perspective, message = %message, "Search quota exhausted");
                Ok(vec![quota_notice(perspective)])
            }
            Err(e) if e.is_recoverable() => {
                warn!(perspective = %perspective, error = %e, "Evidence lookup failed, continuing without evidence");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}

fn closed(e: tokio::sync::AcquireError) -> SearchError {
    SearchError::Transport {
        message: e.to_string(),
    }
}

fn truncate_query(text: &str) -> String {
    text.chars().take(MAX_QUERY_CHARS).collect()
}

fn to_evidence(raw: RawResult, perspective: Perspective) -> Evidence {
    Evidence {
        url: raw.link,
        title: raw.title,
        snippet: raw.snippet,
        source: raw.display_link,
        perspective,
    }
}

fn quota_notice(perspective: Perspective) -> Evidence {
    Evidence {
        url: String::new(),
        title: QUOTA_EXHAUSTED_TITLE.to_string(),
        snippet: "The search provider's daily quota is exhausted, so no sources could be retrieved for this perspective.".to_string(),
        source: "system".to_string(),
        perspective,
    }
}
