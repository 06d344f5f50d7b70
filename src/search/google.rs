use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{build_site_query, RawResult, SearchProvider};
use crate::config::SearchConfig;
use crate::error::{SearchError, SearchResult};

#[derive(Debug, Deserialize)]
struct CustomSearchResponse {
    #[serde(default)]
    items: Vec<RawResult>,
}

/// Client for the Google Custom Search JSON API
#[derive(Clone)]
pub struct GoogleSearchClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    cse_id: Option<String>,
    results_per_query: u32,
    timeout_ms: u64,
}

impl GoogleSearchClient {
    /// Create a new search client
    pub fn new(config: &SearchConfig) -> SearchResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SearchError::Transport {
                message: e.to_string(),
            })?;

        if config.api_key.is_none() || config.cse_id.is_none() {
            warn!("GOOGLE_API_KEY or GOOGLE_CSE_ID not set; searches will return no evidence");
        }

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            cse_id: config.cse_id.clone(),
            results_per_query: config.results_per_query,
            timeout_ms: config.timeout_ms,
        })
    }

    /// Whether both credentials are present
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.cse_id.is_some()
    }

    fn request_failure(&self, e: reqwest::Error) -> SearchError {
        if e.is_timeout() {
            SearchError::Timeout {
                timeout_ms: self.timeout_ms,
            }
        } else {
            SearchError::Transport {
                message: e.to_string(),
            }
        }
    }

    fn classify_failure(status: StatusCode, body: String) -> SearchError {
        let lowered = body.to_lowercase();
        if lowered.contains("dailylimitexceeded") || lowered.contains("quotaexceeded") {
            return SearchError::QuotaExhausted { message: body };
        }
        if status == StatusCode::TOO_MANY_REQUESTS || lowered.contains("ratelimitexceeded") {
            return SearchError::RateLimited { message: body };
        }
        SearchError::Transport {
            message: format!("HTTP {}: {}", status.as_u16(), body),
        }
    }
}

#[async_trait]
impl SearchProvider for GoogleSearchClient {
    async fn search(&self, query: &str, domains: &[String]) -> SearchResult<Vec<RawResult>> {
        let (Some(api_key), Some(cse_id)) = (&self.api_key, &self.cse_id) else {
            return Ok(Vec::new());
        };

        let url = format!("{}/customsearch/v1", self.base_url);
        let full_query = build_site_query(query, domains);
        let num = self.results_per_query.to_string();
        debug!(query = %full_query, "Calling Custom Search");

        let start = Instant::now();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", api_key.as_str()),
                ("cx", cse_id.as_str()),
                ("q", full_query.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.request_failure(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_failure(status, body));
        }

        // Read the body first so a stalled or cut-off transfer stays a
        // transport failure and only unparsable JSON counts as Decode.
        let body = response
            .bytes()
            .await
            .map_err(|e| self.request_failure(e))?;
        let parsed: CustomSearchResponse =
            serde_json::from_slice(&body).map_err(|e| SearchError::Decode {
                message: e.to_string(),
            })?;

        info!(
            results = parsed.items.len(),
            latency_ms = start.elapsed().as_millis(),
            "Custom Search call succeeded"
        );

        Ok(parsed.items)
    }
}
