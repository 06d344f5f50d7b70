use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, info, warn};

use super::types::{ChatRequest, ChatResponse, GenerateRequest, GenerateResponse};
use super::CompletionProvider;
use crate::config::{LlmConfig, RequestConfig};
use crate::error::{LlmError, LlmResult};

fn build_http_client(request_config: &RequestConfig) -> LlmResult<Client> {
    Client::builder()
        .timeout(Duration::from_millis(request_config.timeout_ms))
        .build()
        .map_err(LlmError::Http)
}

fn map_send_error(e: reqwest::Error, timeout_ms: u64) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout { timeout_ms }
    } else {
        LlmError::Http(e)
    }
}

fn is_retryable(err: &LlmError) -> bool {
    match err {
        LlmError::Api { status, .. } => *status == 429 || *status >= 500,
        LlmError::EmptyResponse { .. } => false,
        _ => true,
    }
}

/// Run `op` with exponential backoff between attempts
async fn with_retries<T, F, Fut>(
    provider: &str,
    request_config: &RequestConfig,
    mut op: F,
) -> LlmResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LlmResult<T>>,
{
    let mut retries = 0;

    loop {
        if retries > 0 {
            let delay = backoff_delay(request_config.retry_delay_ms, retries);
            warn!(
                provider = %provider,
                retry = retries,
                delay_ms = delay.as_millis(),
                "Retrying completion request"
            );
            tokio::time::sleep(delay).await;
        }

        let start = Instant::now();
        match op().await {
            Ok(value) => {
                info!(
                    provider = %provider,
                    latency_ms = start.elapsed().as_millis(),
                    "Completion call succeeded"
                );
                return Ok(value);
            }
            Err(e) => {
                error!(
                    provider = %provider,
                    error = %e,
                    latency_ms = start.elapsed().as_millis(),
                    retry = retries,
                    "Completion call failed"
                );

                if !is_retryable(&e) || request_config.max_retries == 0 {
                    return Err(e);
                }
                if retries >= request_config.max_retries {
                    return Err(LlmError::Unavailable {
                        message: e.to_string(),
                        retries,
                    });
                }
                retries += 1;
            }
        }
    }
}

/// Upper bound on a single backoff sleep.
const MAX_BACKOFF_MS: u64 = 60_000;

/// Exponential backoff for the `retry`th attempt (1-based), capped at
/// [`MAX_BACKOFF_MS`].
fn backoff_delay(base_ms: u64, retry: u32) -> Duration {
    let factor = 2_u64.checked_pow(retry.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

async fn check_status(response: reqwest::Response) -> LlmResult<reqwest::Response> {
    let status = response.status();
    if !status.is_success() {
        let error_body = response.text().await.unwrap_or_default();
        return Err(LlmError::Api {
            status: status.as_u16(),
            message: error_body,
        });
    }
    Ok(response)
}

/// Client for the OpenAI chat completions API
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    request_config: RequestConfig,
}

impl OpenAiClient {
    /// Create a new OpenAI client
    pub fn new(config: &LlmConfig, request_config: RequestConfig) -> LlmResult<Self> {
        Ok(Self {
            client: build_http_client(&request_config)?,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            request_config,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn execute_request(&self, request: &ChatRequest) -> LlmResult<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Calling OpenAI chat completions"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.request_config.timeout_ms))?;

        let chat: ChatResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse {
                message: format!("Failed to parse response: {}", e),
            })?;

        chat.text()
            .map(str::to_string)
            .ok_or_else(|| LlmError::EmptyResponse {
                provider: self.provider_name().to_string(),
            })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, prompt: &str, system_prompt: Option<&str>) -> LlmResult<String> {
        let request = &ChatRequest::json(&self.model, prompt, system_prompt);
        with_retries(self.provider_name(), &self.request_config, move || {
            self.execute_request(request)
        })
        .await
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Client for the Gemini generateContent API
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    request_config: RequestConfig,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: &LlmConfig, request_config: RequestConfig) -> LlmResult<Self> {
        Ok(Self {
            client: build_http_client(&request_config)?,
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            request_config,
        })
    }

    async fn execute_request(&self, request: &GenerateRequest) -> LlmResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        debug!(model = %self.model, "Calling Gemini generateContent");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.request_config.timeout_ms))?;

        let generated: GenerateResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse {
                message: format!("Failed to parse response: {}", e),
            })?;

        generated.text().ok_or_else(|| LlmError::EmptyResponse {
            provider: self.provider_name().to_string(),
        })
    }
}

#[async_trait]
impl CompletionProvider for GeminiClient {
    async fn complete(&self, prompt: &str, system_prompt: Option<&str>) -> LlmResult<String> {
        let request = &GenerateRequest::json(prompt, system_prompt);
        with_retries(self.provider_name(), &self.request_config, move || {
            self.execute_request(request)
        })
        .await
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}
