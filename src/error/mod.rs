use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Analysis job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },
}

/// Request validation errors, surfaced to the caller before a job exists
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid video URL: {url}")]
    InvalidUrl { url: String },
}

/// Untrusted text rejected by the sanitization guard
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizationError {
    #[error("{field} cannot be empty")]
    Empty { field: String },

    #[error("{field} contains invalid control characters")]
    ControlCharacters { field: String },

    #[error("{field} contains patterns that may indicate a prompt injection attempt")]
    SuspiciousPattern { field: String },
}

/// Completion provider errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM provider unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Empty completion from {provider}")]
    EmptyResponse { provider: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Search provider errors
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Search rate limited: {message}")]
    RateLimited { message: String },

    #[error("Search quota exhausted: {message}")]
    QuotaExhausted { message: String },

    #[error("Search transport error: {message}")]
    Transport { message: String },

    #[error("Failed to decode search response: {message}")]
    Decode { message: String },
}

impl SearchError {
    /// Whether the retriever absorbs this error instead of propagating it.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SearchError::Decode { .. })
    }
}

/// Transcript collaborator errors
#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("Transcript unavailable for {video_id}: {message}")]
    Unavailable { video_id: String, message: String },

    #[error("Malformed transcript for {video_id}: {message}")]
    Malformed { video_id: String, message: String },
}

/// Job store errors
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job not found: {job_id}")]
    NotFound { job_id: String },
}

/// Structural failures that terminate a job as FAILED
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to fetch transcript: {0}")]
    Transcript(#[from] TranscriptError),

    #[error("Claim extraction failed: {message}")]
    Extraction { message: String },

    #[error("Evidence retrieval failed: {0}")]
    Search(#[from] SearchError),

    #[error("Analysis task panicked: {message}")]
    Panicked { message: String },
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for completion calls
pub type LlmResult<T> = Result<T, LlmError>;

/// Result type alias for search calls
pub type SearchResult<T> = Result<T, SearchError>;

/// Result type alias for pipeline runs
pub type PipelineResult<T> = Result<T, PipelineError>;
