use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub request: RequestConfig,
    pub jobs: JobConfig,
    pub transcripts: TranscriptConfig,
    pub logging: LoggingConfig,
}

/// Which completion provider backs the analyzer and extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Gemini,
}

impl FromStr for LlmProvider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            "gemini" => Ok(LlmProvider::Gemini),
            other => Err(AppError::Config {
                message: format!("Unsupported LLM_PROVIDER: {}", other),
            }),
        }
    }
}

/// Completion provider configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
}

/// Web search configuration
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub api_key: Option<String>,
    pub cse_id: Option<String>,
    pub base_url: String,
    pub results_per_query: u32,
    /// Lookups in flight per retrieval call
    pub concurrency: usize,
    /// Optional process-wide ceiling shared by every job
    pub global_concurrency: Option<usize>,
    pub timeout_ms: u64,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// Job lifecycle configuration
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub retention_secs: u64,
    pub reap_interval_secs: u64,
    pub max_claims: usize,
}

/// Transcript source configuration
#[derive(Debug, Clone)]
pub struct TranscriptConfig {
    pub dir: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn non_blank(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let provider: LlmProvider = env::var("LLM_PROVIDER")
            .unwrap_or_else(|_| "openai".to_string())
            .parse()?;

        let llm = LlmConfig {
            provider,
            openai_api_key: non_blank("OPENAI_API_KEY").unwrap_or_default(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            gemini_api_key: non_blank("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
        };
        llm.validate()?;

        let search = SearchConfig {
            api_key: non_blank("GOOGLE_API_KEY"),
            cse_id: non_blank("GOOGLE_CSE_ID"),
            base_url: env::var("SEARCH_BASE_URL")
                .unwrap_or_else(|_| "https://www.googleapis.com".to_string()),
            results_per_query: env_parse("SEARCH_RESULTS_PER_QUERY", 3),
            concurrency: env_parse("SEARCH_CONCURRENCY", 3usize).max(1),
            global_concurrency: env::var("SEARCH_GLOBAL_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|n| *n > 0),
            timeout_ms: env_parse("SEARCH_TIMEOUT_MS", 10_000),
        };

        let request = RequestConfig {
            timeout_ms: env_parse("REQUEST_TIMEOUT_MS", 60_000),
            max_retries: env_parse("MAX_RETRIES", 2),
            retry_delay_ms: env_parse("RETRY_DELAY_MS", 1000),
        };

        let jobs = JobConfig {
            retention_secs: env_parse("JOB_RETENTION_SECS", 3600),
            reap_interval_secs: env_parse("JOB_REAP_INTERVAL_SECS", 300u64).max(1),
            max_claims: env_parse("MAX_CLAIMS_PER_JOB", 3),
        };

        let transcripts = TranscriptConfig {
            dir: PathBuf::from(
                env::var("TRANSCRIPT_DIR").unwrap_or_else(|_| "./data/transcripts".to_string()),
            ),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        Ok(Config {
            llm,
            search,
            request,
            jobs,
            transcripts,
            logging,
        })
    }
}

impl LlmConfig {
    /// Ensure the selected provider has a usable API key
    pub fn validate(&self) -> Result<(), AppError> {
        let (key, name) = match self.provider {
            LlmProvider::OpenAi => (&self.openai_api_key, "OPENAI_API_KEY"),
            LlmProvider::Gemini => (&self.gemini_api_key, "GEMINI_API_KEY"),
        };
        if key.trim().is_empty() {
            return Err(AppError::Config {
                message: format!(
                    "{} is not configured. Please set it in your .env file.",
                    name
                ),
            });
        }
        Ok(())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            cse_id: None,
            base_url: "https://www.googleapis.com".to_string(),
            results_per_query: 3,
            concurrency: 3,
            global_concurrency: None,
            timeout_ms: 10_000,
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            max_retries: 2,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            retention_secs: 3600,
            reap_interval_secs: 300,
            max_claims: 3,
        }
    }
}
