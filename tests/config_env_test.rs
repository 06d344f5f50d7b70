//! Config environment variable tests
//!
//! These tests verify that Config::from_env() correctly reads and applies
//! environment variable overrides. Config::from_env() also loads a .env file
//! via dotenvy, but variables already set in the process take precedence.
//!
//! Tests use #[serial] to prevent race conditions with shared env vars.

use perspective_prism::config::{Config, LlmProvider, LogFormat};
use serial_test::serial;
use std::env;

fn with_openai_key() {
    env::set_var("LLM_PROVIDER", "openai");
    env::set_var("OPENAI_API_KEY", "sk-test");
}

#[test]
#[serial]
fn test_config_defaults() {
    with_openai_key();

    let config = Config::from_env().unwrap();
    assert_eq!(config.llm.provider, LlmProvider::OpenAi);
    assert_eq!(config.search.concurrency, 3);
    assert_eq!(config.search.results_per_query, 3);
    assert_eq!(config.jobs.retention_secs, 3600);
    assert_eq!(config.jobs.reap_interval_secs, 300);
    assert_eq!(config.jobs.max_claims, 3);
}

#[test]
#[serial]
fn test_missing_provider_key_is_config_error() {
    env::set_var("LLM_PROVIDER", "gemini");
    env::set_var("GEMINI_API_KEY", "   ");

    let err = Config::from_env().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Configuration error: GEMINI_API_KEY is not configured. Please set it in your .env file."
    );

    env::remove_var("GEMINI_API_KEY");
    env::set_var("LLM_PROVIDER", "openai");
}

#[test]
#[serial]
fn test_unsupported_provider() {
    env::set_var("LLM_PROVIDER", "claude-local");

    let err = Config::from_env().unwrap_err();
    assert!(err.to_string().contains("Unsupported LLM_PROVIDER: claude-local"));

    env::set_var("LLM_PROVIDER", "openai");
}

#[test]
#[serial]
fn test_gemini_provider() {
    env::set_var("LLM_PROVIDER", "Gemini");
    env::set_var("GEMINI_API_KEY", "g-test");
    env::set_var("GEMINI_MODEL", "gemini-pro");

    let config = Config::from_env().unwrap();
    assert_eq!(config.llm.provider, LlmProvider::Gemini);
    assert_eq!(config.llm.gemini_model, "gemini-pro");

    env::set_var("LLM_PROVIDER", "openai");
    env::remove_var("GEMINI_API_KEY");
    env::remove_var("GEMINI_MODEL");
}

#[test]
#[serial]
fn test_config_from_env_search_overrides() {
    with_openai_key();
    env::set_var("GOOGLE_API_KEY", "g-key");
    env::set_var("GOOGLE_CSE_ID", "cse");
    env::set_var("SEARCH_CONCURRENCY", "5");
    env::set_var("SEARCH_GLOBAL_CONCURRENCY", "8");
    env::set_var("SEARCH_TIMEOUT_MS", "2500");

    let config = Config::from_env().unwrap();
    assert_eq!(config.search.api_key.as_deref(), Some("g-key"));
    assert_eq!(config.search.cse_id.as_deref(), Some("cse"));
    assert_eq!(config.search.concurrency, 5);
    assert_eq!(config.search.global_concurrency, Some(8));
    assert_eq!(config.search.timeout_ms, 2500);

    env::remove_var("GOOGLE_API_KEY");
    env::remove_var("GOOGLE_CSE_ID");
    env::remove_var("SEARCH_CONCURRENCY");
    env::remove_var("SEARCH_GLOBAL_CONCURRENCY");
    env::remove_var("SEARCH_TIMEOUT_MS");
}

#[test]
#[serial]
fn test_config_from_env_custom_request() {
    with_openai_key();
    env::set_var("REQUEST_TIMEOUT_MS", "30000");
    env::set_var("MAX_RETRIES", "5");
    env::set_var("RETRY_DELAY_MS", "2000");

    let config = Config::from_env().unwrap();
    assert_eq!(config.request.timeout_ms, 30000);
    assert_eq!(config.request.max_retries, 5);
    assert_eq!(config.request.retry_delay_ms, 2000);

    env::remove_var("REQUEST_TIMEOUT_MS");
    env::remove_var("MAX_RETRIES");
    env::remove_var("RETRY_DELAY_MS");
}

#[test]
#[serial]
fn test_config_from_env_job_lifecycle() {
    with_openai_key();
    env::set_var("JOB_RETENTION_SECS", "600");
    env::set_var("JOB_REAP_INTERVAL_SECS", "0");
    env::set_var("MAX_CLAIMS_PER_JOB", "7");

    let config = Config::from_env().unwrap();
    assert_eq!(config.jobs.retention_secs, 600);
    // A zero interval would make the reaper spin
    assert_eq!(config.jobs.reap_interval_secs, 1);
    assert_eq!(config.jobs.max_claims, 7);

    env::remove_var("JOB_RETENTION_SECS");
    env::remove_var("JOB_REAP_INTERVAL_SECS");
    env::remove_var("MAX_CLAIMS_PER_JOB");
}

#[test]
#[serial]
fn test_config_invalid_number_uses_default() {
    with_openai_key();
    env::set_var("SEARCH_RESULTS_PER_QUERY", "not-a-number");

    let config = Config::from_env().unwrap();
    assert_eq!(config.search.results_per_query, 3);

    env::remove_var("SEARCH_RESULTS_PER_QUERY");
}

#[test]
#[serial]
fn test_config_from_env_logging() {
    with_openai_key();
    env::set_var("LOG_FORMAT", "json");
    env::set_var("LOG_LEVEL", "debug");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.logging.level, "debug");

    env::remove_var("LOG_FORMAT");
    env::remove_var("LOG_LEVEL");
}
