//! # Perspective Prism
//!
//! Multi-perspective claim analysis for video transcripts. A job takes a
//! video URL, extracts the claims made in its transcript, gathers evidence
//! for each claim from several source perspectives, and produces a truth
//! profile per claim.
//!
//! ## Architecture
//!
//! ```text
//! create_job ─▶ JobStore (PENDING)
//!                  │
//!                  ▼
//!              Pipeline ── transcript ─▶ claims ─▶ evidence (bounded fan-out)
//!                  │                                  │
//!                  │                                  ▼
//!                  │                    perspective + bias analysis (LLM)
//!                  ▼
//!              JobStore (COMPLETED | FAILED) ◀── get_job_status
//! ```
//!
//! Every piece of untrusted text passes through [`sanitize`] before it is
//! embedded in a prompt.
//!
//! ## Example
//!
//! ```ignore
//! use std::time::Duration;
//! use perspective_prism::{AnalysisService, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let service = AnalysisService::from_config(&config)?;
//!     let job_id = service.create_job("https://youtu.be/dQw4w9WgXcQ").await?;
//!     let status = service.wait_for_job(&job_id, Duration::from_secs(1)).await?;
//!     println!("{}", serde_json::to_string_pretty(&status)?);
//!     Ok(())
//! }
//! ```

/// Claim extraction, evidence retrieval and perspective analysis.
pub mod analysis;
/// Configuration loaded from the environment.
pub mod config;
/// Error types and result aliases.
pub mod error;
/// Job records and the in-memory job store.
pub mod jobs;
/// Completion provider clients.
pub mod llm;
/// Domain and response types.
pub mod models;
/// Per-job orchestration.
pub mod pipeline;
/// Fixed prompt text for the completion provider.
pub mod prompts;
/// Guard for untrusted text entering prompts.
pub mod sanitize;
/// Web search client.
pub mod search;
/// Caller-facing job API.
pub mod service;
/// Transcripts and video URL parsing.
pub mod transcript;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use jobs::{Job, JobStatus, JobStore};
pub use pipeline::Pipeline;
pub use service::{AnalysisService, JobStatusResponse};
