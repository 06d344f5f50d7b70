//! Video references and transcripts.
//!
//! Fetching captions from a third-party service is left to implementors of
//! [`TranscriptSource`]; [`FileTranscriptSource`] serves pre-fetched
//! transcripts from disk.

use std::path::PathBuf;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TranscriptError, ValidationError};

/// Maximum transcript characters sent to claim extraction.
pub const MAX_EXTRACTION_CHARS: usize = 12000;

static VIDEO_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("video id pattern is a valid regular expression")
});

/// Whether `id` is shaped like a video id: 1 to 64 ASCII letters, digits,
/// `_` or `-`.
pub fn is_valid_video_id(id: &str) -> bool {
    VIDEO_ID.is_match(id)
}

/// One captioned span of a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub duration: f64,
}

/// Full transcript of a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub video_id: String,
    pub segments: Vec<TranscriptSegment>,
    pub full_text: String,
}

impl Transcript {
    /// Build a transcript, joining segment text into `full_text`.
    pub fn new(video_id: impl Into<String>, segments: Vec<TranscriptSegment>) -> Self {
        let full_text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            video_id: video_id.into(),
            segments,
            full_text,
        }
    }

    /// Render `[MM:SS] text` lines, truncated for the extraction prompt.
    pub fn format_for_extraction(&self) -> String {
        let mut formatted = String::new();
        for seg in &self.segments {
            let total = seg.start.max(0.0) as u64;
            formatted.push_str(&format!(
                "[{:02}:{:02}] {}\n",
                total / 60,
                total % 60,
                seg.text
            ));
        }

        if formatted.chars().count() > MAX_EXTRACTION_CHARS {
            let mut truncated: String = formatted.chars().take(MAX_EXTRACTION_CHARS).collect();
            truncated.push_str("\n...[TRUNCATED]...");
            return truncated;
        }
        formatted
    }
}

/// Source of video transcripts.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the transcript for `video_id`.
    async fn fetch(&self, video_id: &str) -> Result<Transcript, TranscriptError>;
}

/// Loads `<dir>/<video_id>.json`, a JSON array of segments.
#[derive(Debug, Clone)]
pub struct FileTranscriptSource {
    dir: PathBuf,
}

impl FileTranscriptSource {
    /// Create a source reading from `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl TranscriptSource for FileTranscriptSource {
    async fn fetch(&self, video_id: &str) -> Result<Transcript, TranscriptError> {
        // The id becomes a file name; anything else could leave `dir`.
        if !is_valid_video_id(video_id) {
            return Err(TranscriptError::Unavailable {
                video_id: video_id.to_string(),
                message: "not a valid video id".to_string(),
            });
        }
        let path = self.dir.join(format!("{}.json", video_id));
        debug!(path = %path.display(), "Loading transcript");

        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| TranscriptError::Unavailable {
                video_id: video_id.to_string(),
                message: e.to_string(),
            })?;

        let segments: Vec<TranscriptSegment> =
            serde_json::from_str(&raw).map_err(|e| TranscriptError::Malformed {
                video_id: video_id.to_string(),
                message: e.to_string(),
            })?;

        Ok(Transcript::new(video_id, segments))
    }
}

/// Extract the video id from a YouTube URL.
pub fn extract_video_id(url: &str) -> Result<String, ValidationError> {
    let invalid = || ValidationError::InvalidUrl {
        url: url.to_string(),
    };
    let parsed = Url::parse(url.trim()).map_err(|_| invalid())?;
    let path = parsed.path();

    let id: Option<String> = match parsed.host_str() {
        Some("youtu.be") => path
            .trim_start_matches('/')
            .split('/')
            .next()
            .map(str::to_string),
        Some("www.youtube.com") | Some("youtube.com") | Some("m.youtube.com") => {
            if path == "/watch" {
                parsed
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned())
            } else if let Some(rest) = path
                .strip_prefix("/embed/")
                .or_else(|| path.strip_prefix("/v/"))
            {
                rest.split('/').next().map(str::to_string)
            } else {
                None
            }
        }
        _ => None,
    };

    id.filter(|v| is_valid_video_id(v)).ok_or_else(invalid)
}
