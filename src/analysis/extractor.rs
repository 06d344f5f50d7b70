use async_trait::async_trait;
use serde_json::json;
use tracing::{error, info};

use super::decode::decode_claims;
use crate::llm::SharedCompletionProvider;
use crate::models::Claim;
use crate::prompts::{
    CLAIM_EXTRACTION_FORMAT, CLAIM_EXTRACTION_INSTRUCTIONS, CLAIM_EXTRACTION_SYSTEM_PROMPT,
};
use crate::sanitize::wrap_user_data;
use crate::transcript::Transcript;

/// Id of the synthetic claim returned when extraction fails.
pub const ERROR_CLAIM_ID: &str = "error_claim";

/// Turns a transcript into an ordered list of claims.
///
/// Implementations never fail: a failed extraction yields a single claim for
/// which [`Claim::is_extraction_error`] is true.
#[async_trait]
pub trait ClaimExtractor: Send + Sync {
    async fn extract_claims(&self, transcript: &Transcript) -> Vec<Claim>;
}

/// Claim extraction backed by a completion provider.
#[derive(Clone)]
pub struct LlmClaimExtractor {
    llm: SharedCompletionProvider,
}

impl LlmClaimExtractor {
    pub fn new(llm: SharedCompletionProvider) -> Self {
        Self { llm }
    }

    fn build_prompt(transcript: &Transcript) -> String {
        format!(
            "{}\n\n{}\n\n{}",
            CLAIM_EXTRACTION_INSTRUCTIONS,
            wrap_user_data(&transcript.format_for_extraction(), "TRANSCRIPT"),
            CLAIM_EXTRACTION_FORMAT
        )
    }
}

#[async_trait]
impl ClaimExtractor for LlmClaimExtractor {
    async fn extract_claims(&self, transcript: &Transcript) -> Vec<Claim> {
        let prompt = Self::build_prompt(transcript);

        let completion = match self
            .llm
            .complete(&prompt, Some(CLAIM_EXTRACTION_SYSTEM_PROMPT))
            .await
        {
            Ok(text) => text,
            Err(e) => {
                error!(video_id = %transcript.video_id, error = %e, "Claim extraction call failed");
                return vec![extraction_error_claim(&e.to_string())];
            }
        };

        match decode_claims(&completion) {
            Ok(claims) => {
                info!(
                    video_id = %transcript.video_id,
                    claims = claims.len(),
                    provider = self.llm.provider_name(),
                    "Claims extracted"
                );
                claims
            }
            Err(e) => {
                error!(video_id = %transcript.video_id, error = %e, "Unparsable claim extraction output");
                vec![extraction_error_claim(&e.to_string())]
            }
        }
    }
}

/// The synthetic claim standing in for a failed extraction.
pub fn extraction_error_claim(details: &str) -> Claim {
    Claim::new(
        ERROR_CLAIM_ID,
        "Error: Unable to extract claims from video transcript",
    )
    .with_timestamps(0.0, 0.0)
    .with_context("An error occurred during claim extraction. Please try again.")
    .with_metadata(json!({
        "status": "error",
        "code": "llm_extraction_failed",
        "message": "Unable to extract claims from transcript",
        "details": details,
    }))
}
