use std::time::Instant;

use tracing::{debug, info, warn};

use super::decode::{decode_bias, decode_stance, Decoded};
use crate::error::SanitizationError;
use crate::llm::SharedCompletionProvider;
use crate::models::{BiasAnalysis, Claim, Evidence, Perspective, PerspectiveAnalysis};
use crate::prompts::{
    BIAS_ANALYSIS_FORMAT, BIAS_ANALYSIS_INSTRUCTIONS, BIAS_ANALYSIS_SYSTEM_PROMPT,
    PERSPECTIVE_ANALYSIS_FORMAT, PERSPECTIVE_ANALYSIS_INSTRUCTIONS,
    PERSPECTIVE_ANALYSIS_SYSTEM_PROMPT,
};
use crate::sanitize::{sanitize, wrap_user_data, SanitizeKind};

/// Per-perspective stance analysis and per-claim bias scoring.
#[derive(Clone)]
pub struct PerspectiveAnalyzer {
    llm: SharedCompletionProvider,
}

impl PerspectiveAnalyzer {
    /// Create a new analyzer backed by `llm`
    pub fn new(llm: SharedCompletionProvider) -> Self {
        Self { llm }
    }

    /// Analyze `claim` against one perspective's evidence.
    ///
    /// Never fails: empty evidence yields `Unknown`, and rejected input,
    /// provider errors or unparsable output yield `Error`. The evidence is
    /// always carried into the result.
    pub async fn analyze_perspective(
        &self,
        claim: &Claim,
        perspective: Perspective,
        evidence: Vec<Evidence>,
    ) -> PerspectiveAnalysis {
        if evidence.is_empty() {
            debug!(claim_id = %claim.id, perspective = %perspective, "No evidence, skipping analysis");
            return PerspectiveAnalysis::unknown(perspective);
        }

        let prompt = match build_perspective_prompt(claim, perspective, &evidence) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(
                    claim_id = %claim.id,
                    perspective = %perspective,
                    error = %e,
                    "Rejected untrusted input for perspective analysis"
                );
                return PerspectiveAnalysis::error(
                    perspective,
                    format!("Input validation failed: {}", e),
                    evidence,
                );
            }
        };

        let start = Instant::now();
        let completion = match self
            .llm
            .complete(&prompt, Some(PERSPECTIVE_ANALYSIS_SYSTEM_PROMPT))
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(claim_id = %claim.id, perspective = %perspective, error = %e, "Perspective analysis failed");
                return PerspectiveAnalysis::error(
                    perspective,
                    format!("Analysis failed: {}", e),
                    evidence,
                );
            }
        };

        let verdict = match decode_stance(&completion) {
            Ok(Decoded::Valid(verdict)) => verdict,
            Ok(Decoded::Degraded { value, defaulted }) => {
                warn!(
                    claim_id = %claim.id,
                    perspective = %perspective,
                    defaulted = ?defaulted,
                    "Perspective analysis output defaulted"
                );
                value
            }
            Err(e) => {
                warn!(claim_id = %claim.id, perspective = %perspective, error = %e, "Unparsable perspective analysis");
                return PerspectiveAnalysis::error(
                    perspective,
                    format!("Analysis failed: {}", e),
                    evidence,
                );
            }
        };

        info!(
            claim_id = %claim.id,
            perspective = %perspective,
            stance = ?verdict.stance,
            confidence = verdict.confidence,
            latency_ms = start.elapsed().as_millis(),
            "Perspective analysis completed"
        );

        PerspectiveAnalysis {
            perspective,
            stance: verdict.stance,
            confidence: verdict.confidence,
            explanation: verdict.explanation,
            evidence,
        }
    }

    /// Score `claim` for bias and deception. Never fails; any failure yields
    /// a zero deception rating with the reason in the rationale.
    pub async fn analyze_bias(&self, claim: &Claim) -> BiasAnalysis {
        let prompt = match build_bias_prompt(claim) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(claim_id = %claim.id, error = %e, "Rejected untrusted input for bias analysis");
                return BiasAnalysis::failed(format!("Input validation failed: {}", e));
            }
        };

        let completion = match self
            .llm
            .complete(&prompt, Some(BIAS_ANALYSIS_SYSTEM_PROMPT))
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(claim_id = %claim.id, error = %e, "Bias analysis failed");
                return BiasAnalysis::failed(format!("Analysis failed: {}", e));
            }
        };

        match decode_bias(&completion) {
            Ok(decoded) => {
                if let Decoded::Degraded { defaulted, .. } = &decoded {
                    warn!(claim_id = %claim.id, defaulted = ?defaulted, "Bias analysis output defaulted");
                }
                let bias = decoded.into_inner();
                info!(
                    claim_id = %claim.id,
                    deception_rating = bias.deception_rating,
                    "Bias analysis completed"
                );
                bias
            }
            Err(e) => {
                warn!(claim_id = %claim.id, error = %e, "Unparsable bias analysis");
                BiasAnalysis::failed(format!("Analysis failed: {}", e))
            }
        }
    }
}

/// Build the stance prompt, sanitizing every untrusted field.
pub fn build_perspective_prompt(
    claim: &Claim,
    perspective: Perspective,
    evidence: &[Evidence],
) -> Result<String, SanitizationError> {
    let claim_text = sanitize(&claim.text, SanitizeKind::Claim)?;
    let label = sanitize(perspective.as_str(), SanitizeKind::Perspective)?;
    let evidence_lines = evidence
        .iter()
        .map(|e| {
            sanitize(
                &format!("[{}] {}: {}", e.source, e.title, e.snippet),
                SanitizeKind::Evidence,
            )
            .map(|line| format!("- {}", line))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(format!(
        "{}\n\n{}\n\n{}\n\n{}\n\n{}",
        PERSPECTIVE_ANALYSIS_INSTRUCTIONS,
        wrap_user_data(&claim_text, "CLAIM"),
        wrap_user_data(&label, "PERSPECTIVE"),
        wrap_user_data(&evidence_lines.join("\n"), "EVIDENCE"),
        PERSPECTIVE_ANALYSIS_FORMAT
    ))
}

/// Build the bias prompt, sanitizing claim text and any context.
pub fn build_bias_prompt(claim: &Claim) -> Result<String, SanitizationError> {
    let claim_text = sanitize(&claim.text, SanitizeKind::Claim)?;
    let context = match claim.context.as_deref().map(str::trim) {
        Some(ctx) if !ctx.is_empty() => Some(sanitize(ctx, SanitizeKind::Context)?),
        _ => None,
    };

    let mut prompt = format!(
        "{}\n\n{}\n\n",
        BIAS_ANALYSIS_INSTRUCTIONS,
        wrap_user_data(&claim_text, "CLAIM")
    );
    if let Some(context) = context {
        prompt.push_str(&wrap_user_data(&context, "CONTEXT"));
        prompt.push_str("\n\n");
    }
    prompt.push_str(BIAS_ANALYSIS_FORMAT);
    Ok(prompt)
}
