//! Domain types shared by the pipeline stages.
//!
//! Claims come out of extraction, evidence out of retrieval, and each claim
//! ends up as a [`TruthProfile`] inside the job's [`AnalysisResult`]. The
//! `Client*` types at the bottom are the response shape handed to callers.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An evidentiary viewpoint used to partition sources and stance analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Perspective {
    #[serde(rename = "Scientific")]
    Scientific,
    #[serde(rename = "Journalistic")]
    Journalistic,
    #[serde(rename = "Partisan (Left)")]
    PartisanLeft,
    #[serde(rename = "Partisan (Right)")]
    PartisanRight,
}

impl Perspective {
    /// Display label, also used inside prompts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Perspective::Scientific => "Scientific",
            Perspective::Journalistic => "Journalistic",
            Perspective::PartisanLeft => "Partisan (Left)",
            Perspective::PartisanRight => "Partisan (Right)",
        }
    }

    /// The fixed perspective set analyzed for every claim.
    pub fn all() -> Vec<Perspective> {
        vec![
            Perspective::Scientific,
            Perspective::Journalistic,
            Perspective::PartisanLeft,
            Perspective::PartisanRight,
        ]
    }

    /// Source domains searched for this perspective.
    pub fn domains(&self) -> &'static [&'static str] {
        match self {
            Perspective::Scientific => &[
                "nature.com",
                "science.org",
                "nih.gov",
                "cdc.gov",
                "who.int",
                "scientificamerican.com",
                "phys.org",
            ],
            Perspective::Journalistic => &[
                "reuters.com",
                "apnews.com",
                "bbc.com",
                "npr.org",
                "pbs.org",
                "nytimes.com",
                "wsj.com",
                "washingtonpost.com",
                "bloomberg.com",
            ],
            Perspective::PartisanLeft => &[
                "msnbc.com",
                "huffpost.com",
                "motherjones.com",
                "democracynow.org",
                "theintercept.com",
                "jacobin.com",
                "vox.com",
            ],
            Perspective::PartisanRight => &[
                "foxnews.com",
                "nypost.com",
                "breitbart.com",
                "dailywire.com",
                "washingtontimes.com",
                "newsmax.com",
                "nationalreview.com",
            ],
        }
    }
}

impl fmt::Display for Perspective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A verifiable statement extracted from a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: String,
    pub text: String,
    pub timestamp_start: Option<f64>,
    pub timestamp_end: Option<f64>,
    pub context: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl Claim {
    /// Create a claim with only id and text set
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            timestamp_start: None,
            timestamp_end: None,
            context: None,
            metadata: None,
        }
    }

    /// Set start and end timestamps in seconds
    pub fn with_timestamps(mut self, start: f64, end: f64) -> Self {
        self.timestamp_start = Some(start);
        self.timestamp_end = Some(end);
        self
    }

    /// Set surrounding transcript context
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Attach metadata
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Whether this is the synthetic claim produced when extraction failed.
    pub fn is_extraction_error(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("status"))
            .and_then(|s| s.as_str())
            == Some("error")
    }
}

/// A search result tagged with the perspective it was retrieved for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub source: String,
    pub perspective: Perspective,
}

/// Relationship between a claim and one perspective's evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stance {
    Support,
    Refute,
    Ambiguous,
    Unknown,
    Error,
}

impl Stance {
    /// Lenient parse of a model-provided stance label.
    pub fn from_label(label: &str) -> Option<Stance> {
        match label.trim().to_lowercase().as_str() {
            "support" | "supports" => Some(Stance::Support),
            "refute" | "refutes" => Some(Stance::Refute),
            "ambiguous" => Some(Stance::Ambiguous),
            _ => None,
        }
    }
}

/// Stance analysis for one (claim, perspective) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerspectiveAnalysis {
    pub perspective: Perspective,
    pub stance: Stance,
    pub confidence: f64,
    pub explanation: String,
    pub evidence: Vec<Evidence>,
}

impl PerspectiveAnalysis {
    /// No evidence was found, so no analysis was attempted.
    pub fn unknown(perspective: Perspective) -> Self {
        Self {
            perspective,
            stance: Stance::Unknown,
            confidence: 0.0,
            explanation: "No evidence found from this perspective.".to_string(),
            evidence: Vec::new(),
        }
    }

    /// Analysis failed; evidence is kept.
    pub fn error(perspective: Perspective, explanation: String, evidence: Vec<Evidence>) -> Self {
        Self {
            perspective,
            stance: Stance::Error,
            confidence: 0.0,
            explanation,
            evidence,
        }
    }
}

/// Bias and deception scoring for one claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasAnalysis {
    pub framing_bias: Option<String>,
    pub sourcing_bias: Option<String>,
    pub omission_bias: Option<String>,
    pub sensationalism: Option<String>,
    /// 0 (honest) to 10 (intentionally deceptive)
    pub deception_rating: f64,
    pub deception_rationale: String,
}

impl BiasAnalysis {
    /// Neutral analysis used when scoring failed.
    pub fn failed(rationale: impl Into<String>) -> Self {
        Self {
            framing_bias: None,
            sourcing_bias: None,
            omission_bias: None,
            sensationalism: None,
            deception_rating: 0.0,
            deception_rationale: rationale.into(),
        }
    }
}

/// Overall verdict for a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assessment {
    #[serde(rename = "Likely True")]
    LikelyTrue,
    #[serde(rename = "Likely False")]
    LikelyFalse,
    #[serde(rename = "Suspicious/Deceptive")]
    SuspiciousDeceptive,
    #[serde(rename = "Mixed")]
    Mixed,
}

impl Assessment {
    /// Derive the verdict from stance counts and the deception rating.
    ///
    /// Stance majorities win over the deception threshold.
    pub fn derive(perspectives: &[PerspectiveAnalysis], deception_rating: f64) -> Self {
        let support = perspectives
            .iter()
            .filter(|p| p.stance == Stance::Support)
            .count();
        let refute = perspectives
            .iter()
            .filter(|p| p.stance == Stance::Refute)
            .count();

        if support > refute && support >= 2 {
            Assessment::LikelyTrue
        } else if refute > support && refute >= 2 {
            Assessment::LikelyFalse
        } else if deception_rating > 7.0 {
            Assessment::SuspiciousDeceptive
        } else {
            Assessment::Mixed
        }
    }

    /// Display label
    pub fn as_str(&self) -> &'static str {
        match self {
            Assessment::LikelyTrue => "Likely True",
            Assessment::LikelyFalse => "Likely False",
            Assessment::SuspiciousDeceptive => "Suspicious/Deceptive",
            Assessment::Mixed => "Mixed",
        }
    }
}

impl fmt::Display for Assessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Complete multi-perspective analysis of one claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruthProfile {
    pub claim: Claim,
    pub perspectives: Vec<PerspectiveAnalysis>,
    pub bias_analysis: BiasAnalysis,
    pub overall_assessment: Assessment,
}

impl TruthProfile {
    /// Assemble a profile, deriving the overall assessment.
    pub fn new(
        claim: Claim,
        perspectives: Vec<PerspectiveAnalysis>,
        bias_analysis: BiasAnalysis,
    ) -> Self {
        let overall_assessment = Assessment::derive(&perspectives, bias_analysis.deception_rating);
        Self {
            claim,
            perspectives,
            bias_analysis,
            overall_assessment,
        }
    }
}

/// Result stored on a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub video_id: String,
    pub analyzed_at: DateTime<Utc>,
    /// In extraction order
    pub profiles: Vec<TruthProfile>,
}

// ============================================================================
// Client response shape
// ============================================================================

/// Analysis metadata returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub analyzed_at: String,
}

/// Bias summary returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasIndicators {
    #[serde(default)]
    pub logical_fallacies: Vec<String>,
    #[serde(default)]
    pub emotional_manipulation: Vec<String>,
    pub deception_score: f64,
}

/// Truth profile keyed by perspective label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientTruthProfile {
    pub overall_assessment: String,
    pub perspectives: BTreeMap<String, PerspectiveAnalysis>,
    pub bias_indicators: BiasIndicators,
}

/// One analyzed claim as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientClaimAnalysis {
    pub claim_text: String,
    pub video_timestamp_start: Option<f64>,
    pub video_timestamp_end: Option<f64>,
    pub truth_profile: ClientTruthProfile,
}

/// Full analysis as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub video_id: String,
    pub metadata: AnalysisMetadata,
    pub claims: Vec<ClientClaimAnalysis>,
}

impl From<&TruthProfile> for ClientClaimAnalysis {
    fn from(profile: &TruthProfile) -> Self {
        let bias = &profile.bias_analysis;
        let emotional_manipulation = [&bias.framing_bias, &bias.sensationalism]
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        let logical_fallacies = [&bias.sourcing_bias, &bias.omission_bias]
            .into_iter()
            .flatten()
            .cloned()
            .collect();

        Self {
            claim_text: profile.claim.text.clone(),
            video_timestamp_start: profile.claim.timestamp_start,
            video_timestamp_end: profile.claim.timestamp_end,
            truth_profile: ClientTruthProfile {
                overall_assessment: profile.overall_assessment.to_string(),
                perspectives: profile
                    .perspectives
                    .iter()
                    .map(|p| (p.perspective.to_string(), p.clone()))
                    .collect(),
                bias_indicators: BiasIndicators {
                    logical_fallacies,
                    emotional_manipulation,
                    deception_score: bias.deception_rating,
                },
            },
        }
    }
}

impl From<&AnalysisResult> for AnalysisResponse {
    fn from(result: &AnalysisResult) -> Self {
        Self {
            video_id: result.video_id.clone(),
            metadata: AnalysisMetadata {
                analyzed_at: result.analyzed_at.to_rfc3339(),
            },
            claims: result.profiles.iter().map(ClientClaimAnalysis::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn analysis(perspective: Perspective, stance: Stance) -> PerspectiveAnalysis {
        PerspectiveAnalysis {
            perspective,
            stance,
            confidence: 0.7,
            explanation: String::new(),
            evidence: Vec::new(),
        }
    }

    fn stances(list: &[Stance]) -> Vec<PerspectiveAnalysis> {
        Perspective::all()
            .into_iter()
            .zip(list.iter())
            .map(|(p, s)| analysis(p, *s))
            .collect()
    }

    #[test]
    fn test_assessment_likely_true() {
        let p = stances(&[Stance::Support, Stance::Support, Stance::Refute, Stance::Unknown]);
        assert_eq!(Assessment::derive(&p, 3.0), Assessment::LikelyTrue);
    }

    #[test]
    fn test_assessment_refutes_beat_deception() {
        let p = stances(&[Stance::Refute, Stance::Refute, Stance::Support, Stance::Ambiguous]);
        assert_eq!(Assessment::derive(&p, 9.0), Assessment::LikelyFalse);
    }

    #[test]
    fn test_assessment_suspicious() {
        let p = stances(&[Stance::Support, Stance::Refute, Stance::Unknown, Stance::Unknown]);
        assert_eq!(Assessment::derive(&p, 8.0), Assessment::SuspiciousDeceptive);
    }

    #[test]
    fn test_assessment_mixed() {
        let p = stances(&[Stance::Support, Stance::Refute, Stance::Unknown, Stance::Error]);
        assert_eq!(Assessment::derive(&p, 7.0), Assessment::Mixed);

        // A single support is not enough
        let p = stances(&[Stance::Support, Stance::Unknown, Stance::Unknown, Stance::Unknown]);
        assert_eq!(Assessment::derive(&p, 0.0), Assessment::Mixed);
    }

    #[test]
    fn test_perspective_serialization() {
        let json = serde_json::to_string(&Perspective::PartisanLeft).unwrap();
        assert_eq!(json, "\"Partisan (Left)\"");
        let parsed: Perspective = serde_json::from_str("\"Partisan (Right)\"").unwrap();
        assert_eq!(parsed, Perspective::PartisanRight);
    }

    #[test]
    fn test_stance_from_label() {
        assert_eq!(Stance::from_label("SUPPORT"), Some(Stance::Support));
        assert_eq!(Stance::from_label(" refutes "), Some(Stance::Refute));
        assert_eq!(Stance::from_label("Ambiguous"), Some(Stance::Ambiguous));
        assert_eq!(Stance::from_label("Unknown"), None);
        assert_eq!(Stance::from_label("Error"), None);
    }

    #[test]
    fn test_extraction_error_claim_detection() {
        let claim = Claim::new("error_claim", "Error")
            .with_metadata(serde_json::json!({ "status": "error" }));
        assert!(claim.is_extraction_error());
        assert!(!Claim::new("claim_0", "Water boils at 100C").is_extraction_error());
    }

    #[test]
    fn test_client_response_shape() {
        let claim = Claim::new("claim_0", "X causes Y").with_timestamps(12.0, 18.5);
        let bias = BiasAnalysis {
            framing_bias: Some("loaded language".to_string()),
            sourcing_bias: None,
            omission_bias: Some("cherry-picked study".to_string()),
            sensationalism: None,
            deception_rating: 4.0,
            deception_rationale: "overstated".to_string(),
        };
        let profile = TruthProfile::new(
            claim,
            stances(&[Stance::Support, Stance::Support, Stance::Refute, Stance::Unknown]),
            bias,
        );
        let result = AnalysisResult {
            video_id: "dQw4w9WgXcQ".to_string(),
            analyzed_at: Utc::now(),
            profiles: vec![profile],
        };

        let response = AnalysisResponse::from(&result);
        assert_eq!(response.video_id, "dQw4w9WgXcQ");
        assert_eq!(response.claims.len(), 1);

        let claim = &response.claims[0];
        assert_eq!(claim.claim_text, "X causes Y");
        assert_eq!(claim.video_timestamp_start, Some(12.0));
        assert_eq!(claim.truth_profile.overall_assessment, "Likely True");
        assert_eq!(claim.truth_profile.perspectives.len(), 4);
        assert!(claim.truth_profile.perspectives.contains_key("Partisan (Left)"));
        assert_eq!(
            claim.truth_profile.bias_indicators.emotional_manipulation,
            vec!["loaded language".to_string()]
        );
        assert_eq!(
            claim.truth_profile.bias_indicators.logical_fallacies,
            vec!["cherry-picked study".to_string()]
        );
        assert_eq!(claim.truth_profile.bias_indicators.deception_score, 4.0);
    }
}
