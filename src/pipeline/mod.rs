//! Per-job orchestration: transcript, extraction, retrieval, analysis.
//!
//! Claims are processed one at a time in extraction order. Within a claim,
//! evidence lookups fan out through the retriever and the per-perspective
//! analyses run concurrently, followed by bias scoring.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use tracing::{info, warn};

use crate::analysis::{ClaimExtractor, EvidenceRetriever, PerspectiveAnalyzer};
use crate::error::{PipelineError, PipelineResult};
use crate::jobs::{AdvanceOutcome, JobStatus, JobStore, JobUpdate};
use crate::models::{AnalysisResult, Claim, Perspective, TruthProfile};
use crate::transcript::TranscriptSource;

/// Default cap on claims analyzed per job.
pub const DEFAULT_MAX_CLAIMS: usize = 3;

/// Runs the analysis stages for a job and records the outcome in the store.
pub struct Pipeline {
    transcripts: Arc<dyn TranscriptSource>,
    extractor: Arc<dyn ClaimExtractor>,
    retriever: EvidenceRetriever,
    analyzer: PerspectiveAnalyzer,
    store: JobStore,
    max_claims: usize,
    perspectives: Vec<Perspective>,
}

impl Pipeline {
    pub fn new(
        transcripts: Arc<dyn TranscriptSource>,
        extractor: Arc<dyn ClaimExtractor>,
        retriever: EvidenceRetriever,
        analyzer: PerspectiveAnalyzer,
        store: JobStore,
    ) -> Self {
        Self {
            transcripts,
            extractor,
            retriever,
            analyzer,
            store,
            max_claims: DEFAULT_MAX_CLAIMS,
            perspectives: Perspective::all(),
        }
    }

    /// Override the per-job claim cap.
    pub fn with_max_claims(mut self, max_claims: usize) -> Self {
        self.max_claims = max_claims;
        self
    }

    /// Override the perspective set analyzed for each claim.
    pub fn with_perspectives(mut self, perspectives: Vec<Perspective>) -> Self {
        self.perspectives = perspectives;
        self
    }

    /// The store this pipeline reports into.
    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Drive `job_id` from PENDING to a terminal state.
    ///
    /// Returns the status the job was moved to. If the job disappears from
    /// the store mid-run the analysis still finishes and its outcome is
    /// dropped.
    pub async fn run(&self, job_id: &str, video_id: &str) -> JobStatus {
        if self.store.advance(job_id, JobUpdate::Processing).await == AdvanceOutcome::Missing {
            warn!(job_id = %job_id, "Job vanished before processing started");
        }

        let start = Instant::now();
        let update = match self.analyze_video(video_id).await {
            Ok(result) => {
                info!(
                    job_id = %job_id,
                    video_id = %video_id,
                    claims = result.profiles.len(),
                    elapsed_ms = start.elapsed().as_millis(),
                    "Analysis completed"
                );
                JobUpdate::Completed(result)
            }
            Err(e) => {
                warn!(job_id = %job_id, video_id = %video_id, error = %e, "Analysis failed");
                JobUpdate::Failed(e.to_string())
            }
        };

        let status = update.status();
        self.store.advance(job_id, update).await;
        status
    }

    /// Run every stage for one video. Any error here fails the whole job.
    pub async fn analyze_video(&self, video_id: &str) -> PipelineResult<AnalysisResult> {
        let transcript = self.transcripts.fetch(video_id).await?;

        let mut claims = self.extractor.extract_claims(&transcript).await;
        if let Some(failed) = claims.iter().find(|c| c.is_extraction_error()) {
            let message = failed
                .metadata
                .as_ref()
                .and_then(|m| m.get("details"))
                .and_then(|d| d.as_str())
                .unwrap_or(failed.text.as_str())
                .to_string();
            return Err(PipelineError::Extraction { message });
        }

        if claims.len() > self.max_claims {
            warn!(
                video_id = %video_id,
                extracted = claims.len(),
                limit = self.max_claims,
                "Dropping claims beyond the per-job limit"
            );
            claims.truncate(self.max_claims);
        }

        let mut profiles = Vec::with_capacity(claims.len());
        for claim in claims {
            profiles.push(self.analyze_claim(claim).await?);
        }

        Ok(AnalysisResult {
            video_id: video_id.to_string(),
            analyzed_at: Utc::now(),
            profiles,
        })
    }

    async fn analyze_claim(&self, claim: Claim) -> PipelineResult<TruthProfile> {
        let mut evidence = self
            .retriever
            .retrieve_evidence(&claim, &self.perspectives)
            .await?;

        let per_perspective: Vec<_> = self
            .perspectives
            .iter()
            .map(|&p| (p, evidence.remove(&p).unwrap_or_default()))
            .collect();

        let analyses = join_all(
            per_perspective
                .into_iter()
                .map(|(p, items)| self.analyzer.analyze_perspective(&claim, p, items)),
        )
        .await;

        let bias = self.analyzer.analyze_bias(&claim).await;
        let profile = TruthProfile::new(claim, analyses, bias);

        info!(
            claim_id = %profile.claim.id,
            assessment = %profile.overall_assessment,
            "Claim analyzed"
        );
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::extraction_error_claim;
    use crate::error::{LlmResult, SearchError, SearchResult, TranscriptError};
    use crate::llm::CompletionProvider;
    use crate::models::{Assessment, Stance};
    use crate::prompts::BIAS_ANALYSIS_SYSTEM_PROMPT;
    use crate::search::{RawResult, SearchProvider};
    use crate::transcript::{Transcript, TranscriptSegment};
    use async_trait::async_trait;
    use std::time::Duration;

    struct StaticTranscripts;

    #[async_trait]
    impl TranscriptSource for StaticTranscripts {
        async fn fetch(&self, video_id: &str) -> Result<Transcript, TranscriptError> {
            if video_id == "missing" {
                return Err(TranscriptError::Unavailable {
                    video_id: video_id.to_string(),
                    message: "captions disabled".to_string(),
                });
            }
            Ok(Transcript::new(
                video_id,
                vec![TranscriptSegment {
                    text: "Several bold statements".to_string(),
                    start: 0.0,
                    duration: 4.0,
                }],
            ))
        }
    }

    struct FixedClaims(Vec<Claim>);

    #[async_trait]
    impl ClaimExtractor for FixedClaims {
        async fn extract_claims(&self, _transcript: &Transcript) -> Vec<Claim> {
            self.0.clone()
        }
    }

    struct OneHitSearch;

    #[async_trait]
    impl SearchProvider for OneHitSearch {
        async fn search(&self, query: &str, domains: &[String]) -> SearchResult<Vec<RawResult>> {
            if query.contains("garbled") {
                return Err(SearchError::Decode {
                    message: "bad body".to_string(),
                });
            }
            Ok(vec![RawResult {
                link: format!("https://{}/a", domains[0]),
                title: "Report".to_string(),
                snippet: "Findings".to_string(),
                display_link: domains[0].clone(),
            }])
        }
    }

    /// Supports every claim and rates it mildly deceptive.
    struct AgreeableLlm;

    #[async_trait]
    impl CompletionProvider for AgreeableLlm {
        async fn complete(&self, _prompt: &str, system_prompt: Option<&str>) -> LlmResult<String> {
            if system_prompt == Some(BIAS_ANALYSIS_SYSTEM_PROMPT) {
                Ok(r#"{"deception_rating": 2, "deception_rationale": "Measured"}"#.to_string())
            } else {
                Ok(r#"{"stance": "Support", "confidence": 0.8, "explanation": "Agrees"}"#
                    .to_string())
            }
        }

        fn provider_name(&self) -> &'static str {
            "agreeable"
        }
    }

    fn pipeline(claims: Vec<Claim>) -> Pipeline {
        Pipeline::new(
            Arc::new(StaticTranscripts),
            Arc::new(FixedClaims(claims)),
            EvidenceRetriever::new(Arc::new(OneHitSearch), 3, Duration::from_secs(5)),
            PerspectiveAnalyzer::new(Arc::new(AgreeableLlm)),
            JobStore::new(Duration::from_secs(3600)),
        )
    }

    fn claims(n: usize) -> Vec<Claim> {
        (0..n)
            .map(|i| Claim::new(format!("claim_{}", i), format!("Statement number {}", i)))
            .collect()
    }

    #[tokio::test]
    async fn test_run_completes_job() {
        let pipeline = pipeline(claims(2));
        let job_id = pipeline.store().create("vid").await;

        assert_eq!(pipeline.run(&job_id, "vid").await, JobStatus::Completed);

        let job = pipeline.store().get(&job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.error.is_none());
        let result = job.result.unwrap();
        assert_eq!(result.video_id, "vid");
        assert_eq!(result.profiles.len(), 2);
        assert_eq!(result.profiles[0].claim.id, "claim_0");
        assert_eq!(result.profiles[1].claim.id, "claim_1");

        let profile = &result.profiles[0];
        assert_eq!(profile.perspectives.len(), 4);
        for (analysis, expected) in profile.perspectives.iter().zip(Perspective::all()) {
            assert_eq!(analysis.perspective, expected);
            assert_eq!(analysis.stance, Stance::Support);
            assert_eq!(analysis.evidence[0].source, expected.domains()[0]);
        }
        assert_eq!(profile.bias_analysis.deception_rating, 2.0);
        assert_eq!(profile.overall_assessment, Assessment::LikelyTrue);
    }

    #[tokio::test]
    async fn test_excess_claims_are_dropped() {
        let result = pipeline(claims(5)).analyze_video("vid").await.unwrap();
        let ids: Vec<_> = result.profiles.iter().map(|p| p.claim.id.as_str()).collect();
        assert_eq!(ids, vec!["claim_0", "claim_1", "claim_2"]);

        let result = pipeline(claims(5))
            .with_max_claims(1)
            .with_perspectives(vec![Perspective::Scientific])
            .analyze_video("vid")
            .await
            .unwrap();
        assert_eq!(result.profiles.len(), 1);
        assert_eq!(result.profiles[0].perspectives.len(), 1);
    }

    #[tokio::test]
    async fn test_no_claims_completes_empty() {
        let result = pipeline(Vec::new()).analyze_video("vid").await.unwrap();
        assert!(result.profiles.is_empty());
    }

    #[tokio::test]
    async fn test_transcript_failure_fails_job() {
        let pipeline = pipeline(claims(1));
        let job_id = pipeline.store().create("missing").await;

        assert_eq!(pipeline.run(&job_id, "missing").await, JobStatus::Failed);

        let job = pipeline.store().get(&job_id).await.unwrap();
        assert!(job.result.is_none());
        assert!(job.error.unwrap().contains("captions disabled"));
    }

    #[tokio::test]
    async fn test_extraction_error_fails_job() {
        let pipeline = pipeline(vec![extraction_error_claim("LLM down")]);
        let err = pipeline.analyze_video("vid").await.unwrap_err();
        assert!(matches!(err, PipelineError::Extraction { .. }));
        assert!(err.to_string().contains("LLM down"));
    }

    #[tokio::test]
    async fn test_search_decode_failure_discards_partial_results() {
        let mut list = claims(1);
        list.push(Claim::new("claim_1", "garbled statement"));
        let pipeline = pipeline(list);
        let job_id = pipeline.store().create("vid").await;

        assert_eq!(pipeline.run(&job_id, "vid").await, JobStatus::Failed);
        let job = pipeline.store().get(&job_id).await.unwrap();
        assert!(job.result.is_none());
        assert!(job.error.unwrap().starts_with("Evidence retrieval failed"));
    }

    #[tokio::test]
    async fn test_run_tolerates_reaped_job() {
        let pipeline = pipeline(claims(1));
        assert_eq!(pipeline.run("never-created", "vid").await, JobStatus::Completed);
        assert!(pipeline.store().is_empty().await);
    }
}
