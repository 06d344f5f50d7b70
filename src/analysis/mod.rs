//! Claim extraction, evidence retrieval and per-perspective analysis.
//!
//! Every stage here absorbs its own failures into degraded values. Only
//! search decode errors escape [`EvidenceRetriever`].

mod analyzer;
mod decode;
mod extractor;
mod retriever;

pub use analyzer::{build_bias_prompt, build_perspective_prompt, PerspectiveAnalyzer};
pub use decode::{
    decode_bias, decode_claims, decode_stance, extract_json_from_completion, DecodeError, Decoded,
    StanceVerdict, MISSING_EXPLANATION, MISSING_RATIONALE,
};
pub use extractor::{extraction_error_claim, ClaimExtractor, LlmClaimExtractor, ERROR_CLAIM_ID};
pub use retriever::{
    EvidenceRetriever, MAX_DOMAINS_PER_QUERY, MAX_QUERY_CHARS, QUOTA_EXHAUSTED_TITLE,
};
