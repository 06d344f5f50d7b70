//! Decoding of model output.
//!
//! Nothing from the model is trusted: each decoder either rejects the text
//! as unparsable or returns a [`Decoded`] value in which every missing or
//! wrong-typed field has been replaced by a safe default.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::models::{BiasAnalysis, Claim, Stance};

/// Model output that could not be interpreted at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("No JSON found in response: {message}")]
    NoJson { message: String },

    #[error("Invalid JSON in response: {message}")]
    InvalidJson { message: String },

    #[error("Expected a JSON object, got {found}")]
    NotAnObject { found: String },

    #[error("Field '{field}' has the wrong shape")]
    WrongShape { field: String },
}

/// A decoded value, tagged with whether defaults had to be substituted.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    /// Every field was present and well-typed.
    Valid(T),
    /// Some fields were defaulted; `defaulted` names them.
    Degraded { value: T, defaulted: Vec<&'static str> },
}

impl<T> Decoded<T> {
    fn from_parts(value: T, defaulted: Vec<&'static str>) -> Self {
        if defaulted.is_empty() {
            Decoded::Valid(value)
        } else {
            Decoded::Degraded { value, defaulted }
        }
    }

    /// Whether any default was substituted
    pub fn is_degraded(&self) -> bool {
        matches!(self, Decoded::Degraded { .. })
    }

    /// Unwrap the decoded value regardless of tag
    pub fn into_inner(self) -> T {
        match self {
            Decoded::Valid(value) | Decoded::Degraded { value, .. } => value,
        }
    }
}

/// Stance verdict returned by perspective analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct StanceVerdict {
    pub stance: Stance,
    pub confidence: f64,
    pub explanation: String,
}

/// Placeholder when the model gave no usable explanation.
pub const MISSING_EXPLANATION: &str = "Failed to parse explanation.";
/// Placeholder when the model gave no usable deception rationale.
pub const MISSING_RATIONALE: &str = "No rationale provided.";

/// Extract JSON from a completion string, handling markdown code blocks.
///
/// Tries raw JSON first, then a ```json block, then any ``` block.
pub fn extract_json_from_completion(completion: &str) -> Result<&str, DecodeError> {
    let trimmed = completion.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(trimmed);
    }

    let fenced = if completion.contains("```json") {
        completion
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
    } else if completion.contains("```") {
        completion.split("```").nth(1)
    } else {
        None
    };

    fenced
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DecodeError::NoJson {
            message: format!(
                "first 100 chars: '{}'",
                completion.chars().take(100).collect::<String>()
            ),
        })
}

fn parse_object(completion: &str) -> Result<Map<String, Value>, DecodeError> {
    let json_str = extract_json_from_completion(completion)?;
    let value: Value = serde_json::from_str(json_str).map_err(|e| DecodeError::InvalidJson {
        message: e.to_string(),
    })?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DecodeError::NotAnObject {
            found: type_name(&other).to_string(),
        }),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Numbers, or strings holding a number.
fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Decode a perspective stance verdict.
pub fn decode_stance(completion: &str) -> Result<Decoded<StanceVerdict>, DecodeError> {
    let obj = parse_object(completion)?;
    let mut defaulted = Vec::new();

    let stance = match obj
        .get("stance")
        .and_then(Value::as_str)
        .and_then(Stance::from_label)
    {
        Some(stance) => stance,
        None => {
            defaulted.push("stance");
            Stance::Ambiguous
        }
    };

    let confidence = match obj.get("confidence").and_then(as_number) {
        Some(c) if (0.0..=1.0).contains(&c) => c,
        Some(c) => {
            defaulted.push("confidence");
            c.clamp(0.0, 1.0)
        }
        None => {
            defaulted.push("confidence");
            0.0
        }
    };

    let explanation = match non_empty_str(obj.get("explanation")) {
        Some(text) => text.to_string(),
        None => {
            defaulted.push("explanation");
            MISSING_EXPLANATION.to_string()
        }
    };

    Ok(Decoded::from_parts(
        StanceVerdict {
            stance,
            confidence,
            explanation,
        },
        defaulted,
    ))
}

/// Decode a bias and deception analysis.
pub fn decode_bias(completion: &str) -> Result<Decoded<BiasAnalysis>, DecodeError> {
    let obj = parse_object(completion)?;
    let mut defaulted = Vec::new();

    let mut optional_text = |field: &'static str| -> Option<String> {
        match obj.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Some(_) => {
                defaulted.push(field);
                None
            }
        }
    };

    let framing_bias = optional_text("framing_bias");
    let sourcing_bias = optional_text("sourcing_bias");
    let omission_bias = optional_text("omission_bias");
    let sensationalism = optional_text("sensationalism");

    let deception_rating = match obj.get("deception_rating").and_then(as_number) {
        Some(r) if (0.0..=10.0).contains(&r) => r,
        Some(r) => {
            defaulted.push("deception_rating");
            r.clamp(0.0, 10.0)
        }
        None => {
            defaulted.push("deception_rating");
            0.0
        }
    };

    let deception_rationale = match non_empty_str(obj.get("deception_rationale")) {
        Some(text) => text.to_string(),
        None => {
            defaulted.push("deception_rationale");
            MISSING_RATIONALE.to_string()
        }
    };

    Ok(Decoded::from_parts(
        BiasAnalysis {
            framing_bias,
            sourcing_bias,
            omission_bias,
            sensationalism,
            deception_rating,
            deception_rationale,
        },
        defaulted,
    ))
}

/// Decode extracted claims, skipping malformed entries.
///
/// Entries need non-empty `text` and numeric `start_time`/`end_time`;
/// a non-string `context` becomes empty. Ids are `claim_{index}` where
/// index is the entry's position in the model output.
pub fn decode_claims(completion: &str) -> Result<Vec<Claim>, DecodeError> {
    let obj = parse_object(completion)?;

    let items = match obj.get("claims") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(DecodeError::WrongShape {
                field: "claims".to_string(),
            })
        }
    };

    let mut claims = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Some(text) = non_empty_str(item.get("text")) else {
            warn!(claim_index = index, field = "text", "Skipping claim: missing or empty text");
            continue;
        };
        let Some(start) = item.get("start_time").and_then(as_number) else {
            warn!(claim_index = index, field = "start_time", "Skipping claim: missing or non-numeric time");
            continue;
        };
        let Some(end) = item.get("end_time").and_then(as_number) else {
            warn!(claim_index = index, field = "end_time", "Skipping claim: missing or non-numeric time");
            continue;
        };
        let context = item
            .get("context")
            .and_then(Value::as_str)
            .unwrap_or_default();

        claims.push(
            Claim::new(format!("claim_{}", index), text)
                .with_timestamps(start, end)
                .with_context(context),
        );
    }

    Ok(claims)
}
