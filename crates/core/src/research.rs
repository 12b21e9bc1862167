//! The externally visible research output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Outcome of normalizing the Synthesizer's raw output.
///
/// Serializes untagged: a parsed result is emitted exactly as the
/// Synthesizer produced it, a fallback as `{answer, jurisdiction, confidence}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResearchResult {
    /// Valid JSON, passed through without schema validation.
    Parsed(serde_json::Value),
    /// The raw text wrapped in the fallback envelope.
    Fallback(FallbackAnswer),
}

/// Envelope used when the Synthesizer output is not valid JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackAnswer {
    pub answer: String,
    pub jurisdiction: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgl_metrics: Option<RglMetrics>,
}

/// Reasoning-protocol compliance for one pipeline run.
///
/// `adherence_score` measures formatting only and is unrelated to the
/// evaluator's quality score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RglMetrics {
    pub adherence_score: f64,
    #[serde(default)]
    pub thinking_steps: BTreeMap<String, String>,
}

impl ResearchResult {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    /// The `answer` field, when present and a string.
    pub fn answer(&self) -> Option<&str> {
        match self {
            Self::Parsed(value) => value.get("answer").and_then(|a| a.as_str()),
            Self::Fallback(fallback) => Some(&fallback.answer),
        }
    }

    /// The `confidence` field, when present and numeric.
    pub fn confidence(&self) -> Option<f64> {
        match self {
            Self::Parsed(value) => value.get("confidence").and_then(|c| c.as_f64()),
            Self::Fallback(fallback) => Some(fallback.confidence),
        }
    }

    pub fn rgl_metrics(&self) -> Option<RglMetrics> {
        match self {
            Self::Parsed(value) => value
                .get("rgl_metrics")
                .and_then(|m| serde_json::from_value(m.clone()).ok()),
            Self::Fallback(fallback) => fallback.rgl_metrics.clone(),
        }
    }

    /// Attach reasoning metrics. Parsed results that are not JSON objects
    /// have nowhere to carry them and are left untouched.
    pub fn attach_rgl_metrics(&mut self, metrics: RglMetrics) -> bool {
        match self {
            Self::Parsed(serde_json::Value::Object(map)) => match serde_json::to_value(&metrics) {
                Ok(value) => {
                    map.insert("rgl_metrics".into(), value);
                    true
                }
                Err(_) => false,
            },
            Self::Parsed(_) => false,
            Self::Fallback(fallback) => {
                fallback.rgl_metrics = Some(metrics);
                true
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Parsed(value) => value.clone(),
            Self::Fallback(fallback) => {
                serde_json::to_value(fallback).unwrap_or(serde_json::Value::Null)
            }
        }
    }
}
