//! Result normalizer — turns raw Synthesizer output into a research result.

use mizan_core::research::{FallbackAnswer, ResearchResult};
use tracing::warn;

/// Values written into the fallback envelope.
#[derive(Debug, Clone)]
pub struct ResultNormalizer {
    jurisdiction: String,
    fallback_confidence: f64,
}

impl ResultNormalizer {
    pub fn new(jurisdiction: impl Into<String>, fallback_confidence: f64) -> Self {
        Self {
            jurisdiction: jurisdiction.into(),
            fallback_confidence,
        }
    }

    /// Strictly parse `raw` as JSON. Any valid JSON value is returned as-is;
    /// anything else is wrapped as `{answer, jurisdiction, confidence}`.
    pub fn normalize(&self, raw: &str) -> ResearchResult {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value) => ResearchResult::Parsed(value),
            Err(e) => {
                warn!(error = %e, chars = raw.chars().count(), "Synthesizer output is not JSON, using fallback");
                ResearchResult::Fallback(FallbackAnswer {
                    answer: raw.to_string(),
                    jurisdiction: self.jurisdiction.clone(),
                    confidence: self.fallback_confidence,
                    rgl_metrics: None,
                })
            }
        }
    }
}

impl Default for ResultNormalizer {
    fn default() -> Self {
        Self::new("Saudi Arabia", 0.92)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_json_passes_through() {
        let raw = r#"{"answer": "21 days", "sources": ["Article 109"], "jurisdiction": "Saudi Arabia", "confidence": 0.9}"#;
        let result = ResultNormalizer::default().normalize(raw);
        assert_eq!(
            result,
            ResearchResult::Parsed(json!({
                "answer": "21 days",
                "sources": ["Article 109"],
                "jurisdiction": "Saudi Arabia",
                "confidence": 0.9
            }))
        );
    }

    #[test]
    fn no_schema_validation() {
        let result = ResultNormalizer::default().normalize(r#"{"verdict": "unclear"}"#);
        assert_eq!(result.to_json(), json!({"verdict": "unclear"}));
        assert!(!result.is_fallback());
    }

    #[test]
    fn not_json_uses_exact_fallback() {
        let result = ResultNormalizer::default().normalize("not json");
        assert_eq!(
            result.to_json(),
            json!({"answer": "not json", "jurisdiction": "Saudi Arabia", "confidence": 0.92})
        );
    }

    #[test]
    fn fenced_json_is_not_unwrapped() {
        let raw = "```json\n{\"answer\": \"x\"}\n```";
        let result = ResultNormalizer::default().normalize(raw);
        assert!(result.is_fallback());
        assert_eq!(result.answer(), Some(raw));
    }

    #[test]
    fn configured_fallback_values() {
        let result = ResultNormalizer::new("Kingdom of Saudi Arabia", 0.5).normalize("plain");
        assert_eq!(
            result.to_json(),
            json!({"answer": "plain", "jurisdiction": "Kingdom of Saudi Arabia", "confidence": 0.5})
        );
    }
}
