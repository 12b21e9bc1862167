//! Evaluator feedback records.
//!
//! A record is created once by the self-improvement phase and never mutated.
//! The persisted form is a JSON array of
//! `{role, optimization_tip, score, timestamp, query}` objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::role::AgentRole;

/// Records scoring strictly above this value count as successes.
pub const SUCCESS_THRESHOLD: f64 = 0.8;

/// One evaluator verdict on a completed query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// The role whose future prompts this tip is meant for.
    pub role: AgentRole,

    /// Free-text advice re-injected into that role's system instruction.
    pub optimization_tip: String,

    /// Evaluator-assessed output quality in `[0, 1]`.
    pub score: f64,

    /// When the verdict was recorded. Legacy files store float epoch seconds.
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,

    /// The query that was evaluated.
    pub query: String,
}

impl FeedbackRecord {
    pub fn new(
        role: AgentRole,
        optimization_tip: impl Into<String>,
        score: f64,
        query: impl Into<String>,
    ) -> Self {
        Self {
            role,
            optimization_tip: optimization_tip.into(),
            score,
            timestamp: Utc::now(),
            query: query.into(),
        }
    }

    /// Whether this record may bias future prompts.
    pub fn is_success(&self) -> bool {
        self.score > SUCCESS_THRESHOLD
    }
}

mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Rfc3339(DateTime<Utc>),
        EpochSeconds(f64),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawTimestamp::deserialize(deserializer)? {
            RawTimestamp::Rfc3339(ts) => Ok(ts),
            RawTimestamp::EpochSeconds(secs) => {
                DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
                    .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {secs}")))
            }
        }
    }
}
