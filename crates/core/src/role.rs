//! Agent roles and backend speed tiers.

use serde::{Deserialize, Serialize};

/// Which backend model class serves a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Low-latency, low-cost model used for triage and simple extraction.
    Fast,
    /// High-accuracy model used for planning, verification and synthesis.
    Deep,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fast => write!(f, "fast"),
            Self::Deep => write!(f, "deep"),
        }
    }
}

/// The fixed set of specialised agents the orchestrator dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentRole {
    Triage,
    QueryPlanner,
    LegalExtractor,
    Critic,
    Verifier,
    Synthesizer,
}

impl AgentRole {
    pub const ALL: [AgentRole; 6] = [
        AgentRole::Triage,
        AgentRole::QueryPlanner,
        AgentRole::LegalExtractor,
        AgentRole::Critic,
        AgentRole::Verifier,
        AgentRole::Synthesizer,
    ];

    /// The tier this role runs on unless a call site overrides it.
    pub fn default_tier(self) -> Tier {
        match self {
            Self::Triage | Self::LegalExtractor | Self::Critic => Tier::Fast,
            Self::QueryPlanner | Self::Verifier | Self::Synthesizer => Tier::Deep,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Triage => "Triage",
            Self::QueryPlanner => "QueryPlanner",
            Self::LegalExtractor => "LegalExtractor",
            Self::Critic => "Critic",
            Self::Verifier => "Verifier",
            Self::Synthesizer => "Synthesizer",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentRole {
    type Err = String;

    /// Case-insensitive; accepts the canonical names only.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown agent role: {s}"))
    }
}
