//! Data model for per-query execution traces.

use chrono::{DateTime, Utc};
use mizan_core::{AgentRole, Tier, Usage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Span ──────────────────────────────────────────────────────────────────

/// The kind of work a span represents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    /// A backend call made on behalf of an agent role.
    AgentCall,
    /// A local knowledge base lookup.
    Retrieval,
    /// The post-query self-evaluation call.
    Evaluation,
}

impl std::fmt::Display for SpanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AgentCall => write!(f, "agent_call"),
            Self::Retrieval => write!(f, "retrieval"),
            Self::Evaluation => write!(f, "evaluation"),
        }
    }
}

/// A single traced execution unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    pub id: String,
    pub kind: SpanKind,
    /// Role the call was made for (None for retrieval).
    pub role: Option<AgentRole>,
    pub tier: Option<Tier>,
    /// Concrete model reported by the backend.
    pub model: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Duration in milliseconds (computed on end).
    pub duration_ms: Option<u64>,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    /// Whether the operation succeeded.
    pub success: Option<bool>,
    /// Error message for failed spans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Span {
    /// Create a new span with the given kind.
    pub fn new(kind: SpanKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            role: None,
            tier: None,
            model: None,
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
            input_tokens: None,
            output_tokens: None,
            success: None,
            error: None,
        }
    }

    /// Start a span for a backend call.
    pub fn agent_call(role: AgentRole, tier: Tier) -> Self {
        let mut span = Self::new(SpanKind::AgentCall);
        span.role = Some(role);
        span.tier = Some(tier);
        span
    }

    pub fn with_kind(mut self, kind: SpanKind) -> Self {
        self.kind = kind;
        self
    }

    /// Mark the span as ended with the given success status.
    pub fn end(&mut self, success: bool) {
        let now = Utc::now();
        self.ended_at = Some(now);
        self.duration_ms = Some(
            now.signed_duration_since(self.started_at)
                .num_milliseconds()
                .max(0) as u64,
        );
        self.success = Some(success);
    }

    /// End the span as failed with the given error text.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.end(false);
    }

    /// Record token usage reported by the backend.
    pub fn record_usage(&mut self, usage: &Usage) {
        self.input_tokens = Some(usage.prompt_tokens);
        self.output_tokens = Some(usage.completion_tokens);
    }

    /// Total tokens (input + output), or 0 if not recorded.
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens.unwrap_or(0) + self.output_tokens.unwrap_or(0)
    }
}

// ── Trace ─────────────────────────────────────────────────────────────────

/// All spans recorded while answering one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub id: String,
    pub query: String,
    pub spans: Vec<Span>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Wall-clock time from start to end. Parallel spans overlap, so this
    /// is usually less than the sum of span durations.
    pub elapsed_ms: Option<u64>,
}

impl Trace {
    /// Create a new trace for a query.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            query: query.into(),
            spans: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
            elapsed_ms: None,
        }
    }

    /// Add a span to this trace.
    pub fn add_span(&mut self, span: Span) {
        self.spans.push(span);
    }

    /// Mark the trace as complete.
    pub fn end(&mut self) {
        let now = Utc::now();
        self.ended_at = Some(now);
        self.elapsed_ms = Some(
            now.signed_duration_since(self.started_at)
                .num_milliseconds()
                .max(0) as u64,
        );
    }

    /// Total tokens across all spans.
    pub fn total_tokens(&self) -> u32 {
        self.spans.iter().map(|s| s.total_tokens()).sum()
    }

    /// Sum of span durations in milliseconds.
    pub fn busy_ms(&self) -> u64 {
        self.spans.iter().filter_map(|s| s.duration_ms).sum()
    }

    /// Number of backend calls (agent calls plus evaluation).
    pub fn backend_call_count(&self) -> usize {
        self.spans
            .iter()
            .filter(|s| matches!(s.kind, SpanKind::AgentCall | SpanKind::Evaluation))
            .count()
    }

    /// Spans that ended unsuccessfully.
    pub fn failures(&self) -> impl Iterator<Item = &Span> {
        self.spans.iter().filter(|s| s.success == Some(false))
    }

    /// Spans recorded for a given role, in completion order.
    pub fn spans_for(&self, role: AgentRole) -> impl Iterator<Item = &Span> {
        self.spans.iter().filter(move |s| s.role == Some(role))
    }
}
