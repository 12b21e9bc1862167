//! Phase orchestrator — runs one research query through the agent pipeline.
//!
//! # Flow
//!
//! ```text
//! INIT → TRIAGE_AND_PLAN → RETRIEVE → EXTRACT_AND_PRECHECK → VERIFY
//!      → SYNTHESIZE → SELF_IMPROVE → DONE
//! ```
//!
//! The two `AND` phases run their pair of agent calls concurrently through
//! [`join_pair`]; every other phase is sequential. Any backend failure before
//! self-improvement aborts the query. Self-improvement is best-effort and
//! never changes the returned result.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mizan_config::AppConfig;
use mizan_core::error::ProviderError;
use mizan_core::feedback::FeedbackRecord;
use mizan_core::research::{ResearchResult, RglMetrics};
use mizan_core::{AgentRole, Tier};
use mizan_memory::{FeedbackStore, KnowledgeStore, RetrievalResult};
use mizan_telemetry::{Span, SpanKind, Trace, TraceRecorder};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::fanout::join_pair;
use crate::gateway::AgentGateway;
use crate::normalizer::ResultNormalizer;
use crate::prompt::{self, PromptBook};
use crate::reasoning::{self, ReasoningResponse};

/// Pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Init,
    TriageAndPlan,
    Retrieve,
    ExtractAndPrecheck,
    Verify,
    Synthesize,
    SelfImprove,
    Done,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::TriageAndPlan => "TRIAGE_AND_PLAN",
            Self::Retrieve => "RETRIEVE",
            Self::ExtractAndPrecheck => "EXTRACT_AND_PRECHECK",
            Self::Verify => "VERIFY",
            Self::Synthesize => "SYNTHESIZE",
            Self::SelfImprove => "SELF_IMPROVE",
            Self::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Roles prompted with the think/answer protocol when it is enabled.
const REASONING_ROLES: [AgentRole; 4] = [
    AgentRole::QueryPlanner,
    AgentRole::LegalExtractor,
    AgentRole::Verifier,
    AgentRole::Synthesizer,
];

/// Pipeline knobs.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Chunks handed to the extractor.
    pub top_k: usize,
    /// Prompt planner, extractor, verifier and synthesizer with the
    /// think/answer protocol and attach `rgl_metrics` to the result.
    pub reasoning_protocol: bool,
    pub think_preview_chars: usize,
    /// Run the evaluator after each query.
    pub self_improve: bool,
    /// Role evaluator tips are stored under.
    pub attribute_to: AgentRole,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            top_k: 8,
            reasoning_protocol: false,
            think_preview_chars: 100,
            self_improve: true,
            attribute_to: AgentRole::Synthesizer,
        }
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            top_k: config.knowledge.top_k,
            reasoning_protocol: config.pipeline.reasoning_protocol,
            think_preview_chars: config.pipeline.think_preview_chars,
            self_improve: config.pipeline.self_improve,
            attribute_to: config.feedback.attribute_to,
        }
    }
}

/// Everything produced while answering one query.
#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    pub query: String,
    /// The normalized Synthesizer output.
    pub result: ResearchResult,
    /// Triage classification; advisory only.
    pub triage: String,
    pub plan: String,
    pub retrieved: Vec<RetrievalResult>,
    pub extraction: String,
    pub precheck: String,
    pub verification: String,
    /// Mean format reward, when the reasoning protocol is on.
    pub adherence: Option<f64>,
    /// Time from start to a normalized result, excluding self-improvement.
    pub elapsed: Duration,
    /// The record appended by self-improvement, if any.
    pub feedback: Option<FeedbackRecord>,
    pub phases: Vec<Phase>,
    pub trace: Trace,
}

/// The evaluator's verdict.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Evaluation {
    pub optimization_tip: String,
    pub score: f64,
}

/// Output of one agent call.
struct StepOutput {
    raw: String,
    parsed: Option<ReasoningResponse>,
}

impl StepOutput {
    /// The text handed to the next phase.
    fn text(&self) -> &str {
        match &self.parsed {
            Some(parsed) => parsed.answer(),
            None => &self.raw,
        }
    }

    fn reward(&self) -> f64 {
        self.parsed.as_ref().map_or(0.0, ReasoningResponse::format_reward)
    }

    fn think_preview(&self, max_chars: usize) -> String {
        match &self.parsed {
            Some(parsed) => parsed.think_preview(max_chars),
            None => "...".into(),
        }
    }
}

/// Runs research queries against shared knowledge and feedback stores.
pub struct ResearchOrchestrator {
    gateway: AgentGateway,
    knowledge: Arc<KnowledgeStore>,
    feedback: Arc<FeedbackStore>,
    prompts: PromptBook,
    normalizer: ResultNormalizer,
    settings: OrchestratorSettings,
}

impl ResearchOrchestrator {
    pub fn new(
        gateway: AgentGateway,
        knowledge: Arc<KnowledgeStore>,
        feedback: Arc<FeedbackStore>,
    ) -> Self {
        Self {
            gateway,
            knowledge,
            feedback,
            prompts: PromptBook::default(),
            normalizer: ResultNormalizer::default(),
            settings: OrchestratorSettings::default(),
        }
    }

    pub fn with_prompts(mut self, prompts: PromptBook) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_normalizer(mut self, normalizer: ResultNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn knowledge(&self) -> &KnowledgeStore {
        &self.knowledge
    }

    pub fn feedback(&self) -> &FeedbackStore {
        &self.feedback
    }

    /// Answer `query` with the configured `top_k`.
    pub async fn run(&self, query: &str) -> mizan_core::Result<ResearchOutcome> {
        self.run_with_top_k(query, self.settings.top_k).await
    }

    /// Answer `query`, handing at most `top_k` chunks to the extractor.
    pub async fn run_with_top_k(
        &self,
        query: &str,
        top_k: usize,
    ) -> mizan_core::Result<ResearchOutcome> {
        let started = Instant::now();
        let recorder = TraceRecorder::new(query);
        let mut phases = vec![Phase::Init];
        info!(query, reasoning = self.settings.reasoning_protocol, "Research started");

        // ── TRIAGE_AND_PLAN ──
        self.enter(&mut phases, Phase::TriageAndPlan);
        let (triage, plan) = join_pair(
            self.call(&recorder, AgentRole::Triage, Tier::Fast, query, None),
            self.call(&recorder, AgentRole::QueryPlanner, Tier::Deep, query, None),
        )
        .await?;
        info!(triage = %triage.text(), "Triage complete");

        // ── RETRIEVE ──
        self.enter(&mut phases, Phase::Retrieve);
        let mut span = Span::new(SpanKind::Retrieval);
        let retrieved = self.knowledge.retrieve(query, top_k);
        span.end(true);
        recorder.record(span);
        debug!(chunks = retrieved.len(), top_k, "Retrieval complete");
        let sources = serde_json::to_string(&retrieved)?;

        // ── EXTRACT_AND_PRECHECK ──
        self.enter(&mut phases, Phase::ExtractAndPrecheck);
        let (extraction, precheck) = join_pair(
            self.call(&recorder, AgentRole::LegalExtractor, Tier::Fast, &sources, None),
            self.call(&recorder, AgentRole::Critic, Tier::Fast, query, None),
        )
        .await?;

        // ── VERIFY ──
        self.enter(&mut phases, Phase::Verify);
        let verify_input = format!(
            "Query: {query}\nExtraction: {}\nSources: {sources}",
            extraction.text()
        );
        let advice = format!("Pre-check advice: {}", precheck.text());
        let verification = self
            .call(&recorder, AgentRole::Verifier, Tier::Deep, &verify_input, Some(&advice))
            .await?;

        // ── SYNTHESIZE ──
        self.enter(&mut phases, Phase::Synthesize);
        let synth_input = format!("Query: {query}\nVerified: {}", verification.text());
        let synthesis = self
            .call(&recorder, AgentRole::Synthesizer, Tier::Deep, &synth_input, None)
            .await?;

        let mut result = self.normalizer.normalize(synthesis.text());

        let adherence = if self.settings.reasoning_protocol {
            let steps = [&plan, &extraction, &verification, &synthesis];
            let rewards: Vec<f64> = steps.iter().map(|s| s.reward()).collect();
            let adherence = reasoning::aggregate_adherence(&rewards);
            let chars = self.settings.think_preview_chars;
            let thinking_steps = BTreeMap::from([
                ("planner".to_string(), plan.think_preview(chars)),
                ("extractor".to_string(), extraction.think_preview(chars)),
                ("verifier".to_string(), verification.think_preview(chars)),
                ("synthesizer".to_string(), synthesis.think_preview(chars)),
            ]);
            if !result.attach_rgl_metrics(RglMetrics {
                adherence_score: adherence,
                thinking_steps,
            }) {
                warn!("Synthesizer returned a non-object JSON value, rgl_metrics not attached");
            }
            info!(adherence, "Reasoning protocol adherence");
            Some(adherence)
        } else {
            None
        };

        let elapsed = started.elapsed();
        info!(
            elapsed_ms = elapsed.as_millis() as u64,
            fallback = result.is_fallback(),
            "Research answer ready"
        );

        // ── SELF_IMPROVE ──
        let feedback = if self.settings.self_improve {
            self.enter(&mut phases, Phase::SelfImprove);
            self.self_improve(&recorder, query, &result, elapsed).await
        } else {
            None
        };

        self.enter(&mut phases, Phase::Done);

        Ok(ResearchOutcome {
            query: query.to_string(),
            result,
            triage: triage.text().to_string(),
            plan: plan.text().to_string(),
            retrieved,
            extraction: extraction.text().to_string(),
            precheck: precheck.text().to_string(),
            verification: verification.text().to_string(),
            adherence,
            elapsed,
            feedback,
            phases,
            trace: recorder.finish(),
        })
    }

    fn enter(&self, phases: &mut Vec<Phase>, phase: Phase) {
        debug!(phase = %phase, "Entering phase");
        phases.push(phase);
    }

    /// Assemble the system instruction for `role`.
    async fn system_prompt(&self, role: AgentRole, extra_context: Option<&str>) -> String {
        let base = self.prompts.base(role);
        let base = if self.uses_reasoning(role) {
            prompt::with_reasoning_protocol(role, base)
        } else {
            base.to_string()
        };
        let tip = self.feedback.best_tip(role).await;
        prompt::assemble(&base, tip.as_deref(), extra_context)
    }

    fn uses_reasoning(&self, role: AgentRole) -> bool {
        self.settings.reasoning_protocol && REASONING_ROLES.contains(&role)
    }

    /// One traced agent call.
    async fn call(
        &self,
        recorder: &TraceRecorder,
        role: AgentRole,
        tier: Tier,
        user_content: &str,
        extra_context: Option<&str>,
    ) -> Result<StepOutput, ProviderError> {
        let system = self.system_prompt(role, extra_context).await;
        let raw = self.traced_complete(recorder, SpanKind::AgentCall, role, tier, &system, user_content).await?;

        let parsed = self.uses_reasoning(role).then(|| {
            let parsed = ReasoningResponse::parse(&raw);
            if !parsed.has_think() {
                warn!(role = %role, "Agent omitted the think segment");
            }
            parsed
        });

        Ok(StepOutput { raw, parsed })
    }

    async fn traced_complete(
        &self,
        recorder: &TraceRecorder,
        kind: SpanKind,
        role: AgentRole,
        tier: Tier,
        system: &str,
        user_content: &str,
    ) -> Result<String, ProviderError> {
        let mut span = Span::agent_call(role, tier).with_kind(kind);
        match self.gateway.complete(role, system, user_content, tier).await {
            Ok(reply) => {
                span.model = Some(reply.model);
                if let Some(usage) = &reply.usage {
                    span.record_usage(usage);
                }
                span.end(true);
                recorder.record(span);
                Ok(reply.text)
            }
            Err(e) => {
                span.fail(e.to_string());
                recorder.record(span);
                Err(e)
            }
        }
    }

    /// Ask the evaluator to score the result and store its tip.
    ///
    /// Every failure is logged and swallowed.
    async fn self_improve(
        &self,
        recorder: &TraceRecorder,
        query: &str,
        result: &ResearchResult,
        elapsed: Duration,
    ) -> Option<FeedbackRecord> {
        let user_content = evaluation_prompt(query, result, elapsed);
        let system = self.system_prompt(AgentRole::Critic, None).await;

        let raw = match self
            .traced_complete(recorder, SpanKind::Evaluation, AgentRole::Critic, Tier::Deep, &system, &user_content)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Self-improvement skipped: evaluator call failed");
                return None;
            }
        };

        let evaluation = match parse_evaluation(&raw) {
            Ok(evaluation) => evaluation,
            Err(reason) => {
                warn!(reason = %reason, "Self-improvement skipped: unusable evaluator output");
                return None;
            }
        };

        let record = FeedbackRecord::new(
            self.settings.attribute_to,
            evaluation.optimization_tip,
            evaluation.score,
            query,
        );
        match self.feedback.record_feedback(record.clone()).await {
            Ok(()) => {
                info!(
                    role = %record.role,
                    score = record.score,
                    tip = %record.optimization_tip,
                    "Self-improvement: learned new tip"
                );
                Some(record)
            }
            Err(e) => {
                warn!(error = %e, "Self-improvement skipped: feedback not persisted");
                None
            }
        }
    }
}

/// The evaluator's user content.
pub fn evaluation_prompt(query: &str, result: &ResearchResult, elapsed: Duration) -> String {
    format!(
        "Analyze the following legal agent response for query: \"{query}\"\n\
         Response: {}\n\
         Execution Time: {:.2}s\n\n\
         Identify one specific 'optimization_tip' for the 'Synthesizer' or 'LegalExtractor' to improve accuracy or speed.\n\
         Provide a 'score' from 0.0 to 1.0 based on clarity and source attribution.\n\
         Output ONLY JSON.",
        result.to_json(),
        elapsed.as_secs_f64()
    )
}

/// Extract `{optimization_tip, score}` from the evaluator's reply.
///
/// The JSON object is taken from the first `{` to the last `}`, which
/// tolerates markdown fences and surrounding prose.
pub fn parse_evaluation(raw: &str) -> Result<Evaluation, String> {
    let start = raw.find('{').ok_or("no JSON object in evaluator output")?;
    let end = raw.rfind('}').ok_or("no JSON object in evaluator output")?;
    if end < start {
        return Err("no JSON object in evaluator output".into());
    }

    let evaluation: Evaluation =
        serde_json::from_str(&raw[start..=end]).map_err(|e| format!("invalid evaluator JSON: {e}"))?;

    if !(0.0..=1.0).contains(&evaluation.score) {
        return Err(format!("score {} outside [0, 1]", evaluation.score));
    }
    Ok(evaluation)
}
