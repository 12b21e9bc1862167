//! End-to-end integration tests for the Mizan research pipeline.
//!
//! These tests wire the real config, knowledge, feedback and orchestrator
//! crates together and only replace the text-generation backend with a
//! scripted provider.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use mizan_agent::{
    AgentGateway, OrchestratorSettings, PromptBook, ResearchOrchestrator, ResultNormalizer,
    run_batch,
};
use mizan_config::{AppConfig, ModelsConfig};
use mizan_core::error::ProviderError;
use mizan_core::message::Message;
use mizan_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use mizan_core::{AgentRole, FeedbackRecord};
use mizan_memory::{ChunkingParams, FeedbackStore, KnowledgeStore};
use serde_json::json;

// ── Mock Provider ────────────────────────────────────────────────────────

/// Answers by matching a needle in the request, since the concurrent
/// phases reach the backend in no fixed order.
struct ScriptedProvider {
    rules: Vec<(String, Result<String, String>)>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new() -> Self {
        Self {
            rules: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn on(mut self, needle: &str, reply: &str) -> Self {
        self.rules.push((needle.into(), Ok(reply.into())));
        self
    }

    fn fail_on(mut self, needle: &str, message: &str) -> Self {
        self.rules.push((needle.into(), Err(message.into())));
        self
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn system_prompts_containing(&self, needle: &str) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|r| r.system_prompt().map(String::from))
            .filter(|s| s.contains(needle))
            .collect()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        let system = request.system_prompt().unwrap_or_default();
        let user = request.user_content().unwrap_or_default();

        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| user.contains(needle.as_str()) || system.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| Ok("no scripted reply".into()));

        match reply {
            Ok(text) => Ok(text_response(&text, &request.model)),
            Err(message) => Err(ProviderError::Network(message)),
        }
    }
}

fn text_response(text: &str, model: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 40,
            completion_tokens: 20,
            total_tokens: 60,
        }),
        model: model.into(),
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────

const ANNUAL_LEAVE: &str = "What are the rules for annual leave for workers in Saudi Arabia?";
const EVALUATOR: &str = "Analyze the following legal agent response";

const LABOR_LAW: &str = "\
Article 109: The worker shall be entitled to an annual leave of not less than twenty-one days.
The annual leave shall be increased to thirty days if the worker has served five consecutive years.
Article 98: A worker may not actually work for more than eight hours a day.
Article 107: The employer shall pay the worker for overtime hours an additional amount.
Article 80: The employer may not terminate the contract without an award or notice except in listed cases.";

const SYNTH_JSON: &str = r#"{"answer": "Workers receive at least 21 days of annual leave, rising to 30 days after five consecutive years of service.", "sources": ["Article 109"], "jurisdiction": "Saudi Arabia", "confidence": 0.93}"#;

fn pipeline_mock() -> ScriptedProvider {
    ScriptedProvider::new()
        .on(EVALUATOR, r#"```json
{"optimization_tip": "Quote the article number next to each entitlement.", "score": 0.9}
```"#)
        .on("You are the Triage Agent", "Category: annual leave. Complexity: low.")
        .on("You are the Query Planner", "1. Find the leave article. 2. Check service-length rules.")
        .on("You are the Legal Extractor", "Article 109 grants 21 days, 30 after five years.")
        .on("You are the Critic", "Make sure the five-year increase is mentioned.")
        .on("You are the Verifier", "Verified against Article 109.")
        .on("You are the Synthesizer", SYNTH_JSON)
}

fn knowledge() -> Arc<KnowledgeStore> {
    Arc::new(KnowledgeStore::from_text(LABOR_LAW, ChunkingParams::compact()))
}

fn orchestrator(
    provider: Arc<ScriptedProvider>,
    feedback: Arc<FeedbackStore>,
) -> ResearchOrchestrator {
    let gateway = AgentGateway::new(provider, ModelsConfig::default(), Duration::from_secs(5));
    ResearchOrchestrator::new(gateway, knowledge(), feedback)
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn annual_leave_query_runs_every_phase() {
    let dir = tempfile::tempdir().unwrap();
    let feedback_path = dir.path().join("feedback_history.json");
    let provider = Arc::new(pipeline_mock());
    let feedback = Arc::new(FeedbackStore::load(&feedback_path));
    let orch = orchestrator(provider.clone(), feedback.clone());

    let outcome = orch.run(ANNUAL_LEAVE).await.unwrap();

    assert_eq!(
        outcome.result.to_json(),
        serde_json::from_str::<serde_json::Value>(SYNTH_JSON).unwrap()
    );
    assert!(!outcome.result.is_fallback());
    assert!(!outcome.retrieved.is_empty());
    assert!(outcome.retrieved[0].text.contains("Article 109"));

    // Six agent calls plus the evaluator.
    assert_eq!(provider.requests().len(), 7);
    assert_eq!(outcome.trace.backend_call_count(), 7);
    assert_eq!(outcome.trace.failures().count(), 0);

    // The Verifier sees the Critic's advice and the serialized sources.
    let verifier = provider.system_prompts_containing("You are the Verifier");
    assert_eq!(verifier.len(), 1);
    assert!(verifier[0].contains("Pre-check advice: Make sure the five-year increase"));

    let record = outcome.feedback.expect("evaluator reply should be recorded");
    assert_eq!(record.role, AgentRole::Synthesizer);
    assert_eq!(record.query, ANNUAL_LEAVE);
    assert!((record.score - 0.9).abs() < f64::EPSILON);

    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&feedback_path).unwrap()).unwrap();
    assert_eq!(on_disk.as_array().unwrap().len(), 1);
    assert_eq!(on_disk[0]["role"], "Synthesizer");
}

#[tokio::test]
async fn non_json_synthesis_becomes_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(
        ScriptedProvider::new()
            .on(EVALUATOR, r#"{"optimization_tip": "Return JSON.", "score": 0.2}"#)
            .on("You are the Synthesizer", "not json"),
    );
    let feedback = Arc::new(FeedbackStore::load(dir.path().join("fb.json")));
    let orch = orchestrator(provider, feedback);

    let outcome = orch.run(ANNUAL_LEAVE).await.unwrap();
    assert_eq!(
        outcome.result.to_json(),
        json!({"answer": "not json", "jurisdiction": "Saudi Arabia", "confidence": 0.92})
    );
}

#[tokio::test]
async fn learned_tip_reaches_the_next_query() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(pipeline_mock());
    let feedback = Arc::new(FeedbackStore::load(dir.path().join("fb.json")));
    let orch = orchestrator(provider.clone(), feedback);

    orch.run(ANNUAL_LEAVE).await.unwrap();
    let first = provider.system_prompts_containing("Learned Optimizations:");
    assert!(first.is_empty(), "no tip exists before the first evaluation");

    orch.run("How is overtime paid?").await.unwrap();
    let tipped = provider.system_prompts_containing(
        "Learned Optimizations: Quote the article number next to each entitlement.",
    );
    assert_eq!(tipped.len(), 1);
    assert!(tipped[0].contains("You are the Synthesizer"));
}

#[tokio::test]
async fn low_scores_never_become_tips() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(
        ScriptedProvider::new()
            .on(EVALUATOR, r#"{"optimization_tip": "Be shorter.", "score": 0.8}"#)
            .on("You are the Synthesizer", SYNTH_JSON),
    );
    let feedback = Arc::new(FeedbackStore::load(dir.path().join("fb.json")));
    let orch = orchestrator(provider.clone(), feedback.clone());

    orch.run(ANNUAL_LEAVE).await.unwrap();
    orch.run(ANNUAL_LEAVE).await.unwrap();

    assert_eq!(feedback.len().await, 2);
    assert!(feedback.best_tip(AgentRole::Synthesizer).await.is_none());
    assert!(provider.system_prompts_containing("Learned Optimizations").is_empty());
}

#[tokio::test]
async fn concurrent_feedback_writers_lose_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feedback_history.json");
    let store = Arc::new(FeedbackStore::load(&path));

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let record = FeedbackRecord::new(
                AgentRole::LegalExtractor,
                format!("tip {i}"),
                0.85,
                format!("query {i}"),
            );
            store.record_feedback(record).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let reloaded = FeedbackStore::load(&path);
    assert_eq!(reloaded.len().await, 16);
    assert!(reloaded.best_tip(AgentRole::LegalExtractor).await.is_some());
}

#[tokio::test]
async fn backend_failure_aborts_the_query() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(
        pipeline_mock_with_failure("You are the Verifier", "connection reset"),
    );
    let feedback = Arc::new(FeedbackStore::load(dir.path().join("fb.json")));
    let orch = orchestrator(provider.clone(), feedback.clone());

    let err = orch.run(ANNUAL_LEAVE).await.unwrap_err();
    assert!(err.to_string().contains("connection reset"));
    assert!(provider.system_prompts_containing("You are the Synthesizer").is_empty());
    assert!(feedback.is_empty().await);
}

fn pipeline_mock_with_failure(needle: &str, message: &str) -> ScriptedProvider {
    let mut mock = ScriptedProvider::new().fail_on(needle, message);
    mock.rules.extend(pipeline_mock().rules);
    mock
}

#[tokio::test]
async fn batch_reports_failures_and_keeps_going() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(
        ScriptedProvider::new()
            .fail_on("misconduct", "upstream 503")
            .on(EVALUATOR, r#"{"optimization_tip": "Fine.", "score": 0.5}"#)
            .on("You are the Synthesizer", SYNTH_JSON),
    );
    let feedback = Arc::new(FeedbackStore::load(dir.path().join("fb.json")));
    let orch = orchestrator(provider, feedback);

    let queries = vec![
        ANNUAL_LEAVE.to_string(),
        "Explain dismissal for employee misconduct".to_string(),
    ];
    let report = run_batch(&orch, &queries).await;

    assert_eq!(report.failures, 1);
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.results[0]["query"], ANNUAL_LEAVE);
    assert_eq!(report.results[0]["sources"], json!(["Article 109"]));
    assert!(report.results[1]["error"].as_str().unwrap().contains("upstream 503"));
    assert!(report.total_execution_time.ends_with('s'));

    let summary = serde_json::to_value(&report).unwrap();
    assert!(summary.get("failures").is_none());
    assert!(summary.get("average_time_per_query").is_some());
}

#[tokio::test]
async fn config_file_drives_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let kb_path = dir.path().join("labor_law.txt");
    let feedback_path = dir.path().join("history.json");
    std::fs::write(&kb_path, LABOR_LAW).unwrap();

    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[models]
fast = "fast-model"
deep = "deep-model"

[knowledge]
path = "{kb}"
window = 2
overlap = 1
top_k = 2

[feedback]
path = "{fb}"
attribute_to = "LegalExtractor"

[pipeline]
jurisdiction = "Kingdom of Saudi Arabia"
fallback_confidence = 0.5
reasoning_protocol = false
self_improve = true

[prompts]
Synthesizer = "You are the Synthesizer. Answer in one sentence."
"#,
            kb = kb_path.display(),
            fb = feedback_path.display()
        ),
    )
    .unwrap();

    let config = AppConfig::load_from(&config_path).unwrap();
    let k = &config.knowledge;
    let params = ChunkingParams::new(k.window, k.overlap, k.min_sentence_chars).unwrap();
    let store = Arc::new(KnowledgeStore::load_file(&k.path, params));
    assert!(!store.is_empty());

    let provider = Arc::new(
        ScriptedProvider::new()
            .on(EVALUATOR, r#"{"optimization_tip": "List every article.", "score": 0.95}"#)
            .on("Answer in one sentence.", "Twenty-one days."),
    );
    let gateway = AgentGateway::new(
        provider.clone(),
        config.models.clone(),
        Duration::from_secs(config.backend.call_timeout_secs),
    );
    let orch = ResearchOrchestrator::new(
        gateway,
        store,
        Arc::new(FeedbackStore::load(&config.feedback.path)),
    )
    .with_prompts(PromptBook::new(config.prompt_overrides()))
    .with_normalizer(ResultNormalizer::new(
        &config.pipeline.jurisdiction,
        config.pipeline.fallback_confidence,
    ))
    .with_settings(OrchestratorSettings::from_config(&config));

    let outcome = orch.run(ANNUAL_LEAVE).await.unwrap();

    assert!(outcome.retrieved.len() <= 2);
    assert_eq!(
        outcome.result.to_json(),
        json!({
            "answer": "Twenty-one days.",
            "jurisdiction": "Kingdom of Saudi Arabia",
            "confidence": 0.5
        })
    );
    assert_eq!(outcome.feedback.unwrap().role, AgentRole::LegalExtractor);

    let models: Vec<String> = provider.requests().iter().map(|r| r.model.clone()).collect();
    assert!(models.iter().any(|m| m == "fast-model"));
    assert!(models.iter().any(|m| m == "deep-model"));
    assert!(models.iter().all(|m| m == "fast-model" || m == "deep-model"));

    let history = FeedbackStore::load(&feedback_path);
    assert_eq!(
        history.best_tip(AgentRole::LegalExtractor).await.as_deref(),
        Some("List every article.")
    );
}
