//! Shared test helpers for gateway and orchestrator tests.

use mizan_core::error::ProviderError;
use mizan_core::message::Message;
use mizan_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use mizan_core::AgentRole;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue.
/// Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Successful text responses, in call order.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(make_text_response(t))).collect())
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let count = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("SequentialMockProvider: no more responses (call #{count})"))
    }
}

/// The phrase each built-in base instruction opens with.
pub fn role_marker(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Triage => "You are the Triage Agent",
        AgentRole::QueryPlanner => "You are the Query Planner",
        AgentRole::LegalExtractor => "You are the Legal Extractor",
        AgentRole::Critic => "You are the Critic",
        AgentRole::Verifier => "You are the Verifier",
        AgentRole::Synthesizer => "You are the Synthesizer",
    }
}

struct Rule {
    needle: String,
    reply: Result<String, ProviderError>,
    delay: Duration,
}

/// A mock that answers by matching the request rather than call order.
///
/// The parallel phases issue calls in no fixed order, so responses are keyed
/// by a needle found in the system prompt or user content. Rules are checked
/// in insertion order; the first match wins.
#[derive(Default)]
pub struct RoleMockProvider {
    rules: Vec<Rule>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl RoleMockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `text` when the request mentions `needle`.
    pub fn on(mut self, needle: &str, text: &str) -> Self {
        self.rules.push(Rule {
            needle: needle.into(),
            reply: Ok(text.into()),
            delay: Duration::ZERO,
        });
        self
    }

    /// Reply to `role`'s built-in instruction with `text`.
    pub fn role(self, role: AgentRole, text: &str) -> Self {
        self.on(role_marker(role), text)
    }

    /// Like [`Self::role`], after sleeping for `delay`.
    pub fn role_after(mut self, role: AgentRole, text: &str, delay: Duration) -> Self {
        self.rules.push(Rule {
            needle: role_marker(role).into(),
            reply: Ok(text.into()),
            delay,
        });
        self
    }

    /// Fail requests that mention `needle`.
    pub fn fail_on(mut self, needle: &str, error: ProviderError) -> Self {
        self.rules.push(Rule {
            needle: needle.into(),
            reply: Err(error),
            delay: Duration::ZERO,
        });
        self
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests whose system prompt carries `role`'s marker.
    pub fn requests_for(&self, role: AgentRole) -> Vec<ProviderRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.system_prompt().is_some_and(|s| s.contains(role_marker(role))))
            .collect()
    }
}

#[async_trait::async_trait]
impl Provider for RoleMockProvider {
    fn name(&self) -> &str {
        "role_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let system = request.system_prompt().unwrap_or_default().to_string();
        let user = request.user_content().unwrap_or_default().to_string();
        self.requests.lock().unwrap().push(request);

        let rule = self
            .rules
            .iter()
            .find(|r| user.contains(&r.needle) || system.contains(&r.needle))
            .unwrap_or_else(|| panic!("RoleMockProvider: no rule matches system prompt {system:?}"));

        if !rule.delay.is_zero() {
            tokio::time::sleep(rule.delay).await;
        }
        rule.reply.clone().map(|text| make_text_response(&text))
    }
}

/// A provider that never answers.
pub struct HangingProvider;

#[async_trait::async_trait]
impl Provider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        std::future::pending().await
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}
