//! System-instruction assembly.
//!
//! Every role has a fixed base instruction (overridable from config). Before
//! each call the base is decorated with the role's best learned tip and any
//! call-specific context by [`assemble`], the single place the layout lives.

use mizan_core::AgentRole;
use std::collections::HashMap;

/// Preamble placed before a role's task when the think/answer protocol is on.
pub const REASONING_PREAMBLE: &str = "You are a specialized Saudi Legal Agent. \
You MUST follow the Reinforcement Learning with Guided Logic (RGL) protocol:\n\
1. First, THINK about the legal reasoning process within <think> </think> tags.\n\
2. Reflect on the specific Articles and Statutes provided in the context.\n\
3. Verify your own reasoning for any jurisdictional errors or hallucinations.\n\
4. Finally, provide your structured output within <answer> </answer> tags.\n\
Strict adherence to the <think> and <answer> format is required for reward optimization.";

/// Built-in base instruction for a role.
pub fn default_instruction(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Triage => {
            "You are the Triage Agent for a Saudi legal research system. \
             Classify the query as SIMPLE (answerable from a single statute article) \
             or COMPLEX (needs several articles or interpretation). Reply with the \
             label followed by one sentence of justification."
        }
        AgentRole::QueryPlanner => {
            "You are the Query Planner. Break the query into legal search tasks \
             for Saudi Labor Law. List the statutes, articles and concepts that must \
             be checked, one per line."
        }
        AgentRole::LegalExtractor => {
            "You are the Legal Extractor. Extract specific Article numbers and legal \
             rules from the provided context. Quote the operative wording and keep \
             each rule attached to its article number. Do not add rules that are \
             not in the context."
        }
        AgentRole::Critic => {
            "You are the Critic. Point out ambiguities, missing conditions and common \
             misreadings that an answer to this query must avoid. Be brief and concrete."
        }
        AgentRole::Verifier => {
            "You are the Verifier. Verify the extracted rules against the source text. \
             Be adversarial: flag anything the sources do not support, wrong article \
             numbers and rules from other jurisdictions. Return only the verified rules."
        }
        AgentRole::Synthesizer => {
            "You are the Synthesizer. Output a JSON object with: answer, sources, \
             jurisdiction, confidence. `sources` is a list of article references, \
             `confidence` a number between 0 and 1. Output ONLY the JSON object."
        }
    }
}

/// Per-role base instructions with config overrides applied.
#[derive(Debug, Clone, Default)]
pub struct PromptBook {
    overrides: HashMap<AgentRole, String>,
}

impl PromptBook {
    pub fn new(overrides: HashMap<AgentRole, String>) -> Self {
        Self { overrides }
    }

    /// The base instruction for `role`.
    pub fn base(&self, role: AgentRole) -> &str {
        self.overrides
            .get(&role)
            .map(String::as_str)
            .unwrap_or_else(|| default_instruction(role))
    }

    pub fn is_overridden(&self, role: AgentRole) -> bool {
        self.overrides.contains_key(&role)
    }
}

/// Wrap a role's task in the think/answer protocol preamble.
pub fn with_reasoning_protocol(role: AgentRole, task: &str) -> String {
    format!("{REASONING_PREAMBLE}\n\nRole: {role} Agent\nTask: {task}")
}

/// Compose the final system instruction.
///
/// Empty tips and contexts are treated as absent.
pub fn assemble(base: &str, learned_tip: Option<&str>, extra_context: Option<&str>) -> String {
    let mut prompt = base.to_string();
    if let Some(tip) = learned_tip.filter(|t| !t.is_empty()) {
        prompt.push_str("\nLearned Optimizations: ");
        prompt.push_str(tip);
    }
    if let Some(context) = extra_context.filter(|c| !c.is_empty()) {
        prompt.push_str("\nAdditional Context: ");
        prompt.push_str(context);
    }
    prompt
}
