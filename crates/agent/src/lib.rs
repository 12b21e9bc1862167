//! The research pipeline — the heart of Mizan.
//!
//! A query moves through a fixed sequence of phases:
//!
//! 1. **Triage and plan** (two agents in parallel)
//! 2. **Retrieve** keyword-matched chunks from the knowledge base
//! 3. **Extract and pre-check** (two agents in parallel)
//! 4. **Verify** the extraction against the sources
//! 5. **Synthesize** the final JSON answer, normalized on failure
//! 6. **Self-improve**: an evaluator scores the answer and its tip is stored
//!    for future prompts
//!
//! Every call goes through the [`AgentGateway`], which maps each role's
//! speed tier to a model and enforces the per-call deadline.

pub mod batch;
pub mod fanout;
pub mod gateway;
pub mod normalizer;
pub mod orchestrator;
pub mod prompt;
pub mod reasoning;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use batch::{BatchReport, run_batch};
pub use fanout::join_pair;
pub use gateway::{AgentGateway, AgentReply};
pub use normalizer::ResultNormalizer;
pub use orchestrator::{
    Evaluation, OrchestratorSettings, Phase, ResearchOrchestrator, ResearchOutcome,
};
pub use prompt::PromptBook;
pub use reasoning::{ReasoningResponse, aggregate_adherence};
