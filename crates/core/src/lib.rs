//! # Mizan Core
//!
//! Domain types, traits, and error definitions for the Mizan legal-research
//! agent orchestrator. This crate has **no framework dependencies** — it
//! defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The backend is a trait here; implementations live in `mizan-providers`
//! and in test mocks. Roles, feedback records and research results are plain
//! values shared by the memory, agent and CLI crates.

pub mod error;
pub mod feedback;
pub mod message;
pub mod provider;
pub mod research;
pub mod role;

// Re-export key types at crate root for ergonomics
pub use error::{Error, KnowledgeError, MemoryError, ProviderError, Result};
pub use feedback::{FeedbackRecord, SUCCESS_THRESHOLD};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use research::{FallbackAnswer, ResearchResult, RglMetrics};
pub use role::{AgentRole, Tier};
