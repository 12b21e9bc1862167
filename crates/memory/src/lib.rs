//! Knowledge and feedback stores for Mizan.
//!
//! The knowledge store is a read-only keyword index built once at startup.
//! The feedback store is the persisted, append-only evaluator history.

pub mod feedback;
pub mod knowledge;

pub use feedback::FeedbackStore;
pub use knowledge::{ChunkingParams, KnowledgeChunk, KnowledgeStore, RetrievalResult};
