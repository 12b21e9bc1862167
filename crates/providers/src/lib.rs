//! LLM backend implementations for Mizan.
//!
//! All providers implement the `mizan_core::Provider` trait.
//! The router builds the configured provider and wraps it in the retry policy.

pub mod openai_compat;
pub mod retry;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use retry::{RetryPolicy, RetryProvider};
pub use router::{build_from_config, ProviderRouter};
