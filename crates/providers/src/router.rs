//! Provider router — builds the configured backend.
//!
//! Handles provider creation from configuration and wraps the selected
//! provider in the retry policy.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use mizan_core::provider::Provider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::retry::{RetryPolicy, RetryProvider};

/// Routes LLM requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// List all registered provider names.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Retry policy derived from the `[backend]` section.
pub fn retry_policy(config: &mizan_config::BackendConfig) -> RetryPolicy {
    RetryPolicy {
        max_retries: config.max_retries,
        attempt_timeout: Duration::from_secs(config.attempt_timeout_secs),
        base_backoff: Duration::from_millis(config.retry_backoff_ms),
    }
}

/// Build providers from configuration. Every provider is retry-wrapped.
pub fn build_from_config(config: &mizan_config::AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);
    let policy = retry_policy(&config.backend);

    let mut wrap = |name: &str, provider_config: Option<&mizan_config::ProviderConfig>| {
        let api_key = provider_config
            .and_then(|p| p.api_key.clone())
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();

        let base_url = provider_config
            .and_then(|p| p.api_url.clone())
            .unwrap_or_else(|| default_base_url(name));

        let inner: Arc<dyn Provider> = Arc::new(OpenAiCompatProvider::new(name, &base_url, &api_key));
        router.register(name.to_string(), Arc::new(RetryProvider::new(inner, policy)));
    };

    for (name, provider_config) in &config.providers {
        wrap(name, Some(provider_config));
    }

    // Ensure the default provider exists (even if not explicitly configured)
    if !config.providers.contains_key(&config.default_provider) {
        wrap(&config.default_provider, None);
    }

    router
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
