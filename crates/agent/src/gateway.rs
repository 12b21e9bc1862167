//! Agent gateway — the single boundary to the text-generation backend.
//!
//! Maps a role's speed tier to a concrete model, applies the configured
//! temperature and token cap, and enforces a per-call deadline covering all
//! retries of the underlying provider.

use mizan_config::ModelsConfig;
use mizan_core::error::ProviderError;
use mizan_core::provider::{Provider, ProviderRequest, Usage};
use mizan_core::{AgentRole, Tier};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A completed agent call.
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub text: String,
    /// Model the backend reports having used.
    pub model: String,
    pub tier: Tier,
    pub duration_ms: u64,
    pub usage: Option<Usage>,
}

/// Routes role calls to the backend.
pub struct AgentGateway {
    provider: Arc<dyn Provider>,
    models: ModelsConfig,
    call_timeout: Duration,
}

impl AgentGateway {
    pub fn new(provider: Arc<dyn Provider>, models: ModelsConfig, call_timeout: Duration) -> Self {
        Self {
            provider,
            models,
            call_timeout,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn models(&self) -> &ModelsConfig {
        &self.models
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Send one system instruction and user content on behalf of `role`.
    pub async fn complete(
        &self,
        role: AgentRole,
        system_prompt: &str,
        user_content: &str,
        tier: Tier,
    ) -> Result<AgentReply, ProviderError> {
        let model = self.models.for_tier(tier);
        let mut request = ProviderRequest::exchange(model, system_prompt, user_content)
            .with_temperature(self.models.temperature);
        if self.models.max_tokens > 0 {
            request = request.with_max_tokens(self.models.max_tokens);
        }

        debug!(role = %role, tier = %tier, model, "Agent call started");
        let started = Instant::now();

        let response = match tokio::time::timeout(self.call_timeout, self.provider.complete(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(role = %role, tier = %tier, error = %e, "Agent call failed");
                return Err(e);
            }
            Err(_) => {
                warn!(role = %role, tier = %tier, timeout_secs = self.call_timeout.as_secs(), "Agent call timed out");
                return Err(ProviderError::Timeout(format!(
                    "{role} call exceeded {}s deadline",
                    self.call_timeout.as_secs()
                )));
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        debug!(role = %role, tier = %tier, model = %response.model, duration_ms, "Agent call finished");

        Ok(AgentReply {
            text: response.message.content,
            model: if response.model.is_empty() {
                model.to_string()
            } else {
                response.model
            },
            tier,
            duration_ms,
            usage: response.usage,
        })
    }
}
