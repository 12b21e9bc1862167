//! Configuration loading, validation, and management for Mizan.
//!
//! Loads configuration from `~/.mizan/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use mizan_core::{AgentRole, Tier};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.mizan/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Backend provider used for every agent call
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Fast/deep model selection
    #[serde(default)]
    pub models: ModelsConfig,

    /// Knowledge base source and chunking
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Feedback history persistence
    #[serde(default)]
    pub feedback: FeedbackConfig,

    /// Pipeline behaviour
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Backend deadlines and retries
    #[serde(default)]
    pub backend: BackendConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Per-role base instruction overrides, keyed by role name
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub prompts: HashMap<String, String>,
}

fn default_provider() -> String {
    "openai".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("models", &self.models)
            .field("knowledge", &self.knowledge)
            .field("feedback", &self.feedback)
            .field("pipeline", &self.pipeline)
            .field("backend", &self.backend)
            .field("providers", &self.providers)
            .field("prompts", &self.prompts.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Model used for the fast tier
    #[serde(default = "default_fast_model")]
    pub fast: String,

    /// Model used for the deep tier
    #[serde(default = "default_deep_model")]
    pub deep: String,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_fast_model() -> String {
    "gpt-4.1-nano".into()
}
fn default_deep_model() -> String {
    "gpt-4.1-mini".into()
}
fn default_max_tokens() -> u32 {
    4096
}

impl ModelsConfig {
    pub fn for_tier(&self, tier: Tier) -> &str {
        match tier {
            Tier::Fast => &self.fast,
            Tier::Deep => &self.deep,
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            fast: default_fast_model(),
            deep: default_deep_model(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Plain UTF-8 knowledge base; missing file means an empty store
    #[serde(default = "default_knowledge_path")]
    pub path: PathBuf,

    /// Sentences per chunk
    #[serde(default = "default_window")]
    pub window: usize,

    /// Sentences shared by consecutive chunks
    #[serde(default = "default_overlap")]
    pub overlap: usize,

    /// Sentences at or below this many characters are discarded
    #[serde(default = "default_min_sentence_chars")]
    pub min_sentence_chars: usize,

    /// Chunks handed to the extractor
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_knowledge_path() -> PathBuf {
    PathBuf::from("saudi_labor_law.txt")
}
fn default_window() -> usize {
    8
}
fn default_overlap() -> usize {
    2
}
fn default_min_sentence_chars() -> usize {
    10
}
fn default_top_k() -> usize {
    8
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            path: default_knowledge_path(),
            window: default_window(),
            overlap: default_overlap(),
            min_sentence_chars: default_min_sentence_chars(),
            top_k: default_top_k(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// JSON array of feedback records, rewritten on every append
    #[serde(default = "default_feedback_path")]
    pub path: PathBuf,

    /// Role the evaluator's tips are attributed to
    #[serde(default = "default_feedback_role")]
    pub attribute_to: AgentRole,
}

fn default_feedback_path() -> PathBuf {
    AppConfig::config_dir().join("agent_feedback_loop.json")
}
fn default_feedback_role() -> AgentRole {
    AgentRole::Synthesizer
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            path: default_feedback_path(),
            attribute_to: default_feedback_role(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Jurisdiction written into fallback results
    #[serde(default = "default_jurisdiction")]
    pub jurisdiction: String,

    /// Confidence written into fallback results (a placeholder, not measured)
    #[serde(default = "default_fallback_confidence")]
    pub fallback_confidence: f64,

    /// Use the think/answer protocol for planner, extractor, verifier and synthesizer
    #[serde(default)]
    pub reasoning_protocol: bool,

    /// Characters of each think segment kept in `rgl_metrics`
    #[serde(default = "default_think_preview_chars")]
    pub think_preview_chars: usize,

    /// Run the evaluator after each query
    #[serde(default = "default_true")]
    pub self_improve: bool,
}

fn default_jurisdiction() -> String {
    "Saudi Arabia".into()
}
fn default_fallback_confidence() -> f64 {
    0.92
}
fn default_think_preview_chars() -> usize {
    100
}
fn default_true() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            jurisdiction: default_jurisdiction(),
            fallback_confidence: default_fallback_confidence(),
            reasoning_protocol: false,
            think_preview_chars: default_think_preview_chars(),
            self_improve: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Deadline for a single agent call, retries included
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Timeout for each individual attempt
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    /// Extra attempts after a retryable failure (0 disables retries)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay; doubles on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_call_timeout_secs() -> u64 {
    180
}
fn default_attempt_timeout_secs() -> u64 {
    120
}
fn default_max_retries() -> u32 {
    2
}
fn default_retry_backoff_ms() -> u64 {
    500
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: default_call_timeout_secs(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.mizan/config.toml).
    ///
    /// Also checks environment variables:
    /// - `MIZAN_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `MIZAN_PROVIDER`, `MIZAN_FAST_MODEL`, `MIZAN_DEEP_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load from an explicit path, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production, a map in tests).
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("MIZAN_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(provider) = lookup("MIZAN_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = lookup("MIZAN_FAST_MODEL") {
            self.models.fast = model;
        }
        if let Some(model) = lookup("MIZAN_DEEP_MODEL") {
            self.models.deep = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".mizan")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.models.temperature < 0.0 || self.models.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "models.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.knowledge.window == 0 {
            return Err(ConfigError::ValidationError(
                "knowledge.window must be at least 1".into(),
            ));
        }

        if self.knowledge.overlap >= self.knowledge.window {
            return Err(ConfigError::ValidationError(format!(
                "knowledge.overlap ({}) must be smaller than knowledge.window ({})",
                self.knowledge.overlap, self.knowledge.window
            )));
        }

        if self.knowledge.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "knowledge.top_k must be at least 1".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.pipeline.fallback_confidence) {
            return Err(ConfigError::ValidationError(
                "pipeline.fallback_confidence must be between 0.0 and 1.0".into(),
            ));
        }

        if self.backend.call_timeout_secs == 0 || self.backend.attempt_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "backend timeouts must be greater than zero".into(),
            ));
        }

        for role in self.prompts.keys() {
            role.parse::<AgentRole>().map_err(ConfigError::ValidationError)?;
        }

        Ok(())
    }

    /// Base-instruction overrides resolved to roles.
    pub fn prompt_overrides(&self) -> HashMap<AgentRole, String> {
        self.prompts
            .iter()
            .filter_map(|(name, prompt)| Some((name.parse().ok()?, prompt.clone())))
            .collect()
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            models: ModelsConfig::default(),
            knowledge: KnowledgeConfig::default(),
            feedback: FeedbackConfig::default(),
            pipeline: PipelineConfig::default(),
            backend: BackendConfig::default(),
            providers: HashMap::new(),
            prompts: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.models.fast, "gpt-4.1-nano");
        assert_eq!(config.models.deep, "gpt-4.1-mini");
        assert_eq!(config.knowledge.window, 8);
        assert_eq!(config.knowledge.overlap, 2);
        assert_eq!(config.pipeline.jurisdiction, "Saudi Arabia");
        assert!((config.pipeline.fallback_confidence - 0.92).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.knowledge.top_k, config.knowledge.top_k);
        assert_eq!(parsed.feedback.attribute_to, AgentRole::Synthesizer);
    }

    #[test]
    fn overlap_must_be_below_window() {
        let mut config = AppConfig::default();
        config.knowledge.window = 5;
        config.knowledge.overlap = 5;
        assert!(config.validate().is_err());

        config.knowledge.overlap = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_fallback_confidence_rejected() {
        let mut config = AppConfig::default();
        config.pipeline.fallback_confidence = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_prompt_role_rejected() {
        let mut config = AppConfig::default();
        config.prompts.insert("Reranker".into(), "Rank things".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/mizan/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().default_provider, "openai");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(
            tmp,
            r#"
default_provider = "openrouter"

[knowledge]
window = 5
overlap = 1

[prompts]
Synthesizer = "Answer in Arabic and English."
"#
        )
        .unwrap();

        let config = AppConfig::load_from(tmp.path()).unwrap();
        assert_eq!(config.default_provider, "openrouter");
        assert_eq!(config.knowledge.window, 5);
        assert_eq!(config.knowledge.overlap, 1);
        assert_eq!(config.knowledge.top_k, 8);
        assert_eq!(config.models.deep, "gpt-4.1-mini");
        let overrides = config.prompt_overrides();
        assert_eq!(
            overrides.get(&AgentRole::Synthesizer).map(String::as_str),
            Some("Answer in Arabic and English.")
        );
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-test"),
            ("MIZAN_FAST_MODEL", "tiny"),
            ("MIZAN_PROVIDER", "openrouter"),
        ]);
        let mut config = AppConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.models.fast, "tiny");
        assert_eq!(config.models.deep, "gpt-4.1-mini");
        assert_eq!(config.default_provider, "openrouter");
    }

    #[test]
    fn debug_output_redacts_keys() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn models_by_tier() {
        let models = ModelsConfig::default();
        assert_eq!(models.for_tier(Tier::Fast), "gpt-4.1-nano");
        assert_eq!(models.for_tier(Tier::Deep), "gpt-4.1-mini");
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4.1-mini"));
        assert!(toml_str.contains("Saudi Arabia"));
    }
}
