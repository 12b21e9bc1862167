//! Subcommand implementations and the wiring they share.

pub mod batch;
pub mod config_cmd;
pub mod feedback;
pub mod knowledge;
pub mod research;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use mizan_agent::{
    AgentGateway, OrchestratorSettings, PromptBook, ResearchOrchestrator, ResultNormalizer,
};
use mizan_config::AppConfig;
use mizan_memory::{ChunkingParams, FeedbackStore, KnowledgeStore};

pub type CmdResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// The config file a command should read.
pub fn config_file(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Load configuration with environment overrides applied.
pub fn load_config(path: Option<&Path>) -> CmdResult<AppConfig> {
    let config = AppConfig::load_with_env(&config_file(path))
        .map_err(|e| format!("Failed to load config: {e}"))?;
    Ok(config)
}

pub fn chunking_params(config: &AppConfig) -> CmdResult<ChunkingParams> {
    let k = &config.knowledge;
    Ok(ChunkingParams::new(k.window, k.overlap, k.min_sentence_chars)?)
}

pub fn load_knowledge(config: &AppConfig) -> CmdResult<KnowledgeStore> {
    Ok(KnowledgeStore::load_file(
        &config.knowledge.path,
        chunking_params(config)?,
    ))
}

/// Wire the configured backend, stores and prompts into an orchestrator.
pub fn build_orchestrator(config: &AppConfig) -> CmdResult<ResearchOrchestrator> {
    let local = matches!(
        config.default_provider.as_str(),
        "ollama" | "vllm" | "llamacpp" | "llama.cpp"
    );
    let provider_key = config
        .providers
        .get(&config.default_provider)
        .is_some_and(|p| p.api_key.is_some());
    if !config.has_api_key() && !provider_key && !local {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    MIZAN_API_KEY   = 'sk-...'   (generic)");
        eprintln!("    OPENAI_API_KEY  = 'sk-...'   (for OpenAI direct)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let router = mizan_providers::build_from_config(config);
    let provider = router
        .default()
        .ok_or("No default provider configured")?;

    let gateway = AgentGateway::new(
        provider,
        config.models.clone(),
        Duration::from_secs(config.backend.call_timeout_secs),
    );
    let knowledge = Arc::new(load_knowledge(config)?);
    tracing::debug!(
        chunks = knowledge.len(),
        provider = %config.default_provider,
        "Orchestrator wired"
    );
    let feedback = Arc::new(FeedbackStore::load(&config.feedback.path));

    Ok(ResearchOrchestrator::new(gateway, knowledge, feedback)
        .with_prompts(PromptBook::new(config.prompt_overrides()))
        .with_normalizer(ResultNormalizer::new(
            &config.pipeline.jurisdiction,
            config.pipeline.fallback_confidence,
        ))
        .with_settings(OrchestratorSettings::from_config(config)))
}
