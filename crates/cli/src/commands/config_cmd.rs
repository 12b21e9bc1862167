//! `mizan config` — Configuration management commands.

use std::path::Path;

use mizan_config::AppConfig;

use super::CmdResult;

pub fn show(config_path: Option<&Path>) -> CmdResult {
    let mut config = super::load_config(config_path)?;
    if config.api_key.is_some() {
        config.api_key = Some("[REDACTED]".into());
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub fn init(config_path: Option<&Path>, force: bool) -> CmdResult {
    let path = super::config_file(config_path);
    if path.exists() && !force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )
        .into());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, AppConfig::default_toml())?;
    println!("✅ Wrote default configuration to {}", path.display());
    Ok(())
}

pub fn path(config_path: Option<&Path>) {
    println!("{}", super::config_file(config_path).display());
}

pub fn validate(config_path: Option<&Path>) -> CmdResult {
    println!("🔍 Validating configuration...");

    let config = match super::load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("   ❌ {e}");
            return Err(e);
        }
    };
    println!("   ✅ Config parsed successfully");

    let mut warnings = Vec::new();
    if !config.has_api_key() {
        warnings.push("No API key set (set MIZAN_API_KEY or OPENAI_API_KEY env var)".to_string());
    }
    if !config.knowledge.path.exists() {
        warnings.push(format!(
            "Knowledge base {} not found; retrieval will return nothing",
            config.knowledge.path.display()
        ));
    }

    if warnings.is_empty() {
        println!("   ✅ All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("   ⚠️  {w}");
        }
    }

    println!();
    println!("   Provider:   {}", config.default_provider);
    println!("   Models:     fast={} deep={}", config.models.fast, config.models.deep);
    println!(
        "   Knowledge:  {} (window {}, overlap {})",
        config.knowledge.path.display(),
        config.knowledge.window,
        config.knowledge.overlap
    );
    println!("   Feedback:   {}", config.feedback.path.display());
    println!("   Reasoning:  {}", config.pipeline.reasoning_protocol);
    Ok(())
}
