//! `mizan batch` — run a list of queries and write a timing summary.

use std::path::{Path, PathBuf};

use super::CmdResult;

/// Used when no queries are given on the command line or in a file.
const DEFAULT_QUERIES: [&str; 4] = [
    "What are the mandatory requirements for a valid employment contract under Saudi Labor Law?",
    "Explain the regulations regarding working hours and overtime compensation in Saudi Arabia.",
    "What is the legal procedure for an employer to terminate a contract due to employee misconduct (Article 80)?",
    "What are the rules for annual leave for workers in Saudi Arabia?",
];

pub async fn run(
    config_path: Option<&Path>,
    mut queries: Vec<String>,
    file: Option<PathBuf>,
    output: Option<PathBuf>,
) -> CmdResult {
    if let Some(file) = file {
        let content = std::fs::read_to_string(&file)
            .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
        queries.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(String::from),
        );
    }
    if queries.is_empty() {
        queries = DEFAULT_QUERIES.iter().map(|q| q.to_string()).collect();
    }

    let config = super::load_config(config_path)?;
    let orchestrator = super::build_orchestrator(&config)?;

    eprintln!("⚖️  Running {} queries", queries.len());
    let report = mizan_agent::run_batch(&orchestrator, &queries).await;
    let json = serde_json::to_string_pretty(&report)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json)?;
            eprintln!("📄 Summary written to {}", path.display());
        }
        None => println!("{json}"),
    }

    eprintln!(
        "✅ Completed in {} (average {}), {} failed",
        report.total_execution_time, report.average_time_per_query, report.failures
    );
    Ok(())
}
