//! `mizan feedback` — inspect the learned-optimization history.

use std::path::Path;

use mizan_core::{AgentRole, SUCCESS_THRESHOLD};
use mizan_memory::FeedbackStore;

use super::CmdResult;

fn parse_role(name: &str) -> CmdResult<AgentRole> {
    Ok(name.parse::<AgentRole>()?)
}

pub async fn list(config_path: Option<&Path>, role: Option<String>) -> CmdResult {
    let config = super::load_config(config_path)?;
    let role = role.as_deref().map(parse_role).transpose()?;
    let store = FeedbackStore::load(&config.feedback.path);

    let records: Vec<_> = store
        .records()
        .await
        .into_iter()
        .filter(|r| role.is_none_or(|role| r.role == role))
        .collect();

    println!("📈 Feedback history ({})", store.path().display());
    println!("=========================");
    if records.is_empty() {
        println!("  (no records)");
        return Ok(());
    }

    for record in &records {
        let marker = if record.is_success() { "✅" } else { "  " };
        println!(
            "{marker} {}  {:<14} {:.2}  {}",
            record.timestamp.format("%Y-%m-%d %H:%M"),
            record.role.as_str(),
            record.score,
            record.optimization_tip
        );
        println!("      query: {}", record.query);
    }
    println!();
    println!("  {} records, ✅ = score above {SUCCESS_THRESHOLD}", records.len());
    Ok(())
}

pub async fn best(config_path: Option<&Path>, role: &str) -> CmdResult {
    let config = super::load_config(config_path)?;
    let role = parse_role(role)?;
    let store = FeedbackStore::load(&config.feedback.path);

    match store.best_tip(role).await {
        Some(tip) => println!("{role}: {tip}"),
        None => println!("{role}: no successful tip recorded yet"),
    }
    Ok(())
}
