//! `mizan research` — answer a single query.

use std::path::Path;

use super::CmdResult;

pub struct Options {
    pub top_k: Option<usize>,
    pub reasoning: bool,
    pub self_improve: bool,
    pub details: bool,
    pub trace: bool,
}

pub async fn run(config_path: Option<&Path>, query: &str, options: Options) -> CmdResult {
    let mut config = super::load_config(config_path)?;
    if options.reasoning {
        config.pipeline.reasoning_protocol = true;
    }
    if !options.self_improve {
        config.pipeline.self_improve = false;
    }
    let orchestrator = super::build_orchestrator(&config)?;
    let top_k = options.top_k.unwrap_or(config.knowledge.top_k);

    eprintln!("⚖️  Researching: {query}");
    let outcome = orchestrator.run_with_top_k(query, top_k).await?;

    if options.details {
        eprintln!();
        eprintln!("── Triage ──────────────────────────");
        eprintln!("{}", outcome.triage);
        eprintln!("── Plan ────────────────────────────");
        eprintln!("{}", outcome.plan);
        eprintln!("── Sources ({}) ─────────────────────", outcome.retrieved.len());
        for source in &outcome.retrieved {
            eprintln!("  [{}] score={}  {:.80}", source.chunk_index, source.score, source.text);
        }
        eprintln!("── Extraction ──────────────────────");
        eprintln!("{}", outcome.extraction);
        eprintln!("── Pre-check ───────────────────────");
        eprintln!("{}", outcome.precheck);
        eprintln!("── Verification ────────────────────");
        eprintln!("{}", outcome.verification);
        eprintln!();
    }

    println!("{}", serde_json::to_string_pretty(&outcome.result.to_json())?);

    eprintln!();
    eprintln!("⏱️  Execution time: {:.2}s", outcome.elapsed.as_secs_f64());
    if let Some(adherence) = outcome.adherence {
        eprintln!("🧠 Reasoning adherence: {adherence:.2}");
    }
    match &outcome.feedback {
        Some(record) => eprintln!(
            "📈 Learned tip (score {:.2}) for {}: {}",
            record.score, record.role, record.optimization_tip
        ),
        None if config.pipeline.self_improve => eprintln!("📈 No feedback recorded"),
        None => {}
    }

    if options.trace {
        println!("{}", mizan_telemetry::export_json(&outcome.trace)?);
    }

    Ok(())
}
