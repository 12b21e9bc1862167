//! `mizan knowledge` — inspect and search the knowledge base.

use std::path::Path;

use super::CmdResult;

pub fn stats(config_path: Option<&Path>) -> CmdResult {
    let config = super::load_config(config_path)?;
    let store = super::load_knowledge(&config)?;
    let params = store.params();

    println!("📚 Knowledge Base");
    println!("=================");
    println!("  Source:     {}", config.knowledge.path.display());
    println!("  Chunks:     {}", store.len());
    println!(
        "  Window:     {} sentences, {} shared",
        params.window(),
        params.overlap()
    );
    println!("  Min length: > {} chars per sentence", params.min_sentence_chars());
    println!("  Top-k:      {}", config.knowledge.top_k);

    if !store.is_empty() {
        let total: usize = store.chunks().iter().map(|c| c.text.chars().count()).sum();
        println!("  Avg chunk:  {} chars", total / store.len());
    }
    Ok(())
}

pub fn search(config_path: Option<&Path>, query: &str, top_k: Option<usize>) -> CmdResult {
    let config = super::load_config(config_path)?;
    let store = super::load_knowledge(&config)?;
    let top_k = top_k.unwrap_or(config.knowledge.top_k);

    println!("🔍 Searching knowledge base for: \"{query}\"");
    println!();

    let results = store.retrieve(query, top_k);
    if results.is_empty() {
        println!("  No matching chunks.");
        return Ok(());
    }

    for (rank, result) in results.iter().enumerate() {
        println!("  {}. [chunk {}] score={}", rank + 1, result.chunk_index, result.score);
        println!("     {:.160}", result.text);
    }
    Ok(())
}
