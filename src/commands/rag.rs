//! Rag command - retrieve context items for a query.

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

/// Run rag command
pub fn run(
    db: Option<PathBuf>,
    index_dir: Option<PathBuf>,
    query: &str,
    limit: usize,
    json: bool,
) -> Result<()> {
    let mut engine = super::open_engine(db, index_dir)?;
    let items = engine.retrieve_for_rag(query, limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("{} No context found for: {}", "→".dimmed(), query.cyan());
        return Ok(());
    }

    for item in &items {
        match item.score {
            Some(score) => println!("{} [{:.2}]", item.title.cyan().bold(), score),
            None => println!("{}", item.title.cyan().bold()),
        }
        if !item.tags.is_empty() {
            println!("{} {}", "tags:".dimmed(), item.tags.join(", "));
        }
        if let Some(ref content) = item.content {
            println!("{}", content);
        }
        println!();
    }

    Ok(())
}
