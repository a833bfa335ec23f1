//! Search command - hybrid note search.

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use crate::search::SearchMethod;

/// Run search command
pub fn run(
    db: Option<PathBuf>,
    index_dir: Option<PathBuf>,
    query: &str,
    limit: usize,
    keyword_only: bool,
    json: bool,
) -> Result<()> {
    let mut engine = super::open_engine(db, index_dir)?;
    let response = engine.search(query, limit, !keyword_only)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if response.results.is_empty() {
        println!("{} No results found for: {}", "→".dimmed(), query.cyan());
        return Ok(());
    }

    let method = match response.method {
        SearchMethod::Semantic => "semantic".green(),
        SearchMethod::Keyword => "keyword".yellow(),
    };
    println!(
        "{} {} results for: {} ({})",
        "→".dimmed(),
        response.results.len(),
        query.cyan(),
        method
    );
    println!();

    for result in &response.results {
        match result.score {
            Some(score) => println!(
                "{}. [{:.2}] {}",
                result.rank.to_string().bold(),
                score,
                result.title.cyan()
            ),
            None => println!("{}. {}", result.rank.to_string().bold(), result.title.cyan()),
        }

        if let Some(ref content) = result.content {
            let preview: String = content.chars().take(100).collect();
            if content.chars().count() > 100 {
                println!("   {}...", preview.dimmed());
            } else {
                println!("   {}", preview.dimmed());
            }
        }
        if !result.tags.is_empty() {
            println!("   {} {}", "tags:".dimmed(), result.tags.join(", "));
        }
        println!();
    }

    Ok(())
}
