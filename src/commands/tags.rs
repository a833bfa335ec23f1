//! Tags command - list all tag names.

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

/// Run tags command
pub fn run(db: Option<PathBuf>, index_dir: Option<PathBuf>, json: bool) -> Result<()> {
    let engine = super::open_engine(db, index_dir)?;
    let tags = engine.list_tags()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tags)?);
        return Ok(());
    }

    if tags.is_empty() {
        println!("{} No tags in the note store", "→".dimmed());
        return Ok(());
    }

    println!("{} {} tags", "→".dimmed(), tags.len());
    for tag in &tags {
        println!("  {}", tag.cyan());
    }

    Ok(())
}
