//! Get command - single note lookup.

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

/// Run get command
pub fn run(db: Option<PathBuf>, index_dir: Option<PathBuf>, id: &str, json: bool) -> Result<()> {
    let engine = super::open_engine(db, index_dir)?;
    let detail = engine.get_note(id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    println!("{}", detail.note.title.cyan().bold());
    if let Some(ref subtitle) = detail.note.subtitle {
        println!("{}", subtitle.dimmed());
    }
    println!(
        "{} {}  {} {}",
        "id:".dimmed(),
        detail.note.id,
        "created:".dimmed(),
        detail.note.created.to_rfc3339()
    );
    if !detail.tags.is_empty() {
        println!("{} {}", "tags:".dimmed(), detail.tags.join(", "));
    }
    if let Some(ref content) = detail.note.content {
        println!();
        println!("{}", content);
    }

    Ok(())
}
