//! Index command - build or inspect the vector index.

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use crate::search::index::{INDEX_FILE, MAP_FILE};
use crate::search::VectorIndex;

/// Run index command
pub fn run(
    db: Option<PathBuf>,
    index_dir: Option<PathBuf>,
    status_only: bool,
    json: bool,
) -> Result<()> {
    if status_only {
        return show_status(super::resolve_index_dir(index_dir), json);
    }

    let mut engine = super::open_engine(db, index_dir)?;
    let stats = engine.build_index()?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "indexed": stats.indexed,
                "skipped": stats.skipped,
                "duration_ms": stats.duration_ms,
            })
        );
    } else {
        println!(
            "{} Indexed {} notes ({} skipped) in {}ms",
            "✓".green().bold(),
            stats.indexed.to_string().bold(),
            stats.skipped,
            stats.duration_ms
        );
    }

    Ok(())
}

fn show_status(dir: PathBuf, json: bool) -> Result<()> {
    let loaded = VectorIndex::load(&dir);

    if json {
        let status = match &loaded {
            Ok(index) => serde_json::json!({
                "status": "ready",
                "vectors": index.len(),
                "index_dir": dir.display().to_string(),
            }),
            Err(e) => serde_json::json!({
                "status": "unavailable",
                "error": e.to_string(),
                "index_dir": dir.display().to_string(),
            }),
        };
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    match loaded {
        Ok(index) => {
            println!("{} Index ready: {} vectors", "✓".green().bold(), index.len());
            println!("  {} {}", "artifacts:".dimmed(), dir.join(INDEX_FILE).display());
            println!("  {} {}", "          ".dimmed(), dir.join(MAP_FILE).display());
        }
        Err(e) => {
            println!("{} Index unavailable: {}", "!".yellow().bold(), e);
            println!("  Run {} to build it", "mnemo index".cyan());
        }
    }

    Ok(())
}
