//! CLI subcommands.

pub mod get;
pub mod index;
pub mod rag;
pub mod search;
pub mod tags;

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::search::RetrievalEngine;
use crate::store::NoteRepository;

/// Resolve the note-store database path: `--db` flag, then `MNEMO_DB`.
pub fn resolve_db_path(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Ok(env) = std::env::var("MNEMO_DB") {
        return Ok(PathBuf::from(env));
    }
    bail!("no note database given; pass --db or set MNEMO_DB");
}

/// Resolve the index directory: `--index-dir` flag, then
/// `MNEMO_INDEX_DIR`, then `.mnemo` under the working directory.
pub fn resolve_index_dir(flag: Option<PathBuf>) -> PathBuf {
    if let Some(path) = flag {
        return path;
    }
    if let Ok(env) = std::env::var("MNEMO_INDEX_DIR") {
        return PathBuf::from(env);
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".mnemo")
}

pub fn open_engine(db: Option<PathBuf>, index_dir: Option<PathBuf>) -> Result<RetrievalEngine> {
    let db_path = resolve_db_path(db)?;
    let repo = NoteRepository::open(&db_path)?;
    Ok(RetrievalEngine::new(repo, &resolve_index_dir(index_dir)))
}
