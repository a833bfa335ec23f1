//! Hybrid retrieval engine.
//!
//! Per query: semantic attempt (embed, nearest-neighbor scan, map
//! ordinals to note ids, enrich, rank by score) with keyword fallback
//! (substring match in the note store, recency order). Model and index
//! failures degrade to keyword search; note-store failures propagate.
//!
//! The engine owns the long-lived state explicitly: the embedding
//! provider and the lazily loaded index live on the engine instance, not
//! in process-wide statics, so independent engines can coexist in tests.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

use super::embedding::EmbeddingProvider;
use super::index::VectorIndex;
use crate::error::{Error, Result};
use crate::store::{Note, NoteRepository};

/// Which path actually produced the results. Reported per response so
/// callers never mistake a keyword fallback for a semantic ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    Semantic,
    Keyword,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub content: Option<String>,
    pub subtitle: Option<String>,
    pub created: DateTime<Utc>,
    pub tags: Vec<String>,
    /// Similarity score (1 - L2 distance, higher is more similar).
    /// Present only for semantic results; monotonic, not calibrated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    pub rank: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub method: SearchMethod,
}

/// RAG-shaped context item: ranking metadata stripped down to what a
/// downstream generator needs.
#[derive(Debug, Serialize)]
pub struct ContextItem {
    pub id: String,
    pub title: String,
    pub content: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// A note plus its tag list, for single-note lookups.
#[derive(Debug, Serialize)]
pub struct NoteDetail {
    #[serde(flatten)]
    pub note: Note,
    pub tags: Vec<String>,
}

#[derive(Debug)]
pub struct IndexingStats {
    pub indexed: usize,
    pub skipped: usize,
    pub duration_ms: u128,
}

/// Index lifecycle within one process: loaded at most once, and a
/// failed load sticks as Unavailable until restart.
enum IndexState {
    Unloaded,
    Ready(VectorIndex),
    Unavailable,
}

pub struct RetrievalEngine {
    provider: EmbeddingProvider,
    repo: NoteRepository,
    index_dir: PathBuf,
    index: IndexState,
}

impl RetrievalEngine {
    pub fn new(repo: NoteRepository, index_dir: &Path) -> Self {
        Self {
            provider: EmbeddingProvider::new(),
            repo,
            index_dir: index_dir.to_path_buf(),
            index: IndexState::Unloaded,
        }
    }

    /// Full rebuild: embed every non-trashed note and persist a fresh
    /// artifact pair. The in-memory index is replaced so queries see the
    /// new snapshot immediately.
    pub fn build_index(&mut self) -> Result<IndexingStats> {
        let start = Instant::now();
        self.provider.initialize()?;

        let corpus: Vec<(String, String)> = self
            .repo
            .list_active()?
            .into_iter()
            .map(|note| {
                let text = note.index_text();
                (note.id, text)
            })
            .collect();

        let (index, stats) = VectorIndex::build(&self.provider, &corpus);
        index.persist(&self.index_dir)?;
        self.index = IndexState::Ready(index);

        Ok(IndexingStats {
            indexed: stats.indexed,
            skipped: stats.skipped,
            duration_ms: start.elapsed().as_millis(),
        })
    }

    /// Hybrid search. `semantic` requests the semantic path; the
    /// response's `method` reports which path actually ran.
    pub fn search(&mut self, query: &str, limit: usize, semantic: bool) -> Result<SearchResponse> {
        if limit == 0 {
            return Err(Error::InvalidArgument("limit must be at least 1".to_string()));
        }

        if semantic {
            match self.semantic_results(query, limit) {
                Ok(results) if !results.is_empty() => {
                    return Ok(SearchResponse {
                        results,
                        method: SearchMethod::Semantic,
                    });
                }
                Ok(_) => debug!("semantic attempt produced no results; using keyword search"),
                Err(e) if e.is_degradable() => {
                    warn!(error = %e, "semantic search degraded; using keyword search");
                }
                Err(e) => return Err(e),
            }
        }

        let results = self.keyword_results(query, limit)?;
        Ok(SearchResponse {
            results,
            method: SearchMethod::Keyword,
        })
    }

    /// RAG retrieval: semantic when possible, keyword best-effort
    /// otherwise. Never fails while the note store is reachable.
    pub fn retrieve_for_rag(&mut self, query: &str, limit: usize) -> Result<Vec<ContextItem>> {
        let response = self.search(query, limit, true)?;
        Ok(response
            .results
            .into_iter()
            .map(|r| ContextItem {
                id: r.id,
                title: r.title,
                content: r.content,
                tags: r.tags,
                score: r.score,
            })
            .collect())
    }

    pub fn get_note(&self, id: &str) -> Result<NoteDetail> {
        if id.trim().is_empty() {
            return Err(Error::InvalidArgument("note id is required".to_string()));
        }
        let note = self.repo.find_by_id(id)?;
        let tags = self.repo.tags_for_note(id)?;
        Ok(NoteDetail { note, tags })
    }

    pub fn list_tags(&self) -> Result<Vec<String>> {
        self.repo.list_all_tags()
    }

    /// The semantic path end to end. Model and index failures surface
    /// as degradable errors that `search` absorbs by falling back to
    /// keyword matching; note-store failures surface as fatal ones.
    fn semantic_results(&mut self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        self.provider.initialize()?;
        let vector = self.provider.embed(query)?;
        if vector.iter().all(|&v| v == 0.0) {
            debug!("query has no embeddable tokens; using keyword search");
            return Ok(Vec::new());
        }

        let index = self.loaded_index()?;
        let candidates: Vec<(String, f32)> = index
            .query(&vector, limit)
            .into_iter()
            .filter_map(|(ordinal, distance)| {
                index.id_at(ordinal).map(|id| (id.to_string(), 1.0 - distance))
            })
            .collect();

        self.enrich_scored(&candidates)
    }

    fn loaded_index(&mut self) -> Result<&VectorIndex> {
        if matches!(self.index, IndexState::Unloaded) {
            self.index = match VectorIndex::load(&self.index_dir) {
                Ok(index) => IndexState::Ready(index),
                Err(e) => {
                    warn!(error = %e, "vector index unavailable; semantic search disabled");
                    IndexState::Unavailable
                }
            };
        }
        match &self.index {
            IndexState::Ready(index) => Ok(index),
            _ => Err(Error::IndexNotFound {
                dir: self.index_dir.display().to_string(),
            }),
        }
    }

    /// Batch-fetch candidate notes, attach tags, rank by descending
    /// score. Ids the store no longer has (or has trashed) drop out.
    fn enrich_scored(&self, candidates: &[(String, f32)]) -> Result<Vec<SearchResult>> {
        let ids: Vec<String> = candidates.iter().map(|(id, _)| id.clone()).collect();
        let scores: HashMap<&str, f32> = candidates
            .iter()
            .map(|(id, score)| (id.as_str(), *score))
            .collect();

        let notes = self.repo.find_by_ids(&ids)?;
        let mut results = Vec::with_capacity(notes.len());
        for note in notes {
            let tags = self.repo.tags_for_note(&note.id)?;
            let score = scores.get(note.id.as_str()).copied();
            results.push(SearchResult {
                id: note.id,
                title: note.title,
                content: note.content,
                subtitle: note.subtitle,
                created: note.created,
                tags,
                score,
                rank: 0,
            });
        }

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for (i, result) in results.iter_mut().enumerate() {
            result.rank = i + 1;
        }
        Ok(results)
    }

    /// Keyword path: store ordering (most recently modified first) is
    /// preserved, no scores.
    fn keyword_results(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let notes = self.repo.keyword_search(query, limit)?;
        let mut results = Vec::with_capacity(notes.len());
        for (i, note) in notes.into_iter().enumerate() {
            let tags = self.repo.tags_for_note(&note.id)?;
            results.push(SearchResult {
                id: note.id,
                title: note.title,
                content: note.content,
                subtitle: note.subtitle,
                created: note.created,
                tags,
                score: None,
                rank: i + 1,
            });
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::repository::fixtures::{insert_note, insert_tag};
    use tempfile::TempDir;

    fn sample_engine(dir: &TempDir) -> RetrievalEngine {
        let repo = NoteRepository::open_in_memory().unwrap();
        insert_note(&repo, 1, "note-a", "Apple pie", Some("Baking an apple pie"), 100.0, false);
        insert_note(&repo, 2, "note-b", "Apple tart", Some("Baking an apple tart"), 200.0, false);
        insert_note(&repo, 3, "note-c", "Tax return", Some("Quarterly tax filing"), 300.0, false);
        insert_note(&repo, 4, "note-d", "Old draft", Some("apple leftovers"), 50.0, true);
        insert_tag(&repo, 10, "baking", &[1, 2]);
        insert_tag(&repo, 11, "finance", &[3]);
        RetrievalEngine::new(repo, dir.path())
    }

    #[test]
    fn test_semantic_search_ranked_and_limited() {
        let dir = TempDir::new().unwrap();
        let mut engine = sample_engine(&dir);
        engine.build_index().unwrap();

        let response = engine.search("apple pie baking", 2, true).unwrap();
        assert_eq!(response.method, SearchMethod::Semantic);
        assert!(response.results.len() <= 2);
        assert!(!response.results.is_empty());

        let scores: Vec<f32> = response.results.iter().map(|r| r.score.unwrap()).collect();
        for pair in scores.windows(2) {
            assert!(pair[0] >= pair[1], "scores must descend");
        }
        assert_eq!(response.results[0].id, "note-a");
        assert_eq!(response.results[0].rank, 1);
        assert_eq!(response.results[0].tags, vec!["baking"]);
    }

    #[test]
    fn test_keyword_search_never_touches_model() {
        let dir = TempDir::new().unwrap();
        let mut engine = sample_engine(&dir);
        let response = engine.search("apple", 10, false).unwrap();
        assert_eq!(response.method, SearchMethod::Keyword);
        assert!(!engine.provider.is_initialized());
        // Recency order from the store, trashed excluded
        let ids: Vec<&str> = response.results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["note-b", "note-a"]);
        assert!(response.results.iter().all(|r| r.score.is_none()));
    }

    #[test]
    fn test_semantic_finds_hits_where_keyword_misses() {
        let dir = TempDir::new().unwrap();
        let mut engine = sample_engine(&dir);
        engine.build_index().unwrap();

        // "pomelo" appears nowhere in the corpus: the substring match is
        // empty, but the nearest-neighbor scan still ranks notes.
        let semantic = engine.search("pomelo", 2, true).unwrap();
        assert_eq!(semantic.method, SearchMethod::Semantic);
        assert!(!semantic.results.is_empty());

        let keyword = engine.search("pomelo", 2, false).unwrap();
        assert_eq!(keyword.method, SearchMethod::Keyword);
        assert!(keyword.results.is_empty());
    }

    #[test]
    fn test_missing_index_falls_back_to_keyword() {
        let dir = TempDir::new().unwrap();
        let mut engine = sample_engine(&dir);

        let semantic = engine.search("apple", 10, true).unwrap();
        let keyword = engine.search("apple", 10, false).unwrap();

        assert_eq!(semantic.method, SearchMethod::Keyword);
        let a: Vec<&str> = semantic.results.iter().map(|r| r.id.as_str()).collect();
        let b: Vec<&str> = keyword.results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_corrupt_index_degrades_for_process_lifetime() {
        let dir = TempDir::new().unwrap();
        let mut engine = sample_engine(&dir);
        std::fs::write(dir.path().join(super::super::index::INDEX_FILE), b"garbage").unwrap();
        std::fs::write(dir.path().join(super::super::index::MAP_FILE), b"{}").unwrap();

        let first = engine.search("apple", 10, true).unwrap();
        assert_eq!(first.method, SearchMethod::Keyword);
        let second = engine.search("apple", 10, true).unwrap();
        assert_eq!(second.method, SearchMethod::Keyword);
    }

    #[test]
    fn test_empty_query_on_empty_corpus() {
        let dir = TempDir::new().unwrap();
        let repo = NoteRepository::open_in_memory().unwrap();
        let mut engine = RetrievalEngine::new(repo, dir.path());

        let response = engine.search("", 10, true).unwrap();
        assert_eq!(response.method, SearchMethod::Keyword);
        assert!(response.results.is_empty());
    }

    #[test]
    fn test_zero_limit_is_invalid() {
        let dir = TempDir::new().unwrap();
        let mut engine = sample_engine(&dir);
        let err = engine.search("apple", 0, true).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_notes_trashed_after_build_fall_out() {
        let dir = TempDir::new().unwrap();
        let mut engine = sample_engine(&dir);
        engine.build_index().unwrap();

        engine
            .repo
            .conn()
            .execute("UPDATE ZSFNOTE SET ZTRASHED = 1", [])
            .unwrap();

        // Every semantic candidate enriches to nothing, so the call
        // reports the keyword path (which also finds nothing).
        let response = engine.search("apple pie", 10, true).unwrap();
        assert_eq!(response.method, SearchMethod::Keyword);
        assert!(response.results.is_empty());
    }

    #[test]
    fn test_rag_semantic_carries_scores() {
        let dir = TempDir::new().unwrap();
        let mut engine = sample_engine(&dir);
        engine.build_index().unwrap();

        let items = engine.retrieve_for_rag("apple pie baking", 3).unwrap();
        assert!(!items.is_empty());
        assert!(items.iter().all(|item| item.score.is_some()));
    }

    #[test]
    fn test_rag_falls_back_without_scores() {
        let dir = TempDir::new().unwrap();
        let mut engine = sample_engine(&dir);

        let items = engine.retrieve_for_rag("apple", 3).unwrap();
        assert!(!items.is_empty());
        assert!(items.iter().all(|item| item.score.is_none()));
    }

    #[test]
    fn test_get_note_tags_consistent_with_list_tags() {
        let dir = TempDir::new().unwrap();
        let engine = sample_engine(&dir);

        let detail = engine.get_note("note-a").unwrap();
        assert_eq!(detail.note.title, "Apple pie");
        let all_tags = engine.list_tags().unwrap();
        for tag in &detail.tags {
            assert!(all_tags.contains(tag));
        }
    }

    #[test]
    fn test_get_note_errors() {
        let dir = TempDir::new().unwrap();
        let engine = sample_engine(&dir);
        assert!(matches!(
            engine.get_note("nope").unwrap_err(),
            Error::NoteNotFound { .. }
        ));
        assert!(matches!(
            engine.get_note("  ").unwrap_err(),
            Error::InvalidArgument(_)
        ));
    }

    #[test]
    fn test_build_excludes_trashed_notes() {
        let dir = TempDir::new().unwrap();
        let mut engine = sample_engine(&dir);
        let stats = engine.build_index().unwrap();
        assert_eq!(stats.indexed, 3);
        assert_eq!(stats.skipped, 0);
    }
}
