//! Flat vector index with an on-disk lifecycle.
//!
//! Two co-located artifacts: `index.bin` (raw f32 vectors, one per
//! corpus entry, little-endian, behind a magic/version/dimension header)
//! and `index.map.json` (ordinal position to note identifier). Entry *i*
//! of both refers to the same source text; build only ever advances the
//! two structures together, and load refuses anything that breaks that
//! alignment.
//!
//! The scan is exact, not approximate. Personal note corpora are
//! thousands of entries, so a brute-force L2 pass is both simpler and
//! accurate.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{info, warn};

use super::embedding::{l2_distance, EmbeddingProvider, EMBEDDING_DIM};
use crate::error::{Error, Result};

const INDEX_MAGIC: &[u8; 4] = b"MNIX";
const INDEX_FORMAT_VERSION: u32 = 1;

pub const INDEX_FILE: &str = "index.bin";
pub const MAP_FILE: &str = "index.map.json";

/// Ordinal-to-identifier companion artifact, dimension-tagged so a
/// model change is caught at load time.
#[derive(Serialize, Deserialize)]
struct PositionMap {
    dim: usize,
    ids: Vec<String>,
}

/// Counters reported by a build pass.
#[derive(Debug, Default)]
pub struct BuildStats {
    pub indexed: usize,
    pub skipped: usize,
}

#[derive(Debug)]
pub struct VectorIndex {
    vectors: Vec<Vec<f32>>,
    ids: Vec<String>,
}

impl VectorIndex {
    pub fn empty() -> Self {
        Self {
            vectors: Vec::new(),
            ids: Vec::new(),
        }
    }

    /// Embed a corpus of (identifier, text) pairs. Empty texts and
    /// texts that fail to embed are skipped from BOTH the vector list
    /// and the position map, so ordinal alignment holds unconditionally.
    pub fn build(
        provider: &EmbeddingProvider,
        corpus: &[(String, String)],
    ) -> (Self, BuildStats) {
        let mut index = Self::empty();
        let mut stats = BuildStats::default();

        for (id, text) in corpus {
            if text.trim().is_empty() {
                stats.skipped += 1;
                continue;
            }
            match provider.embed(text) {
                Ok(vector) => {
                    index.vectors.push(vector);
                    index.ids.push(id.clone());
                    stats.indexed += 1;
                }
                Err(e) => {
                    warn!(note_id = %id, error = %e, "skipping unembeddable note");
                    stats.skipped += 1;
                }
            }
        }

        (index, stats)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Identifier mapped to an ordinal, if one exists.
    pub fn id_at(&self, ordinal: usize) -> Option<&str> {
        self.ids.get(ordinal).map(String::as_str)
    }

    /// Exact k-nearest-neighbor scan. Ascending L2 distance, at most
    /// `k` entries, empty for an empty index.
    pub fn query(&self, vector: &[f32], k: usize) -> Vec<(usize, f32)> {
        let mut hits: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(ordinal, v)| (ordinal, l2_distance(vector, v)))
            .collect();
        hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        hits
    }

    /// Write both artifacts into `dir`. They are only meaningful as a
    /// pair and `load` reads them as a pair.
    pub fn persist(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;

        let mut buf = Vec::with_capacity(16 + self.vectors.len() * EMBEDDING_DIM * 4);
        buf.extend_from_slice(INDEX_MAGIC);
        buf.extend_from_slice(&INDEX_FORMAT_VERSION.to_le_bytes());
        buf.extend_from_slice(&(EMBEDDING_DIM as u32).to_le_bytes());
        buf.extend_from_slice(&(self.vectors.len() as u32).to_le_bytes());
        for vector in &self.vectors {
            for &val in vector {
                buf.extend_from_slice(&val.to_le_bytes());
            }
        }
        let mut file = fs::File::create(dir.join(INDEX_FILE))?;
        file.write_all(&buf)?;

        let map = PositionMap {
            dim: EMBEDDING_DIM,
            ids: self.ids.clone(),
        };
        fs::write(dir.join(MAP_FILE), serde_json::to_vec(&map)?)?;

        info!(count = self.vectors.len(), dir = %dir.display(), "persisted vector index");
        Ok(())
    }

    /// Load the artifact pair from `dir`. `IndexNotFound` when either
    /// file is missing; `IndexCorrupt` when the pair cannot be trusted.
    pub fn load(dir: &Path) -> Result<Self> {
        let index_path = dir.join(INDEX_FILE);
        let map_path = dir.join(MAP_FILE);
        if !index_path.exists() || !map_path.exists() {
            return Err(Error::IndexNotFound {
                dir: dir.display().to_string(),
            });
        }

        let vectors = read_index_file(&index_path)?;
        let map: PositionMap = serde_json::from_slice(&fs::read(&map_path)?)
            .map_err(|e| corrupt(format!("position map: {e}")))?;

        if map.dim != EMBEDDING_DIM {
            return Err(corrupt(format!(
                "position map dimension {} does not match model dimension {}",
                map.dim, EMBEDDING_DIM
            )));
        }
        if map.ids.len() != vectors.len() {
            return Err(corrupt(format!(
                "position map has {} ids but index has {} vectors",
                map.ids.len(),
                vectors.len()
            )));
        }

        info!(count = vectors.len(), dir = %dir.display(), "loaded vector index");
        Ok(Self {
            vectors,
            ids: map.ids,
        })
    }
}

fn corrupt(reason: String) -> Error {
    Error::IndexCorrupt { reason }
}

fn read_index_file(path: &Path) -> Result<Vec<Vec<f32>>> {
    let mut file = fs::File::open(path)?;
    let mut raw = Vec::new();
    file.read_to_end(&mut raw)?;

    if raw.len() < 16 {
        return Err(corrupt("index file shorter than header".to_string()));
    }
    if &raw[0..4] != INDEX_MAGIC {
        return Err(corrupt("bad index magic".to_string()));
    }
    let version = u32::from_le_bytes(raw[4..8].try_into().unwrap());
    if version != INDEX_FORMAT_VERSION {
        return Err(corrupt(format!("unsupported index format version {version}")));
    }
    let dim = u32::from_le_bytes(raw[8..12].try_into().unwrap()) as usize;
    if dim != EMBEDDING_DIM {
        return Err(corrupt(format!(
            "index dimension {dim} does not match model dimension {EMBEDDING_DIM}"
        )));
    }
    let count = u32::from_le_bytes(raw[12..16].try_into().unwrap()) as usize;

    let body = &raw[16..];
    if body.len() != count * dim * 4 {
        return Err(corrupt(format!(
            "index body is {} bytes, expected {} for {count} vectors",
            body.len(),
            count * dim * 4
        )));
    }

    let mut vectors = Vec::with_capacity(count);
    for chunk in body.chunks_exact(dim * 4) {
        let vector: Vec<f32> = chunk
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes(b.try_into().unwrap()))
            .collect();
        vectors.push(vector);
    }

    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn provider() -> EmbeddingProvider {
        let mut p = EmbeddingProvider::new();
        p.initialize().unwrap();
        p
    }

    fn corpus(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(id, text)| (id.to_string(), text.to_string()))
            .collect()
    }

    #[test]
    fn test_build_alignment() {
        let (index, stats) = VectorIndex::build(
            &provider(),
            &corpus(&[("a", "apples"), ("b", "oranges"), ("c", "pears")]),
        );
        assert_eq!(index.vectors.len(), index.ids.len());
        assert_eq!(stats.indexed, 3);
        assert_eq!(index.id_at(1), Some("b"));
    }

    #[test]
    fn test_build_skips_empty_text_and_keeps_alignment() {
        let (index, stats) = VectorIndex::build(
            &provider(),
            &corpus(&[("a", "apples"), ("blank", "   "), ("c", "pears")]),
        );
        assert_eq!(stats.indexed, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(index.len(), 2);
        // The blank entry was excluded from both structures, so the
        // ordinal after it still points at the right note.
        assert_eq!(index.id_at(0), Some("a"));
        assert_eq!(index.id_at(1), Some("c"));
    }

    #[test]
    fn test_query_ascending_distance_and_limit() {
        let p = provider();
        let (index, _) = VectorIndex::build(
            &p,
            &corpus(&[("a", "apple pie"), ("b", "apple tart"), ("c", "tax return")]),
        );
        let q = p.embed("apple pie").unwrap();
        let hits = index.query(&q, 2);
        assert_eq!(hits.len(), 2);
        assert!(hits[0].1 <= hits[1].1);
        assert_eq!(index.id_at(hits[0].0), Some("a"));
    }

    #[test]
    fn test_query_empty_index() {
        let index = VectorIndex::empty();
        assert!(index.query(&vec![0.0; EMBEDDING_DIM], 5).is_empty());
    }

    #[test]
    fn test_persist_load_round_trip() {
        let p = provider();
        let dir = TempDir::new().unwrap();
        let (index, _) = VectorIndex::build(&p, &corpus(&[("a", "apples"), ("b", "oranges")]));
        index.persist(dir.path()).unwrap();

        let loaded = VectorIndex::load(dir.path()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.id_at(0), Some("a"));

        let q = p.embed("oranges").unwrap();
        let hits = loaded.query(&q, 1);
        assert_eq!(loaded.id_at(hits[0].0), Some("b"));
    }

    #[test]
    fn test_load_missing_artifacts() {
        let dir = TempDir::new().unwrap();
        let err = VectorIndex::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::IndexNotFound { .. }));
    }

    #[test]
    fn test_load_rejects_missing_map() {
        let dir = TempDir::new().unwrap();
        let (index, _) = VectorIndex::build(&provider(), &corpus(&[("a", "apples")]));
        index.persist(dir.path()).unwrap();
        fs::remove_file(dir.path().join(MAP_FILE)).unwrap();
        let err = VectorIndex::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::IndexNotFound { .. }));
    }

    #[test]
    fn test_load_rejects_bad_magic() {
        let dir = TempDir::new().unwrap();
        let (index, _) = VectorIndex::build(&provider(), &corpus(&[("a", "apples")]));
        index.persist(dir.path()).unwrap();
        fs::write(dir.path().join(INDEX_FILE), b"not an index file").unwrap();
        let err = VectorIndex::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::IndexCorrupt { .. }));
    }

    #[test]
    fn test_load_rejects_map_divergence() {
        let dir = TempDir::new().unwrap();
        let (index, _) = VectorIndex::build(&provider(), &corpus(&[("a", "apples"), ("b", "oranges")]));
        index.persist(dir.path()).unwrap();
        let map = serde_json::json!({ "dim": EMBEDDING_DIM, "ids": ["a"] });
        fs::write(dir.path().join(MAP_FILE), map.to_string()).unwrap();
        let err = VectorIndex::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::IndexCorrupt { .. }));
    }

    #[test]
    fn test_load_rejects_dimension_mismatch() {
        let dir = TempDir::new().unwrap();
        let (index, _) = VectorIndex::build(&provider(), &corpus(&[("a", "apples")]));
        index.persist(dir.path()).unwrap();
        let map = serde_json::json!({ "dim": 128, "ids": ["a"] });
        fs::write(dir.path().join(MAP_FILE), map.to_string()).unwrap();
        let err = VectorIndex::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::IndexCorrupt { .. }));
    }
}
