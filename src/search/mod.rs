//! Hybrid retrieval: embeddings, the on-disk vector index, and the
//! engine that ties them to the note store.

pub mod embedding;
pub mod engine;
pub mod index;

pub use embedding::{EmbeddingProvider, EMBEDDING_DIM};
pub use engine::{
    ContextItem, NoteDetail, RetrievalEngine, SearchMethod, SearchResponse, SearchResult,
};
pub use index::VectorIndex;
