//! mnemo-mcp library
//!
//! Exposes a personal note store (Core Data SQLite) as a searchable
//! knowledge base: hybrid semantic/keyword retrieval with a RAG output
//! mode, served over MCP or the CLI.
//!
//! # Modules
//!
//! - `store`: read-only note repository and timestamp conversion
//! - `search`: embedding provider, vector index lifecycle, retrieval engine
//! - `mcp`: MCP server for AI-agent integration (feature `mcp`)
//! - `error`: typed failure taxonomy

pub mod commands;
pub mod error;
#[cfg(feature = "mcp")]
pub mod mcp;
pub mod search;
pub mod store;

pub use error::{Error, Result};
pub use search::{RetrievalEngine, SearchMethod, SearchResponse, SearchResult};
pub use store::{Note, NoteRepository};
