//! MCP server for the note store.
//!
//! Provides AI-native access to hybrid search, note lookup, tags and
//! RAG context retrieval.

mod server;

pub use server::{run_mcp_server, NoteService};
