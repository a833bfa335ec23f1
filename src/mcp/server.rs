//! Note-store MCP server implementation.

use anyhow::Result;
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::Error;
use crate::search::RetrievalEngine;
use crate::store::NoteRepository;

/// Parameters for the note_search tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchParams {
    /// Free-text search query
    #[schemars(description = "Free-text search query")]
    pub query: String,
    /// Maximum number of results (default: 5, max: 100)
    #[schemars(description = "Maximum number of results (default: 5, max: 100)")]
    #[serde(default)]
    pub limit: usize,
    /// Use semantic similarity search (default: true)
    #[schemars(description = "Use semantic similarity; false forces keyword matching")]
    #[serde(default = "default_semantic")]
    pub semantic: bool,
}

fn default_semantic() -> bool {
    true
}

/// Parameters for the note_get tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetNoteParams {
    /// Unique note identifier
    #[schemars(description = "Unique note identifier")]
    pub id: String,
}

/// Parameters for the note_retrieve tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RetrieveParams {
    /// Query to retrieve context for
    #[schemars(description = "Query to retrieve context for")]
    pub query: String,
    /// Maximum number of context items (default: 5, max: 50)
    #[schemars(description = "Maximum number of context items (default: 5, max: 50)")]
    #[serde(default)]
    pub limit: usize,
}

/// Note-store MCP service. The engine is shared behind a mutex: the
/// loaded index and the embedding model are per-process state, not
/// per-call.
#[derive(Clone)]
pub struct NoteService {
    engine: Arc<Mutex<RetrievalEngine>>,
    tool_router: ToolRouter<Self>,
}

impl NoteService {
    pub fn new(engine: RetrievalEngine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            tool_router: Self::tool_router(),
        }
    }
}

fn to_mcp_error(err: Error) -> McpError {
    match err {
        Error::InvalidArgument(_) | Error::NoteNotFound { .. } => {
            McpError::invalid_params(err.to_string(), None)
        }
        other => McpError::internal_error(other.to_string(), None),
    }
}

fn json_result<T: serde::Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let output = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("JSON serialization failed: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(output)]))
}

fn clamp_limit(requested: usize, default: usize, max: usize) -> usize {
    if requested == 0 {
        default
    } else {
        requested.min(max)
    }
}

#[tool_router]
impl NoteService {
    /// Hybrid note search
    #[tool(description = "Search the note store. Uses semantic embedding similarity with automatic keyword fallback; the response's 'method' field reports which one actually produced the results.")]
    async fn note_search(
        &self,
        params: Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let limit = clamp_limit(params.0.limit, 5, 100);
        let mut engine = self.engine.lock().await;
        let response = engine
            .search(&params.0.query, limit, params.0.semantic)
            .map_err(to_mcp_error)?;
        json_result(&response)
    }

    /// Get a single note with its tags
    #[tool(description = "Get the full content, metadata and tags of one note by its identifier.")]
    async fn note_get(
        &self,
        params: Parameters<GetNoteParams>,
    ) -> Result<CallToolResult, McpError> {
        let engine = self.engine.lock().await;
        let detail = engine.get_note(&params.0.id).map_err(to_mcp_error)?;
        json_result(&detail)
    }

    /// List all tags
    #[tool(description = "List all tag names in the note store, deduplicated and sorted.")]
    async fn note_list_tags(&self) -> Result<CallToolResult, McpError> {
        let engine = self.engine.lock().await;
        let tags = engine.list_tags().map_err(to_mcp_error)?;
        json_result(&tags)
    }

    /// Retrieve RAG context
    #[tool(description = "Retrieve note content as RAG context for a query. Semantic when the index is available, keyword best-effort otherwise; keyword items carry no score.")]
    async fn note_retrieve(
        &self,
        params: Parameters<RetrieveParams>,
    ) -> Result<CallToolResult, McpError> {
        let limit = clamp_limit(params.0.limit, 5, 50);
        let mut engine = self.engine.lock().await;
        let items = engine
            .retrieve_for_rag(&params.0.query, limit)
            .map_err(to_mcp_error)?;
        json_result(&items)
    }
}

#[tool_handler]
impl ServerHandler for NoteService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Note store MCP server. Hybrid semantic/keyword search, single-note \
                 lookup, tag listing and RAG context retrieval over a read-only \
                 personal note database."
                    .to_string(),
            ),
            ..Default::default()
        }
    }
}

/// Run the MCP server over stdio.
pub async fn run_mcp_server(db_path: PathBuf, index_dir: PathBuf) -> Result<()> {
    use tokio::io::{stdin, stdout};

    let repo = NoteRepository::open(&db_path)?;
    let engine = RetrievalEngine::new(repo, &index_dir);
    let service = NoteService::new(engine);
    let transport = (stdin(), stdout());
    let server = service.serve(transport).await?;
    server.waiting().await?;

    Ok(())
}
