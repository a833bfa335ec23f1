use clap::{Parser, Subcommand};
use std::path::PathBuf;

use mnemo_mcp::commands;

#[derive(Parser)]
#[command(name = "mnemo")]
#[command(about = "Searchable knowledge base over a personal note store", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the note-store SQLite database (or MNEMO_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Directory for vector index artifacts (or MNEMO_INDEX_DIR)
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the vector index from the current note corpus
    Index {
        #[arg(long, help = "Show index status only")]
        status: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Hybrid semantic/keyword search
    Search {
        query: String,
        #[arg(long, short, default_value_t = 5, help = "Limit results")]
        limit: usize,
        #[arg(long, help = "Force keyword matching (skip semantic search)")]
        keyword: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Get a single note by identifier
    Get {
        id: String,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// List all tags
    Tags {
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Retrieve RAG context for a query
    Rag {
        query: String,
        #[arg(long, short, default_value_t = 5, help = "Limit context items")]
        limit: usize,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Start MCP server for AI-agent integration
    #[cfg(feature = "mcp")]
    Mcp {
        #[arg(long, help = "Show client configuration instructions")]
        install: bool,
    },
}

fn main() -> anyhow::Result<()> {
    // stdout carries command output (and the MCP protocol), so logs go
    // to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Index { status, json } => {
            commands::index::run(cli.db, cli.index_dir, status, json)
        }
        Commands::Search {
            query,
            limit,
            keyword,
            json,
        } => commands::search::run(cli.db, cli.index_dir, &query, limit, keyword, json),
        Commands::Get { id, json } => commands::get::run(cli.db, cli.index_dir, &id, json),
        Commands::Tags { json } => commands::tags::run(cli.db, cli.index_dir, json),
        Commands::Rag { query, limit, json } => {
            commands::rag::run(cli.db, cli.index_dir, &query, limit, json)
        }
        #[cfg(feature = "mcp")]
        Commands::Mcp { install } => {
            if install {
                print_mcp_install_instructions();
                Ok(())
            } else {
                run_mcp_server(cli.db, cli.index_dir)
            }
        }
    }
}

#[cfg(feature = "mcp")]
fn run_mcp_server(db: Option<PathBuf>, index_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let db_path = commands::resolve_db_path(db)?;
    let index_dir = commands::resolve_index_dir(index_dir);
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(mnemo_mcp::mcp::run_mcp_server(db_path, index_dir))
}

#[cfg(feature = "mcp")]
fn print_mcp_install_instructions() {
    use colored::Colorize;

    let binary_path = std::env::current_exe()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| "mnemo".to_string());

    println!("{}", "MCP Server Installation Guide".bold().cyan());
    println!();
    println!("Add the following to your MCP client configuration:");
    println!();
    println!(
        r#"{{
  "mcpServers": {{
    "mnemo": {{
      "command": "{}",
      "args": ["mcp"],
      "env": {{
        "MNEMO_DB": "/path/to/notes/database.sqlite",
        "MNEMO_INDEX_DIR": "/path/to/index/dir"
      }}
    }}
  }}
}}"#,
        binary_path
    );
    println!();
    println!("{}", "Available tools:".bold());
    println!("  • {} - Hybrid semantic/keyword search", "note_search".green());
    println!("  • {} - Get full note content and tags", "note_get".green());
    println!("  • {} - List all tags", "note_list_tags".green());
    println!("  • {} - Retrieve RAG context", "note_retrieve".green());
}
