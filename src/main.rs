//! # docsift CLI
//!
//! The `docsift` binary indexes a directory of documents in memory and
//! answers literal and regex queries against it, either as one-shot
//! commands or as a long-running MCP / HTTP tool server.
//!
//! ## Usage
//!
//! ```bash
//! docsift --config ./config/docsift.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docsift scan [DIR]` | Index a directory and print the scan report |
//! | `docsift search "<query>"` | Case-insensitive literal search |
//! | `docsift regex "<pattern>"` | Regex search (`^`/`$` match per line) |
//! | `docsift list` | List indexed documents |
//! | `docsift stats` | Collection statistics |
//! | `docsift get <path or name>` | Print a document's full text |
//! | `docsift serve mcp` | MCP tool server over stdio |
//! | `docsift serve http` | JSON tool server over HTTP |
//!
//! The index lives only as long as the process, so every one-shot command
//! scans `index.root` (or `--root`) first. `--json` prints the same JSON
//! the MCP and HTTP tools return.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docsift::cli;
use docsift::config;
use docsift::index::DocumentIndex;
use docsift::mcp;
use docsift::server;
use docsift::tools::ToolRegistry;

/// docsift: index a folder of documents and search it.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docsift.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docsift",
    about = "Index a directory of documents and search it with literal or regex queries",
    version,
    long_about = "docsift extracts text from PDF, Word, Excel, PowerPoint, CSV, JSON, Markdown \
    and plain-text files, keeps it in an in-memory index that only re-extracts changed files, \
    and serves literal and regex search with context windows via a CLI, MCP (stdio) and HTTP."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/docsift.toml`. When the file does not exist,
    /// built-in defaults are used.
    #[arg(long, global = true, default_value = "./config/docsift.toml")]
    config: PathBuf,

    /// Directory to index, overriding `index.root`.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Log filter (e.g. `debug`, `docsift=trace`). `RUST_LOG` takes precedence.
    /// Defaults to `warn` for one-shot commands and `info` for servers.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Print tool-shaped JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Scan a directory and print the report.
    ///
    /// Uses `index.root` (or `--root`) when DIR is omitted.
    Scan {
        /// Directory to scan.
        dir: Option<PathBuf>,
    },

    /// Case-insensitive literal search.
    Search {
        /// Text to search for.
        query: String,

        /// Maximum number of matches (default: `search.default_max_results`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Regex search; `^` and `$` match at line boundaries.
    Regex {
        /// Regular expression.
        pattern: String,

        /// Match case exactly (the default is case-insensitive).
        #[arg(long)]
        case_sensitive: bool,

        /// Maximum number of matches (default: `search.default_max_results`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List indexed documents.
    List,

    /// Print collection statistics.
    Stats,

    /// Print a document's full text.
    ///
    /// Accepts a path or a bare file name. Exits with status 1 when no
    /// document matches.
    Get {
        /// Document path or file name.
        path_or_name: String,
    },

    /// Run a tool server.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },
}

#[derive(Subcommand)]
enum ServeService {
    /// MCP JSON-RPC over stdin/stdout.
    Mcp,

    /// JSON tool API over HTTP.
    Http {
        /// Bind address, overriding `server.bind`.
        #[arg(long)]
        bind: Option<String>,
    },
}

fn init_tracing(level: &str, ansi: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(ansi)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let serving = matches!(cli.command, Commands::Serve { .. });
    let stdio = matches!(
        cli.command,
        Commands::Serve {
            service: ServeService::Mcp
        }
    );
    let default_level = if serving { "info" } else { "warn" };
    init_tracing(cli.log_level.as_deref().unwrap_or(default_level), !stdio);

    let mut cfg = config::load_or_default(&cli.config)?;
    if let Some(root) = cli.root {
        cfg.index.root = root;
    }
    let index = Arc::new(DocumentIndex::new(&cfg));

    // `scan` picks its own directory; everything else indexes the root first.
    if let Commands::Scan { dir } = &cli.command {
        if cli.json {
            cli::run_tool_json(&index, "scan_documents", cli::scan_params(dir.as_deref())).await?;
        } else {
            cli::run_scan(&index, dir.as_deref())?;
        }
        return Ok(());
    }

    if serving {
        // A server can still be pointed at a directory later via scan_documents.
        if let Err(e) = index.scan(None) {
            tracing::warn!(error = %e, "initial scan failed, starting with an empty index");
        }
    } else {
        index
            .scan(None)
            .with_context(|| format!("failed to index {}", cfg.index.root.display()))?;
    }

    match cli.command {
        Commands::Scan { .. } => unreachable!(),
        Commands::Search { query, limit } => {
            if cli.json {
                let params = serde_json::json!({ "query": query, "max_results": limit });
                cli::run_tool_json(&index, "search_documents", params).await?;
            } else {
                cli::run_search(&index, &query, limit)?;
            }
        }
        Commands::Regex {
            pattern,
            case_sensitive,
            limit,
        } => {
            if cli.json {
                let params = serde_json::json!({
                    "pattern": pattern,
                    "case_insensitive": !case_sensitive,
                    "max_results": limit,
                });
                cli::run_tool_json(&index, "search_regex", params).await?;
            } else {
                cli::run_regex(&index, &pattern, case_sensitive, limit)?;
            }
        }
        Commands::List => {
            if cli.json {
                cli::run_tool_json(&index, "list_documents", serde_json::json!({})).await?;
            } else {
                cli::run_list(&index)?;
            }
        }
        Commands::Stats => {
            if cli.json {
                cli::run_tool_json(&index, "get_document_stats", serde_json::json!({})).await?;
            } else {
                cli::run_stats(&index)?;
            }
        }
        Commands::Get { path_or_name } => {
            if cli.json {
                let params = serde_json::json!({ "filename": path_or_name });
                cli::run_tool_json(&index, "get_document_content", params).await?;
            } else {
                cli::run_get(&index, &path_or_name)?;
            }
        }
        Commands::Serve { service } => {
            let tools = Arc::new(ToolRegistry::with_builtins());
            match service {
                ServeService::Mcp => mcp::run_stdio(index, tools).await?,
                ServeService::Http { bind } => {
                    let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
                    server::run_server(&bind, index, tools).await?;
                }
            }
        }
    }

    Ok(())
}
