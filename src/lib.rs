//! # docsift
//!
//! Index a directory of heterogeneous documents and search the extracted
//! text with literal or regex queries.
//!
//! docsift extracts normalized text from each supported file, caches it in
//! memory keyed by path and modification time (unchanged files are never
//! re-extracted), and answers queries with highlighted context windows.
//! The same operations are reachable from a CLI, an MCP server over stdio
//! and a JSON HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐   ┌──────────────┐
//! │  Scanner   │──▶│ Extractors │──▶│ DocumentCache│
//! │ walk+mtime │   │ PDF/OOXML/…│   │ path → record│
//! └────────────┘   └────────────┘   └──────┬───────┘
//!                                          │ snapshot
//!                      ┌───────────────────┤
//!                      ▼                   ▼
//!               ┌──────────────┐    ┌─────────────┐
//!               │ SearchEngine │    │    stats    │
//!               └──────┬───────┘    └──────┬──────┘
//!                      └──────┬────────────┘
//!                             ▼
//!                      DocumentIndex ──▶ tools ──▶ CLI / MCP / HTTP
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docsift --root ~/Documents scan
//! docsift --root ~/Documents search "quarterly report"
//! docsift --root ~/Documents regex '^invoice\s+#\d+'
//! docsift --root ~/Documents serve mcp
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Error taxonomy |
//! | [`extract`] | File-type dispatch and text extraction |
//! | [`language`] | Language identification |
//! | [`cache`] | In-memory record cache |
//! | [`scanner`] | Directory walk and cache maintenance |
//! | [`search`] | Literal and regex search |
//! | [`stats`] | Collection statistics |
//! | [`index`] | The facade the surfaces talk to |
//! | [`tools`] | Tool trait and registry |
//! | [`mcp`] | MCP stdio bridge |
//! | [`server`] | HTTP tool server |
//! | [`cli`] | CLI command output |

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod index;
pub mod language;
pub mod mcp;
pub mod models;
pub mod scanner;
pub mod search;
pub mod server;
pub mod stats;
pub mod tools;
