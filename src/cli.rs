//! Command implementations for the `docsift` binary.
//!
//! Text output is for people. With `--json` each command runs the matching
//! tool from [`ToolRegistry::with_builtins`] and prints its result, so the
//! CLI, MCP and HTTP surfaces all emit the same shapes.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{json, Value};

use crate::index::DocumentIndex;
use crate::models::{DocumentSummary, ScanReport, SearchOutcome};
use crate::stats;
use crate::tools::{ToolContext, ToolRegistry};

/// Runs a built-in tool and prints its JSON result.
pub async fn run_tool_json(index: &Arc<DocumentIndex>, tool: &str, params: Value) -> Result<()> {
    let registry = ToolRegistry::with_builtins();
    let tool = registry
        .find(tool)
        .with_context(|| format!("no tool registered with name: {}", tool))?;
    let result = tool
        .execute(params, &ToolContext::new(Arc::clone(index)))
        .await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub fn scan_params(directory: Option<&Path>) -> Value {
    match directory {
        Some(dir) => json!({ "directory": dir }),
        None => json!({}),
    }
}

pub fn run_scan(index: &DocumentIndex, directory: Option<&Path>) -> Result<()> {
    let report = index.scan(directory)?;
    print_report(&report);
    let documents = index.documents_under(&report.root);
    if !documents.is_empty() {
        println!();
        print_documents(&documents);
    }
    Ok(())
}

pub fn print_report(report: &ScanReport) {
    println!("Scanned {}", report.root.display());
    println!("  processed:   {}", report.processed_count());
    println!("  unchanged:   {}", report.skipped_unchanged);
    println!("  unsupported: {}", report.skipped_unsupported);
    println!("  removed:     {}", report.removed.len());
    println!("  failed:      {}", report.failed_count());
    for failure in &report.failed {
        println!("    {}: {}", failure.path.display(), failure.cause);
    }
    if report.cancelled {
        println!("  (cancelled)");
    }
    println!("  took:        {} ms", report.duration_ms);
}

fn print_documents(documents: &[DocumentSummary]) {
    for (i, doc) in documents.iter().enumerate() {
        println!(
            "{}. {} [{}, {}]",
            i + 1,
            doc.file_name,
            doc.file_type,
            doc.language
        );
        println!("    path: {}", doc.path.display());
        println!(
            "    size: {}  chars: {}  modified: {}",
            stats::format_bytes(doc.size_bytes),
            doc.content_length,
            stats::format_relative(doc.modified_time)
        );
        println!(
            "    preview: \"{}\"",
            doc.content_preview.replace('\n', " ").trim()
        );
    }
}

pub fn run_search(index: &DocumentIndex, query: &str, limit: Option<usize>) -> Result<()> {
    let limit = limit.unwrap_or(index.default_max_results());
    let outcome = index.search(query, limit)?;
    print_matches(&outcome);
    Ok(())
}

pub fn run_regex(
    index: &DocumentIndex,
    pattern: &str,
    case_sensitive: bool,
    limit: Option<usize>,
) -> Result<()> {
    let limit = limit.unwrap_or(index.default_max_results());
    let outcome = index.search_regex(pattern, !case_sensitive, limit)?;
    print_matches(&outcome);
    Ok(())
}

fn print_matches(outcome: &SearchOutcome) {
    if outcome.matches.is_empty() {
        println!("No results.");
        return;
    }
    for (i, m) in outcome.matches.iter().enumerate() {
        println!(
            "{}. {} (match {} of {}, char {})",
            i + 1,
            m.file_name,
            m.match_number,
            m.total_matches,
            m.position
        );
        println!("    path: {}", m.path.display());
        println!("    context: \"{}\"", m.context.replace('\n', " ").trim());
        println!();
    }
    let suffix = if outcome.truncated {
        " (limit reached, more matches exist)"
    } else {
        ""
    };
    println!("{} matches{}", outcome.total_found, suffix);
}

pub fn run_list(index: &DocumentIndex) -> Result<()> {
    let documents = index.list_documents();
    if documents.is_empty() {
        println!("No documents indexed.");
        return Ok(());
    }
    print_documents(&documents);
    Ok(())
}

pub fn run_stats(index: &DocumentIndex) -> Result<()> {
    print!("{}", stats::render(&index.get_stats()));
    Ok(())
}

pub fn run_get(index: &DocumentIndex, path_or_name: &str) -> Result<()> {
    let doc = match index.get_content(path_or_name) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!("--- Document ---");
    println!("path:       {}", doc.path.display());
    println!("file_name:  {}", doc.file_name);
    println!("file_type:  {}", doc.file_type);
    println!("language:   {}", doc.language);
    println!("size:       {}", stats::format_bytes(doc.size_bytes));
    println!("modified:   {}", doc.modified_time.format("%Y-%m-%dT%H:%M:%SZ"));
    println!();
    println!("--- Content ---");
    println!("{}", doc.content);
    Ok(())
}
