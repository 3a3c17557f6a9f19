//! Collection statistics.
//!
//! [`compute`] is a pure fold over a snapshot; the CLI prints the result
//! with [`render`]. Sizes are rounded to two decimals, the way the JSON
//! tools report them.

use std::fmt::Write;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::{DocumentRecord, IndexStats};

pub fn compute(records: &[Arc<DocumentRecord>]) -> IndexStats {
    let mut stats = IndexStats::default();
    for record in records {
        stats.total_documents += 1;
        stats.total_size_bytes += record.size_bytes;
        *stats
            .counts_by_type
            .entry(record.file_type.clone())
            .or_insert(0) += 1;
        *stats
            .counts_by_language
            .entry(record.language.clone())
            .or_insert(0) += 1;
    }

    let total = stats.total_size_bytes as f64;
    stats.total_size_mb = round2(total / 1024.0 / 1024.0);
    if stats.total_documents > 0 {
        stats.avg_size_kb = round2(total / stats.total_documents as f64 / 1024.0);
    }
    stats
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Human-readable summary for `docsift stats`.
pub fn render(stats: &IndexStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "docsift — Index Stats");
    let _ = writeln!(out, "=====================");
    let _ = writeln!(out);
    let _ = writeln!(out, "  Documents:   {}", stats.total_documents);
    let _ = writeln!(out, "  Total size:  {}", format_bytes(stats.total_size_bytes));
    let _ = writeln!(out, "  Average:     {:.2} KB", stats.avg_size_kb);

    if !stats.counts_by_type.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  By type:");
        for (file_type, count) in &stats.counts_by_type {
            let _ = writeln!(out, "    {:<26} {:>6}", file_type, count);
        }
    }
    if !stats.counts_by_language.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  By language:");
        for (language, count) in &stats.counts_by_language {
            let _ = writeln!(out, "    {:<26} {:>6}", language, count);
        }
    }
    out
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Relative time for listings (e.g. "3 hours ago"); absolute past 30 days.
pub fn format_relative(ts: DateTime<Utc>) -> String {
    let delta = (Utc::now() - ts).num_seconds();
    if delta < 0 {
        return ts.format("%Y-%m-%d %H:%M").to_string();
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        ts.format("%Y-%m-%d %H:%M").to_string()
    }
}
