//! Core data models used throughout docsift.
//!
//! These types represent the indexed documents, the scan report, and the
//! search results that flow between the scanner, the search engine and the
//! tool surfaces.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Characters of content shown in a [`DocumentSummary`].
const PREVIEW_CHARS: usize = 200;

/// One indexed file. Immutable once built; re-extraction produces a new record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentRecord {
    pub path: PathBuf,
    pub file_name: String,
    pub file_type: String,
    pub language: String,
    pub size_bytes: u64,
    /// On-disk modification time observed at extraction; the staleness key.
    pub modified_time: DateTime<Utc>,
    pub content: String,
    pub extracted_at: DateTime<Utc>,
}

impl DocumentRecord {
    pub fn summary(&self) -> DocumentSummary {
        let content_length = self.content.chars().count();
        let content_preview = if content_length > PREVIEW_CHARS {
            let head: String = self.content.chars().take(PREVIEW_CHARS).collect();
            format!("{}...", head)
        } else {
            self.content.clone()
        };
        DocumentSummary {
            path: self.path.clone(),
            file_name: self.file_name.clone(),
            file_type: self.file_type.clone(),
            language: self.language.clone(),
            size_bytes: self.size_bytes,
            modified_time: self.modified_time,
            content_length,
            content_preview,
        }
    }
}

/// Listing view of a [`DocumentRecord`] without the full content.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub path: PathBuf,
    pub file_name: String,
    pub file_type: String,
    pub language: String,
    pub size_bytes: u64,
    pub modified_time: DateTime<Utc>,
    pub content_length: usize,
    pub content_preview: String,
}

/// A file the scanner could not index, with a human-readable cause.
#[derive(Debug, Clone, Serialize)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub cause: String,
}

/// Outcome of one scan. Per-file failures live here, not in an `Err`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub root: PathBuf,
    /// Paths extracted (new or changed) during this scan, in walk order.
    pub processed: Vec<PathBuf>,
    /// Supported files whose cached record was still fresh.
    pub skipped_unchanged: usize,
    /// Files with no registered extractor.
    pub skipped_unsupported: usize,
    pub failed: Vec<ScanFailure>,
    /// Cache entries pruned because their file is gone.
    pub removed: Vec<PathBuf>,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl ScanReport {
    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

/// A single hit. Ephemeral; never stored.
#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    pub path: PathBuf,
    pub file_name: String,
    pub file_type: String,
    pub language: String,
    /// Character offset of the match start within the content.
    pub position: usize,
    pub byte_offset: usize,
    /// 1-based index of this match within its document.
    pub match_number: usize,
    /// Matches in this document, counted past the result limit.
    pub total_matches: usize,
    /// The matched text exactly as it appears in the content.
    pub matched: String,
    /// Surrounding text with the match wrapped in highlight markers.
    pub context: String,
}

/// Matches plus the bookkeeping the tool responses report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutcome {
    pub matches: Vec<SearchMatch>,
    pub total_found: usize,
    /// The limit was hit while more matches existed.
    pub truncated: bool,
}

/// Aggregate counts over a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexStats {
    pub total_documents: usize,
    pub total_size_bytes: u64,
    pub total_size_mb: f64,
    pub avg_size_kb: f64,
    pub counts_by_type: BTreeMap<String, usize>,
    pub counts_by_language: BTreeMap<String, usize>,
}
