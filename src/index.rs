//! The document index: one cache plus the scanner, search engine and
//! stats built over it.
//!
//! [`DocumentIndex`] is the object every outer surface (CLI, MCP, HTTP)
//! talks to. It is `Sync`; share it behind an `Arc`. Scans serialize among
//! themselves, while reads work on snapshots and never wait for a scan.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::cache::DocumentCache;
use crate::config::Config;
use crate::error::{IndexError, Result};
use crate::extract::ExtractorRegistry;
use crate::language::LanguageDetector;
use crate::models::{DocumentRecord, DocumentSummary, IndexStats, ScanReport, SearchOutcome};
use crate::scanner::Scanner;
use crate::search::SearchEngine;
use crate::stats;

pub struct DocumentIndex {
    cache: Arc<DocumentCache>,
    scanner: Scanner,
    engine: SearchEngine,
    default_max_results: usize,
}

impl DocumentIndex {
    /// Index with every built-in extractor.
    pub fn new(config: &Config) -> Self {
        Self::with_registry(config, ExtractorRegistry::builtin())
    }

    pub fn with_registry(config: &Config, registry: ExtractorRegistry) -> Self {
        let cache = Arc::new(DocumentCache::new());
        let scanner = Scanner::new(
            Arc::clone(&cache),
            Arc::new(registry),
            LanguageDetector::new(&config.language),
            config.index.clone(),
        );
        Self {
            cache,
            scanner,
            engine: SearchEngine::new(&config.search),
            default_max_results: config.search.default_max_results,
        }
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    pub fn default_max_results(&self) -> usize {
        self.default_max_results
    }

    /// Scans `directory`, or the configured `index.root` when `None`.
    pub fn scan(&self, directory: Option<&Path>) -> Result<ScanReport> {
        let root = directory.unwrap_or_else(|| self.scanner.default_root());
        self.scanner.scan(root)
    }

    /// Stops the scan in progress, if any.
    pub fn cancel_scan(&self) {
        self.scanner.cancel();
    }

    pub fn search(&self, query: &str, max_results: usize) -> Result<SearchOutcome> {
        self.engine
            .search(&self.searchable_snapshot(), query, max_results)
    }

    pub fn search_regex(
        &self,
        pattern: &str,
        case_insensitive: bool,
        max_results: usize,
    ) -> Result<SearchOutcome> {
        self.engine.search_regex(
            &self.searchable_snapshot(),
            pattern,
            case_insensitive,
            max_results,
        )
    }

    /// Snapshot minus records whose file changed or vanished since it was
    /// extracted. Those stay out of results until the next scan refreshes
    /// or prunes them.
    fn searchable_snapshot(&self) -> Vec<Arc<DocumentRecord>> {
        self.cache
            .snapshot()
            .into_iter()
            .filter(|record| {
                let current = is_current(record);
                if !current {
                    tracing::debug!(path = %record.path.display(), "stale record skipped by search");
                }
                current
            })
            .collect()
    }

    /// Summaries of every cached document, sorted by path.
    pub fn list_documents(&self) -> Vec<DocumentSummary> {
        self.cache.snapshot().iter().map(|r| r.summary()).collect()
    }

    /// Summaries of the cached documents under `root`.
    pub fn documents_under(&self, root: &Path) -> Vec<DocumentSummary> {
        self.cache
            .snapshot()
            .iter()
            .filter(|r| r.path.starts_with(root))
            .map(|r| r.summary())
            .collect()
    }

    pub fn get_stats(&self) -> IndexStats {
        stats::compute(&self.cache.snapshot())
    }

    /// Full record for a path or a file name.
    ///
    /// Tried in order: the exact cache key, the canonicalized path, then a
    /// file-name match. A file name shared by several documents is refused
    /// rather than guessed.
    pub fn get_content(&self, path_or_name: &str) -> Result<Arc<DocumentRecord>> {
        let key = path_or_name.trim();
        if key.is_empty() {
            return Err(IndexError::InvalidQuery(
                "document path or file name must not be empty".to_string(),
            ));
        }

        if let Some(record) = self.cache.get(Path::new(key)) {
            return Ok(record);
        }
        if let Ok(canonical) = std::fs::canonicalize(key) {
            if let Some(record) = self.cache.get(&canonical) {
                return Ok(record);
            }
        }

        let mut by_name: Vec<Arc<DocumentRecord>> = self
            .cache
            .snapshot()
            .into_iter()
            .filter(|r| r.file_name == key)
            .collect();
        match by_name.len() {
            0 => Err(IndexError::NotFound(key.to_string())),
            1 => Ok(by_name.remove(0)),
            n => Err(IndexError::InvalidQuery(format!(
                "'{}' matches {} documents; use the full path",
                key, n
            ))),
        }
    }
}

/// The file still exists with the modification time it was extracted at.
fn is_current(record: &DocumentRecord) -> bool {
    match std::fs::metadata(&record.path).and_then(|m| m.modified()) {
        Ok(modified) => DateTime::<Utc>::from(modified) == record.modified_time,
        Err(_) => false,
    }
}
