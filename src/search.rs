//! Literal and regex search over a cache snapshot.
//!
//! Both modes compile to a [`regex::Regex`] and share one match loop:
//! literal queries are escaped and matched case-insensitively, so match
//! offsets always refer to the original content and never to a lowercased
//! copy of it.
//!
//! Results follow snapshot order (sorted by path), then position within a
//! document. Collection stops hard at `max_results`, even in the middle of
//! a document; [`SearchOutcome::truncated`] says whether more matches
//! existed.

use std::sync::Arc;

use regex::{Regex, RegexBuilder};

use crate::config::SearchConfig;
use crate::error::{IndexError, Result};
use crate::models::{DocumentRecord, SearchMatch, SearchOutcome};

/// Compiled program size cap for user-supplied patterns.
const REGEX_SIZE_LIMIT: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct SearchEngine {
    context_radius: usize,
    highlight_open: String,
    highlight_close: String,
}

impl SearchEngine {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            context_radius: config.context_radius,
            highlight_open: config.highlight_open.clone(),
            highlight_close: config.highlight_close.clone(),
        }
    }

    /// Case-insensitive substring search.
    pub fn search(
        &self,
        records: &[Arc<DocumentRecord>],
        query: &str,
        max_results: usize,
    ) -> Result<SearchOutcome> {
        if query.is_empty() {
            return Err(IndexError::InvalidQuery(
                "query must not be empty".to_string(),
            ));
        }
        if max_results == 0 {
            return Ok(SearchOutcome::default());
        }
        let regex = RegexBuilder::new(&regex::escape(query))
            .case_insensitive(true)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
            .map_err(|e| IndexError::InvalidQuery(e.to_string()))?;
        Ok(self.collect(records, &regex, max_results))
    }

    /// Regex search with `^`/`$` anchored at line boundaries.
    pub fn search_regex(
        &self,
        records: &[Arc<DocumentRecord>],
        pattern: &str,
        case_insensitive: bool,
        max_results: usize,
    ) -> Result<SearchOutcome> {
        if pattern.is_empty() {
            return Err(IndexError::InvalidQuery(
                "pattern must not be empty".to_string(),
            ));
        }
        let regex = compile_pattern(pattern, case_insensitive)?;
        if max_results == 0 {
            return Ok(SearchOutcome::default());
        }
        Ok(self.collect(records, &regex, max_results))
    }

    fn collect(
        &self,
        records: &[Arc<DocumentRecord>],
        regex: &Regex,
        max_results: usize,
    ) -> SearchOutcome {
        let mut outcome = SearchOutcome::default();

        'docs: for record in records {
            let content = record.content.as_str();
            let hits: Vec<regex::Match<'_>> =
                regex.find_iter(content).filter(|m| !m.is_empty()).collect();
            let total_matches = hits.len();
            let mut scanned_bytes = 0;
            let mut scanned_chars = 0;

            for (i, m) in hits.into_iter().enumerate() {
                if outcome.matches.len() == max_results {
                    outcome.truncated = true;
                    break 'docs;
                }

                scanned_chars += content[scanned_bytes..m.start()].chars().count();
                scanned_bytes = m.start();

                outcome.matches.push(SearchMatch {
                    path: record.path.clone(),
                    file_name: record.file_name.clone(),
                    file_type: record.file_type.clone(),
                    language: record.language.clone(),
                    position: scanned_chars,
                    byte_offset: m.start(),
                    match_number: i + 1,
                    total_matches,
                    matched: m.as_str().to_string(),
                    context: self.context_window(content, m.start(), m.end()),
                });
            }
        }

        outcome.total_found = outcome.matches.len();
        outcome
    }

    /// `context_radius` characters either side of `start..end`, clamped to
    /// the content, with the match wrapped in the highlight markers.
    pub fn context_window(&self, content: &str, start: usize, end: usize) -> String {
        let from = chars_back(content, start, self.context_radius);
        let to = chars_forward(content, end, self.context_radius);
        let mut window = String::with_capacity(
            to - from + self.highlight_open.len() + self.highlight_close.len(),
        );
        window.push_str(&content[from..start]);
        window.push_str(&self.highlight_open);
        window.push_str(&content[start..end]);
        window.push_str(&self.highlight_close);
        window.push_str(&content[end..to]);
        window
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(&SearchConfig::default())
    }
}

pub fn compile_pattern(pattern: &str, case_insensitive: bool) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .multi_line(true)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .map_err(|e| IndexError::InvalidPattern {
            pattern: pattern.to_string(),
            cause: e.to_string(),
        })
}

/// Byte index `n` characters before `idx`, or 0.
fn chars_back(s: &str, idx: usize, n: usize) -> usize {
    if n == 0 {
        return idx;
    }
    s[..idx]
        .char_indices()
        .rev()
        .nth(n - 1)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Byte index `n` characters after `idx`, or the end of `s`.
fn chars_forward(s: &str, idx: usize, n: usize) -> usize {
    s[idx..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| idx + i)
        .unwrap_or(s.len())
}
