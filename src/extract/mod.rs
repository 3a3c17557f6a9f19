//! File-type dispatch and text extraction.
//!
//! Every supported format is an [`Extractor`] registered under one or more
//! file extensions with a human-readable type label. The scanner looks an
//! entry up by extension and calls [`ExtractorEntry::extract_file`], which
//! reads the bytes, runs the extractor and normalizes the result.
//!
//! | Extensions | Label | Module |
//! |------------|-------|--------|
//! | `.txt` `.text` `.log` | Text File | [`text`] |
//! | `.md` `.markdown` | Markdown Document | [`structured`] |
//! | `.csv` | CSV File | [`structured`] |
//! | `.json` | JSON File | [`structured`] |
//! | `.pdf` | PDF Document | this module (pdf-extract) |
//! | `.docx` `.xlsx` `.pptx` | Word / Excel / PowerPoint | [`ooxml`] |
//!
//! Adding a format is a call to [`ExtractorRegistry::register`]; nothing in
//! the scanner changes.

pub mod ooxml;
pub mod structured;
pub mod text;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use thiserror::Error;

use crate::error::IndexError;

/// Extraction failure for a single file. The scanner records it against the
/// path and moves on. A panicking extractor surfaces as [`ExtractError::Panicked`].
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("OOXML extraction failed: {0}")]
    Ooxml(String),
    #[error("CSV parsing failed: {0}")]
    Csv(String),
    #[error("JSON parsing failed: {0}")]
    Json(String),
    #[error("could not decode text: {0}")]
    Encoding(String),
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("file exceeds size limit ({size} > {limit} bytes)")]
    TooLarge { size: u64, limit: u64 },
    #[error("no text extracted")]
    Empty,
    #[error("extractor panicked: {0}")]
    Panicked(String),
}

/// Converts the raw bytes of one file format into text.
pub trait Extractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// PDF text layer via pdf-extract.
pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
    }
}

/// One row of the registration table.
pub struct ExtractorEntry {
    extensions: Vec<String>,
    label: String,
    extractor: Box<dyn Extractor>,
}

impl ExtractorEntry {
    /// Human-readable type label, e.g. `"PDF Document"`.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn extractor(&self) -> &dyn Extractor {
        self.extractor.as_ref()
    }

    /// Reads `path` (refusing files above `max_bytes`), extracts and
    /// normalizes its text. Text that normalizes to nothing is an error.
    pub fn extract_file(&self, path: &Path, max_bytes: u64) -> Result<String, ExtractError> {
        let size = std::fs::metadata(path)?.len();
        if size > max_bytes {
            return Err(ExtractError::TooLarge {
                size,
                limit: max_bytes,
            });
        }
        let bytes = std::fs::read(path)?;
        let raw = panic::catch_unwind(AssertUnwindSafe(|| self.extractor.extract(&bytes)))
            .map_err(|payload| ExtractError::Panicked(panic_message(payload.as_ref())))??;
        let text = normalize_text(&raw);
        if text.is_empty() {
            return Err(ExtractError::Empty);
        }
        Ok(text)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Static extension → extractor table.
pub struct ExtractorRegistry {
    entries: Vec<ExtractorEntry>,
}

impl ExtractorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registry with every built-in format.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(&[".txt", ".text", ".log"], "Text File", Box::new(text::PlainTextExtractor));
        registry.register(
            &[".md", ".markdown"],
            "Markdown Document",
            Box::new(structured::MarkdownExtractor),
        );
        registry.register(&[".csv"], "CSV File", Box::new(structured::CsvExtractor));
        registry.register(&[".json"], "JSON File", Box::new(structured::JsonExtractor));
        registry.register(&[".pdf"], "PDF Document", Box::new(PdfExtractor));
        registry.register(&[".docx"], "Word Document", Box::new(ooxml::DocxExtractor));
        registry.register(&[".xlsx"], "Excel Spreadsheet", Box::new(ooxml::XlsxExtractor));
        registry.register(
            &[".pptx"],
            "PowerPoint Presentation",
            Box::new(ooxml::PptxExtractor),
        );
        registry
    }

    /// Register an extractor. Later registrations win for a repeated extension.
    pub fn register(&mut self, extensions: &[&str], label: &str, extractor: Box<dyn Extractor>) {
        self.entries.push(ExtractorEntry {
            extensions: extensions.iter().map(|e| canonical_extension(e)).collect(),
            label: label.to_string(),
            extractor,
        });
    }

    /// Look up by extension. Case-insensitive; the leading dot is optional.
    pub fn lookup(&self, extension: &str) -> Result<&ExtractorEntry, IndexError> {
        let wanted = canonical_extension(extension);
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.extensions.iter().any(|e| *e == wanted))
            .ok_or(IndexError::UnsupportedType { extension: wanted })
    }

    /// Look up by the extension of `path`. Files without an extension are unsupported.
    pub fn for_path(&self, path: &Path) -> Result<&ExtractorEntry, IndexError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        self.lookup(&ext)
    }

    pub fn entries(&self) -> &[ExtractorEntry] {
        &self.entries
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn canonical_extension(ext: &str) -> String {
    let lower = ext.trim().to_lowercase();
    if lower.is_empty() || lower.starts_with('.') {
        lower
    } else {
        format!(".{}", lower)
    }
}

/// Collapses extracted text into its stored form.
///
/// Control characters other than `\n` are dropped (tabs become spaces),
/// horizontal whitespace collapses to one space, lines are trimmed, and
/// runs of blank lines collapse to a single blank line. Line structure is
/// kept so that `^`/`$` anchors still mean line start and end.
pub fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blank_run = 0usize;
    for line in raw.split('\n') {
        let mut cleaned = String::with_capacity(line.len());
        let mut pending_space = false;
        for ch in line.chars() {
            if ch.is_whitespace() {
                pending_space = true;
                continue;
            }
            if ch.is_control() || ch == '\u{feff}' {
                continue;
            }
            if pending_space && !cleaned.is_empty() {
                cleaned.push(' ');
            }
            pending_space = false;
            cleaned.push(ch);
        }
        if cleaned.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if blank_run > 0 {
                out.push('\n');
            }
        }
        blank_run = 0;
        out.push_str(&cleaned);
    }
    out
}
