//! Text-based structured formats: CSV, JSON and Markdown.
//!
//! All three decode their bytes through the plain-text fallback chain first,
//! so a Latin-1 CSV or a UTF-16 JSON file is handled the same way a `.txt`
//! file would be.

use pulldown_cmark::{Event, Options, Parser, TagEnd};

use super::ooxml::CELL_DELIMITER;
use super::text::decode_text;
use super::{ExtractError, Extractor};

/// CSV: header row and data rows, one line each, fields joined by [`CELL_DELIMITER`].
pub struct CsvExtractor;

impl Extractor for CsvExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let text = decode_text(bytes)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut lines = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ExtractError::Csv(e.to_string()))?;
            let fields: Vec<&str> = record
                .iter()
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .collect();
            if !fields.is_empty() {
                lines.push(fields.join(CELL_DELIMITER));
            }
        }
        Ok(lines.join("\n"))
    }
}

/// JSON: parsed and pretty-printed, so keys and values are searchable as text.
pub struct JsonExtractor;

impl Extractor for JsonExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let text = decode_text(bytes)?;
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| ExtractError::Json(e.to_string()))?;
        serde_json::to_string_pretty(&value).map_err(|e| ExtractError::Json(e.to_string()))
    }
}

/// Markdown rendered to plain text: markup and raw HTML are dropped,
/// block elements end a line, table cells are delimited.
pub struct MarkdownExtractor;

impl Extractor for MarkdownExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let source = decode_text(bytes)?;
        Ok(markdown_to_text(&source))
    }
}

pub fn markdown_to_text(source: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut out = String::with_capacity(source.len());
    for event in Parser::new_ext(source, options) {
        match event {
            Event::Text(t) | Event::Code(t) => out.push_str(&t),
            Event::SoftBreak => out.push(' '),
            Event::HardBreak => out.push('\n'),
            Event::End(TagEnd::TableCell) => out.push_str(CELL_DELIMITER),
            Event::End(TagEnd::TableHead) | Event::End(TagEnd::TableRow) => {
                if out.ends_with(CELL_DELIMITER) {
                    out.truncate(out.len() - CELL_DELIMITER.len());
                }
                out.push('\n');
            }
            Event::End(
                TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock,
            ) => out.push('\n'),
            _ => {}
        }
    }
    out
}
