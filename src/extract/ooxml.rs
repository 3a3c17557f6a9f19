//! Office Open XML extraction (docx, xlsx, pptx).
//!
//! Each format is a ZIP archive of XML parts. Parts are read with a size
//! cap and streamed through quick-xml; no DOM is built.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{ExtractError, Extractor};

/// Maximum sheets to process in an xlsx.
const XLSX_MAX_SHEETS: usize = 100;
/// Maximum cells to process per sheet (avoids unbounded memory).
const XLSX_MAX_CELLS_PER_SHEET: usize = 100_000;
/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Delimiter between spreadsheet and table cells.
pub const CELL_DELIMITER: &str = " | ";

type Archive<'a> = zip::ZipArchive<Cursor<&'a [u8]>>;

fn ooxml_err(e: impl std::fmt::Display) -> ExtractError {
    ExtractError::Ooxml(e.to_string())
}

fn open_archive(bytes: &[u8]) -> Result<Archive<'_>, ExtractError> {
    zip::ZipArchive::new(Cursor::new(bytes)).map_err(ooxml_err)
}

fn read_zip_entry_bounded(archive: &mut Archive<'_>, name: &str) -> Result<Vec<u8>, ExtractError> {
    let entry = archive.by_name(name).map_err(ooxml_err)?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(ooxml_err)?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, MAX_XML_ENTRY_BYTES
        )));
    }
    Ok(out)
}

/// Like [`read_zip_entry_bounded`], but a missing part is `Ok(None)`.
fn read_optional_entry(
    archive: &mut Archive<'_>,
    name: &str,
) -> Result<Option<Vec<u8>>, ExtractError> {
    if archive.index_for_name(name).is_none() {
        return Ok(None);
    }
    read_zip_entry_bounded(archive, name).map(Some)
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key || a.key.local_name().as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Sorts part names like `prefix12.xml` by their number.
fn sort_numbered_parts(names: &mut [String], prefix: &str) {
    names.sort_by_key(|name| {
        name.trim_start_matches(prefix)
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
}

// ============ docx ============

/// Word documents: paragraph text and table cells in document order.
pub struct DocxExtractor;

impl Extractor for DocxExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let mut archive = open_archive(bytes)?;
        if archive.index_for_name("word/document.xml").is_none() {
            return Err(ExtractError::Ooxml(
                "word/document.xml not found".to_string(),
            ));
        }
        let xml = read_zip_entry_bounded(&mut archive, "word/document.xml")?;
        docx_body_text(&xml)
    }
}

/// Paragraphs become lines. Inside a table, paragraphs of one cell are
/// joined by spaces, cells by [`CELL_DELIMITER`], and each row is a line.
fn docx_body_text(xml: &[u8]) -> Result<String, ExtractError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut lines: Vec<String> = Vec::new();
    let mut paragraph = String::new();
    let mut cell = String::new();
    let mut row: Vec<String> = Vec::new();
    let mut table_depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"tbl" => table_depth += 1,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" | b"br" | b"cr" => paragraph.push(' '),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                paragraph.push_str(&te.unescape().map_err(ooxml_err)?);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let text = paragraph.trim().to_string();
                    paragraph.clear();
                    if !text.is_empty() && table_depth == 0 {
                        lines.push(text);
                    } else if !text.is_empty() {
                        if !cell.is_empty() {
                            cell.push(' ');
                        }
                        cell.push_str(&text);
                    }
                }
                b"tc" if table_depth == 1 => {
                    row.push(std::mem::take(&mut cell));
                }
                b"tr" if table_depth == 1 => {
                    let cells: Vec<String> = row.drain(..).filter(|c| !c.is_empty()).collect();
                    if !cells.is_empty() {
                        lines.push(cells.join(CELL_DELIMITER));
                    }
                }
                b"tbl" => table_depth = table_depth.saturating_sub(1),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(lines.join("\n"))
}

// ============ pptx ============

/// Presentations: slide text in slide-number order, one line per paragraph.
pub struct PptxExtractor;

impl Extractor for PptxExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let mut archive = open_archive(bytes)?;
        let mut slide_names: Vec<String> = archive
            .file_names()
            .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
            .map(|s| s.to_string())
            .collect();
        sort_numbered_parts(&mut slide_names, "ppt/slides/slide");

        let mut slides = Vec::new();
        for name in slide_names {
            let xml = read_zip_entry_bounded(&mut archive, &name)?;
            let text = drawing_text(&xml)?;
            if !text.is_empty() {
                slides.push(text);
            }
        }
        Ok(slides.join("\n\n"))
    }
}

/// Collects `<a:t>` runs, one line per `<a:p>`.
fn drawing_text(xml: &[u8]) -> Result<String, ExtractError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut lines = Vec::new();
    let mut paragraph = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(te)) if in_text => {
                paragraph.push_str(&te.unescape().map_err(ooxml_err)?);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let text = paragraph.trim().to_string();
                    paragraph.clear();
                    if !text.is_empty() {
                        lines.push(text);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(lines.join("\n"))
}

// ============ xlsx ============

/// Spreadsheets: every sheet under a `Sheet: <name>` header, non-empty
/// cells in row-major order, one line per row.
pub struct XlsxExtractor;

impl Extractor for XlsxExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let mut archive = open_archive(bytes)?;
        let shared_strings = match read_optional_entry(&mut archive, "xl/sharedStrings.xml")? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };
        let sheets = list_sheets(&mut archive)?;

        let mut sections = Vec::new();
        for (name, part) in sheets.into_iter().take(XLSX_MAX_SHEETS) {
            let xml = read_zip_entry_bounded(&mut archive, &part)?;
            let rows = sheet_rows(&xml, &shared_strings)?;
            let mut section = format!("Sheet: {}", name);
            for row in rows {
                section.push('\n');
                section.push_str(&row);
            }
            sections.push(section);
        }
        Ok(sections.join("\n\n"))
    }
}

/// Each `<si>` is one string; rich-text runs inside it are concatenated.
fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_t = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_t => {
                current.push_str(&te.unescape().map_err(ooxml_err)?);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"si" => strings.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// `(display name, part path)` for every worksheet in workbook order.
///
/// Names come from `xl/workbook.xml`, resolved to parts through
/// `xl/_rels/workbook.xml.rels`. Without a workbook part, worksheet files
/// are listed by number and named after their file.
fn list_sheets(archive: &mut Archive<'_>) -> Result<Vec<(String, String)>, ExtractError> {
    let workbook = read_optional_entry(archive, "xl/workbook.xml")?;
    let rels = read_optional_entry(archive, "xl/_rels/workbook.xml.rels")?;

    if let (Some(workbook), Some(rels)) = (workbook, rels) {
        let targets = parse_relationships(&rels)?;
        let mut sheets = Vec::new();
        let mut reader = Reader::from_reader(workbook.as_slice());
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                    let name = attr_value(&e, b"name").unwrap_or_default();
                    let part = attr_value(&e, b"id")
                        .and_then(|id| targets.get(&id).cloned())
                        .map(|target| resolve_part(&target));
                    if let Some(part) = part {
                        if archive.index_for_name(&part).is_some() {
                            sheets.push((name, part));
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(ooxml_err(e)),
                _ => {}
            }
            buf.clear();
        }
        if !sheets.is_empty() {
            return Ok(sheets);
        }
    }

    let mut parts: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    sort_numbered_parts(&mut parts, "xl/worksheets/sheet");
    Ok(parts
        .into_iter()
        .map(|part| {
            let name = part
                .trim_start_matches("xl/worksheets/")
                .trim_end_matches(".xml")
                .to_string();
            (name, part)
        })
        .collect())
}

fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, ExtractError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut targets = HashMap::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attr_value(&e, b"Id"), attr_value(&e, b"Target")) {
                    targets.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(targets)
}

/// Relationship targets are relative to `xl/` unless absolute.
fn resolve_part(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

/// One string per non-empty row, cells joined by [`CELL_DELIMITER`].
fn sheet_rows(xml: &[u8], shared_strings: &[String]) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell_type: Option<String> = None;
    let mut value = String::new();
    let mut capture = false;
    let mut cell_count = 0usize;

    loop {
        if cell_count >= XLSX_MAX_CELLS_PER_SHEET {
            break;
        }
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"c" => {
                    cell_type = attr_value(&e, b"t");
                    value.clear();
                }
                b"v" | b"t" => capture = true,
                _ => {}
            },
            Ok(Event::Text(te)) if capture => {
                value.push_str(&te.unescape().map_err(ooxml_err)?);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => capture = false,
                b"c" => {
                    let resolved = resolve_cell(cell_type.as_deref(), value.trim(), shared_strings);
                    if !resolved.is_empty() {
                        row.push(resolved);
                        cell_count += 1;
                    }
                    cell_type = None;
                    value.clear();
                }
                b"row" => {
                    if !row.is_empty() {
                        rows.push(row.join(CELL_DELIMITER));
                        row.clear();
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }
    if !row.is_empty() {
        rows.push(row.join(CELL_DELIMITER));
    }
    Ok(rows)
}

fn resolve_cell(cell_type: Option<&str>, raw: &str, shared_strings: &[String]) -> String {
    match cell_type {
        Some("s") => raw
            .parse::<usize>()
            .ok()
            .and_then(|i| shared_strings.get(i))
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        Some("b") => match raw {
            "1" => "TRUE".to_string(),
            "0" => "FALSE".to_string(),
            other => other.to_string(),
        },
        _ => raw.to_string(),
    }
}
