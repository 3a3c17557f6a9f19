//! End-to-end behaviour of the index over real directories: caching,
//! re-extraction, pruning, failure isolation and the search contract.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use docsift::config::Config;
use docsift::error::IndexError;
use docsift::index::DocumentIndex;
use tempfile::TempDir;

fn index_for(root: &Path) -> DocumentIndex {
    let mut cfg = Config::minimal();
    cfg.index.root = root.to_path_buf();
    DocumentIndex::new(&cfg)
}

fn fox_and_dog() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a.txt"), "the quick brown fox").unwrap();
    fs::write(tmp.path().join("b.txt"), "the lazy dog").unwrap();
    tmp
}

fn set_mtime(path: &Path, time: SystemTime) {
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(time).unwrap();
}

fn minimal_docx_with_text(phrase: &str) -> Vec<u8> {
    use std::io::Write;
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:body></w:document>",
            phrase
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

/// One-page PDF whose only font uses `encoding`.
fn pdf_with_font_encoding(encoding: &str) -> Vec<u8> {
    let stream = b"BT /F1 12 Tf 100 700 Td (hello) Tj ET";
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let mut offsets = Vec::new();
    offsets.push(out.len());
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    offsets.push(out.len());
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    offsets.push(out.len());
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    offsets.push(out.len());
    out.extend_from_slice(format!("4 0 obj << /Length {} >> stream\n", stream.len()).as_bytes());
    out.extend_from_slice(stream);
    out.extend_from_slice(b"\nendstream endobj\n");
    offsets.push(out.len());
    out.extend_from_slice(
        format!(
            "5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /{} >> endobj\n",
            encoding
        )
        .as_bytes(),
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

#[test]
fn fox_and_dog_scenario() {
    let tmp = fox_and_dog();
    let index = index_for(tmp.path());

    let report = index.scan(None).unwrap();
    assert_eq!(report.processed_count(), 2);
    assert_eq!(report.failed_count(), 0);

    let the = index.search("the", 10).unwrap();
    assert_eq!(the.total_found, 2);
    assert_eq!(the.matches[0].file_name, "a.txt");
    assert_eq!(the.matches[1].file_name, "b.txt");

    let fox = index.search("fox", 10).unwrap();
    assert_eq!(fox.total_found, 1);
    assert_eq!(fox.matches[0].file_name, "a.txt");
    assert!(
        fox.matches[0].context.contains("the quick brown **fox**"),
        "context was {:?}",
        fox.matches[0].context
    );

    let anchored = index.search_regex("^the", true, 10).unwrap();
    assert_eq!(anchored.total_found, 2);

    let stats = index.get_stats();
    assert_eq!(stats.total_documents, 2);
    assert_eq!(stats.counts_by_type.len(), 1);
    assert_eq!(stats.counts_by_type["Text File"], 2);
}

#[test]
fn unchanged_rescan_extracts_nothing() {
    let tmp = fox_and_dog();
    let index = index_for(tmp.path());

    index.scan(None).unwrap();
    let before = index.cache().snapshot();

    let report = index.scan(None).unwrap();
    assert_eq!(report.processed_count(), 0);
    assert_eq!(report.skipped_unchanged, 2);
    assert!(report.removed.is_empty());

    let after = index.cache().snapshot();
    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(after.iter()) {
        assert!(Arc::ptr_eq(b, a), "record for {} was replaced", b.path.display());
    }
}

#[test]
fn touching_a_file_forces_reextraction() {
    let tmp = fox_and_dog();
    let index = index_for(tmp.path());
    index.scan(None).unwrap();

    let a = tmp.path().join("a.txt");
    fs::write(&a, "the quick red fox").unwrap();
    let touched = SystemTime::now() + Duration::from_secs(30);
    set_mtime(&a, touched);

    let report = index.scan(None).unwrap();
    assert_eq!(report.processed_count(), 1);
    assert!(report.processed[0].ends_with("a.txt"));
    assert_eq!(report.skipped_unchanged, 1);

    let record = index.get_content("a.txt").unwrap();
    assert_eq!(record.content, "the quick red fox");
    assert_eq!(record.modified_time, chrono::DateTime::<chrono::Utc>::from(touched));
}

#[test]
fn older_timestamp_also_counts_as_stale() {
    let tmp = fox_and_dog();
    let index = index_for(tmp.path());
    index.scan(None).unwrap();

    set_mtime(
        &tmp.path().join("b.txt"),
        SystemTime::now() - Duration::from_secs(3600),
    );
    let report = index.scan(None).unwrap();
    assert_eq!(report.processed_count(), 1);
}

#[test]
fn edited_file_is_not_searched_until_rescanned() {
    let tmp = TempDir::new().unwrap();
    let doc = tmp.path().join("draft.txt");
    fs::write(&doc, "old phrase here").unwrap();
    let index = index_for(tmp.path());
    index.scan(None).unwrap();
    assert_eq!(index.search("old phrase", 10).unwrap().total_found, 1);

    fs::write(&doc, "new words entirely").unwrap();
    set_mtime(&doc, SystemTime::now() + Duration::from_secs(30));

    assert!(index.search("old phrase", 10).unwrap().matches.is_empty());
    assert!(index.search_regex("^old", true, 10).unwrap().matches.is_empty());

    index.scan(None).unwrap();
    assert!(index.search("old phrase", 10).unwrap().matches.is_empty());
    assert_eq!(index.search("new words", 10).unwrap().total_found, 1);
}

#[test]
fn deleted_files_are_pruned() {
    let tmp = fox_and_dog();
    let index = index_for(tmp.path());
    index.scan(None).unwrap();

    fs::remove_file(tmp.path().join("b.txt")).unwrap();
    let report = index.scan(None).unwrap();
    assert_eq!(report.removed.len(), 1);
    assert!(report.removed[0].ends_with("b.txt"));
    assert_eq!(index.cache().len(), 1);

    let lazy = index.search("lazy", 10).unwrap();
    assert!(lazy.matches.is_empty());
}

#[test]
fn corrupt_pdf_does_not_abort_the_scan() {
    let tmp = fox_and_dog();
    fs::write(tmp.path().join("broken.pdf"), b"%PDF-1.4 this is not really a pdf").unwrap();
    let index = index_for(tmp.path());

    let report = index.scan(None).unwrap();
    assert_eq!(report.processed_count(), 2);
    assert_eq!(report.failed_count(), 1);
    assert!(report.failed[0].path.ends_with("broken.pdf"));
    assert_eq!(index.cache().len(), 2);
}

#[test]
fn pdf_with_unknown_font_encoding_is_a_per_file_failure() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a.txt"), "plain neighbour text").unwrap();
    fs::write(tmp.path().join("bad.pdf"), pdf_with_font_encoding("BogusEncoding")).unwrap();
    let index = index_for(tmp.path());

    let report = index.scan(None).unwrap();
    assert_eq!(report.processed_count(), 1);
    assert!(report.processed[0].ends_with("a.txt"));
    assert_eq!(report.failed_count(), 1);
    assert!(report.failed[0].path.ends_with("bad.pdf"));
    assert_eq!(index.cache().len(), 1);
    assert_eq!(index.search("neighbour", 10).unwrap().total_found, 1);
}

#[test]
fn failed_reextraction_keeps_previous_record() {
    let tmp = TempDir::new().unwrap();
    let doc = tmp.path().join("memo.docx");
    fs::write(&doc, minimal_docx_with_text("original memo text")).unwrap();
    let index = index_for(tmp.path());
    index.scan(None).unwrap();
    assert_eq!(index.get_content("memo.docx").unwrap().content, "original memo text");

    fs::write(&doc, b"PK\x03\x04 truncated archive").unwrap();
    set_mtime(&doc, SystemTime::now() + Duration::from_secs(30));

    let report = index.scan(None).unwrap();
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.processed_count(), 0);
    assert!(report.removed.is_empty());
    assert_eq!(index.get_content("memo.docx").unwrap().content, "original memo text");
}

#[test]
fn literal_search_ignores_case() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("log.txt"), "Batch PROCESSING finished").unwrap();
    let index = index_for(tmp.path());
    index.scan(None).unwrap();

    let out = index.search("processing", 10).unwrap();
    assert_eq!(out.total_found, 1);
    assert_eq!(out.matches[0].matched, "PROCESSING");

    let out = index.search("PROCESSING", 10).unwrap();
    assert_eq!(out.total_found, 1);
}

#[test]
fn invalid_regex_is_invalid_pattern() {
    let tmp = fox_and_dog();
    let index = index_for(tmp.path());
    index.scan(None).unwrap();

    match index.search_regex("(the", true, 10) {
        Err(IndexError::InvalidPattern { pattern, .. }) => assert_eq!(pattern, "(the"),
        other => panic!("expected InvalidPattern, got {:?}", other.map(|o| o.total_found)),
    }
}

#[test]
fn zero_max_results_in_both_modes() {
    let tmp = fox_and_dog();
    let index = index_for(tmp.path());
    index.scan(None).unwrap();

    assert!(index.search("the", 0).unwrap().matches.is_empty());
    assert!(index.search_regex("the", true, 0).unwrap().matches.is_empty());
}

#[test]
fn plain_text_round_trips() {
    let tmp = TempDir::new().unwrap();
    let text = "First paragraph of the file.\n\nSecond paragraph, with punctuation!";
    fs::write(tmp.path().join("plain.txt"), text).unwrap();
    let index = index_for(tmp.path());
    index.scan(None).unwrap();

    let record = index.get_content("plain.txt").unwrap();
    assert_eq!(record.content, text);
    assert_eq!(record.file_type, "Text File");
    assert_eq!(record.size_bytes, text.len() as u64);
}

#[test]
fn explicit_directory_overrides_root() {
    let configured = fox_and_dog();
    let other = TempDir::new().unwrap();
    fs::write(other.path().join("c.txt"), "another directory entirely").unwrap();

    let index = index_for(configured.path());
    let report = index.scan(Some(other.path())).unwrap();
    assert_eq!(report.processed_count(), 1);
    assert_eq!(index.list_documents()[0].file_name, "c.txt");
}

#[test]
fn missing_root_is_a_scan_error() {
    let index = index_for(Path::new("/definitely/not/a/real/dir"));
    assert!(matches!(index.scan(None), Err(IndexError::Scan { .. })));
}

#[test]
fn concurrent_scans_serialize_and_reads_proceed() {
    let tmp = TempDir::new().unwrap();
    for i in 0..20 {
        fs::write(
            tmp.path().join(format!("doc{:02}.txt", i)),
            format!("document number {} mentions the keyword", i),
        )
        .unwrap();
    }
    let index = Arc::new(index_for(tmp.path()));

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let index = Arc::clone(&index);
            std::thread::spawn(move || index.scan(None).map(|r| r.processed_count()))
        })
        .collect();
    let reader = {
        let index = Arc::clone(&index);
        std::thread::spawn(move || {
            for _ in 0..20 {
                let out = index.search("keyword", 100).unwrap();
                assert!(out.total_found <= 20);
            }
        })
    };

    let processed: usize = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .sum();
    reader.join().unwrap();

    // Exactly one of the serialized scans did the extraction work.
    assert_eq!(processed, 20);
    assert_eq!(index.search("keyword", 100).unwrap().total_found, 20);
}
