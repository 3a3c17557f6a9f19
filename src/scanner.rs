//! Directory scanning and cache maintenance.
//!
//! A scan walks the root (sorted, so results are deterministic), skips
//! excluded and unsupported files, and skips files whose cached record is
//! still fresh. The remaining files are extracted on a pool of scoped
//! worker threads; results come back over a channel and the scanning
//! thread is the only one that writes to the cache. After the walk, cache
//! entries for files that disappeared are pruned.
//!
//! Per-file problems end up in [`ScanReport::failed`]. Only an unusable
//! root fails the scan as a whole.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::cache::DocumentCache;
use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::extract::{ExtractError, ExtractorEntry, ExtractorRegistry};
use crate::language::LanguageDetector;
use crate::models::{DocumentRecord, ScanFailure, ScanReport};

/// Always excluded, before `index.exclude_globs`.
pub const DEFAULT_EXCLUDES: [&str; 3] = ["**/.git/**", "**/node_modules/**", "**/target/**"];

/// A file that needs (re-)extraction.
struct Job<'a> {
    path: PathBuf,
    entry: &'a ExtractorEntry,
    size_bytes: u64,
    modified_time: DateTime<Utc>,
}

pub struct Scanner {
    cache: Arc<DocumentCache>,
    registry: Arc<ExtractorRegistry>,
    detector: LanguageDetector,
    config: IndexConfig,
    scan_lock: Mutex<()>,
    cancel: Arc<AtomicBool>,
}

impl Scanner {
    pub fn new(
        cache: Arc<DocumentCache>,
        registry: Arc<ExtractorRegistry>,
        detector: LanguageDetector,
        config: IndexConfig,
    ) -> Self {
        Self {
            cache,
            registry,
            detector,
            config,
            scan_lock: Mutex::new(()),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Asks the scan in progress to stop. Checked between files; results
    /// already extracted are still applied and pruning is skipped.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Shared flag behind [`Scanner::cancel`], for callers on other threads.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn default_root(&self) -> &Path {
        &self.config.root
    }

    /// Scans `root`, updating the cache. A concurrent call waits for the
    /// running scan to finish.
    pub fn scan(&self, root: &Path) -> Result<ScanReport> {
        let _guard = self.scan_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.cancel.store(false, Ordering::SeqCst);
        let started = Instant::now();

        let root = std::fs::canonicalize(root).map_err(|e| IndexError::Scan {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !root.is_dir() {
            return Err(IndexError::Scan {
                path: root,
                reason: "not a directory".to_string(),
            });
        }
        let excludes = self.build_excludes(&root)?;

        tracing::info!(root = %root.display(), "scan started");

        let mut report = ScanReport {
            root: root.clone(),
            ..ScanReport::default()
        };
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut unreadable_dirs: Vec<PathBuf> = Vec::new();
        let mut jobs: Vec<Job<'_>> = Vec::new();

        let walker = WalkDir::new(&root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();
        for entry in walker {
            if self.is_cancelled() {
                break;
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                    tracing::warn!(path = %path.display(), error = %e, "walk error");
                    unreadable_dirs.push(path.clone());
                    report.failed.push(ScanFailure {
                        path,
                        cause: e.to_string(),
                    });
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(&root).unwrap_or(path);
            if excludes.is_match(relative) {
                tracing::debug!(path = %path.display(), "excluded");
                continue;
            }

            let extractor = match self.registry.for_path(path) {
                Ok(extractor) => extractor,
                Err(_) => {
                    tracing::debug!(path = %path.display(), "unsupported type, skipping");
                    report.skipped_unsupported += 1;
                    continue;
                }
            };
            seen.insert(path.to_path_buf());

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cannot read metadata");
                    report.failed.push(ScanFailure {
                        path: path.to_path_buf(),
                        cause: e.to_string(),
                    });
                    continue;
                }
            };
            let modified_time = match metadata.modified() {
                Ok(t) => DateTime::<Utc>::from(t),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "no modification time");
                    report.failed.push(ScanFailure {
                        path: path.to_path_buf(),
                        cause: e.to_string(),
                    });
                    continue;
                }
            };

            if !self.cache.is_stale(path, modified_time) {
                tracing::debug!(path = %path.display(), "unchanged");
                report.skipped_unchanged += 1;
                continue;
            }

            tracing::debug!(path = %path.display(), file_type = extractor.label(), "queued for extraction");
            jobs.push(Job {
                path: path.to_path_buf(),
                entry: extractor,
                size_bytes: metadata.len(),
                modified_time,
            });
        }

        self.run_extraction(&jobs, &mut report);

        report.cancelled = self.is_cancelled();
        if report.cancelled {
            tracing::info!(root = %root.display(), "scan cancelled, pruning skipped");
        } else {
            report.removed = self.prune(&root, &seen, &unreadable_dirs);
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            root = %root.display(),
            processed = report.processed_count(),
            unchanged = report.skipped_unchanged,
            unsupported = report.skipped_unsupported,
            failed = report.failed_count(),
            removed = report.removed.len(),
            duration_ms = report.duration_ms,
            "scan finished"
        );
        Ok(report)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn build_excludes(&self, root: &Path) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        let patterns = DEFAULT_EXCLUDES
            .iter()
            .map(|p| p.to_string())
            .chain(self.config.exclude_globs.iter().cloned());
        for pattern in patterns {
            let glob = Glob::new(&pattern).map_err(|e| IndexError::Scan {
                path: root.to_path_buf(),
                reason: format!("invalid exclude glob '{}': {}", pattern, e),
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|e| IndexError::Scan {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Extracts `jobs` on worker threads and applies the results.
    fn run_extraction(&self, jobs: &[Job<'_>], report: &mut ScanReport) {
        if jobs.is_empty() {
            return;
        }
        let workers = self.config.workers.clamp(1, jobs.len());
        let next = AtomicUsize::new(0);
        let mut processed: Vec<(usize, PathBuf)> = Vec::new();
        let mut failed: Vec<(usize, ScanFailure)> = Vec::new();

        std::thread::scope(|scope| {
            let (tx, rx) = mpsc::channel::<(usize, std::result::Result<DocumentRecord, ExtractError>)>();
            for _ in 0..workers {
                let tx = tx.clone();
                let next = &next;
                scope.spawn(move || loop {
                    if self.is_cancelled() {
                        break;
                    }
                    let i = next.fetch_add(1, Ordering::SeqCst);
                    let Some(job) = jobs.get(i) else {
                        break;
                    };
                    let outcome = self.extract_job(job);
                    if tx.send((i, outcome)).is_err() {
                        break;
                    }
                });
            }
            drop(tx);

            for (i, outcome) in rx {
                let job = &jobs[i];
                match outcome {
                    Ok(record) => {
                        self.cache.put(record);
                        processed.push((i, job.path.clone()));
                    }
                    Err(cause) => {
                        let err = IndexError::Extraction {
                            path: job.path.clone(),
                            cause,
                        };
                        tracing::warn!(error = %err, "extraction failed, keeping previous record");
                        failed.push((
                            i,
                            ScanFailure {
                                path: job.path.clone(),
                                cause: err.to_string(),
                            },
                        ));
                    }
                }
            }
        });

        processed.sort_by_key(|(i, _)| *i);
        failed.sort_by_key(|(i, _)| *i);
        report.processed = processed.into_iter().map(|(_, p)| p).collect();
        report.failed.extend(failed.into_iter().map(|(_, f)| f));
    }

    fn extract_job(&self, job: &Job<'_>) -> std::result::Result<DocumentRecord, ExtractError> {
        let content = job.entry.extract_file(&job.path, self.config.max_file_bytes)?;
        let language = self.detector.detect(&content);
        let file_name = job
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(DocumentRecord {
            path: job.path.clone(),
            file_name,
            file_type: job.entry.label().to_string(),
            language,
            size_bytes: job.size_bytes,
            modified_time: job.modified_time,
            content,
            extracted_at: Utc::now(),
        })
    }

    /// Drops records whose file is gone, and records under `root` the walk
    /// did not yield (newly excluded, or turned unsupported). Paths under a
    /// directory the walk could not read are left alone.
    fn prune(&self, root: &Path, seen: &HashSet<PathBuf>, unreadable: &[PathBuf]) -> Vec<PathBuf> {
        let mut removed = Vec::new();
        for path in self.cache.paths() {
            let gone = !path.exists();
            let unseen = path.starts_with(root)
                && !seen.contains(&path)
                && !unreadable.iter().any(|dir| path.starts_with(dir));
            if (gone || unseen) && self.cache.remove(&path) {
                tracing::debug!(path = %path.display(), "pruned");
                removed.push(path);
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Extractor;
    use std::fs;
    use tempfile::TempDir;

    fn scanner_with(registry: ExtractorRegistry, config: IndexConfig) -> (Scanner, Arc<DocumentCache>) {
        let cache = Arc::new(DocumentCache::new());
        let scanner = Scanner::new(
            Arc::clone(&cache),
            Arc::new(registry),
            LanguageDetector::default(),
            config,
        );
        (scanner, cache)
    }

    fn scanner() -> (Scanner, Arc<DocumentCache>) {
        scanner_with(ExtractorRegistry::builtin(), IndexConfig::default())
    }

    #[test]
    fn missing_root_is_a_scan_error() {
        let (scanner, _) = scanner();
        let err = scanner.scan(Path::new("/definitely/not/a/dir")).unwrap_err();
        assert!(matches!(err, IndexError::Scan { .. }));
    }

    #[test]
    fn file_root_is_a_scan_error() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.txt");
        fs::write(&file, "hello").unwrap();
        let (scanner, _) = scanner();
        let err = scanner.scan(&file).unwrap_err();
        assert!(err.to_string().contains("not a directory"), "{}", err);
    }

    #[test]
    fn counts_unsupported_and_excluded() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "alpha").unwrap();
        fs::write(tmp.path().join("image.png"), [0u8, 1, 2]).unwrap();
        fs::create_dir_all(tmp.path().join("node_modules/pkg")).unwrap();
        fs::write(tmp.path().join("node_modules/pkg/readme.txt"), "vendored").unwrap();

        let (scanner, cache) = scanner();
        let report = scanner.scan(tmp.path()).unwrap();
        assert_eq!(report.processed_count(), 1);
        assert_eq!(report.skipped_unsupported, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn newly_excluded_files_are_pruned() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("drafts")).unwrap();
        fs::write(tmp.path().join("keep.txt"), "keep me").unwrap();
        fs::write(tmp.path().join("drafts/wip.txt"), "work in progress").unwrap();

        let cache = Arc::new(DocumentCache::new());
        let registry = Arc::new(ExtractorRegistry::builtin());
        let first = Scanner::new(
            Arc::clone(&cache),
            Arc::clone(&registry),
            LanguageDetector::default(),
            IndexConfig::default(),
        );
        assert_eq!(first.scan(tmp.path()).unwrap().processed_count(), 2);

        let second = Scanner::new(
            Arc::clone(&cache),
            registry,
            LanguageDetector::default(),
            IndexConfig {
                exclude_globs: vec!["drafts/**".to_string()],
                ..IndexConfig::default()
            },
        );
        let report = second.scan(tmp.path()).unwrap();
        assert_eq!(report.removed.len(), 1);
        assert!(report.removed[0].ends_with("drafts/wip.txt"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn oversized_file_is_a_failure_not_an_abort() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("big.txt"), "x".repeat(100)).unwrap();
        fs::write(tmp.path().join("small.txt"), "tiny").unwrap();
        let (scanner, _) = scanner_with(
            ExtractorRegistry::builtin(),
            IndexConfig {
                max_file_bytes: 10,
                ..IndexConfig::default()
            },
        );
        let report = scanner.scan(tmp.path()).unwrap();
        assert_eq!(report.processed_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(report.failed[0].cause.contains("size limit"), "{}", report.failed[0].cause);
    }

    #[test]
    fn processed_is_in_walk_order_with_many_workers() {
        let tmp = TempDir::new().unwrap();
        for name in ["d.txt", "a.txt", "c.txt", "b.txt", "e.txt"] {
            fs::write(tmp.path().join(name), format!("content of {}", name)).unwrap();
        }
        let (scanner, _) = scanner_with(
            ExtractorRegistry::builtin(),
            IndexConfig {
                workers: 4,
                ..IndexConfig::default()
            },
        );
        let report = scanner.scan(tmp.path()).unwrap();
        let names: Vec<String> = report
            .processed
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt", "d.txt", "e.txt"]);
    }

    struct CancelOnExtract(Arc<AtomicBool>);

    impl Extractor for CancelOnExtract {
        fn extract(&self, bytes: &[u8]) -> std::result::Result<String, ExtractError> {
            self.0.store(true, Ordering::SeqCst);
            Ok(String::from_utf8_lossy(bytes).to_string())
        }
    }

    #[test]
    fn cancel_stops_dispatch_and_skips_pruning() {
        let tmp = TempDir::new().unwrap();
        for name in ["a.slow", "b.slow", "c.slow"] {
            fs::write(tmp.path().join(name), "some text").unwrap();
        }

        let cache = Arc::new(DocumentCache::new());
        let stale = tmp.path().canonicalize().unwrap().join("gone.txt");
        cache.put(DocumentRecord {
            path: stale.clone(),
            file_name: "gone.txt".to_string(),
            file_type: "Text File".to_string(),
            language: "unknown".to_string(),
            size_bytes: 1,
            modified_time: Utc::now(),
            content: "old".to_string(),
            extracted_at: Utc::now(),
        });

        let flag = Arc::new(AtomicBool::new(false));
        let mut registry = ExtractorRegistry::new();
        registry.register(&[".slow"], "Slow", Box::new(CancelOnExtract(Arc::clone(&flag))));
        let mut scanner = Scanner::new(
            Arc::clone(&cache),
            Arc::new(registry),
            LanguageDetector::default(),
            IndexConfig {
                workers: 1,
                ..IndexConfig::default()
            },
        );
        scanner.cancel = flag;

        let report = scanner.scan(tmp.path()).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.processed_count(), 1);
        assert!(report.removed.is_empty());
        assert!(cache.get(&stale).is_some());
    }
}
